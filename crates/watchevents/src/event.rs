//! Raw event model
//!
//! Mirrors the JSON shape of a core/v1 `Event` as served by the cluster API.
//! Only the fields the normalization engine reads are modelled; the raw
//! object is kept alongside for the resource snapshot passthrough.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity class reported by the event producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    Normal,
    Warning,
    /// Anything the producer sent that is not one of the two known classes.
    #[serde(other)]
    Other,
}

/// Object metadata subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub uid: String,
    pub resource_version: String,
    pub name: String,
    pub namespace: String,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// The object an event is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectReference {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub field_path: String,
}

/// Reporting component and host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSource {
    pub component: String,
    pub host: String,
}

/// A cluster event as observed on the watch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KubeEvent {
    pub metadata: ObjectMeta,
    pub involved_object: ObjectReference,
    pub reason: String,
    pub message: String,
    pub source: EventSource,
    pub count: i32,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Time the event was first observed (`eventTime`).
    pub event_time: Option<DateTime<Utc>>,
}

impl KubeEvent {
    /// Decode a watch payload.
    ///
    /// Returns `None` for payloads that are not events: a `kind` other than
    /// `Event`, or a shape that does not deserialize.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(kind) = value.get("kind").and_then(Value::as_str) {
            if kind != "Event" {
                return None;
            }
        }
        if !value.is_object() {
            return None;
        }
        Self::deserialize(value).ok()
    }

    /// Identity key used by the dedup ledger.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.metadata.uid
    }

    /// Version stamp used by the dedup ledger.
    #[must_use]
    pub fn resource_version(&self) -> &str {
        &self.metadata.resource_version
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.event_type == EventType::Warning
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal pod event; tests override fields as needed.
    pub fn pod_event(uid: &str, rv: &str) -> KubeEvent {
        KubeEvent {
            metadata: ObjectMeta {
                uid: uid.to_string(),
                resource_version: rv.to_string(),
                name: format!("web-1.{uid}"),
                namespace: "default".to_string(),
                creation_timestamp: None,
            },
            involved_object: ObjectReference {
                kind: "Pod".to_string(),
                name: "web-1".to_string(),
                namespace: "default".to_string(),
                field_path: String::new(),
            },
            reason: "Scheduled".to_string(),
            message: "Successfully assigned default/web-1 to node-a".to_string(),
            count: 1,
            ..KubeEvent::default()
        }
    }
}
