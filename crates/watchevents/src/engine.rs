//! Annotation and classification engine
//!
//! Turns one accepted event into one interval:
//!
//! ```text
//! KubeEvent ─► base message (count, node roles, reason)
//!           ─► reason-specific annotations (container, image, duration)
//!           ─► level + start time (staleness check)
//!           ─► pathology oracle ─► interesting / pathological, display width
//!           ─► Interval ─► IntervalRecorder
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cluster::{NodeLookup, resolve_node_roles};
use crate::config::Config;
use crate::event::KubeEvent;
use crate::extract::{container_from_field_path, image_and_duration};
use crate::interval::{Interval, IntervalRecorder, IntervalSource, Level, display_end};
use crate::locator::locate_event;
use crate::message::{AnnotationKey, Message};
use crate::pathology::{PathologyOracle, TopologyMode};
use crate::window::{StalenessWindow, effective_time};

/// Reasons that get dedicated annotation handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownReason {
    /// Container being stopped.
    Killing,
    /// Image pull started.
    Pulling,
    /// Image pull finished (or image already present).
    Pulled,
}

impl KnownReason {
    #[must_use]
    pub fn parse(reason: &str) -> Option<Self> {
        match reason {
            "Killing" => Some(Self::Killing),
            "Pulling" => Some(Self::Pulling),
            "Pulled" => Some(Self::Pulled),
            _ => None,
        }
    }
}

/// Machine-config OS update reasons; logged on receipt for diagnosis.
fn is_os_update(reason: &str) -> bool {
    matches!(reason, "OSUpdateStaged" | "OSUpdateStarted")
}

/// Tunables taken from `[classification]`.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub duplicate_event_threshold: i32,
    pub sandbox_marker: String,
    pub node_lookup_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            duplicate_event_threshold: config.classification.duplicate_event_threshold,
            sandbox_marker: config.classification.sandbox_marker.clone(),
            node_lookup_timeout: config.node_lookup_timeout(),
        }
    }
}

/// External collaborators the engine reads from and writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub nodes: Arc<dyn NodeLookup>,
    pub oracle: Arc<dyn PathologyOracle>,
    pub recorder: Arc<dyn IntervalRecorder>,
}

/// Per-stream classification engine.
pub struct EventEngine {
    settings: EngineSettings,
    window: StalenessWindow,
    topology: TopologyMode,
    deps: Collaborators,
}

impl EventEngine {
    #[must_use]
    pub fn new(
        settings: EngineSettings,
        window: StalenessWindow,
        topology: TopologyMode,
        deps: Collaborators,
    ) -> Self {
        Self {
            settings,
            window,
            topology,
            deps,
        }
    }

    #[must_use]
    pub fn window(&self) -> &StalenessWindow {
        &self.window
    }

    #[must_use]
    pub fn topology(&self) -> TopologyMode {
        self.topology
    }

    #[must_use]
    pub fn recorder(&self) -> &Arc<dyn IntervalRecorder> {
        &self.deps.recorder
    }

    /// Classify one event and emit its interval.
    ///
    /// Returns `None` when the event is older than the staleness horizon.
    pub async fn process(&self, event: &KubeEvent) -> Option<Interval> {
        let os_update = is_os_update(&event.reason);
        if os_update {
            tracing::info!(
                reason = %event.reason,
                involved = %event.involved_object.name,
                last_timestamp = ?event.last_timestamp,
                "watch received OS update event"
            );
        }

        let message = self.base_message(event).await;
        let message = annotate_for_reason(event, message);

        let level = if event.is_warning() {
            Level::Warning
        } else {
            Level::Info
        };

        let effective = effective_time(event);
        if self.window.is_stale(effective) {
            if os_update {
                tracing::info!(
                    reason = %event.reason,
                    involved = %event.involved_object.name,
                    last_timestamp = ?event.last_timestamp,
                    "OS update event filtered for being too old"
                );
            } else {
                tracing::debug!(
                    uid = %event.uid(),
                    at = ?effective,
                    horizon = %self.window.horizon(),
                    "dropping stale event"
                );
            }
            return None;
        }
        let from = effective.unwrap_or_else(Utc::now);

        let locator = locate_event(event);
        let (message, to) = self.classify(event, &locator, message, from);

        let interval = Interval::new(IntervalSource::KubeEvent, level, locator, message, from, to);
        tracing::info!(
            uid = %event.uid(),
            resource_version = %event.resource_version(),
            locator = %interval.locator,
            message = %interval.message,
            "processed event"
        );
        self.deps.recorder.add_interval(interval.clone());
        Some(interval)
    }

    /// Human text, repeat count, node roles and reason.
    async fn base_message(&self, event: &KubeEvent) -> Message {
        let mut message = Message::new(event.message.clone());
        if event.count > 1 {
            message.set(AnnotationKey::Count, event.count.to_string());
        }

        if event.involved_object.kind == "Node" {
            if let Some(roles) = resolve_node_roles(
                self.deps.nodes.as_ref(),
                &event.involved_object.name,
                self.settings.node_lookup_timeout,
            )
            .await
            {
                message.set(AnnotationKey::Roles, roles);
            }
        }

        if !event.reason.is_empty() {
            message = message.with_reason(event.reason.clone());
        }
        message
    }

    /// Interesting/pathological flags and the interval end.
    fn classify(
        &self,
        event: &KubeEvent,
        locator: &str,
        mut message: Message,
        from: DateTime<Utc>,
    ) -> (Message, DateTime<Utc>) {
        let matched = self
            .deps
            .oracle
            .matches_any(locator, &message, self.topology);

        if event.count > 1 {
            if let Some(rule) = &matched {
                tracing::debug!(rule = %rule.name, locator, "repeated event matches known pattern");
                message.set(AnnotationKey::Interesting, "true");
            }
            if event.count > self.settings.duplicate_event_threshold {
                message.set(AnnotationKey::Pathological, "true");
            }
            (message, display_end(from))
        } else if event.message.contains(self.settings.sandbox_marker.as_str()) {
            message.set(AnnotationKey::Interesting, "true");
            (message, display_end(from))
        } else {
            (message, from)
        }
    }
}

/// Reason-specific annotations for pod container events.
fn annotate_for_reason(event: &KubeEvent, mut message: Message) -> Message {
    let Some(reason) = KnownReason::parse(&event.reason) else {
        return message;
    };
    if event.involved_object.kind != "Pod" {
        return message;
    }
    let Some(container) = container_from_field_path(&event.involved_object.field_path) else {
        return message;
    };

    match reason {
        KnownReason::Killing => {
            message.set(AnnotationKey::Container, container);
        }
        KnownReason::Pulling | KnownReason::Pulled => {
            if let Some(pull) = image_and_duration(&event.message) {
                message.set(AnnotationKey::Container, container);
                if let Some(duration) = pull.duration_label() {
                    message.set(AnnotationKey::Duration, duration);
                }
                message.set(AnnotationKey::Image, pull.image);
            }
        }
    }
    message
}
