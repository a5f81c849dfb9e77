//! Interval records and sinks
//!
//! An interval is the unit the timeline consumes: a leveled, located,
//! annotated span of time. The engine hands each interval to an
//! [`IntervalRecorder`] once and never touches it again.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// Resource-kind label for raw event snapshots.
pub const EVENTS_RESOURCE: &str = "events";

/// End time for an interval that must be visible on the timeline.
///
/// The timeline renderer drops intervals with `from == to`, so intervals we
/// want charted get one second of width. The second carries no timing
/// meaning; replace this once the renderer shows zero-width intervals.
#[must_use]
pub fn display_end(from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::seconds(1)
}

/// Interval severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Warning,
}

/// Producer of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalSource {
    KubeEvent,
}

/// A timeline interval. `to >= from` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub source: IntervalSource,
    pub level: Level,
    pub locator: String,
    pub message: Message,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Interval {
    /// Build an interval; a `to` earlier than `from` is clamped to `from`.
    #[must_use]
    pub fn new(
        source: IntervalSource,
        level: Level,
        locator: impl Into<String>,
        message: Message,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            level,
            locator: locator.into(),
            message,
            from,
            to: to.max(from),
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.to - self.from
    }
}

/// Raw object archived alongside intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub resource: String,
    pub object: Value,
}

/// Write-only sink for monitor output.
pub trait IntervalRecorder: Send + Sync {
    /// Archive a raw resource under a resource-kind label.
    fn record_resource(&self, resource: &str, object: &Value);

    /// Store a finished interval.
    fn add_interval(&self, interval: Interval);
}

#[derive(Debug, Default)]
struct RecordedState {
    resources: Vec<ResourceSnapshot>,
    intervals: Vec<Interval>,
}

/// In-memory recorder.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    state: Mutex<RecordedState>,
}

impl MemoryRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn intervals(&self) -> Vec<Interval> {
        self.state.lock().intervals.clone()
    }

    #[must_use]
    pub fn resources(&self) -> Vec<ResourceSnapshot> {
        self.state.lock().resources.clone()
    }

    /// Drain recorded intervals, leaving the recorder empty.
    pub fn take_intervals(&self) -> Vec<Interval> {
        std::mem::take(&mut self.state.lock().intervals)
    }
}

impl IntervalRecorder for MemoryRecorder {
    fn record_resource(&self, resource: &str, object: &Value) {
        self.state.lock().resources.push(ResourceSnapshot {
            resource: resource.to_string(),
            object: object.clone(),
        });
    }

    fn add_interval(&self, interval: Interval) {
        self.state.lock().intervals.push(interval);
    }
}
