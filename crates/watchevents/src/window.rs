//! Staleness window
//!
//! Event sources may replay events whose effective time is far older than
//! their delivery time (test harnesses writing events "now" with old
//! timestamps). Those would show up as just-happened in the timeline, so
//! events older than `started_at - lookback` are dropped.

use chrono::{DateTime, Duration, Utc};

use crate::event::KubeEvent;

/// Fixed horizon computed once when monitoring starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessWindow {
    horizon: DateTime<Utc>,
}

impl StalenessWindow {
    /// A lookback reaching past the earliest representable time saturates.
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, lookback: Duration) -> Self {
        Self {
            horizon: started_at
                .checked_sub_signed(lookback)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Window anchored at the current time.
    #[must_use]
    pub fn starting_now(lookback: Duration) -> Self {
        Self::new(Utc::now(), lookback)
    }

    #[must_use]
    pub fn horizon(&self) -> DateTime<Utc> {
        self.horizon
    }

    /// True iff a timestamp is present and strictly before the horizon.
    ///
    /// An absent timestamp is never stale.
    #[must_use]
    pub fn is_stale(&self, at: Option<DateTime<Utc>>) -> bool {
        match at {
            Some(at) => at < self.horizon,
            None => false,
        }
    }
}

/// Best available timestamp: last seen, else first observed, else creation.
///
/// Unix-epoch values count as unset.
#[must_use]
pub fn effective_time(event: &KubeEvent) -> Option<DateTime<Utc>> {
    [
        event.last_timestamp,
        event.event_time,
        event.metadata.creation_timestamp,
    ]
    .into_iter()
    .flatten()
    .find(|ts| ts.timestamp() != 0 || ts.timestamp_subsec_nanos() != 0)
}
