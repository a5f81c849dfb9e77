//! Watch driver
//!
//! Consumes the notifications of one event watch (initial list, then adds and
//! updates), gates them through the dedup ledger and hands accepted events to
//! the engine.
//!
//! # States
//!
//! | State      | Entered on                 | Effect of a new event version          |
//! |------------|----------------------------|----------------------------------------|
//! | `Listing`  | start                      | resource snapshot only                 |
//! | `Watching` | first list / first add     | resource snapshot + interval           |
//!
//! Delete notifications are ignored; a deletion that matters shows up as a
//! later event describing it. The transport owns retry and relist; the driver
//! only stops when told to or when the stream ends.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::cluster::{NodeLookup, TopologySource, fetch_topology};
use crate::config::Config;
use crate::engine::{Collaborators, EngineSettings, EventEngine};
use crate::event::KubeEvent;
use crate::interval::{EVENTS_RESOURCE, IntervalRecorder};
use crate::ledger::DedupLedger;
use crate::pathology::{PathologyOracle, RuleSetOracle};
use crate::window::StalenessWindow;

/// One notification from the watch transport.
#[derive(Debug, Clone)]
pub enum WatchNotification {
    /// Full snapshot from a list call.
    Listed(Vec<Value>),
    Added(Value),
    Updated(Value),
    Deleted(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Listing,
    Watching,
}

/// Counters reported when the driver stops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStats {
    /// Snapshot items recorded during listing.
    pub listed: u64,
    /// Add/update notifications that passed the ledger.
    pub accepted: u64,
    /// Notifications rejected by the ledger.
    pub duplicates: u64,
    /// Accepted events dropped as stale.
    pub stale: u64,
    /// Payloads that were not events.
    pub skipped_payloads: u64,
    pub deletes_ignored: u64,
    /// Intervals emitted.
    pub intervals: u64,
}

/// Drives one event stream through ledger and engine.
pub struct WatchDriver {
    ledger: DedupLedger,
    engine: EventEngine,
    state: DriverState,
    stats: WatchStats,
}

impl WatchDriver {
    #[must_use]
    pub fn new(engine: EventEngine) -> Self {
        Self {
            ledger: DedupLedger::new(),
            engine,
            state: DriverState::Listing,
            stats: WatchStats::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> &WatchStats {
        &self.stats
    }

    #[must_use]
    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Handle a single notification to completion.
    pub async fn handle(&mut self, notification: WatchNotification) {
        match notification {
            WatchNotification::Listed(items) => self.handle_listed(&items),
            WatchNotification::Added(obj) | WatchNotification::Updated(obj) => {
                self.state = DriverState::Watching;
                self.handle_upsert(&obj).await;
            }
            WatchNotification::Deleted(_) => {
                self.stats.deletes_ignored += 1;
            }
        }
    }

    fn handle_listed(&mut self, items: &[Value]) {
        if self.state == DriverState::Watching {
            tracing::debug!(items = items.len(), "event watch relisted");
        }
        for obj in items {
            let Some(event) = self.decode(obj) else {
                continue;
            };
            if self
                .ledger
                .should_process(event.uid(), event.resource_version())
            {
                self.engine.recorder().record_resource(EVENTS_RESOURCE, obj);
                self.stats.listed += 1;
            } else {
                self.stats.duplicates += 1;
            }
        }
        self.state = DriverState::Watching;
        tracing::info!(
            items = items.len(),
            recorded = self.stats.listed,
            "initial event list processed"
        );
    }

    async fn handle_upsert(&mut self, obj: &Value) {
        let Some(event) = self.decode(obj) else {
            return;
        };
        if !self
            .ledger
            .should_process(event.uid(), event.resource_version())
        {
            self.stats.duplicates += 1;
            tracing::trace!(uid = %event.uid(), resource_version = %event.resource_version(), "event unchanged");
            return;
        }
        self.stats.accepted += 1;
        self.engine.recorder().record_resource(EVENTS_RESOURCE, obj);
        if self.engine.process(&event).await.is_some() {
            self.stats.intervals += 1;
        } else {
            self.stats.stale += 1;
        }
    }

    fn decode(&mut self, obj: &Value) -> Option<KubeEvent> {
        let event = KubeEvent::from_value(obj);
        if event.is_none() {
            self.stats.skipped_payloads += 1;
            tracing::trace!("skipping non-event watch payload");
        }
        event
    }

    /// Run until shutdown is signalled or the notification stream ends.
    ///
    /// Shutdown is observed between notifications only; a notification being
    /// handled always completes. A dropped shutdown sender counts as shutdown.
    pub async fn run(
        mut self,
        mut notifications: mpsc::Receiver<WatchNotification>,
        mut shutdown: watch::Receiver<bool>,
    ) -> WatchStats {
        tracing::info!(
            horizon = %self.engine.window().horizon(),
            topology = ?self.engine.topology(),
            "event watch started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                maybe = notifications.recv() => {
                    let Some(notification) = maybe else {
                        tracing::info!("event watch stream closed");
                        break;
                    };
                    self.handle(notification).await;
                }
            }
        }
        tracing::info!(stats = ?self.stats, "event watch stopped");
        self.stats
    }
}

/// Collaborators for [`spawn_event_monitoring`].
#[derive(Clone)]
pub struct MonitorDeps {
    pub nodes: Arc<dyn NodeLookup>,
    pub topology: Arc<dyn TopologySource>,
    pub recorder: Arc<dyn IntervalRecorder>,
    /// Custom oracle; the configured matcher lists are used when `None`.
    pub oracle: Option<Arc<dyn PathologyOracle>>,
}

/// Start monitoring one event stream in a background task.
///
/// The staleness horizon is anchored at the time of this call. Topology is
/// fetched once; a failed fetch leaves it unset.
pub async fn spawn_event_monitoring(
    config: &Config,
    deps: MonitorDeps,
    notifications: mpsc::Receiver<WatchNotification>,
    shutdown: watch::Receiver<bool>,
) -> crate::Result<JoinHandle<WatchStats>> {
    config.validate()?;
    let window = StalenessWindow::starting_now(config.lookback());

    let oracle: Arc<dyn PathologyOracle> = match deps.oracle {
        Some(oracle) => oracle,
        None => Arc::new(RuleSetOracle::from_config(&config.pathology)?),
    };
    let topology = fetch_topology(deps.topology.as_ref()).await;

    let engine = EventEngine::new(
        EngineSettings::from_config(config),
        window,
        topology,
        Collaborators {
            nodes: deps.nodes,
            oracle,
            recorder: deps.recorder,
        },
    );
    let driver = WatchDriver::new(engine);
    Ok(tokio::spawn(driver.run(notifications, shutdown)))
}
