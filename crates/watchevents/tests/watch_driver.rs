//! Integration tests for the watch driver.
//!
//! Drives `spawn_event_monitoring` through a real mpsc channel with
//! in-memory fakes for node lookup, topology and the interval sink.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};

use watchevents::Error;
use watchevents::cluster::{NodeLookup, TopologySource};
use watchevents::config::Config;
use watchevents::error::{ConfigError, LookupError, PatternError};
use watchevents::interval::{Level, MemoryRecorder};
use watchevents::message::AnnotationKey;
use watchevents::pathology::TopologyMode;
use watchevents::watch::{MonitorDeps, WatchNotification, WatchStats, spawn_event_monitoring};

// ────────────────────────────────────────────────────────────────────
// Fakes
// ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeNodes {
    calls: AtomicUsize,
}

#[async_trait]
impl NodeLookup for FakeNodes {
    async fn node_labels(&self, name: &str) -> Result<BTreeMap<String, String>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match name {
            "master-0" => Ok(BTreeMap::from([
                ("node-role.kubernetes.io/master".to_string(), String::new()),
                ("node-role.kubernetes.io/control-plane".to_string(), String::new()),
            ])),
            other => Err(LookupError::NodeNotFound(other.to_string())),
        }
    }
}

struct NoInfra;

#[async_trait]
impl TopologySource for NoInfra {
    async fn topology(&self) -> Result<TopologyMode, LookupError> {
        Err(LookupError::Failed("infrastructures.config \"cluster\" not found".into()))
    }
}

struct Harness {
    notify: mpsc::Sender<WatchNotification>,
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<WatchStats>,
    recorder: Arc<MemoryRecorder>,
    nodes: Arc<FakeNodes>,
}

impl Harness {
    async fn start(config: &Config, topology: Arc<dyn TopologySource>) -> Self {
        let recorder = Arc::new(MemoryRecorder::new());
        let nodes = Arc::new(FakeNodes::default());
        let (notify, rx) = mpsc::channel(32);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let deps = MonitorDeps {
            nodes: nodes.clone(),
            topology,
            recorder: recorder.clone(),
            oracle: None,
        };
        let handle = spawn_event_monitoring(config, deps, rx, shutdown_rx)
            .await
            .unwrap();
        Self {
            notify,
            shutdown,
            handle,
            recorder,
            nodes,
        }
    }

    async fn send(&self, notification: WatchNotification) {
        self.notify.send(notification).await.unwrap();
    }

    /// Close the stream and wait for the driver to drain it.
    async fn finish(self) -> (WatchStats, Arc<MemoryRecorder>, Arc<FakeNodes>) {
        drop(self.notify);
        let stats = self.handle.await.unwrap();
        drop(self.shutdown);
        (stats, self.recorder, self.nodes)
    }
}

fn event(uid: &str, rv: &str, reason: &str, message: &str, count: i32) -> Value {
    json!({
        "kind": "Event",
        "apiVersion": "v1",
        "metadata": {"uid": uid, "resourceVersion": rv, "namespace": "openshift-etcd"},
        "involvedObject": {
            "kind": "Pod",
            "name": "etcd-master-0",
            "namespace": "openshift-etcd",
            "fieldPath": "spec.containers{etcd}",
        },
        "reason": reason,
        "message": message,
        "source": {"component": "kubelet", "host": "master-0"},
        "count": count,
        "type": "Warning",
        "lastTimestamp": Utc::now().to_rfc3339(),
    })
}

fn node_event(uid: &str, rv: &str) -> Value {
    json!({
        "kind": "Event",
        "metadata": {"uid": uid, "resourceVersion": rv},
        "involvedObject": {"kind": "Node", "name": "master-0"},
        "reason": "NodeReady",
        "message": "Node master-0 status is now: NodeReady",
        "type": "Normal",
        "count": 1,
        "eventTime": Utc::now().to_rfc3339(),
    })
}

const RULES: &str = r#"
[[pathology.steady_state]]
name = "etcd-unhealthy"
locator = "^ns/openshift-etcd "
reason = "^Unhealthy$"

[[pathology.upgrade]]
name = "sno-only"
reason = "^BackOff$"
topology = "single_replica"
"#;

// ────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_then_watch_emits_only_new_versions() {
    let config = Config::default();
    let h = Harness::start(&config, Arc::new(TopologyMode::HighlyAvailable)).await;

    h.send(WatchNotification::Listed(vec![
        event("a", "1", "Started", "Started container etcd", 1),
        event("b", "1", "Created", "Created container etcd", 1),
    ]))
    .await;
    h.send(WatchNotification::Added(event("a", "1", "Started", "Started container etcd", 1)))
        .await;
    h.send(WatchNotification::Updated(event("b", "2", "Created", "Created container etcd", 1)))
        .await;

    let (stats, recorder, _) = h.finish().await;
    assert_eq!(stats.listed, 2);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.intervals, 1);

    let intervals = recorder.intervals();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].level, Level::Warning);
    assert_eq!(
        intervals[0].locator,
        "ns/openshift-etcd pod/etcd-master-0 node/master-0"
    );
    assert_eq!(recorder.resources().len(), 3);
    assert!(recorder.resources().iter().all(|r| r.resource == "events"));
}

#[tokio::test]
async fn relist_does_not_reemit() {
    let config = Config::default();
    let h = Harness::start(&config, Arc::new(TopologyMode::HighlyAvailable)).await;

    h.send(WatchNotification::Added(event("a", "1", "Started", "Started container etcd", 1)))
        .await;
    h.send(WatchNotification::Listed(vec![
        event("a", "1", "Started", "Started container etcd", 1),
        event("c", "7", "Killing", "Stopping container etcd", 1),
    ]))
    .await;

    let (stats, recorder, _) = h.finish().await;
    assert_eq!(stats.intervals, 1);
    assert_eq!(stats.listed, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(recorder.intervals().len(), 1);
}

#[tokio::test]
async fn deletes_never_emit() {
    let config = Config::default();
    let h = Harness::start(&config, Arc::new(TopologyMode::HighlyAvailable)).await;

    h.send(WatchNotification::Deleted(event("a", "1", "Started", "x", 1))).await;
    h.send(WatchNotification::Deleted(event("a", "2", "Started", "x", 1))).await;

    let (stats, recorder, _) = h.finish().await;
    assert_eq!(stats.deletes_ignored, 2);
    assert!(recorder.intervals().is_empty());
    assert!(recorder.resources().is_empty());
}

#[tokio::test]
async fn configured_rules_mark_repeated_events() {
    let config = Config::from_toml_str(RULES).unwrap();
    let h = Harness::start(&config, Arc::new(TopologyMode::HighlyAvailable)).await;

    h.send(WatchNotification::Added(event(
        "a",
        "1",
        "Unhealthy",
        "Readiness probe failed",
        25,
    )))
    .await;
    // Topology-restricted rule does not apply on an HA cluster.
    h.send(WatchNotification::Added(event(
        "b",
        "1",
        "BackOff",
        "Back-off restarting failed container",
        3,
    )))
    .await;

    let (_, recorder, _) = h.finish().await;
    let intervals = recorder.intervals();
    assert_eq!(intervals.len(), 2);

    let unhealthy = &intervals[0].message;
    assert_eq!(unhealthy.annotation(AnnotationKey::Count), Some("25"));
    assert_eq!(unhealthy.annotation(AnnotationKey::Interesting), Some("true"));
    assert_eq!(unhealthy.annotation(AnnotationKey::Pathological), Some("true"));
    assert_eq!(intervals[0].duration(), chrono::Duration::seconds(1));

    let backoff = &intervals[1].message;
    assert!(!backoff.has_annotation(AnnotationKey::Interesting));
    assert!(!backoff.has_annotation(AnnotationKey::Pathological));
}

#[tokio::test]
async fn failed_topology_fetch_leaves_topology_unset() {
    let config = Config::from_toml_str(RULES).unwrap();
    let h = Harness::start(&config, Arc::new(NoInfra)).await;

    h.send(WatchNotification::Added(event(
        "b",
        "1",
        "BackOff",
        "Back-off restarting failed container",
        3,
    )))
    .await;

    let (stats, recorder, _) = h.finish().await;
    assert_eq!(stats.intervals, 1);
    assert!(!recorder.intervals()[0]
        .message
        .has_annotation(AnnotationKey::Interesting));
}

#[tokio::test]
async fn single_replica_topology_enables_restricted_rules() {
    let config = Config::from_toml_str(RULES).unwrap();
    let h = Harness::start(&config, Arc::new(TopologyMode::SingleReplica)).await;

    h.send(WatchNotification::Added(event(
        "b",
        "1",
        "BackOff",
        "Back-off restarting failed container",
        3,
    )))
    .await;

    let (_, recorder, _) = h.finish().await;
    assert_eq!(
        recorder.intervals()[0]
            .message
            .annotation(AnnotationKey::Interesting),
        Some("true")
    );
}

#[tokio::test]
async fn node_events_carry_roles() {
    let config = Config::default();
    let h = Harness::start(&config, Arc::new(TopologyMode::HighlyAvailable)).await;

    h.send(WatchNotification::Added(node_event("n", "1"))).await;

    let (_, recorder, nodes) = h.finish().await;
    let intervals = recorder.intervals();
    assert_eq!(intervals[0].locator, "node/master-0");
    assert_eq!(
        intervals[0].message.annotation(AnnotationKey::Roles),
        Some("control-plane,master")
    );
    assert_eq!(nodes.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_and_foreign_payloads_are_dropped() {
    let config = Config::default();
    let h = Harness::start(&config, Arc::new(TopologyMode::HighlyAvailable)).await;

    let mut old = event("old", "1", "Started", "Started container etcd", 1);
    old["lastTimestamp"] = json!((Utc::now() - chrono::Duration::hours(2)).to_rfc3339());
    h.send(WatchNotification::Added(old)).await;
    h.send(WatchNotification::Added(json!({"kind": "Pod", "metadata": {"uid": "p"}})))
        .await;
    h.send(WatchNotification::Added(json!("not an object"))).await;

    let (stats, recorder, _) = h.finish().await;
    assert_eq!(stats.stale, 1);
    assert_eq!(stats.skipped_payloads, 2);
    assert!(recorder.intervals().is_empty());
    assert_eq!(recorder.resources().len(), 1);
}

#[tokio::test]
async fn shutdown_signal_stops_driver() {
    let config = Config::default();
    let h = Harness::start(&config, Arc::new(TopologyMode::HighlyAvailable)).await;

    h.send(WatchNotification::Added(event("a", "1", "Started", "x", 1))).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.shutdown.send(true).unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(5), h.handle)
        .await
        .expect("driver stops after shutdown")
        .unwrap();
    assert_eq!(stats.intervals, 1);
    // The sender is still held here, so the driver left on the shutdown
    // signal and released its end of the stream.
    assert!(h.notify.is_closed());
}

#[tokio::test]
async fn invalid_matcher_regex_fails_spawn() {
    let config = Config::from_toml_str(
        r#"
        [[pathology.steady_state]]
        name = "broken"
        reason = "(unclosed"
        "#,
    )
    .unwrap();
    let (_tx, rx) = mpsc::channel(1);
    let (_stop, stop_rx) = watch::channel(false);
    let deps = MonitorDeps {
        nodes: Arc::new(FakeNodes::default()),
        topology: Arc::new(TopologyMode::Unset),
        recorder: Arc::new(MemoryRecorder::new()),
        oracle: None,
    };
    let err = spawn_event_monitoring(&config, deps, rx, stop_rx)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Pattern(PatternError::InvalidRegex(_))));
}

#[tokio::test]
async fn oversized_lookback_fails_spawn() {
    let mut config = Config::default();
    config.window.lookback_minutes = 1_000_000_000_000;
    let (_tx, rx) = mpsc::channel(1);
    let (_stop, stop_rx) = watch::channel(false);
    let deps = MonitorDeps {
        nodes: Arc::new(FakeNodes::default()),
        topology: Arc::new(TopologyMode::Unset),
        recorder: Arc::new(MemoryRecorder::new()),
        oracle: None,
    };
    let err = spawn_event_monitoring(&config, deps, rx, stop_rx)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Invalid(_))));
}
