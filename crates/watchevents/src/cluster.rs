//! Cluster lookups used while classifying events
//!
//! The engine needs two things from the cluster API besides the event
//! stream: node labels (for role annotations) and the control-plane topology
//! (for pathology matching). Both are best effort. A failed lookup degrades
//! to a missing annotation or the `Unset` topology and never fails an event.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LookupError;
use crate::pathology::TopologyMode;

/// Label prefix marking node roles, e.g. `node-role.kubernetes.io/worker`.
pub const NODE_ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

/// Fetches node labels by node name.
#[async_trait]
pub trait NodeLookup: Send + Sync {
    async fn node_labels(&self, name: &str) -> Result<BTreeMap<String, String>, LookupError>;
}

/// Fetches the cluster's control-plane topology.
#[async_trait]
pub trait TopologySource: Send + Sync {
    async fn topology(&self) -> Result<TopologyMode, LookupError>;
}

/// A topology known up front.
#[async_trait]
impl TopologySource for TopologyMode {
    async fn topology(&self) -> Result<TopologyMode, LookupError> {
        Ok(*self)
    }
}

/// Sorted, comma-joined role names from node labels.
///
/// Empty when the node carries no role labels.
#[must_use]
pub fn node_roles<'a, I>(label_keys: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let mut roles: Vec<&str> = label_keys
        .into_iter()
        .filter_map(|key| key.strip_prefix(NODE_ROLE_LABEL_PREFIX))
        .filter(|role| !role.is_empty())
        .collect();
    roles.sort_unstable();
    roles.join(",")
}

/// Resolve the role list for a node, bounded by `timeout`.
///
/// Returns `None` when the lookup fails or takes too long.
pub async fn resolve_node_roles(
    lookup: &dyn NodeLookup,
    node: &str,
    timeout: Duration,
) -> Option<String> {
    let result = match tokio::time::timeout(timeout, lookup.node_labels(node)).await {
        Ok(result) => result,
        Err(_) => Err(LookupError::Timeout(timeout.as_millis() as u64)),
    };
    match result {
        Ok(labels) => Some(node_roles(labels.keys())),
        Err(err) => {
            tracing::debug!(node, error = %err, "node role lookup failed");
            None
        }
    }
}

/// Fetch the topology once, falling back to `Unset` on failure.
pub async fn fetch_topology(source: &dyn TopologySource) -> TopologyMode {
    match source.topology().await {
        Ok(topology) => topology,
        Err(err) => {
            tracing::error!(
                error = %err,
                hint = %err.remediation().summary,
                "could not fetch cluster infra info"
            );
            TopologyMode::Unset
        }
    }
}
