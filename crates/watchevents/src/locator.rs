//! Object locators
//!
//! A locator is the human-readable identity of the object an event concerns,
//! e.g. `ns/default pod/web-1 node/node-a`. Timeline tooling groups intervals
//! by locator, so the format must stay stable.

use crate::event::KubeEvent;

/// Reporting component whose host is appended as a `node/<host>` suffix.
const NODE_AGENT_COMPONENT: &str = "kubelet";

/// Locator for a namespace.
#[must_use]
pub fn namespace_locator(namespace: &str) -> String {
    format!("ns/{namespace}")
}

/// Locator for a node.
#[must_use]
pub fn node_locator(node: &str) -> String {
    format!("node/{node}")
}

/// Build the locator for an involved object.
///
/// Namespace and Node kinds are checked before namespace presence: both are
/// cluster scoped and must not take the generic `<kind>/<name>` form.
#[must_use]
pub fn locate(
    kind: &str,
    name: &str,
    namespace: &str,
    source_host: &str,
    source_component: &str,
) -> String {
    match kind {
        "Namespace" => return namespace_locator(name),
        "Node" => return node_locator(name),
        _ => {}
    }

    let mut locator = if namespace.is_empty() {
        format!("{}/{name}", kind.to_lowercase())
    } else {
        format!("ns/{namespace} {}/{name}", kind.to_lowercase())
    };
    if !source_host.is_empty() && source_component == NODE_AGENT_COMPONENT {
        locator.push(' ');
        locator.push_str(&node_locator(source_host));
    }
    locator
}

/// Locator for the object an event is about.
#[must_use]
pub fn locate_event(event: &KubeEvent) -> String {
    let obj = &event.involved_object;
    locate(
        &obj.kind,
        &obj.name,
        &obj.namespace,
        &event.source.host,
        &event.source.component,
    )
}
