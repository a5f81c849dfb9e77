//! Dedup ledger for watch notifications
//!
//! Maps each event identity to the last version stamp that was processed.
//! Watch transports redeliver objects on relist and on unrelated updates; an
//! event is processed again only when its version stamp changed.
//!
//! The ledger is never pruned. It grows with the number of distinct event
//! identities seen during one monitoring run.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Single-writer ledger owned by one watch driver.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashMap<String, String>,
}

impl DedupLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `(identity, version)` has not been processed yet, and
    /// records `version` as the last processed stamp for `identity`.
    pub fn should_process(&mut self, identity: &str, version: &str) -> bool {
        match self.seen.get_mut(identity) {
            Some(last) if last == version => false,
            Some(last) => {
                version.clone_into(last);
                true
            }
            None => {
                self.seen.insert(identity.to_string(), version.to_string());
                true
            }
        }
    }

    /// Last processed version for an identity.
    #[must_use]
    pub fn last_version(&self, identity: &str) -> Option<&str> {
        self.seen.get(identity).map(String::as_str)
    }

    /// Number of distinct identities recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Ledger shared by several watch drivers.
///
/// Each `should_process` call is atomic per identity.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<DedupLedger>>,
}

impl SharedLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_process(&self, identity: &str, version: &str) -> bool {
        self.inner.lock().should_process(identity, version)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
