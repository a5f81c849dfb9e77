//! watchevents: kube event normalization engine
//!
//! Observes a live stream of cluster events and turns each one into an
//! annotated, timestamped interval for timeline analysis.
//!
//! # Architecture
//!
//! ```text
//! watch transport → WatchDriver → DedupLedger → EventEngine → IntervalRecorder
//!                                                  ↓
//!                       extract / locator / cluster lookups / pathology oracle
//! ```
//!
//! # Modules
//!
//! - `event`: raw event model as delivered by the cluster API
//! - `ledger`: identity → version stamp dedup ledger
//! - `window`: staleness horizon for backdated events
//! - `extract`: field-path and message pattern extractors
//! - `locator`: stable object locators
//! - `message`: ordered annotation set and message rendering
//! - `interval`: interval records, sinks, display policy
//! - `pathology`: pathology oracle and rule-set matcher
//! - `cluster`: node lookup, node roles, topology source
//! - `engine`: annotation/classification engine
//! - `watch`: Listing/Watching driver and task spawning
//! - `config`: configuration management
//! - `logging`: tracing subscriber setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod extract;
pub mod interval;
pub mod ledger;
pub mod locator;
pub mod logging;
pub mod message;
pub mod pathology;
pub mod watch;
pub mod window;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
