//! Reliable race-result capture from Madness-engine shared memory telemetry.
//!
//! Parc Ferme watches the fixed-size telemetry record a running simulation
//! publishes into shared memory, detects race lifecycle transitions, and
//! exports the standings to durable files and a remote collector with
//! guaranteed eventual delivery.
//!
//! # Architecture
//!
//! - **Snapshot Reader**: torn-read-safe copies of the shared region via the
//!   producer's sequence-number protocol, with no locks and no blocking.
//! - **Race State Tracker**: derives discrete lifecycle events (session
//!   changed, race started, race ended) from successive snapshots.
//! - **Result Aggregator**: projects a snapshot into sorted, filtered
//!   standings with session and track metadata.
//! - **Artifact Writer**: JSON and CSV artifacts, timestamped at minute
//!   granularity, routed by export cadence.
//! - **Delivery Queue**: POSTs every artifact to the collector with infinite
//!   fixed-interval retry; delivered files are relocated, never deleted
//!   before confirmation.
//!
//! Everything runs on one cooperative [`pipeline::Pipeline`] loop. Live
//! capture is Windows-only; every layer above the memory mapping is
//! platform-neutral and tested against in-memory regions.

pub mod artifact;
pub mod config;
pub mod delivery;
mod error;
pub mod notify;
pub mod pipeline;
pub mod reader;
pub mod results;
pub mod schema;
pub mod source;
pub mod tracker;

#[cfg(test)]
mod test_utils;

// Platform-specific modules
#[cfg(windows)]
pub mod windows;

pub use artifact::{ArtifactPaths, ArtifactWriter};
pub use config::Config;
pub use delivery::{Collector, DeliveryQueue, HttpCollector};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, Timing};
pub use reader::SnapshotReader;
pub use results::{RaceResults, ResultRecord, SortOrder, aggregate};
pub use schema::{RaceState, SessionState, TelemetrySnapshot};
pub use source::TelemetryRegion;
pub use tracker::{RaceEvent, RaceTracker};

#[cfg(windows)]
pub use windows::SharedMemoryRegion;
