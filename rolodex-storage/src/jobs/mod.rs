//! Background Jobs for the contact store
//!
//! - `tombstone_purge`: removes expired tombstones and re-stamps contacts
//!   whose version stamp failed after commit
//!
//! # Usage
//!
//! ```ignore
//! use rolodex_storage::jobs::tombstone_purge_task;
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handle = tokio::spawn(tombstone_purge_task(Arc::clone(&store), PurgeConfig::default(), shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

pub mod tombstone_purge;

pub use tombstone_purge::{tombstone_purge_task, PurgeMetrics, PurgeSnapshot};
