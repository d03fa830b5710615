//! # genie-sync
//!
//! Canonical snapshot writer, git publisher and the backup pipeline.
//!
//! Call [`pipeline::run`] to fetch one space, write its snapshot into a
//! working copy and publish the change, or use [`snapshot`] directly to
//! export a document without touching version control.

pub mod error;
pub mod git;
pub mod pipeline;
pub mod remote;
pub mod snapshot;

pub use error::SyncError;
pub use git::WorkingCopy;
pub use pipeline::{run, BackupOutcome, PublishResult};
pub use snapshot::{canonical_json, snapshot_path, write_snapshot, SnapshotWrite};
