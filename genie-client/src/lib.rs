//! # genie-client
//!
//! Blocking REST client for the analytics workspace service.
//!
//! [`WorkspaceClient`] covers the calls the backup and its bootstrap/verify
//! tooling need. The pipeline only sees the [`SpaceSource`] and
//! [`SecretStore`] traits, so tests can substitute in-memory fakes.

pub mod client;
pub mod error;
pub mod secrets;
pub mod source;
pub mod spaces;
pub mod sql;

pub use client::WorkspaceClient;
pub use error::ClientError;
pub use source::{SecretStore, SpaceSource};
pub use spaces::{decode_serialized_space, CreateSpaceRequest, SpaceResponse, SpaceSummary};
pub use sql::{pick_warehouse, StatementRequest, TableInfo, Warehouse};
