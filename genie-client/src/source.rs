//! Seams between the backup pipeline and the workspace service.

use serde_json::Value;

use genie_core::{Secret, SpaceId};

use crate::client::WorkspaceClient;
use crate::error::ClientError;
use crate::spaces::decode_serialized_space;

/// Anything that can produce the configuration document of a space.
pub trait SpaceSource {
    fn fetch_space_config(&self, space_id: &SpaceId) -> Result<Value, ClientError>;
}

/// Scoped key/value secret lookup.
pub trait SecretStore {
    fn get_secret(&self, scope: &str, key: &str) -> Result<Secret, ClientError>;
}

impl SpaceSource for WorkspaceClient {
    fn fetch_space_config(&self, space_id: &SpaceId) -> Result<Value, ClientError> {
        tracing::info!(space_id = %space_id, "fetching space configuration");
        let response = self.get_space(space_id, true).map_err(|err| {
            tracing::error!(space_id = %space_id, error = %err, "space fetch failed");
            err
        })?;
        decode_serialized_space(space_id, &response)
    }
}

impl SecretStore for WorkspaceClient {
    fn get_secret(&self, scope: &str, key: &str) -> Result<Secret, ClientError> {
        tracing::info!(scope, key, "retrieving repository token");
        self.read_secret(scope, key).map_err(|err| {
            tracing::error!(scope, key, error = %err, "secret retrieval failed");
            err
        })
    }
}
