//! Scoped secret lookup: `GET /api/2.0/secrets/get`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use genie_core::Secret;

use crate::client::WorkspaceClient;
use crate::error::ClientError;

#[derive(Debug, Deserialize)]
struct GetSecretResponse {
    #[serde(default)]
    value: Option<String>,
}

impl WorkspaceClient {
    /// Read `scope/key` and decode it into a [`Secret`].
    pub fn read_secret(&self, scope: &str, key: &str) -> Result<Secret, ClientError> {
        let url = self.endpoint(&["api", "2.0", "secrets", "get"])?;
        let response: GetSecretResponse = self.get_json(&url, &[("scope", scope), ("key", key)])?;
        let encoded = response.value.ok_or_else(|| ClientError::MissingField {
            path: url.path().to_string(),
            field: "value",
        })?;
        decode_secret_value(scope, key, &encoded)
    }
}

/// Secret values travel base64-encoded; the token inside is UTF-8 text.
pub(crate) fn decode_secret_value(scope: &str, key: &str, encoded: &str) -> Result<Secret, ClientError> {
    let fail = |reason: String| ClientError::SecretDecode {
        scope: scope.to_string(),
        key: key.to_string(),
        reason,
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| fail(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| fail("value is not UTF-8".to_string()))?;
    Ok(Secret::new(text.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_token() {
        let encoded = STANDARD.encode("ghp_abc123\n");
        let secret = decode_secret_value("scope", "git-pat", &encoded).unwrap();
        assert_eq!(secret.expose(), "ghp_abc123");
    }

    #[test]
    fn bad_base64_names_scope_and_key() {
        let err = decode_secret_value("scope", "git-pat", "%%%").unwrap_err();
        assert!(matches!(err, ClientError::SecretDecode { .. }));
        let msg = err.to_string();
        assert!(msg.contains("scope/git-pat"), "got: {msg}");
    }

    #[test]
    fn empty_secret_is_rejected() {
        let encoded = STANDARD.encode("   ");
        assert!(matches!(
            decode_secret_value("s", "k", &encoded),
            Err(ClientError::Config(_))
        ));
    }
}
