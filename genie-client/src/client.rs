//! HTTP plumbing shared by every endpoint module.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use genie_core::{Secret, WorkspaceAuth};

use crate::error::ClientError;

/// Error bodies are cut to this many characters before they land in an error.
const MAX_ERROR_BODY: usize = 512;

/// Authenticated client for one workspace.
#[derive(Clone)]
pub struct WorkspaceClient {
    agent: ureq::Agent,
    host: Url,
    token: Secret,
}

impl std::fmt::Debug for WorkspaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceClient")
            .field("host", &self.host.as_str())
            .field("token", &self.token)
            .finish()
    }
}

impl WorkspaceClient {
    pub fn new(auth: &WorkspaceAuth) -> Result<Self, ClientError> {
        let host = Url::parse(&auth.host).map_err(|e| ClientError::Url(e.to_string()))?;
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("genie-backup/", env!("CARGO_PKG_VERSION")))
            .timeout_connect(Duration::from_secs(30))
            .build();
        Ok(Self {
            agent,
            host,
            token: auth.token.clone(),
        })
    }

    /// Workspace base URL, without trailing slash.
    pub fn host(&self) -> &str {
        self.host.as_str().trim_end_matches('/')
    }

    /// `<host>/<segments...>` with each segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.host.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(format!("{} cannot carry a path", self.host)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let mut request = self.authorized("GET", url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        tracing::debug!(path = url.path(), "GET");
        let response = request.call().map_err(|e| call_error("GET", url, e))?;
        decode(url, response)
    }

    pub(crate) fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &Url,
        body: &B,
    ) -> Result<T, ClientError> {
        tracing::debug!(path = url.path(), "POST");
        let response = self
            .authorized("POST", url)
            .send_json(body)
            .map_err(|e| call_error("POST", url, e))?;
        decode(url, response)
    }

    fn authorized(&self, method: &str, url: &Url) -> ureq::Request {
        self.agent
            .request_url(method, url)
            .set("Authorization", &format!("Bearer {}", self.token.expose()))
            .set("Accept", "application/json")
    }
}

fn decode<T: DeserializeOwned>(url: &Url, response: ureq::Response) -> Result<T, ClientError> {
    response.into_json::<T>().map_err(|source| ClientError::Decode {
        path: url.path().to_string(),
        source,
    })
}

fn call_error(method: &'static str, url: &Url, err: ureq::Error) -> ClientError {
    let path = url.path().to_string();
    match err {
        ureq::Error::Status(status, response) => {
            let mut body = response.into_string().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
                body.push('…');
            }
            ClientError::Status {
                method,
                path,
                status,
                body,
            }
        }
        ureq::Error::Transport(transport) => ClientError::Transport {
            method,
            path,
            message: transport.to_string(),
        },
    }
}
