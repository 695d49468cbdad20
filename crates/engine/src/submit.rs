//! Submission boundary.
//!
//! A [`SubmissionSink`] hands a finished [`RequestPayload`] to the outside
//! world and returns the identifier of the created request. Sinks never
//! see the selection store, so a failed submission cannot disturb it.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::payload::RequestPayload;

/// Identifier of a created service request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The receiving side refused the request.
    #[error("submission rejected: {0}")]
    Rejected(String),
    /// The request could not be delivered.
    #[error("submission failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, payload: &RequestPayload) -> Result<RequestId, SubmitError>;
}

#[async_trait]
impl<K: SubmissionSink + ?Sized> SubmissionSink for Box<K> {
    async fn submit(&self, payload: &RequestPayload) -> Result<RequestId, SubmitError> {
        (**self).submit(payload).await
    }
}

// ──────────────────────────────────────────────
// FileSubmissionSink
// ──────────────────────────────────────────────

/// Writes each payload as a pretty-printed JSON file into an outbox
/// directory. The request id is the file stem.
pub struct FileSubmissionSink {
    dir: PathBuf,
}

impl FileSubmissionSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SubmissionSink for FileSubmissionSink {
    async fn submit(&self, payload: &RequestPayload) -> Result<RequestId, SubmitError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SubmitError::Transport(format!("{}: {}", self.dir.display(), e)))?;

        let stamp = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
        let id = format!("req-{}", stamp);
        let path = self.dir.join(format!("{}.json", id));
        let body = serde_json::to_vec_pretty(payload)
            .map_err(|e| SubmitError::Rejected(e.to_string()))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| SubmitError::Transport(format!("{}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), "request written to outbox");
        Ok(RequestId(id))
    }
}

// ──────────────────────────────────────────────
// HttpSubmissionSink
// ──────────────────────────────────────────────

/// POSTs the payload as JSON and reads the created id from the response
/// body's `id` field (string or number).
#[cfg(feature = "http")]
pub struct HttpSubmissionSink {
    url: String,
    auth_token: Option<String>,
}

#[cfg(feature = "http")]
impl HttpSubmissionSink {
    pub fn new(url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            url: url.into(),
            auth_token,
        }
    }
}

/// Pull the request id out of a creation response.
pub fn response_request_id(body: &serde_json::Value) -> Option<RequestId> {
    match body.get("id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(RequestId(s.clone())),
        serde_json::Value::Number(n) => Some(RequestId(n.to_string())),
        _ => None,
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl SubmissionSink for HttpSubmissionSink {
    async fn submit(&self, payload: &RequestPayload) -> Result<RequestId, SubmitError> {
        let url = self.url.clone();
        let auth_token = self.auth_token.clone();
        let body = serde_json::to_value(payload).map_err(|e| SubmitError::Rejected(e.to_string()))?;

        let response = tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            let mut request = agent.post(&url);
            if let Some(ref token) = auth_token {
                request = request.header("Authorization", &format!("Bearer {}", token));
            }
            let response = request.send_json(&body).map_err(|e| match e {
                ureq::Error::StatusCode(code) => SubmitError::Rejected(format!("HTTP {}", code)),
                other => SubmitError::Transport(other.to_string()),
            })?;
            response
                .into_body()
                .read_json::<serde_json::Value>()
                .map_err(|e| SubmitError::Transport(format!("invalid response body: {}", e)))
        })
        .await
        .map_err(|e| SubmitError::Transport(format!("task join error: {}", e)))??;

        response_request_id(&response)
            .ok_or_else(|| SubmitError::Rejected("response did not include a request id".to_string()))
    }
}
