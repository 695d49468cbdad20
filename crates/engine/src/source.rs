//! Catalog sources.
//!
//! A [`CatalogSource`] asynchronously supplies the raw service records
//! that [`labreq_catalog::project_catalog`] turns into a catalog. The
//! engine fetches once per session (see [`crate::session::CatalogCache`]).

use std::path::PathBuf;

use async_trait::async_trait;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors that can occur when fetching the raw catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read catalog file {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to fetch catalog from {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("catalog is not valid JSON: {0}")]
    Parse(String),
}

// ──────────────────────────────────────────────
// Trait
// ──────────────────────────────────────────────

/// Asynchronous provider of raw catalog records.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the raw catalog document (a list of service records).
    async fn fetch_catalog(&self) -> Result<serde_json::Value, SourceError>;

    /// Short description for logs, e.g. a path or URL.
    fn describe(&self) -> String;
}

#[async_trait]
impl<S: CatalogSource + ?Sized> CatalogSource for Box<S> {
    async fn fetch_catalog(&self) -> Result<serde_json::Value, SourceError> {
        (**self).fetch_catalog().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

// ──────────────────────────────────────────────
// StaticCatalogSource
// ──────────────────────────────────────────────

/// Returns a fixed document on every call.
pub struct StaticCatalogSource {
    document: serde_json::Value,
}

impl StaticCatalogSource {
    pub fn new(document: serde_json::Value) -> Self {
        Self { document }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch_catalog(&self) -> Result<serde_json::Value, SourceError> {
        Ok(self.document.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

// ──────────────────────────────────────────────
// FileCatalogSource
// ──────────────────────────────────────────────

/// Reads the catalog from a JSON file.
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch_catalog(&self) -> Result<serde_json::Value, SourceError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        serde_json::from_str(&text).map_err(|e| SourceError::Parse(e.to_string()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ──────────────────────────────────────────────
// HttpCatalogSource
// ──────────────────────────────────────────────

/// Fetches the catalog with an HTTP GET.
///
/// Uses `ureq` (sync) inside `tokio::task::spawn_blocking` so the runtime
/// is not blocked. An optional bearer token is sent as `Authorization`.
#[cfg(feature = "http")]
pub struct HttpCatalogSource {
    url: String,
    auth_token: Option<String>,
}

#[cfg(feature = "http")]
impl HttpCatalogSource {
    pub fn new(url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            url: url.into(),
            auth_token,
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_catalog(&self) -> Result<serde_json::Value, SourceError> {
        let url = self.url.clone();
        let auth_token = self.auth_token.clone();

        tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            let mut request = agent.get(&url);
            if let Some(ref token) = auth_token {
                request = request.header("Authorization", &format!("Bearer {}", token));
            }

            let response = request.call().map_err(|e| SourceError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            })?;

            response
                .into_body()
                .read_json::<serde_json::Value>()
                .map_err(|e| SourceError::Parse(e.to_string()))
        })
        .await
        .map_err(|e| SourceError::Fetch {
            url: self.url.clone(),
            message: format!("task join error: {}", e),
        })?
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
