//! `labreq.toml` configuration.
//!
//! Every section is optional; a missing file yields the defaults.
//!
//! # Example
//!
//! ```toml
//! [catalog]
//! url = "https://lab.example.com/api/services"
//! auth_token = "..."
//!
//! [submission]
//! url = "https://lab.example.com/api/service-requests"
//!
//! [validation]
//! min_name_length = 2
//! min_description_length = 10
//!
//! [logging]
//! filter = "labreq=info"
//! ```

use std::path::{Path, PathBuf};

use labreq_engine::{
    CatalogSource, FileCatalogSource, FileSubmissionSink, HttpCatalogSource, HttpSubmissionSink,
    SubmissionSink, ValidationRules,
};
use serde::Deserialize;

/// Looked up in the current directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "labreq.toml";

/// Bearer token fallback when `[catalog] auth_token` is unset.
pub(crate) const AUTH_TOKEN_ENV: &str = "LABREQ_AUTH_TOKEN";

const DEFAULT_OUTBOX: &str = "outbox";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no catalog configured; pass --catalog or set [catalog] path or url")]
    NoCatalog,
    #[error("[catalog] sets both path and url; keep one")]
    AmbiguousCatalog,
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LabreqConfig {
    pub catalog: CatalogConfig,
    pub submission: SubmissionConfig,
    pub validation: ValidationRules,
    pub logging: LoggingConfig,
    /// Directory relative paths in the file are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// `[catalog]`: where service records come from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CatalogConfig {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    pub auth_token: Option<String>,
}

/// `[submission]`: an endpoint to POST to, or an outbox directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SubmissionConfig {
    pub url: Option<String>,
    pub outbox: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "warn".to_string(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load `explicit`, or `labreq.toml` from the current directory if present.
pub(crate) fn load(explicit: Option<&Path>) -> Result<LabreqConfig, ConfigError> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                read_config(path)
            } else {
                Ok(LabreqConfig::default())
            }
        }
    }
}

pub(crate) fn read_config(path: &Path) -> Result<LabreqConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: LabreqConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.base_dir = path.parent().map(Path::to_path_buf);
    Ok(config)
}

impl LabreqConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub(crate) fn auth_token(&self) -> Option<String> {
        self.catalog
            .auth_token
            .clone()
            .or_else(|| std::env::var(AUTH_TOKEN_ENV).ok())
            .filter(|t| !t.trim().is_empty())
    }

    /// Pick the catalog source. A `--catalog` override starting with
    /// `http://` or `https://` is fetched, anything else is read as a file.
    pub(crate) fn catalog_source(&self, override_: Option<&str>) -> Result<Box<dyn CatalogSource>, ConfigError> {
        if let Some(location) = override_ {
            let source: Box<dyn CatalogSource> = if is_url(location) {
                Box::new(HttpCatalogSource::new(location, self.auth_token()))
            } else {
                Box::new(FileCatalogSource::new(location))
            };
            return Ok(source);
        }
        match (&self.catalog.path, &self.catalog.url) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousCatalog),
            (Some(path), None) => Ok(Box::new(FileCatalogSource::new(self.resolve(path)))),
            (None, Some(url)) => Ok(Box::new(HttpCatalogSource::new(url.as_str(), self.auth_token()))),
            (None, None) => Err(ConfigError::NoCatalog),
        }
    }

    /// POST to `[submission] url` when set, otherwise write to the outbox.
    pub(crate) fn submission_sink(&self) -> Box<dyn SubmissionSink> {
        match &self.submission.url {
            Some(url) => Box::new(HttpSubmissionSink::new(url.as_str(), self.auth_token())),
            None => {
                let outbox = self
                    .submission
                    .outbox
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTBOX));
                Box::new(FileSubmissionSink::new(self.resolve(&outbox)))
            }
        }
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
