pub(crate) mod catalog;
pub(crate) mod check;
pub(crate) mod payload;
pub(crate) mod review;
pub(crate) mod submit;

use std::path::Path;
use std::process;
use std::sync::Arc;

use labreq_engine::{
    rehydrate, Catalog, CatalogCache, CatalogWarning, InstanceIdGenerator, RequestPayload,
    RequestSession,
};
use serde::Serialize;

use crate::config::LabreqConfig;
use crate::{report_error, OutputFormat};

/// Settings shared by every subcommand.
pub(crate) struct Context {
    pub config: LabreqConfig,
    /// `--catalog` override.
    pub catalog: Option<String>,
    pub output: OutputFormat,
    pub quiet: bool,
}

impl Context {
    pub(crate) fn fail(&self, msg: &str) -> ! {
        report_error(msg, self.output, self.quiet);
        process::exit(1);
    }

    /// Fetch and project the catalog, exiting on failure.
    pub(crate) async fn load_catalog(&self) -> (Arc<Catalog>, Vec<CatalogWarning>) {
        let source = match self.config.catalog_source(self.catalog.as_deref()) {
            Ok(s) => s,
            Err(e) => self.fail(&e.to_string()),
        };
        let cache = CatalogCache::new(source);
        match cache.load().await {
            Ok(catalog) => (catalog, cache.warnings().to_vec()),
            Err(e) => self.fail(&format!("could not load catalog: {}", e)),
        }
    }

    /// Read a request document and rebuild its selection against the catalog.
    pub(crate) async fn load_session(&self, request: &Path) -> RequestSession {
        let (catalog, _) = self.load_catalog().await;

        let text = match std::fs::read_to_string(request) {
            Ok(s) => s,
            Err(e) => self.fail(&format!("error reading file '{}': {}", request.display(), e)),
        };
        let document: RequestPayload = match serde_json::from_str(&text) {
            Ok(d) => d,
            Err(e) => self.fail(&format!("error parsing JSON in '{}': {}", request.display(), e)),
        };
        let store = match rehydrate(&document.services, catalog, Arc::new(InstanceIdGenerator::new())) {
            Ok(store) => store,
            Err(e) => self.fail(&format!("invalid request '{}': {}", request.display(), e)),
        };
        tracing::debug!(
            request = %request.display(),
            services = store.state().len(),
            "request loaded"
        );
        RequestSession::from_parts(document.details, store, self.config.validation)
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}
