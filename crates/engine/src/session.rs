//! Per-session state: the cached catalog and the request being built.
//!
//! A session is created when a user starts a request and dropped once the
//! request is submitted or abandoned. Nothing here is global.

use std::sync::Arc;

use labreq_catalog::{project_catalog, Catalog, CatalogError, CatalogWarning};
use tokio::sync::OnceCell;

use crate::instance::InstanceIdGenerator;
use crate::payload::{build_request, RequestPayload};
use crate::review::{project_review, ReviewCategory};
use crate::selection::SelectionStore;
use crate::source::{CatalogSource, SourceError};
use crate::submit::{RequestId, SubmissionSink, SubmitError};
use crate::validate::{validate_request, RequestDetails, ValidationErrors, ValidationRules};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

// ──────────────────────────────────────────────
// CatalogCache
// ──────────────────────────────────────────────

struct LoadedCatalog {
    catalog: Arc<Catalog>,
    warnings: Vec<CatalogWarning>,
}

/// One-shot fetch-and-cache of the projected catalog.
///
/// The first successful [`CatalogCache::load`] fetches and projects; later
/// calls return the same `Arc`. A failed load is not cached, so the caller
/// can retry.
pub struct CatalogCache<S> {
    source: S,
    loaded: OnceCell<LoadedCatalog>,
}

impl<S: CatalogSource> CatalogCache<S> {
    pub fn new(source: S) -> Self {
        CatalogCache {
            source,
            loaded: OnceCell::new(),
        }
    }

    pub async fn load(&self) -> Result<Arc<Catalog>, LoadError> {
        let loaded = self
            .loaded
            .get_or_try_init(|| async {
                let document = self.source.fetch_catalog().await?;
                let projection = project_catalog(&document)?;
                tracing::info!(
                    source = %self.source.describe(),
                    services = projection.catalog.service_count(),
                    warnings = projection.warnings.len(),
                    "catalog loaded"
                );
                Ok::<_, LoadError>(LoadedCatalog {
                    catalog: Arc::new(projection.catalog),
                    warnings: projection.warnings,
                })
            })
            .await?;
        Ok(loaded.catalog.clone())
    }

    /// Warnings from the projection; empty until loaded.
    pub fn warnings(&self) -> &[CatalogWarning] {
        self.loaded
            .get()
            .map(|l| l.warnings.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }
}

// ──────────────────────────────────────────────
// RequestSession
// ──────────────────────────────────────────────

/// Result of a submission attempt that reached the validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(RequestId),
    /// Nothing was sent; fix these and retry.
    Invalid(ValidationErrors),
}

/// The request a user is building: details, selection and rules.
pub struct RequestSession {
    pub details: RequestDetails,
    store: SelectionStore,
    rules: ValidationRules,
}

impl RequestSession {
    pub fn new(catalog: Arc<Catalog>, rules: ValidationRules) -> Self {
        Self::from_parts(
            RequestDetails::default(),
            SelectionStore::with_ids(catalog, Arc::new(InstanceIdGenerator::new())),
            rules,
        )
    }

    pub fn from_parts(details: RequestDetails, store: SelectionStore, rules: ValidationRules) -> Self {
        RequestSession {
            details,
            store,
            rules,
        }
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SelectionStore {
        &mut self.store
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub fn validate(&self) -> ValidationErrors {
        validate_request(&self.details, self.store.state(), &self.rules)
    }

    pub fn payload(&self) -> RequestPayload {
        build_request(&self.details, self.store.state())
    }

    pub fn review(&self) -> Vec<ReviewCategory> {
        project_review(self.store.state(), self.store.catalog())
    }

    /// Validate and, if clean, hand the payload to `sink`.
    ///
    /// The session is only read, so on any failure the user can retry
    /// without re-entering anything.
    pub async fn submit<K: SubmissionSink + ?Sized>(&self, sink: &K) -> Result<SubmitOutcome, SubmitError> {
        let errors = self.validate();
        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "submission blocked by validation");
            return Ok(SubmitOutcome::Invalid(errors));
        }

        let payload = self.payload();
        match sink.submit(&payload).await {
            Ok(id) => {
                tracing::info!(request = %id, services = payload.services.len(), "request submitted");
                Ok(SubmitOutcome::Submitted(id))
            }
            Err(e) => {
                tracing::warn!("submission failed: {}", e);
                Err(e)
            }
        }
    }
}
