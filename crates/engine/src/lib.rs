//! labreq-engine: selection state, conditional fields and request assembly.
//!
//! The engine sits between a projected [`Catalog`] and the submission
//! boundary. Services are selected into a [`SelectionStore`], either as a
//! plain quantity or as individually configured instances whose additional
//! fields may depend on each other. From the store the engine derives:
//!
//! - validation errors ([`validate_request`])
//! - the normalized submission payload ([`build_payload`])
//! - a category-grouped review ([`project_review`])
//!
//! Catalog fetching and submission are behind async traits
//! ([`CatalogSource`], [`SubmissionSink`]) so callers can plug in HTTP,
//! files or in-memory fixtures.

pub mod draft;
pub mod instance;
pub mod payload;
pub mod review;
pub mod selection;
pub mod session;
pub mod source;
pub mod submit;
pub mod validate;
pub mod value;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use draft::{DraftRejected, InstanceDraft};
pub use instance::{FieldValue, InstanceFactory, InstanceId, InstanceIdGenerator, ServiceInstance};
pub use labreq_catalog::{
    project_catalog, Catalog, CatalogError, CatalogProjection, CatalogWarning, FieldDefinition,
    FieldDependency, FieldType, ServiceCategory, ServiceDefinition,
};
pub use payload::{
    build_payload, build_request, rehydrate, AdditionalDatum, InstancePayload, RehydrateError,
    RequestPayload, ServicePayload,
};
pub use review::{project_review, ReviewCategory, ReviewEntry, ReviewInstance, ReviewService};
pub use selection::{
    count_of_samples, sum_of_quantities, SelectedService, SelectionState, SelectionStore, ServiceKind,
};
pub use session::{CatalogCache, LoadError, RequestSession, SubmitOutcome};
pub use source::{CatalogSource, FileCatalogSource, SourceError, StaticCatalogSource};
#[cfg(feature = "http")]
pub use source::HttpCatalogSource;
pub use submit::{FileSubmissionSink, RequestId, SubmissionSink, SubmitError};
#[cfg(feature = "http")]
pub use submit::HttpSubmissionSink;
pub use validate::{validate_details, validate_request, RequestDetails, ValidationErrors, ValidationRules};
pub use value::{coerce, FieldData};
pub use visibility::{is_visible, visible_fields};
