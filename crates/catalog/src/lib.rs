//! labreq-catalog: service catalog types and projection.
//!
//! The backend delivers services as a flat list where each record carries
//! its own category reference and an unordered list of additional fields.
//! [`project_catalog`] turns that list into an ordered
//! category → service → field tree ([`Catalog`]) consumed by the
//! selection engine. Projection is pure; malformed records are skipped
//! and reported as warnings.

pub mod project;
pub mod types;

pub use project::{project_catalog, CatalogError, CatalogProjection, CatalogWarning};
pub use types::*;
