//! Shared fixtures for unit tests.

use labreq_catalog::{project_catalog, Catalog};

pub(crate) const CATALOG_JSON: &str = include_str!("../tests/fixtures/catalog.json");

/// Two categories: `lab` (moisture, borehole_sample, proctor) and
/// `field` (test_pit, spt). `borehole_sample` and `test_pit` carry
/// additional fields with one dependent field each.
pub(crate) fn sample_catalog() -> Catalog {
    let document: serde_json::Value =
        serde_json::from_str(CATALOG_JSON).expect("fixture catalog is valid JSON");
    let projection = project_catalog(&document).expect("fixture catalog projects");
    assert!(projection.warnings.is_empty(), "{:?}", projection.warnings);
    projection.catalog
}
