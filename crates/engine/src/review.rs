//! Read-only review grouping for confirmation screens.
//!
//! Shows what is stored, grouped by catalog category. Visibility is not
//! re-evaluated: every non-empty stored value is listed.

use labreq_catalog::Catalog;
use serde::Serialize;

use crate::selection::SelectionState;

/// Name of the trailing group for services missing from the catalog.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEntry {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewInstance {
    /// 1-based position within the service, for "Sample 2 of 3" style labels.
    pub index: usize,
    pub quantity: u32,
    pub entries: Vec<ReviewEntry>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewService {
    pub service_id: String,
    pub name: String,
    pub total_quantity: u32,
    pub instances: Vec<ReviewInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewCategory {
    pub category_id: Option<String>,
    pub name: String,
    pub services: Vec<ReviewService>,
}

/// Group the selection by category in catalog order.
///
/// Services keep their selection order inside a group. Labels come from
/// the catalog, falling back to the field id when a field is unknown.
pub fn project_review(selection: &SelectionState, catalog: &Catalog) -> Vec<ReviewCategory> {
    let mut groups: Vec<(Option<usize>, ReviewCategory)> = Vec::new();

    for selected in selection {
        let category = catalog.category_of(&selected.service_id);
        let service = catalog.service(&selected.service_id);

        let instances = selected
            .instances
            .iter()
            .enumerate()
            .map(|(i, instance)| ReviewInstance {
                index: i + 1,
                quantity: instance.quantity,
                entries: instance
                    .values
                    .iter()
                    .filter(|v| !v.value.is_empty())
                    .map(|v| ReviewEntry {
                        label: service
                            .and_then(|s| s.field(&v.field_id))
                            .map(|f| f.label.clone())
                            .unwrap_or_else(|| v.field_id.clone()),
                        value: v.value.display_string(),
                    })
                    .collect(),
                notes: instance.notes.clone(),
            })
            .collect();

        let review = ReviewService {
            service_id: selected.service_id.clone(),
            name: selected.name.clone(),
            total_quantity: selected.total_quantity(),
            instances,
        };

        let position = category.and_then(|c| catalog.category_position(&c.id));
        match groups.iter_mut().find(|(pos, _)| *pos == position) {
            Some((_, group)) => group.services.push(review),
            None => groups.push((
                position,
                ReviewCategory {
                    category_id: category.map(|c| c.id.clone()),
                    name: category
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                    services: vec![review],
                },
            )),
        }
    }

    // None sorts first for Option, so map it past every real position
    groups.sort_by_key(|(pos, _)| pos.unwrap_or(usize::MAX));
    groups.into_iter().map(|(_, group)| group).collect()
}
