//! Typed structs for the projected service catalog.
//!
//! The projector turns flat backend records into this tree. Everything
//! here is read-only reference data once projected; the selection side
//! never mutates it.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

// ── Field types ─────────────────────────────────────────────────────

/// Input type of an additional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    ShortText,
    LongText,
    Number,
    SingleSelect,
    Boolean,
    Date,
}

impl FieldType {
    /// Parse a wire type name. Accepts both the backend's form-widget
    /// names (`text`, `textarea`, `select`, `checkbox`) and the
    /// snake_case names this crate serializes to.
    pub fn from_wire(name: &str) -> Option<FieldType> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "short_text" | "string" => Some(FieldType::ShortText),
            "textarea" | "long_text" => Some(FieldType::LongText),
            "number" | "integer" | "decimal" => Some(FieldType::Number),
            "select" | "single_select" => Some(FieldType::SingleSelect),
            "boolean" | "checkbox" | "bool" => Some(FieldType::Boolean),
            "date" => Some(FieldType::Date),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::ShortText => "short_text",
            FieldType::LongText => "long_text",
            FieldType::Number => "number",
            FieldType::SingleSelect => "single_select",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Field definitions ───────────────────────────────────────────────

/// Single-parent visibility rule: the owning field is shown only while
/// the field named `on_field_name` holds `on_value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDependency {
    pub on_field_name: String,
    /// Kept as the scalar the catalog delivered (string, number or bool).
    pub on_value: serde_json::Value,
}

/// One additional field declared by a service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub id: String,
    /// Machine key; dependencies refer to fields by this name.
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub display_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency: Option<FieldDependency>,
}

// ── Services and categories ─────────────────────────────────────────

/// A catalog entry for one offerable lab or field service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDefinition {
    pub id: String,
    pub name: String,
    pub code: String,
    pub description: String,
    pub category_id: String,
    /// Sorted by `display_order`, stable for ties.
    pub fields: Vec<FieldDefinition>,
}

impl ServiceDefinition {
    /// Whether this service carries an additional-information schema.
    pub fn has_additional_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn field(&self, field_id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCategory {
    pub id: String,
    pub name: String,
    pub code: String,
    pub services: Vec<ServiceDefinition>,
}

// ── Catalog ─────────────────────────────────────────────────────────

/// The projected catalog: ordered categories plus a service index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    categories: Vec<ServiceCategory>,
    #[serde(skip)]
    index: HashMap<String, (usize, usize)>,
}

impl Catalog {
    pub fn new(categories: Vec<ServiceCategory>) -> Self {
        let mut index = HashMap::new();
        for (ci, category) in categories.iter().enumerate() {
            for (si, service) in category.services.iter().enumerate() {
                index.entry(service.id.clone()).or_insert((ci, si));
            }
        }
        Catalog { categories, index }
    }

    pub fn categories(&self) -> &[ServiceCategory] {
        &self.categories
    }

    pub fn service(&self, service_id: &str) -> Option<&ServiceDefinition> {
        let (ci, si) = *self.index.get(service_id)?;
        Some(&self.categories[ci].services[si])
    }

    /// The category owning `service_id`, if the service is in the catalog.
    pub fn category_of(&self, service_id: &str) -> Option<&ServiceCategory> {
        let (ci, _) = *self.index.get(service_id)?;
        Some(&self.categories[ci])
    }

    /// Position of a category in catalog order.
    pub fn category_position(&self, category_id: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.id == category_id)
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.categories.iter().flat_map(|c| c.services.iter())
    }

    pub fn service_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
