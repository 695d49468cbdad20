//! Projection of flat backend service records into a [`Catalog`].
//!
//! The main entry point is [`project_catalog`]. Records are walked in
//! input order; a record that cannot be projected is skipped and reported
//! as a [`CatalogWarning`] instead of failing the whole catalog.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::types::*;

/// Errors that abort a projection entirely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The document is neither an array nor an object with a `services` array.
    #[error("catalog document must be an array of services or an object with a 'services' array")]
    InvalidDocument,
}

/// A non-fatal problem found while projecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogWarning {
    /// Position of the offending record in the input list.
    pub record: usize,
    /// Service id when one could be read.
    pub service_id: Option<String>,
    pub message: String,
}

impl fmt::Display for CatalogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service_id {
            Some(id) => write!(f, "record {} (service '{}'): {}", self.record, id, self.message),
            None => write!(f, "record {}: {}", self.record, self.message),
        }
    }
}

/// Output of [`project_catalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogProjection {
    pub catalog: Catalog,
    pub warnings: Vec<CatalogWarning>,
}

/// Project raw service records into an ordered category tree.
///
/// Categories appear in order of first occurrence and take their metadata
/// from that first record. Services keep input order within a category.
/// Fields are sorted by display order, ties keeping input order.
pub fn project_catalog(document: &serde_json::Value) -> Result<CatalogProjection, CatalogError> {
    let records = match document {
        serde_json::Value::Array(arr) => arr,
        serde_json::Value::Object(obj) => obj
            .get("services")
            .and_then(|s| s.as_array())
            .ok_or(CatalogError::InvalidDocument)?,
        _ => return Err(CatalogError::InvalidDocument),
    };

    let mut categories: Vec<ServiceCategory> = Vec::new();
    let mut seen_services: HashSet<String> = HashSet::new();
    let mut warnings = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let parsed = match parse_service(index, record, &mut warnings) {
            Ok(parsed) => parsed,
            Err(warning) => {
                tracing::warn!(record = index, "skipping catalog record: {}", warning.message);
                warnings.push(warning);
                continue;
            }
        };
        let (service, category_ref) = parsed;

        if !seen_services.insert(service.id.clone()) {
            let warning = CatalogWarning {
                record: index,
                service_id: Some(service.id.clone()),
                message: "duplicate service id; first occurrence kept".to_string(),
            };
            tracing::warn!(record = index, service = %service.id, "{}", warning.message);
            warnings.push(warning);
            continue;
        }

        match categories.iter_mut().find(|c| c.id == category_ref.id) {
            Some(category) => category.services.push(service),
            None => categories.push(ServiceCategory {
                id: category_ref.id,
                name: category_ref.name,
                code: category_ref.code,
                services: vec![service],
            }),
        }
    }

    Ok(CatalogProjection {
        catalog: Catalog::new(categories),
        warnings,
    })
}

// ── Parsing helpers ─────────────────────────────────────────────────

struct CategoryRef {
    id: String,
    name: String,
    code: String,
}

/// Read a string, accepting numeric ids as their decimal text.
fn scalar_str(obj: &serde_json::Value, field: &str) -> Option<String> {
    match obj.get(field)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_str(obj: &serde_json::Value, field: &str) -> String {
    obj.get(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn parse_service(
    index: usize,
    record: &serde_json::Value,
    warnings: &mut Vec<CatalogWarning>,
) -> Result<(ServiceDefinition, CategoryRef), CatalogWarning> {
    if !record.is_object() {
        return Err(CatalogWarning {
            record: index,
            service_id: None,
            message: "record is not an object".to_string(),
        });
    }

    let id = scalar_str(record, "id").ok_or_else(|| CatalogWarning {
        record: index,
        service_id: None,
        message: "missing 'id'".to_string(),
    })?;

    let category = parse_category_ref(record).ok_or_else(|| CatalogWarning {
        record: index,
        service_id: Some(id.clone()),
        message: "missing category reference".to_string(),
    })?;

    let name = scalar_str(record, "name").unwrap_or_else(|| id.clone());
    let code = optional_str(record, "code");
    let description = optional_str(record, "description");

    let raw_fields = record
        .get("fields")
        .or_else(|| record.get("additional_fields"))
        .and_then(|f| f.as_array())
        .map(|arr| arr.as_slice())
        .unwrap_or(&[]);

    let mut fields: Vec<FieldDefinition> = Vec::with_capacity(raw_fields.len());
    for raw in raw_fields {
        let parsed = parse_field(raw).and_then(|field| {
            if fields.iter().any(|f| f.id == field.id) {
                Err(format!("duplicate field id '{}'; first occurrence kept", field.id))
            } else if fields.iter().any(|f| f.name == field.name) {
                Err(format!("duplicate field name '{}'; first occurrence kept", field.name))
            } else {
                Ok(field)
            }
        });
        match parsed {
            Ok(field) => fields.push(field),
            Err(message) => {
                tracing::warn!(record = index, service = %id, "skipping field: {}", message);
                warnings.push(CatalogWarning {
                    record: index,
                    service_id: Some(id.clone()),
                    message,
                });
            }
        }
    }
    // sort_by_key is stable, so equal display orders keep input order
    fields.sort_by_key(|f| f.display_order);

    for field in &fields {
        if let Some(dep) = &field.dependency {
            if !fields.iter().any(|f| f.name == dep.on_field_name) {
                let message = format!(
                    "field '{}' depends on undeclared field '{}'",
                    field.name, dep.on_field_name
                );
                tracing::warn!(record = index, service = %id, "{}", message);
                warnings.push(CatalogWarning {
                    record: index,
                    service_id: Some(id.clone()),
                    message,
                });
            }
        }
    }

    Ok((
        ServiceDefinition {
            id,
            name,
            code,
            description,
            category_id: category.id.clone(),
            fields,
        },
        category,
    ))
}

fn parse_category_ref(record: &serde_json::Value) -> Option<CategoryRef> {
    match record.get("category") {
        Some(cat) if cat.is_object() => {
            let id = scalar_str(cat, "id")?;
            Some(CategoryRef {
                name: scalar_str(cat, "name").unwrap_or_else(|| id.clone()),
                code: optional_str(cat, "code"),
                id,
            })
        }
        _ => {
            let id = scalar_str(record, "category_id")?;
            Some(CategoryRef {
                name: scalar_str(record, "category_name").unwrap_or_else(|| id.clone()),
                code: optional_str(record, "category_code"),
                id,
            })
        }
    }
}

fn parse_field(raw: &serde_json::Value) -> Result<FieldDefinition, String> {
    let id = scalar_str(raw, "id").ok_or_else(|| "field missing 'id'".to_string())?;

    let type_name = raw
        .get("type")
        .or_else(|| raw.get("field_type"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| format!("field '{}' missing 'type'", id))?;
    let field_type = FieldType::from_wire(type_name)
        .ok_or_else(|| format!("field '{}' has unknown type '{}'", id, type_name))?;

    let name = scalar_str(raw, "name")
        .or_else(|| scalar_str(raw, "field_name"))
        .unwrap_or_else(|| id.clone());
    let label = scalar_str(raw, "label").unwrap_or_else(|| name.clone());
    let required = raw
        .get("required")
        .or_else(|| raw.get("is_required"))
        .and_then(|r| r.as_bool())
        .unwrap_or(false);

    let options = raw
        .get("options")
        .and_then(|o| o.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Object(_) => scalar_str(v, "value"),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let display_order = raw
        .get("order")
        .or_else(|| raw.get("display_order"))
        .and_then(|o| o.as_i64())
        .unwrap_or(0);

    Ok(FieldDefinition {
        id,
        name,
        label,
        field_type,
        required,
        options,
        display_order,
        dependency: parse_dependency(raw),
    })
}

fn parse_dependency(raw: &serde_json::Value) -> Option<FieldDependency> {
    if let Some(dep) = raw.get("depends_on").filter(|d| d.is_object()) {
        let on_field_name = scalar_str(dep, "field_name").or_else(|| scalar_str(dep, "field"))?;
        let on_value = dep.get("value").cloned().unwrap_or(serde_json::Value::Null);
        return Some(FieldDependency {
            on_field_name,
            on_value,
        });
    }
    let on_field_name = scalar_str(raw, "depends_on_field")?;
    let on_value = raw
        .get("depends_on_value")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    Some(FieldDependency {
        on_field_name,
        on_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(id: &str, order: i64) -> serde_json::Value {
        json!({ "id": id, "name": id, "label": id, "type": "text", "order": order })
    }

    #[test]
    fn groups_by_first_occurrence_category() {
        let doc = json!([
            { "id": "s1", "name": "Moisture", "code": "MC",
              "category": { "id": "lab", "name": "Laboratory", "code": "LAB" } },
            { "id": "s2", "name": "SPT", "code": "SPT",
              "category": { "id": "field", "name": "Field", "code": "FLD" } },
            { "id": "s3", "name": "Atterberg", "code": "AL",
              "category": { "id": "lab", "name": "Renamed later", "code": "X" } },
        ]);

        let projection = project_catalog(&doc).unwrap();
        let cats = projection.catalog.categories();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].id, "lab");
        assert_eq!(cats[0].name, "Laboratory");
        let ids: Vec<&str> = cats[0].services.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s3"]);
        assert_eq!(cats[1].services[0].id, "s2");
        assert!(projection.warnings.is_empty());
    }

    #[test]
    fn fields_sorted_by_order_stable_for_ties() {
        let doc = json!({ "services": [{
            "id": "s1", "name": "Sieve", "category_id": "lab",
            "fields": [field("c", 2), field("a", 1), field("b", 1), field("z", 0)]
        }]});

        let projection = project_catalog(&doc).unwrap();
        let service = projection.catalog.service("s1").unwrap();
        let order: Vec<&str> = service.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(order, vec!["z", "a", "b", "c"]);
        assert_eq!(projection.catalog.categories()[0].name, "lab");
    }

    #[test]
    fn record_without_category_is_skipped_with_warning() {
        let doc = json!([
            { "id": "s1", "name": "Orphan" },
            { "id": "s2", "name": "Kept", "category_id": 7 },
            "not a record",
        ]);

        let projection = project_catalog(&doc).unwrap();
        assert_eq!(projection.catalog.service_count(), 1);
        assert!(projection.catalog.service("s2").is_some());
        assert_eq!(projection.warnings.len(), 2);
        assert_eq!(projection.warnings[0].service_id.as_deref(), Some("s1"));
        assert_eq!(projection.warnings[1].record, 2);
    }

    #[test]
    fn unknown_field_type_skips_field_only() {
        let doc = json!([{
            "id": "s1", "name": "X", "category_id": "lab",
            "fields": [
                { "id": "f1", "name": "depth", "type": "number" },
                { "id": "f2", "name": "stars", "type": "rating" }
            ]
        }]);

        let projection = project_catalog(&doc).unwrap();
        let service = projection.catalog.service("s1").unwrap();
        assert_eq!(service.fields.len(), 1);
        assert_eq!(service.fields[0].field_type, FieldType::Number);
        assert_eq!(projection.warnings.len(), 1);
    }

    #[test]
    fn dependency_shapes_are_parsed() {
        let doc = json!([{
            "id": "s1", "name": "X", "category_id": "lab",
            "fields": [
                { "id": "f1", "name": "depth", "type": "select", "options": ["surface", "deep"] },
                { "id": "f2", "name": "notes", "type": "textarea",
                  "depends_on": { "field_name": "depth", "value": "surface" } },
                { "id": "f3", "name": "casing", "type": "checkbox",
                  "depends_on_field": "depth", "depends_on_value": "deep" }
            ]
        }]);

        let projection = project_catalog(&doc).unwrap();
        let service = projection.catalog.service("s1").unwrap();
        assert_eq!(service.fields[0].options, vec!["surface", "deep"]);
        let dep = service.fields[1].dependency.as_ref().unwrap();
        assert_eq!(dep.on_field_name, "depth");
        assert_eq!(dep.on_value, json!("surface"));
        assert!(service.fields[2].dependency.is_some());
        assert!(projection.warnings.is_empty());
    }

    #[test]
    fn dangling_dependency_warns_but_keeps_field() {
        let doc = json!([{
            "id": "s1", "name": "X", "category_id": "lab",
            "fields": [
                { "id": "f1", "name": "notes", "type": "text",
                  "depends_on": { "field_name": "ghost", "value": "yes" } }
            ]
        }]);

        let projection = project_catalog(&doc).unwrap();
        assert_eq!(projection.catalog.service("s1").unwrap().fields.len(), 1);
        assert_eq!(projection.warnings.len(), 1);
        assert!(projection.warnings[0].message.contains("ghost"));
    }

    #[test]
    fn duplicate_service_id_keeps_first() {
        let doc = json!([
            { "id": "s1", "name": "First", "category_id": "lab" },
            { "id": "s1", "name": "Second", "category_id": "lab" },
        ]);

        let projection = project_catalog(&doc).unwrap();
        assert_eq!(projection.catalog.service("s1").unwrap().name, "First");
        assert_eq!(projection.warnings.len(), 1);
    }

    #[test]
    fn duplicate_fields_keep_first() {
        let doc = json!([{
            "id": "s1", "name": "X", "category_id": "lab",
            "fields": [
                { "id": "f1", "name": "depth", "type": "text" },
                { "id": "f1", "name": "depth_again", "type": "number" },
                { "id": "f2", "name": "depth", "type": "text" },
                { "id": "f3", "name": "notes", "type": "textarea" }
            ]
        }]);

        let projection = project_catalog(&doc).unwrap();
        let service = projection.catalog.service("s1").unwrap();
        let ids: Vec<&str> = service.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["f1", "f3"]);
        assert_eq!(service.fields[0].field_type, FieldType::ShortText);
        assert_eq!(projection.warnings.len(), 2);
        assert!(projection.warnings[0].message.contains("field id 'f1'"));
        assert!(projection.warnings[1].message.contains("field name 'depth'"));
    }

    #[test]
    fn scalar_document_is_rejected() {
        assert_eq!(
            project_catalog(&json!("nope")).unwrap_err(),
            CatalogError::InvalidDocument
        );
        assert!(project_catalog(&json!({ "items": [] })).is_err());
    }
}
