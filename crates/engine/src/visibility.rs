//! Field visibility for conditional additional fields.
//!
//! Visibility is recomputed from the instance's current values on every
//! call. Nothing is cached, so a value change is reflected immediately.

use labreq_catalog::FieldDefinition;

use crate::instance::ServiceInstance;
use crate::value::json_compare_string;

/// Whether `field` is currently shown for `instance`.
///
/// A field without a dependency is always visible. A dependent field is
/// visible when its parent (matched by name among `all_fields`) holds a
/// non-empty value whose trimmed string form equals the trimmed string
/// form of the dependency value. A parent that cannot be resolved leaves
/// the field visible.
pub fn is_visible(
    field: &FieldDefinition,
    instance: &ServiceInstance,
    all_fields: &[FieldDefinition],
) -> bool {
    let dep = match &field.dependency {
        Some(dep) => dep,
        None => return true,
    };

    let parent = match all_fields.iter().find(|f| f.name == dep.on_field_name) {
        Some(parent) => parent,
        None => return true,
    };

    let current = match instance.value(&parent.id).and_then(|v| v.compare_string()) {
        Some(current) => current,
        None => return false,
    };

    json_compare_string(&dep.on_value).is_some_and(|expected| expected == current)
}

/// The fields of `all_fields` currently visible for `instance`, in order.
pub fn visible_fields<'a>(
    all_fields: &'a [FieldDefinition],
    instance: &ServiceInstance,
) -> Vec<&'a FieldDefinition> {
    all_fields
        .iter()
        .filter(|f| is_visible(f, instance, all_fields))
        .collect()
}
