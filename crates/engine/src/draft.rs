//! Staged editing of a single sample.
//!
//! An [`InstanceDraft`] is a modal-local copy of an instance. Edits go to
//! the draft only; the store changes when [`InstanceDraft::save`]
//! succeeds. Dropping a draft discards it and leaves the store as it was.

use labreq_catalog::{FieldDefinition, FieldType, ServiceDefinition};

use crate::instance::{InstanceId, ServiceInstance};
use crate::selection::{write_field, SelectionStore};
use crate::validate::ValidationErrors;
use crate::visibility::{is_visible, visible_fields};

/// Why a draft could not be committed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftRejected {
    /// Visible required fields are empty or values are out of range.
    #[error("sample has {} invalid field(s)", .0.len())]
    Invalid(ValidationErrors),
    /// The service or instance being edited is no longer selected.
    #[error("sample '{instance_id}' of service '{service_id}' is no longer selected")]
    Stale {
        service_id: String,
        instance_id: InstanceId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftMode {
    New,
    Edit,
}

/// Staged configuration of one sample of a schema-bearing service.
#[derive(Debug, Clone)]
pub struct InstanceDraft {
    service: ServiceDefinition,
    instance: ServiceInstance,
    mode: DraftMode,
}

impl InstanceDraft {
    /// Start configuring a new sample. `None` for unknown services and
    /// services without additional fields.
    pub fn new_sample(store: &SelectionStore, service_id: &str) -> Option<InstanceDraft> {
        let service = store.catalog().service(service_id)?;
        if !service.has_additional_fields() {
            return None;
        }
        Some(InstanceDraft {
            instance: store.factory().create(service),
            service: service.clone(),
            mode: DraftMode::New,
        })
    }

    /// Start editing an existing sample.
    pub fn edit(store: &SelectionStore, service_id: &str, instance_id: &InstanceId) -> Option<InstanceDraft> {
        let service = store.catalog().service(service_id)?;
        if !service.has_additional_fields() {
            return None;
        }
        let instance = store.instance(service_id, instance_id)?.clone();
        Some(InstanceDraft {
            service: service.clone(),
            instance,
            mode: DraftMode::Edit,
        })
    }

    pub fn service(&self) -> &ServiceDefinition {
        &self.service
    }

    pub fn instance(&self) -> &ServiceInstance {
        &self.instance
    }

    pub fn is_new(&self) -> bool {
        self.mode == DraftMode::New
    }

    /// Coerce and stage a value. `false` for fields the service does not declare.
    pub fn set_field_value(&mut self, field_id: &str, raw: &serde_json::Value) -> bool {
        write_field(&self.service, &mut self.instance, field_id, raw)
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.instance.notes = notes.to_string();
    }

    /// Fields to render for the current staged values.
    pub fn visible_fields(&self) -> Vec<&FieldDefinition> {
        visible_fields(&self.service.fields, &self.instance)
    }

    /// Check the staged values, keyed by field id.
    ///
    /// Only currently visible fields are checked: required ones must be
    /// non-empty and single-select values must be one of the options.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for field in &self.service.fields {
            if !is_visible(field, &self.instance, &self.service.fields) {
                continue;
            }
            let value = self.instance.value(&field.id);
            let empty = value.map_or(true, |v| v.is_empty());
            if empty {
                if field.required {
                    errors.insert(field.id.clone(), format!("{} is required", field.label));
                }
                continue;
            }
            if field.field_type == FieldType::SingleSelect && !field.options.is_empty() {
                let chosen = value.and_then(|v| v.compare_string()).unwrap_or_default();
                if !field.options.iter().any(|o| o.trim() == chosen) {
                    errors.insert(
                        field.id.clone(),
                        format!("{} must be one of: {}", field.label, field.options.join(", ")),
                    );
                }
            }
        }
        errors
    }

    /// Commit the draft to the store if it validates.
    ///
    /// A new sample is appended to the service (selecting it if needed);
    /// an edited sample replaces the stored one. After a new sample is
    /// committed the draft edits it, so saving again replaces rather than
    /// appends. The draft is left intact on rejection so the user can
    /// correct it.
    pub fn save(&mut self, store: &mut SelectionStore) -> Result<InstanceId, DraftRejected> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(DraftRejected::Invalid(errors));
        }

        let committed = match self.mode {
            DraftMode::New => store.add_configured_service(&self.service.id, vec![self.instance.clone()]),
            DraftMode::Edit => store.replace_instance(&self.service.id, self.instance.clone()),
        };
        if !committed {
            return Err(DraftRejected::Stale {
                service_id: self.service.id.clone(),
                instance_id: self.instance.id.clone(),
            });
        }
        tracing::debug!(
            service = %self.service.id,
            instance = %self.instance.id,
            new = self.is_new(),
            "sample saved"
        );
        self.mode = DraftMode::Edit;
        Ok(self.instance.id.clone())
    }
}
