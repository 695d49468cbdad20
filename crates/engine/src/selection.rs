//! Selection state and the store that mutates it.
//!
//! [`SelectionStore`] is the only writer of [`SelectionState`]. Every
//! mutation is a discrete command that either applies fully or is
//! silently ignored (returning `false`); none of them errors or panics.
//! The store upholds two invariants:
//!
//! - a selected service always has at least one instance;
//! - service ids are unique within the selection.

use std::collections::HashSet;
use std::sync::Arc;

use labreq_catalog::{Catalog, ServiceDefinition};
use serde::Serialize;

use crate::instance::{FieldValue, InstanceFactory, InstanceId, InstanceIdGenerator, ServiceInstance};
use crate::value::{coerce, FieldData};

// ──────────────────────────────────────────────
// Aggregation rules
// ──────────────────────────────────────────────

/// Total units of a schema-less service: one instance may stand for
/// several units, so quantities are summed. Saturates at `u32::MAX`.
pub fn sum_of_quantities(instances: &[ServiceInstance]) -> u32 {
    instances
        .iter()
        .map(|i| i.quantity)
        .fold(0u32, u32::saturating_add)
}

/// Total units of a schema-bearing service: every instance is one
/// physical sample, whatever its quantity field says.
pub fn count_of_samples(instances: &[ServiceInstance]) -> u32 {
    instances.len() as u32
}

// ──────────────────────────────────────────────
// State
// ──────────────────────────────────────────────

/// How a service was selected, fixed at selection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// No additional fields; instances carry a free quantity.
    Simple,
    /// Has additional fields; each instance is one configured sample.
    Configured,
}

impl ServiceKind {
    pub fn of(service: &ServiceDefinition) -> ServiceKind {
        if service.has_additional_fields() {
            ServiceKind::Configured
        } else {
            ServiceKind::Simple
        }
    }
}

/// A service in the selection with its instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedService {
    pub service_id: String,
    /// Captured from the catalog when the service was selected.
    pub name: String,
    pub description: String,
    pub kind: ServiceKind,
    pub instances: Vec<ServiceInstance>,
}

impl SelectedService {
    pub fn total_quantity(&self) -> u32 {
        match self.kind {
            ServiceKind::Simple => sum_of_quantities(&self.instances),
            ServiceKind::Configured => count_of_samples(&self.instances),
        }
    }

    pub fn instance(&self, instance_id: &InstanceId) -> Option<&ServiceInstance> {
        self.instances.iter().find(|i| &i.id == instance_id)
    }

    fn instance_mut(&mut self, instance_id: &InstanceId) -> Option<&mut ServiceInstance> {
        self.instances.iter_mut().find(|i| &i.id == instance_id)
    }
}

/// Ordered list of selected services, unique by service id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionState {
    services: Vec<SelectedService>,
}

impl SelectionState {
    pub fn services(&self) -> &[SelectedService] {
        &self.services
    }

    pub fn get(&self, service_id: &str) -> Option<&SelectedService> {
        self.services.iter().find(|s| s.service_id == service_id)
    }

    pub fn contains(&self, service_id: &str) -> bool {
        self.get(service_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SelectedService> {
        self.services.iter()
    }

    fn get_mut(&mut self, service_id: &str) -> Option<&mut SelectedService> {
        self.services.iter_mut().find(|s| s.service_id == service_id)
    }
}

impl<'a> IntoIterator for &'a SelectionState {
    type Item = &'a SelectedService;
    type IntoIter = std::slice::Iter<'a, SelectedService>;

    fn into_iter(self) -> Self::IntoIter {
        self.services.iter()
    }
}

// ──────────────────────────────────────────────
// Field writes
// ──────────────────────────────────────────────

/// Coerce `raw` against the field's declared type and store it.
///
/// Returns `false` when the service does not declare `field_id` or the
/// instance has no slot for it.
pub(crate) fn write_field(
    service: &ServiceDefinition,
    instance: &mut ServiceInstance,
    field_id: &str,
    raw: &serde_json::Value,
) -> bool {
    let field = match service.field(field_id) {
        Some(field) => field,
        None => return false,
    };
    match instance.slot_mut(field_id) {
        Some(slot) => {
            *slot = coerce(field.field_type, raw);
            true
        }
        None => false,
    }
}

/// Rebuild an instance's slots to match the service schema: declaration
/// order, one slot per field, unknown field ids dropped.
fn conform_slots(service: &ServiceDefinition, instance: &mut ServiceInstance) {
    let mut old = std::mem::take(&mut instance.values);
    instance.values = service
        .fields
        .iter()
        .map(|f| {
            let value = old
                .iter_mut()
                .find(|v| v.field_id == f.id)
                .map(|v| std::mem::take(&mut v.value))
                .unwrap_or(FieldData::Empty);
            FieldValue {
                field_id: f.id.clone(),
                value,
            }
        })
        .collect();
}

// ──────────────────────────────────────────────
// Store
// ──────────────────────────────────────────────

/// Owner of the selection for one request session.
#[derive(Debug)]
pub struct SelectionStore {
    catalog: Arc<Catalog>,
    ids: Arc<InstanceIdGenerator>,
    state: SelectionState,
}

impl SelectionStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_ids(catalog, Arc::new(InstanceIdGenerator::new()))
    }

    pub fn with_ids(catalog: Arc<Catalog>, ids: Arc<InstanceIdGenerator>) -> Self {
        SelectionStore {
            catalog,
            ids,
            state: SelectionState::default(),
        }
    }

    // ── Read accessors ───────────────────────────

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn factory(&self) -> InstanceFactory<'_> {
        InstanceFactory::new(&self.ids)
    }

    pub fn selected(&self, service_id: &str) -> Option<&SelectedService> {
        self.state.get(service_id)
    }

    pub fn instance(&self, service_id: &str, instance_id: &InstanceId) -> Option<&ServiceInstance> {
        self.state.get(service_id)?.instance(instance_id)
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    // ── Mutations ────────────────────────────────

    /// Select a service without additional fields, as one instance of
    /// `quantity` units. Selecting it again adds to that instance.
    ///
    /// Ignored for schema-bearing services and for a zero quantity.
    pub fn add_simple_service(&mut self, service_id: &str, quantity: u32) -> bool {
        let service = match self.catalog.service(service_id) {
            Some(service) => service,
            None => return ignored("add_simple_service", service_id, "unknown service"),
        };
        if service.has_additional_fields() {
            return ignored("add_simple_service", service_id, "service has additional fields");
        }
        if quantity == 0 {
            return ignored("add_simple_service", service_id, "quantity must be at least 1");
        }

        if let Some(existing) = self.state.get_mut(service_id) {
            if let Some(first) = existing.instances.first_mut() {
                first.quantity = first.quantity.saturating_add(quantity);
                return true;
            }
        }

        let instance = InstanceFactory::new(&self.ids).create_with_quantity(service, quantity);
        self.state.services.push(SelectedService {
            service_id: service.id.clone(),
            name: service.name.clone(),
            description: service.description.clone(),
            kind: ServiceKind::Simple,
            instances: vec![instance],
        });
        true
    }

    /// Select a schema-bearing service with the given configured samples,
    /// or append them to it if it is already selected.
    ///
    /// Instance quantities are pinned to 1 and value slots are conformed
    /// to the schema. Instances whose id is already stored for the service
    /// (or repeated in `instances`) are skipped. Ignored when nothing is
    /// left to add or the service has no additional fields.
    pub fn add_configured_service(&mut self, service_id: &str, instances: Vec<ServiceInstance>) -> bool {
        let service = match self.catalog.service(service_id) {
            Some(service) => service,
            None => return ignored("add_configured_service", service_id, "unknown service"),
        };
        if !service.has_additional_fields() {
            return ignored("add_configured_service", service_id, "service has no additional fields");
        }
        if instances.is_empty() {
            return ignored("add_configured_service", service_id, "no instances given");
        }

        let mut taken: HashSet<InstanceId> = self
            .state
            .get(service_id)
            .map(|s| s.instances.iter().map(|i| i.id.clone()).collect())
            .unwrap_or_default();
        let instances: Vec<ServiceInstance> = instances
            .into_iter()
            .filter(|instance| {
                let fresh = taken.insert(instance.id.clone());
                if !fresh {
                    tracing::debug!(
                        service = service_id,
                        instance = %instance.id,
                        "skipping instance with an id already in use"
                    );
                }
                fresh
            })
            .map(|mut instance| {
                instance.quantity = 1;
                conform_slots(service, &mut instance);
                instance
            })
            .collect();
        if instances.is_empty() {
            return ignored("add_configured_service", service_id, "instance ids already in use");
        }

        match self.state.get_mut(service_id) {
            Some(existing) => existing.instances.extend(instances),
            None => self.state.services.push(SelectedService {
                service_id: service.id.clone(),
                name: service.name.clone(),
                description: service.description.clone(),
                kind: ServiceKind::Configured,
                instances,
            }),
        }
        true
    }

    /// Change the quantity of a schema-less instance.
    ///
    /// Ignored for configured samples (always 1) and for a zero quantity.
    pub fn update_instance_quantity(
        &mut self,
        service_id: &str,
        instance_id: &InstanceId,
        quantity: u32,
    ) -> bool {
        if quantity == 0 {
            return ignored("update_instance_quantity", service_id, "quantity must be at least 1");
        }
        let selected = match self.state.get_mut(service_id) {
            Some(selected) => selected,
            None => return ignored("update_instance_quantity", service_id, "service not selected"),
        };
        if selected.kind == ServiceKind::Configured {
            return ignored("update_instance_quantity", service_id, "configured samples have quantity 1");
        }
        match selected.instance_mut(instance_id) {
            Some(instance) => {
                instance.quantity = quantity;
                true
            }
            None => ignored("update_instance_quantity", service_id, "unknown instance"),
        }
    }

    /// Copy an instance (quantity, values and notes) under a new id and
    /// append it to the same service. Returns the new id.
    pub fn duplicate_instance(&mut self, service_id: &str, instance_id: &InstanceId) -> Option<InstanceId> {
        let selected = match self.state.get_mut(service_id) {
            Some(selected) => selected,
            None => {
                ignored("duplicate_instance", service_id, "service not selected");
                return None;
            }
        };
        let copy = match selected.instance(instance_id) {
            Some(original) => original.duplicate(self.ids.next_id()),
            None => {
                ignored("duplicate_instance", service_id, "unknown instance");
                return None;
            }
        };
        let new_id = copy.id.clone();
        selected.instances.push(copy);
        Some(new_id)
    }

    /// Remove one instance. Removing the last instance removes the service.
    pub fn remove_instance(&mut self, service_id: &str, instance_id: &InstanceId) -> bool {
        let pos = match self.state.services.iter().position(|s| s.service_id == service_id) {
            Some(pos) => pos,
            None => return ignored("remove_instance", service_id, "service not selected"),
        };
        let selected = &mut self.state.services[pos];
        let before = selected.instances.len();
        selected.instances.retain(|i| &i.id != instance_id);
        if selected.instances.len() == before {
            return ignored("remove_instance", service_id, "unknown instance");
        }
        if selected.instances.is_empty() {
            self.state.services.remove(pos);
        }
        true
    }

    /// Remove a service and all of its instances.
    pub fn remove_service(&mut self, service_id: &str) -> bool {
        let before = self.state.services.len();
        self.state.services.retain(|s| s.service_id != service_id);
        if self.state.services.len() == before {
            return ignored("remove_service", service_id, "service not selected");
        }
        true
    }

    /// Coerce and store a field value. Does not evaluate visibility.
    pub fn set_field_value(
        &mut self,
        service_id: &str,
        instance_id: &InstanceId,
        field_id: &str,
        raw: &serde_json::Value,
    ) -> bool {
        let service = match self.catalog.service(service_id) {
            Some(service) => service,
            None => return ignored("set_field_value", service_id, "unknown service"),
        };
        let instance = match self
            .state
            .get_mut(service_id)
            .and_then(|s| s.instance_mut(instance_id))
        {
            Some(instance) => instance,
            None => return ignored("set_field_value", service_id, "unknown instance"),
        };
        if !write_field(service, instance, field_id, raw) {
            return ignored("set_field_value", service_id, "unknown field");
        }
        true
    }

    pub fn set_instance_notes(&mut self, service_id: &str, instance_id: &InstanceId, notes: &str) -> bool {
        match self
            .state
            .get_mut(service_id)
            .and_then(|s| s.instance_mut(instance_id))
        {
            Some(instance) => {
                instance.notes = notes.to_string();
                true
            }
            None => ignored("set_instance_notes", service_id, "unknown instance"),
        }
    }

    /// Replace an existing instance wholesale, matched by id. Used to
    /// commit an edit draft.
    pub fn replace_instance(&mut self, service_id: &str, mut instance: ServiceInstance) -> bool {
        let service = match self.catalog.service(service_id) {
            Some(service) => service,
            None => return ignored("replace_instance", service_id, "unknown service"),
        };
        let selected = match self.state.get_mut(service_id) {
            Some(selected) => selected,
            None => return ignored("replace_instance", service_id, "service not selected"),
        };
        if selected.kind == ServiceKind::Configured {
            instance.quantity = 1;
            conform_slots(service, &mut instance);
        } else if instance.quantity == 0 {
            return ignored("replace_instance", service_id, "quantity must be at least 1");
        }
        match selected.instance_mut(&instance.id) {
            Some(slot) => {
                *slot = instance;
                true
            }
            None => ignored("replace_instance", service_id, "unknown instance"),
        }
    }

    /// Drop the whole selection.
    pub fn clear(&mut self) {
        self.state.services.clear();
    }
}

fn ignored(operation: &str, service_id: &str, reason: &str) -> bool {
    tracing::debug!(operation, service = service_id, "mutation ignored: {}", reason);
    false
}
