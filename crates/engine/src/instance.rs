//! Service instances (samples) and their factory.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use labreq_catalog::ServiceDefinition;
use serde::Serialize;

use crate::value::FieldData;

// ──────────────────────────────────────────────
// Identifiers
// ──────────────────────────────────────────────

/// Opaque instance identifier, unique for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        InstanceId(s.to_string())
    }
}

/// Hands out instance ids for one session.
///
/// Ids combine a random per-session prefix with a counter, so two ids
/// from the same generator never collide and ids from different sessions
/// are unlikely to.
#[derive(Debug)]
pub struct InstanceIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl Default for InstanceIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceIdGenerator {
    pub fn new() -> Self {
        Self::with_prefix(&format!("{:08x}", rand::random::<u32>()))
    }

    /// Deterministic generator, mostly for tests and fixtures.
    pub fn with_prefix(prefix: &str) -> Self {
        InstanceIdGenerator {
            prefix: prefix.to_string(),
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> InstanceId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        InstanceId(format!("{}-{}", self.prefix, n))
    }
}

// ──────────────────────────────────────────────
// Instances
// ──────────────────────────────────────────────

/// A stored value for one declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub field_id: String,
    pub value: FieldData,
}

/// One concrete unit of a selected service.
///
/// For schema-bearing services an instance is exactly one physical sample
/// and its quantity stays at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInstance {
    pub id: InstanceId,
    pub quantity: u32,
    /// One slot per declared field, in declaration order.
    pub values: Vec<FieldValue>,
    pub notes: String,
}

impl ServiceInstance {
    pub fn value(&self, field_id: &str) -> Option<&FieldData> {
        self.values
            .iter()
            .find(|v| v.field_id == field_id)
            .map(|v| &v.value)
    }

    pub(crate) fn slot_mut(&mut self, field_id: &str) -> Option<&mut FieldData> {
        self.values
            .iter_mut()
            .find(|v| v.field_id == field_id)
            .map(|v| &mut v.value)
    }

    /// Copy of this instance under a new id.
    pub(crate) fn duplicate(&self, id: InstanceId) -> ServiceInstance {
        ServiceInstance {
            id,
            ..self.clone()
        }
    }
}

/// Creates blank instances for a service.
pub struct InstanceFactory<'a> {
    ids: &'a InstanceIdGenerator,
}

impl<'a> InstanceFactory<'a> {
    pub fn new(ids: &'a InstanceIdGenerator) -> Self {
        InstanceFactory { ids }
    }

    /// A fresh instance with quantity 1, an empty slot for every declared
    /// field and no notes.
    pub fn create(&self, service: &ServiceDefinition) -> ServiceInstance {
        ServiceInstance {
            id: self.ids.next_id(),
            quantity: 1,
            values: service
                .fields
                .iter()
                .map(|f| FieldValue {
                    field_id: f.id.clone(),
                    value: FieldData::Empty,
                })
                .collect(),
            notes: String::new(),
        }
    }

    /// A schema-less instance carrying `quantity` units.
    pub fn create_with_quantity(&self, service: &ServiceDefinition, quantity: u32) -> ServiceInstance {
        ServiceInstance {
            quantity,
            ..self.create(service)
        }
    }
}
