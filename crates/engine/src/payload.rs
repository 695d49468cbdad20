//! Normalized request payloads.
//!
//! [`build_payload`] flattens the selection into the submission shape.
//! Stored values are emitted as they are, whether or not their field is
//! currently visible; visibility is a rendering concern and is not
//! re-evaluated here. Empty slots are omitted.
//!
//! [`rehydrate`] goes the other way, rebuilding a store from a payload
//! through the regular store operations.

use std::collections::HashSet;
use std::sync::Arc;

use labreq_catalog::Catalog;
use serde::{Deserialize, Serialize};

use crate::instance::InstanceIdGenerator;
use crate::selection::{write_field, SelectedService, SelectionState, SelectionStore};
use crate::validate::RequestDetails;

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalDatum {
    pub field_id: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancePayload {
    pub quantity: u32,
    #[serde(default)]
    pub additional_data: Vec<AdditionalDatum>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePayload {
    pub service_id: String,
    pub instances: Vec<InstancePayload>,
}

/// Everything handed to the submission boundary: contact details at the
/// top level plus the flattened services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    #[serde(flatten)]
    pub details: RequestDetails,
    pub services: Vec<ServicePayload>,
}

// ──────────────────────────────────────────────
// Building
// ──────────────────────────────────────────────

fn service_payload(selected: &SelectedService) -> ServicePayload {
    ServicePayload {
        service_id: selected.service_id.clone(),
        instances: selected
            .instances
            .iter()
            .map(|instance| InstancePayload {
                quantity: instance.quantity,
                additional_data: instance
                    .values
                    .iter()
                    .filter(|v| !v.value.is_empty())
                    .map(|v| AdditionalDatum {
                        field_id: v.field_id.clone(),
                        value: v.value.to_json(),
                    })
                    .collect(),
                notes: instance.notes.clone(),
            })
            .collect(),
    }
}

/// Flatten the selection, one entry per selected service in selection order.
pub fn build_payload(selection: &SelectionState) -> Vec<ServicePayload> {
    selection.iter().map(service_payload).collect()
}

pub fn build_request(details: &RequestDetails, selection: &SelectionState) -> RequestPayload {
    RequestPayload {
        details: details.clone(),
        services: build_payload(selection),
    }
}

// ──────────────────────────────────────────────
// Rehydration
// ──────────────────────────────────────────────

/// Why a payload could not be turned back into a selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RehydrateError {
    #[error("unknown service '{service_id}'")]
    UnknownService { service_id: String },
    #[error("service '{service_id}' appears more than once")]
    DuplicateService { service_id: String },
    #[error("service '{service_id}' has no instances")]
    NoInstances { service_id: String },
    #[error("service '{service_id}' has an instance with quantity 0")]
    InvalidQuantity { service_id: String },
    #[error("service '{service_id}' does not declare field '{field_id}'")]
    UnknownField { service_id: String, field_id: String },
}

/// Rebuild a selection store from a payload.
///
/// Values are written through the same coercion as interactive edits, so
/// a payload produced by [`build_payload`] round-trips to the same stored
/// values (instance ids are freshly generated).
pub fn rehydrate(
    services: &[ServicePayload],
    catalog: Arc<Catalog>,
    ids: Arc<InstanceIdGenerator>,
) -> Result<SelectionStore, RehydrateError> {
    let mut store = SelectionStore::with_ids(catalog.clone(), ids);
    let mut seen = HashSet::new();

    for entry in services {
        let service_id = entry.service_id.as_str();
        let service = catalog
            .service(service_id)
            .ok_or_else(|| RehydrateError::UnknownService {
                service_id: service_id.to_string(),
            })?;
        if !seen.insert(service_id) {
            return Err(RehydrateError::DuplicateService {
                service_id: service_id.to_string(),
            });
        }
        if entry.instances.is_empty() {
            return Err(RehydrateError::NoInstances {
                service_id: service_id.to_string(),
            });
        }

        if service.has_additional_fields() {
            let mut instances = Vec::with_capacity(entry.instances.len());
            for item in &entry.instances {
                let mut instance = store.factory().create(service);
                for datum in &item.additional_data {
                    if !write_field(service, &mut instance, &datum.field_id, &datum.value) {
                        return Err(RehydrateError::UnknownField {
                            service_id: service_id.to_string(),
                            field_id: datum.field_id.clone(),
                        });
                    }
                }
                instance.notes = item.notes.clone();
                instances.push(instance);
            }
            store.add_configured_service(service_id, instances);
        } else {
            if entry.instances.iter().any(|i| i.quantity == 0) {
                return Err(RehydrateError::InvalidQuantity {
                    service_id: service_id.to_string(),
                });
            }
            if let Some(datum) = entry.instances.iter().flat_map(|i| &i.additional_data).next() {
                return Err(RehydrateError::UnknownField {
                    service_id: service_id.to_string(),
                    field_id: datum.field_id.clone(),
                });
            }
            let first = &entry.instances[0];
            store.add_simple_service(service_id, first.quantity);
            let first_id = match store.selected(service_id) {
                Some(selected) => selected.instances[0].id.clone(),
                None => continue,
            };
            store.set_instance_notes(service_id, &first_id, &first.notes);
            for item in &entry.instances[1..] {
                if let Some(id) = store.duplicate_instance(service_id, &first_id) {
                    store.update_instance_quantity(service_id, &id, item.quantity);
                    store.set_instance_notes(service_id, &id, &item.notes);
                }
            }
        }
    }

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceId;
    use crate::testing::sample_catalog;
    use crate::visibility::is_visible;
    use serde_json::json;

    fn store() -> SelectionStore {
        SelectionStore::with_ids(
            Arc::new(sample_catalog()),
            Arc::new(InstanceIdGenerator::with_prefix("p")),
        )
    }

    fn add_sample(store: &mut SelectionStore, service_id: &str) -> InstanceId {
        let service = store.catalog().service(service_id).unwrap().clone();
        let instance = store.factory().create(&service);
        let id = instance.id.clone();
        store.add_configured_service(service_id, vec![instance]);
        id
    }

    #[test]
    fn payload_shape() {
        let mut store = store();
        store.add_simple_service("moisture", 3);
        let id = add_sample(&mut store, "borehole_sample");
        store.set_field_value("borehole_sample", &id, "bs_depth", &json!("deep"));
        store.set_field_value("borehole_sample", &id, "bs_weight", &json!("4.25"));
        store.set_instance_notes("borehole_sample", &id, "double bagged");

        let payload = serde_json::to_value(build_payload(store.state())).unwrap();
        assert_eq!(
            payload,
            json!([
                { "serviceId": "moisture",
                  "instances": [{ "quantity": 3, "additionalData": [], "notes": "" }] },
                { "serviceId": "borehole_sample",
                  "instances": [{
                      "quantity": 1,
                      "additionalData": [
                          { "fieldId": "bs_depth", "value": "deep" },
                          { "fieldId": "bs_weight", "value": 4.25 }
                      ],
                      "notes": "double bagged"
                  }] }
            ])
        );
    }

    #[test]
    fn hidden_value_is_still_emitted() {
        let mut store = store();
        let id = add_sample(&mut store, "borehole_sample");
        store.set_field_value("borehole_sample", &id, "bs_depth", &json!("surface"));
        store.set_field_value("borehole_sample", &id, "bs_notes", &json!("organic topsoil"));

        let service = store.catalog().service("borehole_sample").unwrap().clone();
        let notes_field = service.field("bs_notes").unwrap();
        assert!(is_visible(notes_field, store.instance("borehole_sample", &id).unwrap(), &service.fields));

        store.set_field_value("borehole_sample", &id, "bs_depth", &json!("deep"));
        let instance = store.instance("borehole_sample", &id).unwrap();
        assert!(!is_visible(notes_field, instance, &service.fields));
        assert!(!instance.value("bs_notes").unwrap().is_empty());

        let payload = build_payload(store.state());
        let data = &payload[0].instances[0].additional_data;
        assert!(data.contains(&AdditionalDatum {
            field_id: "bs_notes".into(),
            value: json!("organic topsoil"),
        }));
    }

    #[test]
    fn request_flattens_details() {
        let mut store = store();
        store.add_simple_service("spt", 2);
        let details = RequestDetails {
            contact_name: "Ana".into(),
            email: "ana@example.com".into(),
            ..RequestDetails::default()
        };
        let value = serde_json::to_value(build_request(&details, store.state())).unwrap();
        assert_eq!(value["contactName"], json!("Ana"));
        assert_eq!(value["email"], json!("ana@example.com"));
        assert_eq!(value["services"][0]["serviceId"], json!("spt"));
    }

    #[test]
    fn rehydrate_round_trip() {
        let mut store = store();
        store.add_simple_service("moisture", 2);
        let first = store.selected("moisture").unwrap().instances[0].id.clone();
        let dup = store.duplicate_instance("moisture", &first).unwrap();
        store.update_instance_quantity("moisture", &dup, 3);
        store.set_instance_notes("moisture", &dup, "second batch");

        let a = add_sample(&mut store, "borehole_sample");
        store.set_field_value("borehole_sample", &a, "bs_depth", &json!("surface"));
        store.set_field_value("borehole_sample", &a, "bs_notes", &json!("roots"));
        store.set_field_value("borehole_sample", &a, "bs_sampled_on", &json!("2024-06-30"));
        let b = add_sample(&mut store, "borehole_sample");
        store.set_field_value("borehole_sample", &b, "bs_depth", &json!("deep"));
        store.set_field_value("borehole_sample", &b, "bs_weight", &json!(12));

        let t = add_sample(&mut store, "test_pit");
        store.set_field_value("test_pit", &t, "tp_location", &json!("TP-03"));
        store.set_field_value("test_pit", &t, "tp_groundwater", &json!(false));

        let payload = build_payload(store.state());
        let text = serde_json::to_string(&payload).unwrap();
        let parsed: Vec<ServicePayload> = serde_json::from_str(&text).unwrap();
        let restored = rehydrate(
            &parsed,
            store.catalog().clone(),
            Arc::new(InstanceIdGenerator::with_prefix("r")),
        )
        .unwrap();

        let before = store.state();
        let after = restored.state();
        assert_eq!(before.len(), after.len());
        for (x, y) in before.iter().zip(after.iter()) {
            assert_eq!(x.service_id, y.service_id);
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.instances.len(), y.instances.len());
            assert_eq!(x.total_quantity(), y.total_quantity());
            for (i, j) in x.instances.iter().zip(y.instances.iter()) {
                assert_eq!(i.values, j.values);
                assert_eq!(i.notes, j.notes);
                assert_eq!(i.quantity, j.quantity);
            }
        }
        assert_eq!(build_payload(after), payload);
    }

    #[test]
    fn rehydrate_rejects_bad_payloads() {
        let catalog = Arc::new(sample_catalog());
        let ids = || Arc::new(InstanceIdGenerator::with_prefix("r"));
        let one = |id: &str, q: u32| ServicePayload {
            service_id: id.into(),
            instances: vec![InstancePayload {
                quantity: q,
                additional_data: vec![],
                notes: String::new(),
            }],
        };

        let err = rehydrate(&[one("ghost", 1)], catalog.clone(), ids()).unwrap_err();
        assert_eq!(err, RehydrateError::UnknownService { service_id: "ghost".into() });

        let err = rehydrate(&[one("spt", 1), one("spt", 2)], catalog.clone(), ids()).unwrap_err();
        assert!(matches!(err, RehydrateError::DuplicateService { .. }));

        let err = rehydrate(&[one("spt", 0)], catalog.clone(), ids()).unwrap_err();
        assert!(matches!(err, RehydrateError::InvalidQuantity { .. }));

        let empty = ServicePayload {
            service_id: "spt".into(),
            instances: vec![],
        };
        let err = rehydrate(&[empty], catalog.clone(), ids()).unwrap_err();
        assert!(matches!(err, RehydrateError::NoInstances { .. }));

        let mut bad_field = one("test_pit", 1);
        bad_field.instances[0].additional_data.push(AdditionalDatum {
            field_id: "tp_colour".into(),
            value: json!("brown"),
        });
        let err = rehydrate(&[bad_field], catalog.clone(), ids()).unwrap_err();
        assert!(err.to_string().contains("tp_colour"));

        let mut schemaless_data = one("spt", 1);
        schemaless_data.instances[0].additional_data.push(AdditionalDatum {
            field_id: "ghost".into(),
            value: json!("x"),
        });
        let err = rehydrate(&[schemaless_data], catalog, ids()).unwrap_err();
        assert_eq!(
            err,
            RehydrateError::UnknownField {
                service_id: "spt".into(),
                field_id: "ghost".into(),
            }
        );
    }
}
