//! End-to-end request building against the fixture catalog.

use std::sync::Arc;

use labreq_engine::{
    build_payload, build_request, is_visible, rehydrate, validate_request, visible_fields, Catalog,
    CatalogCache, FieldData, InstanceDraft, InstanceIdGenerator, RequestDetails, SelectionStore,
    StaticCatalogSource, ValidationRules,
};
use serde_json::json;

const CATALOG: &str = include_str!("fixtures/catalog.json");

async fn catalog() -> Arc<Catalog> {
    let cache = CatalogCache::new(StaticCatalogSource::new(serde_json::from_str(CATALOG).unwrap()));
    cache.load().await.unwrap()
}

fn store(catalog: Arc<Catalog>) -> SelectionStore {
    SelectionStore::with_ids(catalog, Arc::new(InstanceIdGenerator::with_prefix("it")))
}

fn filled_details() -> RequestDetails {
    RequestDetails {
        contact_name: "Marta Vidal".into(),
        email: "marta.vidal@civil.example".into(),
        phone: "+34 600 111 222".into(),
        company: "Vidal Ingenieria".into(),
        project_name: "Harbour extension".into(),
        project_location: "Quay 4".into(),
        description: "Geotechnical campaign for the new quay wall".into(),
    }
}

#[tokio::test]
async fn duplicating_a_simple_service_doubles_its_total() {
    let mut store = store(catalog().await);

    assert!(store.add_simple_service("moisture", 4));
    let selected = store.selected("moisture").unwrap();
    assert_eq!(selected.instances.len(), 1);
    assert_eq!(selected.total_quantity(), 4);

    let first = selected.instances[0].id.clone();
    let copy = store.duplicate_instance("moisture", &first).unwrap();
    assert_ne!(copy, first);

    let selected = store.selected("moisture").unwrap();
    assert_eq!(selected.instances.len(), 2);
    assert_eq!(selected.total_quantity(), 8);
}

#[tokio::test]
async fn hidden_value_is_kept_and_submitted() {
    let catalog = catalog().await;
    let mut store = store(catalog.clone());
    let service = catalog.service("borehole_sample").unwrap();
    let notes_field = service.field("bs_notes").unwrap();

    let mut draft = InstanceDraft::new_sample(&store, "borehole_sample").unwrap();
    draft.set_field_value("bs_depth", &json!("surface"));
    let visible = draft.visible_fields();
    let shown: Vec<&str> = visible.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(shown, vec!["bs_depth", "bs_notes", "bs_weight", "bs_sampled_on"]);

    drop(visible);
    draft.set_field_value("bs_notes", &json!("topsoil, roots"));
    let id = draft.save(&mut store).unwrap();

    store.set_field_value("borehole_sample", &id, "bs_depth", &json!("deep"));
    let instance = store.instance("borehole_sample", &id).unwrap();
    assert!(!is_visible(notes_field, instance, &service.fields));
    assert!(!visible_fields(&service.fields, instance)
        .iter()
        .any(|f| f.id == "bs_notes"));
    assert_eq!(
        instance.value("bs_notes"),
        Some(&FieldData::Text("topsoil, roots".into()))
    );

    let payload = serde_json::to_value(build_payload(store.state())).unwrap();
    assert_eq!(
        payload[0]["instances"][0]["additionalData"],
        json!([
            { "fieldId": "bs_depth", "value": "deep" },
            { "fieldId": "bs_notes", "value": "topsoil, roots" }
        ])
    );
}

#[tokio::test]
async fn saving_a_sample_requires_visible_required_fields() {
    let mut store = store(catalog().await);

    let mut draft = InstanceDraft::new_sample(&store, "test_pit").unwrap();
    draft.set_field_value("tp_groundwater", &json!(true));
    let rejected = draft.save(&mut store).unwrap_err();
    assert!(store.is_empty());
    match rejected {
        labreq_engine::DraftRejected::Invalid(errors) => {
            assert!(errors.contains("tp_location"));
            assert!(errors.contains("tp_groundwater_depth"));
        }
        other => panic!("unexpected rejection: {}", other),
    }

    // unticking groundwater hides the depth, so only location is needed
    draft.set_field_value("tp_groundwater", &json!(false));
    draft.set_field_value("tp_location", &json!("TP-07"));
    draft.save(&mut store).unwrap();
    assert_eq!(store.selected("test_pit").unwrap().total_quantity(), 1);
}

#[tokio::test]
async fn validator_reports_until_everything_is_filled() {
    let mut store = store(catalog().await);
    let rules = ValidationRules::default();

    let errors = validate_request(&RequestDetails::default(), store.state(), &rules);
    for key in ["contactName", "email", "phone", "projectName", "description", "services"] {
        assert!(errors.contains(key), "missing error for {}", key);
    }
    assert!(!errors.contains("company"));
    assert!(!errors.contains("projectLocation"));

    store.add_simple_service("proctor", 1);
    let errors = validate_request(&filled_details(), store.state(), &rules);
    assert!(errors.is_empty(), "{:?}", errors);
}

#[tokio::test]
async fn every_selected_service_keeps_at_least_one_instance() {
    let catalog = catalog().await;
    let mut store = store(catalog.clone());
    store.add_simple_service("spt", 2);
    let first = store.selected("spt").unwrap().instances[0].id.clone();
    store.duplicate_instance("spt", &first);

    let pit = catalog.service("test_pit").unwrap();
    let sample = store.factory().create(pit);
    let sample_id = sample.id.clone();
    store.add_configured_service("test_pit", vec![sample]);

    store.remove_instance("spt", &first);
    assert_eq!(store.selected("spt").unwrap().instances.len(), 1);
    store.remove_instance("test_pit", &sample_id);
    assert!(store.selected("test_pit").is_none());

    for selected in store.state() {
        assert!(!selected.instances.is_empty(), "{} has no instances", selected.service_id);
    }
}

#[tokio::test]
async fn payload_round_trips_through_rehydrate() {
    let catalog = catalog().await;
    let mut original = store(catalog.clone());
    original.add_simple_service("moisture", 2);
    let first = original.selected("moisture").unwrap().instances[0].id.clone();
    let copy = original.duplicate_instance("moisture", &first).unwrap();
    original.update_instance_quantity("moisture", &copy, 3);
    original.set_instance_notes("moisture", &copy, "bag B");

    let mut draft = InstanceDraft::new_sample(&original, "borehole_sample").unwrap();
    draft.set_field_value("bs_depth", &json!("shallow"));
    draft.set_field_value("bs_weight", &json!("2.50"));
    draft.set_field_value("bs_sampled_on", &json!("2024-03-18"));
    draft.set_notes("double-bagged");
    draft.save(&mut original).unwrap();

    let request = build_request(&filled_details(), original.state());
    let wire = serde_json::to_string(&request).unwrap();
    let parsed: labreq_engine::RequestPayload = serde_json::from_str(&wire).unwrap();
    assert_eq!(parsed.details, filled_details());

    let restored = rehydrate(
        &parsed.services,
        catalog,
        Arc::new(InstanceIdGenerator::with_prefix("rt")),
    )
    .unwrap();

    let ids = |s: &SelectionStore| -> Vec<String> {
        s.state().iter().map(|x| x.service_id.clone()).collect()
    };
    assert_eq!(ids(&restored), ids(&original));
    for (a, b) in original.state().iter().zip(restored.state().iter()) {
        assert_eq!(a.instances.len(), b.instances.len());
        assert_eq!(a.total_quantity(), b.total_quantity());
        for (x, y) in a.instances.iter().zip(b.instances.iter()) {
            assert_eq!(x.values, y.values);
            assert_eq!(x.notes, y.notes);
        }
    }
    assert_eq!(build_payload(restored.state()), request.services);
}
