//! Capacity failures absorbed by the entity store's write path

use crm_store::{
    CollectionKind, EntityStore, InMemoryStorage, Institution, KeyValueStore, MirrorSink, Program,
    Snapshot, WriteOutcome,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CountingMirror {
    pushes: Mutex<usize>,
}

impl MirrorSink for CountingMirror {
    fn push(&self, _snapshot: Snapshot) {
        *self.pushes.lock().unwrap() += 1;
    }
}

fn with_logo(name: &str) -> Program {
    let mut program = Program::new(name).with_code("C");
    program.logo = Some(format!("data:image/png;base64,{}", "A".repeat(64)));
    program
}

fn stored(storage: &InMemoryStorage, kind: CollectionKind) -> Vec<Value> {
    serde_json::from_str(&storage.get(kind.storage_key()).unwrap().unwrap()).unwrap()
}

#[test]
fn test_first_write_failure_falls_back_to_stripped_logos() {
    let storage = Arc::new(InMemoryStorage::new());
    let store = EntityStore::new(storage.clone(), Arc::new(CountingMirror::default()));
    store.programs().add(with_logo("A"));

    storage.fail_next_writes(1).unwrap();
    let id = store.programs().add(with_logo("B"));

    let outcome = store.last_write_outcome().unwrap();
    assert_eq!(outcome, WriteOutcome::WithoutLargeFields);
    assert!(outcome.is_degraded() && outcome.is_persisted());
    let saved = stored(&storage, CollectionKind::Programs);
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|p| p.get("logo").is_none()));

    let program = store.programs().get(&id).unwrap();
    assert_eq!(program.name, "B");
    assert_eq!(program.code.as_deref(), Some("C"));
    assert_eq!(store.degradation_stats().stripped_writes, 1);
}

#[test]
fn test_exhausted_write_keeps_prior_value_and_returns_normally() {
    let storage = Arc::new(InMemoryStorage::new());
    let mirror = Arc::new(CountingMirror::default());
    let store = EntityStore::new(storage.clone(), mirror.clone());
    let existing = store.institutions().add(Institution::new("Existing"));
    let prior = storage.get(CollectionKind::Institutions.storage_key()).unwrap();
    let pushes_before = *mirror.pushes.lock().unwrap();

    storage.fail_all_writes(true).unwrap();
    let id = store.institutions().add(Institution::new("Lost"));
    assert!(id.starts_with("esc_"));
    assert!(store.institutions().update(&existing, &serde_json::json!({"nombre": "Renamed"})));

    assert_eq!(storage.get(CollectionKind::Institutions.storage_key()).unwrap(), prior);
    assert_eq!(store.last_write_outcome(), Some(WriteOutcome::Abandoned));
    assert_eq!(store.degradation_stats().abandoned_writes, 2);
    assert_eq!(*mirror.pushes.lock().unwrap(), pushes_before);

    storage.fail_all_writes(false).unwrap();
    let names: Vec<String> = store.institutions().list().into_iter().map(|i| i.nombre).collect();
    assert_eq!(names, vec!["Existing"]);
}

#[test]
fn test_truncation_keeps_most_recent_records() {
    let storage = Arc::new(InMemoryStorage::new());
    let store = EntityStore::new(storage.clone(), Arc::new(CountingMirror::default()))
        .with_max_records_on_degrade(3);
    assert_eq!(store.max_records_on_degrade(), 3);
    for i in 0..5 {
        store.programs().add(Program::new(format!("P{i}")));
    }

    storage.fail_next_writes(2).unwrap();
    store.programs().add(Program::new("P5"));

    assert_eq!(
        store.last_write_outcome(),
        Some(WriteOutcome::Truncated { kept: 3, dropped: 3 })
    );
    let names: Vec<String> = store.programs().list().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["P3", "P4", "P5"]);
}

#[test]
fn test_quota_pressure_from_real_budget() {
    let storage = Arc::new(InMemoryStorage::with_quota(4_096));
    let store = EntityStore::new(storage.clone(), Arc::new(CountingMirror::default()));

    let mut school = Institution::new("Con logo");
    school.logo = Some("A".repeat(8_192));
    let id = store.institutions().add(school);

    let saved = store.institutions().get(&id).unwrap();
    assert_eq!(saved.nombre, "Con logo");
    assert_eq!(saved.logo, None);
    assert!(storage.usage().unwrap().used_bytes <= 4_096);
}
