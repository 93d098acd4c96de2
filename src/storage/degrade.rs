//! Degradation policy for collection writes.
//!
//! A collection is always written as one JSON array under its key. When the
//! backend reports a capacity failure the writer sheds data in stages and
//! retries with the reduced *new* state:
//!
//! 1. drop the collection's large fields (logos) from every record;
//! 2. additionally keep only the last `max_records` records, by array order;
//! 3. give up, leaving whatever the key held before.
//!
//! Nothing here ever raises to the caller; the outcome says what landed.

use super::engine::KeyValueStore;
use crate::core::StoreError;
use crate::model::CollectionKind;
use crate::model::document::without_fields;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tracing::{Level, event};

pub const DEFAULT_MAX_RECORDS_ON_DEGRADE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The collection was stored as given.
    Full,
    /// Stored after removing large fields.
    WithoutLargeFields,
    /// Stored without large fields and cut to the most recent records.
    Truncated { kept: usize, dropped: usize },
    /// Nothing was stored; the previous value is intact.
    Abandoned,
}

impl WriteOutcome {
    pub fn is_persisted(self) -> bool {
        !matches!(self, Self::Abandoned)
    }

    pub fn is_degraded(self) -> bool {
        !matches!(self, Self::Full)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DegradationStats {
    pub full_writes: u64,
    pub stripped_writes: u64,
    pub truncated_writes: u64,
    pub abandoned_writes: u64,
}

pub struct DegradingWriter {
    max_records: usize,
    full_writes: AtomicU64,
    stripped_writes: AtomicU64,
    truncated_writes: AtomicU64,
    abandoned_writes: AtomicU64,
}

enum Attempt {
    Stored,
    OutOfSpace,
    Failed,
}

impl DegradingWriter {
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records,
            full_writes: AtomicU64::new(0),
            stripped_writes: AtomicU64::new(0),
            truncated_writes: AtomicU64::new(0),
            abandoned_writes: AtomicU64::new(0),
        }
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    pub fn stats(&self) -> DegradationStats {
        DegradationStats {
            full_writes: self.full_writes.load(AtomicOrdering::Relaxed),
            stripped_writes: self.stripped_writes.load(AtomicOrdering::Relaxed),
            truncated_writes: self.truncated_writes.load(AtomicOrdering::Relaxed),
            abandoned_writes: self.abandoned_writes.load(AtomicOrdering::Relaxed),
        }
    }

    /// Persist `records` as the new state of `kind`'s collection.
    pub fn write(
        &self,
        storage: &dyn KeyValueStore,
        kind: CollectionKind,
        records: &[Value],
    ) -> WriteOutcome {
        let outcome = self.write_staged(storage, kind, records);
        let counter = match outcome {
            WriteOutcome::Full => &self.full_writes,
            WriteOutcome::WithoutLargeFields => &self.stripped_writes,
            WriteOutcome::Truncated { .. } => &self.truncated_writes,
            WriteOutcome::Abandoned => &self.abandoned_writes,
        };
        counter.fetch_add(1, AtomicOrdering::Relaxed);
        outcome
    }

    fn write_staged(
        &self,
        storage: &dyn KeyValueStore,
        kind: CollectionKind,
        records: &[Value],
    ) -> WriteOutcome {
        let key = kind.storage_key();

        match Self::attempt(storage, key, records) {
            Attempt::Stored => return WriteOutcome::Full,
            Attempt::Failed => return WriteOutcome::Abandoned,
            Attempt::OutOfSpace => {}
        }

        let stripped: Vec<Value> = records
            .iter()
            .map(|record| without_fields(record, kind.large_fields()))
            .collect();
        match Self::attempt(storage, key, &stripped) {
            Attempt::Stored => {
                event!(Level::WARN, key, "saved collection without large fields to fit storage quota");
                return WriteOutcome::WithoutLargeFields;
            }
            Attempt::Failed => return WriteOutcome::Abandoned,
            Attempt::OutOfSpace => {}
        }

        let dropped = stripped.len().saturating_sub(self.max_records);
        let trimmed = &stripped[dropped..];
        match Self::attempt(storage, key, trimmed) {
            Attempt::Stored => {
                event!(
                    Level::WARN,
                    key,
                    kept = trimmed.len(),
                    dropped,
                    "saved trimmed collection to fit storage quota"
                );
                WriteOutcome::Truncated {
                    kept: trimmed.len(),
                    dropped,
                }
            }
            Attempt::Failed => WriteOutcome::Abandoned,
            Attempt::OutOfSpace => {
                event!(
                    Level::ERROR,
                    key,
                    records = records.len(),
                    "unable to persist collection: quota exceeded and every fallback failed"
                );
                WriteOutcome::Abandoned
            }
        }
    }

    fn attempt(storage: &dyn KeyValueStore, key: &str, records: &[Value]) -> Attempt {
        let encoded = match serde_json::to_string(records) {
            Ok(encoded) => encoded,
            Err(err) => {
                event!(Level::ERROR, key, error = %err, "failed to serialize collection");
                return Attempt::Failed;
            }
        };
        match storage.set(key, &encoded) {
            Ok(()) => Attempt::Stored,
            Err(err @ StoreError::QuotaExceeded { .. }) => {
                event!(Level::WARN, key, error = %err, "collection write hit storage quota");
                Attempt::OutOfSpace
            }
            Err(err) => {
                event!(Level::ERROR, key, error = %err, "collection write failed");
                Attempt::Failed
            }
        }
    }
}

impl Default for DegradingWriter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDS_ON_DEGRADE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use serde_json::json;

    fn programs(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"id": format!("car_{i}"), "name": format!("P{i}"), "logo": "data:image/png;base64,AAAA"}))
            .collect()
    }

    fn stored(storage: &InMemoryStorage, kind: CollectionKind) -> Vec<Value> {
        serde_json::from_str(&storage.get(kind.storage_key()).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_full_write() {
        let storage = InMemoryStorage::new();
        let writer = DegradingWriter::default();
        let outcome = writer.write(&storage, CollectionKind::Programs, &programs(2));
        assert_eq!(outcome, WriteOutcome::Full);
        assert_eq!(stored(&storage, CollectionKind::Programs), programs(2));
        assert_eq!(writer.stats().full_writes, 1);
    }

    #[test]
    fn test_strips_logos_after_first_failure() {
        let storage = InMemoryStorage::new();
        storage.fail_next_writes(1).unwrap();
        let writer = DegradingWriter::default();

        let outcome = writer.write(&storage, CollectionKind::Programs, &programs(3));
        assert_eq!(outcome, WriteOutcome::WithoutLargeFields);

        let saved = stored(&storage, CollectionKind::Programs);
        assert_eq!(saved.len(), 3);
        assert!(saved.iter().all(|p| p.get("logo").is_none()));
        assert_eq!(saved[2]["name"], json!("P2"));
    }

    #[test]
    fn test_truncates_to_most_recent_records() {
        let storage = InMemoryStorage::new();
        storage.fail_next_writes(2).unwrap();
        let writer = DegradingWriter::new(5);

        let outcome = writer.write(&storage, CollectionKind::Programs, &programs(8));
        assert_eq!(outcome, WriteOutcome::Truncated { kept: 5, dropped: 3 });

        let saved = stored(&storage, CollectionKind::Programs);
        let ids: Vec<_> = saved.iter().map(|p| p["id"].as_str().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["car_3", "car_4", "car_5", "car_6", "car_7"]);
        assert_eq!(writer.stats().truncated_writes, 1);
    }

    #[test]
    fn test_exhaustion_keeps_prior_value() {
        let storage = InMemoryStorage::new();
        storage.set(CollectionKind::Programs.storage_key(), "[\"prior\"]").unwrap();
        storage.fail_all_writes(true).unwrap();
        let writer = DegradingWriter::default();

        let outcome = writer.write(&storage, CollectionKind::Programs, &programs(1));
        assert_eq!(outcome, WriteOutcome::Abandoned);
        assert_eq!(
            storage.get(CollectionKind::Programs.storage_key()).unwrap().as_deref(),
            Some("[\"prior\"]")
        );
        assert_eq!(storage.attempt_count().unwrap(), 4);
        assert_eq!(writer.stats().abandoned_writes, 1);
    }

    #[test]
    fn test_real_quota_is_satisfied_by_stripping() {
        let big_logo = "A".repeat(4_000);
        let records: Vec<Value> = (0..3)
            .map(|i| json!({"id": format!("esc_{i}"), "nombre": "X", "logo": big_logo}))
            .collect();
        let storage = InMemoryStorage::with_quota(2_000);
        let writer = DegradingWriter::default();

        let outcome = writer.write(&storage, CollectionKind::Institutions, &records);
        assert_eq!(outcome, WriteOutcome::WithoutLargeFields);
        assert_eq!(stored(&storage, CollectionKind::Institutions).len(), 3);
    }
}
