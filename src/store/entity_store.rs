//! The entity store: CRUD over the institution, program and user collections.
//!
//! Every collection lives as one JSON array under its own key. Reads heal
//! missing identifiers; writes go through the [`DegradingWriter`] and, when
//! something was stored, push a sanitized snapshot to the mirror without
//! waiting for it. Nothing here raises to the caller: failures surface as
//! `bool`/`Option` results, the last [`WriteOutcome`] and the degradation
//! counters.

use super::collection::Collection;
use crate::config::StoreConfig;
use crate::core::{Result, StoreError};
use crate::model::document::{heal_all, without_fields};
use crate::model::{CollectionKind, CollectionSet, Institution, Program, Snapshot, User};
use crate::storage::{
    DegradationStats, DegradingWriter, FileStorage, InMemoryStorage, KeyValueStore, WriteOutcome,
};
use crate::sync::{HttpMirror, MirrorSink, NoopMirror, sanitize_snapshot};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{Level, event};

pub struct EntityStore {
    storage: Arc<dyn KeyValueStore>,
    mirror: Arc<dyn MirrorSink>,
    writer: DegradingWriter,
    last_outcome: Mutex<Option<WriteOutcome>>,
}

impl EntityStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, mirror: Arc<dyn MirrorSink>) -> Self {
        Self {
            storage,
            mirror,
            writer: DegradingWriter::default(),
            last_outcome: Mutex::new(None),
        }
    }

    /// Unmirrored store over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()), Arc::new(NoopMirror))
    }

    /// File-backed store with the quota and mirror described by `config`.
    ///
    /// The HTTP mirror binds to the tokio runtime current at this call; open
    /// the store from inside the runtime for mirroring to take effect.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let storage = FileStorage::open(&config.data_dir)?.with_quota(config.quota_bytes);
        let mirror: Arc<dyn MirrorSink> = if config.mirror.enabled {
            Arc::new(HttpMirror::new(&config.mirror)?)
        } else {
            Arc::new(NoopMirror)
        };
        event!(
            Level::INFO,
            data_dir = %storage.dir().display(),
            quota_bytes = ?config.quota_bytes,
            mirror = config.mirror.enabled,
            "entity store opened"
        );
        Ok(Self::new(Arc::new(storage), mirror)
            .with_max_records_on_degrade(config.max_records_on_degrade))
    }

    pub fn with_max_records_on_degrade(mut self, max: usize) -> Self {
        self.writer = DegradingWriter::new(max);
        self
    }

    pub fn institutions(&self) -> Collection<'_, Institution> {
        Collection::new(self)
    }

    pub fn programs(&self) -> Collection<'_, Program> {
        Collection::new(self)
    }

    pub fn users(&self) -> Collection<'_, User> {
        Collection::new(self)
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    /// Records kept when a write has to be truncated.
    pub fn max_records_on_degrade(&self) -> usize {
        self.writer.max_records()
    }

    pub fn degradation_stats(&self) -> DegradationStats {
        self.writer.stats()
    }

    /// Outcome of the most recent collection write, `None` before the first.
    pub fn last_write_outcome(&self) -> Option<WriteOutcome> {
        self.last_outcome.lock().ok().and_then(|outcome| *outcome)
    }

    /// All three collections. With `strip_large_fields` logos are removed and
    /// users are reduced to name, email, role and institution.
    pub fn export_snapshot(&self, strip_large_fields: bool) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for kind in CollectionKind::ALL {
            *snapshot.collection_mut(kind) = self.read_healed(kind).unwrap_or_else(|err| {
                event!(Level::ERROR, collection = %kind, error = %err, "export skipped unreadable collection");
                Vec::new()
            });
        }
        if strip_large_fields {
            sanitize_snapshot(&snapshot)
        } else {
            snapshot
        }
    }

    /// Overwrite the collections present in `collections`, leaving the others alone.
    ///
    /// Institutions and programs without a valid identifier get one; with
    /// `strip_large_fields` their logos are dropped. Users are written as
    /// provided. Returns what was written.
    pub fn replace_all(&self, mut collections: CollectionSet, strip_large_fields: bool) -> CollectionSet {
        let mut written = CollectionSet::default();
        for kind in CollectionKind::ALL {
            let Some(records) = collections.take(kind) else {
                continue;
            };
            let (mut records, _) = heal_all(kind, records);
            if strip_large_fields {
                records = records
                    .iter()
                    .map(|record| without_fields(record, kind.large_fields()))
                    .collect();
            }
            self.persist(kind, &records);
            written = written.with(kind, records);
        }
        written
    }

    /// Raw stored array. A missing key or a stored `null` reads as empty.
    pub(crate) fn read_raw(&self, kind: CollectionKind) -> Result<Vec<Value>> {
        let Some(raw) = self.storage.get(kind.storage_key())? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Value>(&raw)? {
            Value::Array(records) => Ok(records),
            Value::Null => Ok(Vec::new()),
            other => Err(StoreError::Serialization(format!(
                "{} holds {} instead of an array",
                kind.storage_key(),
                json_type(&other)
            ))),
        }
    }

    /// Stored array with identifiers healed; a healed array is written back first.
    pub(crate) fn read_healed(&self, kind: CollectionKind) -> Result<Vec<Value>> {
        let (records, changed) = heal_all(kind, self.read_raw(kind)?);
        if changed {
            event!(Level::INFO, collection = %kind, "assigned missing record identifiers");
            self.persist(kind, &records);
        }
        Ok(records)
    }

    /// Write a collection and, if anything landed, mirror the new state.
    pub(crate) fn persist(&self, kind: CollectionKind, records: &[Value]) -> WriteOutcome {
        let outcome = self.writer.write(self.storage.as_ref(), kind, records);
        self.record_outcome(outcome);
        if outcome.is_persisted() {
            self.mirror.push(self.mirror_snapshot());
        }
        outcome
    }

    pub(crate) fn record_outcome(&self, outcome: WriteOutcome) {
        if let Ok(mut last) = self.last_outcome.lock() {
            *last = Some(outcome);
        }
    }

    // Built from what is stored right now, without healing: healing here
    // would write, and every write mirrors.
    fn mirror_snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for kind in CollectionKind::ALL {
            *snapshot.collection_mut(kind) = self.read_raw(kind).unwrap_or_default();
        }
        sanitize_snapshot(&snapshot)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
