use super::EntityStore;
use crate::core::new_id;
use crate::model::document::{identity_of, merge_patch, to_document};
use crate::model::{Entity, Institution, Program, User};
use crate::storage::WriteOutcome;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{Level, event};

/// Collections whose identifiers are minted by the store.
pub trait GeneratedId: Entity {}

impl GeneratedId for Institution {}
impl GeneratedId for Program {}

/// Handle over one collection of an [`EntityStore`].
pub struct Collection<'a, R> {
    store: &'a EntityStore,
    _record: PhantomData<R>,
}

impl<'a, R: Entity> Collection<'a, R> {
    pub(crate) fn new(store: &'a EntityStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Records in stored order. Records missing an identifier are assigned
    /// one and the fixed collection is written back before returning; records
    /// that do not fit the typed view are skipped here but kept in storage.
    pub fn list(&self) -> Vec<R> {
        self.documents()
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<R>(record) {
                Ok(typed) => Some(typed),
                Err(err) => {
                    event!(Level::WARN, collection = %R::KIND, error = %err, "skipping unreadable record");
                    None
                }
            })
            .collect()
    }

    /// Stored records as raw JSON, identifiers healed.
    pub fn documents(&self) -> Vec<Value> {
        self.store.read_healed(R::KIND).unwrap_or_else(|err| {
            event!(Level::ERROR, collection = %R::KIND, error = %err, "failed to read collection");
            Vec::new()
        })
    }

    pub fn get(&self, id: &str) -> Option<R> {
        self.documents()
            .into_iter()
            .find(|record| identity_of(R::KIND, record) == Some(id))
            .and_then(|record| serde_json::from_value(record).ok())
    }

    /// Shallow-merge `patch` onto the record identified by `id`.
    ///
    /// Returns `false`, leaving storage untouched, when no record matches.
    /// The identity field itself cannot be patched.
    pub fn update<P: Serialize>(&self, id: &str, patch: &P) -> bool {
        let Some(mut records) = self.load_for_write() else {
            return false;
        };
        let Some(index) = records
            .iter()
            .position(|record| identity_of(R::KIND, record) == Some(id))
        else {
            return false;
        };
        let mut patch = match to_document(patch) {
            Ok(patch) => patch,
            Err(err) => {
                event!(Level::ERROR, collection = %R::KIND, error = %err, "rejected update patch");
                return false;
            }
        };
        patch.remove(R::KIND.identity_field());

        if let Value::Object(record) = &mut records[index] {
            merge_patch(record, patch);
        }
        self.store.persist(R::KIND, &records);
        true
    }

    /// Remove the record identified by `id`. Always reports success; when
    /// nothing matches nothing is written. No other collection is touched:
    /// programs keep pointing at a deleted institution.
    pub fn delete(&self, id: &str) -> bool {
        let Some(records) = self.load_for_write() else {
            return true;
        };
        let before = records.len();
        let kept: Vec<Value> = records
            .into_iter()
            .filter(|record| identity_of(R::KIND, record) != Some(id))
            .collect();
        if kept.len() != before {
            self.store.persist(R::KIND, &kept);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // An unreadable collection is never overwritten: the mutation is dropped.
    fn load_for_write(&self) -> Option<Vec<Value>> {
        match self.store.read_healed(R::KIND) {
            Ok(records) => Some(records),
            Err(err) => {
                event!(
                    Level::ERROR,
                    collection = %R::KIND,
                    error = %err,
                    "collection unreadable, mutation skipped"
                );
                self.store.record_outcome(WriteOutcome::Abandoned);
                None
            }
        }
    }
}

impl<R: GeneratedId> Collection<'_, R> {
    /// Append `record` under a freshly minted identifier and return it.
    /// Any identifier already on `record` is replaced.
    pub fn add(&self, record: R) -> String {
        let prefix = R::KIND.id_prefix().unwrap_or("rec");
        let id = new_id(prefix);

        let mut document = match to_document(&record) {
            Ok(document) => document,
            Err(err) => {
                event!(Level::ERROR, collection = %R::KIND, error = %err, "failed to encode new record");
                self.store.record_outcome(WriteOutcome::Abandoned);
                return id;
            }
        };
        document.insert(R::KIND.identity_field().to_string(), Value::String(id.clone()));

        let Some(mut records) = self.load_for_write() else {
            return id;
        };
        records.push(Value::Object(document));
        self.store.persist(R::KIND, &records);
        id
    }
}

impl Collection<'_, User> {
    /// Add a user. Returns `false` without writing when the email is empty or
    /// already taken (emails are compared exactly).
    pub fn add(&self, user: User) -> bool {
        if user.email.is_empty() {
            return false;
        }
        let Some(mut records) = self.load_for_write() else {
            return false;
        };
        if records
            .iter()
            .any(|record| identity_of(User::KIND, record) == Some(user.email.as_str()))
        {
            return false;
        }
        let document = match to_document(&user) {
            Ok(document) => document,
            Err(err) => {
                event!(Level::ERROR, error = %err, "failed to encode new user");
                return false;
            }
        };
        records.push(Value::Object(document));
        self.store.persist(User::KIND, &records);
        true
    }
}
