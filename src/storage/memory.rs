use super::engine::{KeyValueStore, StorageUsage, check_quota, entry_size};
use crate::core::{Result, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory key-value store with an optional byte budget.
///
/// Besides serving as the default backend for tests, it can be told to reject
/// upcoming writes with a capacity failure, which is how the degradation path
/// is exercised without filling a real quota.
pub struct InMemoryStorage {
    quota: Option<usize>,
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, String>,
    /// Number of upcoming `set` calls to reject.
    fail_next: usize,
    fail_all: bool,
    /// Successful `set` calls.
    writes: usize,
    /// Every `set` call, including rejected ones.
    attempts: usize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            quota: None,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Enforce a total budget (keys plus values, in bytes).
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota: Some(quota_bytes),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Reject the next `count` writes with a capacity failure.
    pub fn fail_next_writes(&self, count: usize) -> Result<()> {
        self.state.lock()?.fail_next = count;
        Ok(())
    }

    /// Reject every write with a capacity failure until switched off.
    pub fn fail_all_writes(&self, fail: bool) -> Result<()> {
        self.state.lock()?.fail_all = fail;
        Ok(())
    }

    pub fn write_count(&self) -> Result<usize> {
        Ok(self.state.lock()?.writes)
    }

    pub fn attempt_count(&self) -> Result<usize> {
        Ok(self.state.lock()?.attempts)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.lock()?.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        state.attempts += 1;

        if state.fail_all || state.fail_next > 0 {
            state.fail_next = state.fail_next.saturating_sub(1);
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                requested: entry_size(key, value),
                available: 0,
            });
        }

        let used_by_others: usize = state
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_size(k, v))
            .sum();
        check_quota(key, value, used_by_others, self.quota)?;

        state.entries.insert(key.to_string(), value.to_string());
        state.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.state.lock()?.entries.remove(key);
        Ok(())
    }

    fn usage(&self) -> Result<StorageUsage> {
        let state = self.state.lock()?;
        Ok(StorageUsage {
            used_bytes: state.entries.iter().map(|(k, v)| entry_size(k, v)).sum(),
            quota_bytes: self.quota,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.get("a").unwrap(), None);
        storage.set("a", "1").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        storage.remove("a").unwrap();
        storage.remove("a").unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
    }

    #[test]
    fn test_quota_counts_other_keys_only() {
        let storage = InMemoryStorage::with_quota(10);
        storage.set("a", "1234").unwrap(); // 5 bytes
        storage.set("a", "12345678").unwrap(); // replaces itself: 9 bytes
        let err = storage.set("b", "12").unwrap_err();
        assert!(err.is_capacity());
        assert_eq!(storage.get("b").unwrap(), None);
        assert_eq!(storage.usage().unwrap().used_bytes, 9);
    }

    #[test]
    fn test_injected_failures_leave_value_untouched() {
        let storage = InMemoryStorage::new();
        storage.set("k", "old").unwrap();
        storage.fail_next_writes(2).unwrap();
        assert!(storage.set("k", "new").unwrap_err().is_capacity());
        assert!(storage.set("k", "new").unwrap_err().is_capacity());
        storage.set("k", "new").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("new"));
        assert_eq!(storage.write_count().unwrap(), 2);
        assert_eq!(storage.attempt_count().unwrap(), 4);

        storage.fail_all_writes(true).unwrap();
        assert!(storage.set("k", "newer").is_err());
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("new"));
    }
}
