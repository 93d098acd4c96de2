use crate::core::{Result, StoreError};

/// Key-value persistence boundary - allows pluggable storage backends.
///
/// Mirrors the semantics of browser local storage: string keys, string
/// values, a shared byte budget across all keys, and writes that either land
/// completely or fail without touching the previous value.
pub trait KeyValueStore: Send + Sync {
    /// Read a key; `None` when it was never written or has been removed.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value of a key. Fails with [`StoreError::QuotaExceeded`]
    /// when the new value does not fit.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Bytes in use and the configured budget.
    fn usage(&self) -> Result<StorageUsage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageUsage {
    pub used_bytes: usize,
    pub quota_bytes: Option<usize>,
}

/// Footprint of one entry, counted the way browsers count it: key plus value.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Verify that writing `value` under `key` fits the budget, given the bytes
/// used by every *other* entry.
pub(crate) fn check_quota(
    key: &str,
    value: &str,
    used_by_others: usize,
    quota: Option<usize>,
) -> Result<()> {
    let Some(quota) = quota else { return Ok(()) };
    let requested = entry_size(key, value);
    let available = quota.saturating_sub(used_by_others);
    if requested > available {
        return Err(StoreError::QuotaExceeded {
            key: key.to_string(),
            requested,
            available,
        });
    }
    Ok(())
}
