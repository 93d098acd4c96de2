use crate::core::{Result, StoreError};
use crate::storage::degrade::DEFAULT_MAX_RECORDS_ON_DEGRADE;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Budget browsers give local storage per origin.
pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

pub const DEFAULT_MIRROR_ENDPOINT: &str = "http://localhost:3001/save-json";

pub const DEFAULT_SAVE_SERVER_PORT: u16 = 3001;

/// Body ceiling of the save endpoint.
pub const DEFAULT_SAVE_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Entity store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one file per collection key
    pub data_dir: PathBuf,

    /// Total storage budget; `None` for unlimited
    pub quota_bytes: Option<usize>,

    /// Records kept when a write must be truncated to fit
    pub max_records_on_degrade: usize,

    /// Best-effort disk mirror
    pub mirror: MirrorConfig,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            quota_bytes: Some(DEFAULT_STORAGE_QUOTA_BYTES),
            max_records_on_degrade: DEFAULT_MAX_RECORDS_ON_DEGRADE,
            mirror: MirrorConfig::default(),
        }
    }

    /// Set the storage budget
    pub fn quota_bytes(mut self, quota: Option<usize>) -> Self {
        self.quota_bytes = quota;
        self
    }

    /// Set how many records survive a truncating write
    pub fn max_records_on_degrade(mut self, max: usize) -> Self {
        self.max_records_on_degrade = max;
        self
    }

    pub fn mirror(mut self, mirror: MirrorConfig) -> Self {
        self.mirror = mirror;
        self
    }

    /// Read configuration from the environment.
    ///
    /// - `CRM_DATA_DIR` (default `.crm-data`)
    /// - `CRM_STORAGE_QUOTA_BYTES` (`0` disables the budget)
    /// - `CRM_MAX_RECORDS_ON_DEGRADE`
    /// - `CRM_MIRROR_ENABLED`, `CRM_MIRROR_URL`, `CRM_MIRROR_TIMEOUT_MS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(env_string("CRM_DATA_DIR", ".crm-data"));

        if let Some(quota) = env_parse::<usize>("CRM_STORAGE_QUOTA_BYTES")? {
            config.quota_bytes = (quota > 0).then_some(quota);
        }
        if let Some(max) = env_parse::<usize>("CRM_MAX_RECORDS_ON_DEGRADE")? {
            config.max_records_on_degrade = max;
        }
        config.mirror = MirrorConfig::from_env()?;
        Ok(config)
    }
}

/// Where and how snapshots are mirrored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Transport timeout; the store itself never waits on the mirror
    pub timeout: Option<Duration>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_MIRROR_ENDPOINT.to_string(),
            timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl MirrorConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(enabled) = env_parse::<bool>("CRM_MIRROR_ENABLED")? {
            config.enabled = enabled;
        }
        if let Ok(url) = std::env::var("CRM_MIRROR_URL") {
            config.endpoint = url;
        }
        if let Some(ms) = env_parse::<u64>("CRM_MIRROR_TIMEOUT_MS")? {
            config.timeout = Some(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

/// Settings of the save server that receives mirrored snapshots
#[derive(Debug, Clone)]
pub struct SaveServerConfig {
    pub bind_addr: SocketAddr,
    /// File overwritten with every received snapshot
    pub out_file: PathBuf,
    pub body_limit_bytes: usize,
}

impl Default for SaveServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_SAVE_SERVER_PORT)),
            out_file: PathBuf::from("data").join("crm-data.json"),
            body_limit_bytes: DEFAULT_SAVE_BODY_LIMIT_BYTES,
        }
    }
}

impl SaveServerConfig {
    pub fn out_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_file = path.into();
        self
    }

    /// `SAVE_SERVER_PORT`, `SAVE_SERVER_HOST` and `SAVE_SERVER_OUT_FILE`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        let port = env_parse::<u16>("SAVE_SERVER_PORT")?.unwrap_or(DEFAULT_SAVE_SERVER_PORT);
        let host = env_string("SAVE_SERVER_HOST", "127.0.0.1");
        config.bind_addr = format!("{host}:{port}").parse::<SocketAddr>().map_err(|e| {
            StoreError::Config(format!("SAVE_SERVER_HOST/PORT must form a valid host:port: {e}"))
        })?;
        if let Ok(path) = std::env::var("SAVE_SERVER_OUT_FILE") {
            config.out_file = PathBuf::from(path);
        }
        Ok(config)
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| StoreError::Config(format!("{key} is invalid: {e}"))),
        Err(_) => Ok(None),
    }
}
