pub mod degrade;
pub mod engine;
pub mod file;
pub mod memory;

pub use degrade::{DegradationStats, DegradingWriter, WriteOutcome};
pub use engine::{KeyValueStore, StorageUsage};
pub use file::FileStorage;
pub use memory::InMemoryStorage;
