// ============================================================================
// crm_store Library
// ============================================================================

pub mod auth;
pub mod config;
pub mod core;
pub mod model;
pub mod server;
pub mod storage;
pub mod store;
pub mod sync;
pub mod web;

// Re-export main types for convenience
pub use auth::AuthService;
pub use config::{MirrorConfig, SaveServerConfig, StoreConfig};
pub use core::{Result, StoreError, new_id};
pub use model::{
    CollectionKind, CollectionSet, Document, Entity, Institution, InstitutionPatch, Program,
    ProgramPatch, Role, Snapshot, User, UserPatch,
};
pub use storage::{
    DegradationStats, DegradingWriter, FileStorage, InMemoryStorage, KeyValueStore, StorageUsage,
    WriteOutcome,
};
pub use store::{Collection, EntityStore};
pub use sync::{HttpMirror, MirrorSink, NoopMirror};
