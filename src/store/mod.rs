pub mod collection;
pub mod entity_store;

pub use collection::{Collection, GeneratedId};
pub use entity_store::EntityStore;
