pub mod document;
pub mod institution;
pub mod kind;
pub mod lenient;
pub mod program;
pub mod snapshot;
pub mod user;

pub use document::{Document, to_document};
pub use institution::{Institution, InstitutionPatch};
pub use kind::CollectionKind;
pub use program::{Program, ProgramPatch};
pub use snapshot::{CollectionSet, Snapshot};
pub use user::{Role, User, UserPatch};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A typed view over the records of one collection.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const KIND: CollectionKind;
}
