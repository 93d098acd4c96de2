pub mod error;
pub mod id;

pub use error::{Result, StoreError};
pub use id::{is_valid_id, new_id};
