pub mod save;

pub use save::{SaveAck, SavedSnapshot, router, serve};
