pub mod http;
pub mod mirror;

pub use http::HttpMirror;
pub use mirror::{MirrorSink, NoopMirror, sanitize_snapshot};
