//! Fire-and-forget mirror over HTTP.

use super::mirror::MirrorSink;
use crate::config::MirrorConfig;
use crate::core::{Result, StoreError};
use crate::model::Snapshot;
use tokio::runtime::Handle;
use tracing::{Level, event};

/// POSTs each snapshot as JSON to the save endpoint on a detached task.
pub struct HttpMirror {
    client: reqwest::Client,
    endpoint: String,
    runtime: Option<Handle>,
}

impl HttpMirror {
    /// Build a mirror bound to the current tokio runtime, if there is one.
    /// Without a runtime every push is dropped.
    pub fn new(config: &MirrorConfig) -> Result<Self> {
        Self::with_runtime(config, Handle::try_current().ok())
    }

    pub fn with_runtime(config: &MirrorConfig, runtime: Option<Handle>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            runtime,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl MirrorSink for HttpMirror {
    fn push(&self, snapshot: Snapshot) {
        let Some(runtime) = &self.runtime else {
            event!(Level::DEBUG, "no async runtime available, mirror push dropped");
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        // Detached: the handle is dropped and the outcome only logged.
        drop(runtime.spawn(async move {
            match client.post(&endpoint).json(&snapshot).send().await {
                Ok(response) if response.status().is_success() => {
                    event!(Level::DEBUG, endpoint = %endpoint, "mirror snapshot delivered");
                }
                Ok(response) => {
                    event!(
                        Level::DEBUG,
                        endpoint = %endpoint,
                        status = %response.status(),
                        "mirror endpoint rejected snapshot"
                    );
                }
                Err(err) => {
                    event!(Level::DEBUG, endpoint = %endpoint, error = %err, "mirror push failed");
                }
            }
        }));
    }
}
