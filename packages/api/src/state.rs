// ABOUTME: Shared application state for the HTTP handlers
// ABOUTME: Holds the compile service and the mutable process-wide build defaults

use buildbox_sandbox::{BuildDefaults, CompileService};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CompileService>,
    pub defaults: Arc<RwLock<BuildDefaults>>,
}

impl AppState {
    pub fn new(service: CompileService, defaults: BuildDefaults) -> Self {
        Self {
            service: Arc::new(service),
            defaults: Arc::new(RwLock::new(defaults)),
        }
    }

    /// Copy of the current defaults. The lock is released before returning.
    pub async fn defaults_snapshot(&self) -> BuildDefaults {
        *self.defaults.read().await
    }
}
