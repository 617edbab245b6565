use std::sync::Arc;

use credseal_core::{Orchestrator, SigningConfig, SigningTool};

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub public_url: Arc<str>,
}

impl AppState {
    pub fn new(signing: SigningConfig, public_url: &str, tool: Arc<dyn SigningTool>) -> Self {
        Self {
            orchestrator: Arc::new(Orchestrator::new(Arc::new(signing), tool)),
            public_url: Arc::from(public_url.trim_end_matches('/')),
        }
    }

    pub fn config(&self) -> &SigningConfig {
        self.orchestrator.config()
    }

    /// Public download URL of a file in the output directory
    pub fn file_url(&self, filename: &str) -> String {
        format!("{}/api/v1/files/{filename}", self.public_url)
    }
}
