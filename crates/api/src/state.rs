use std::sync::Arc;

use tokio::sync::RwLock;
use worker::Integration;

/// The loaded integration, if any. Emptied on shutdown so the receiver
/// stops answering for its id.
#[derive(Clone)]
pub struct AppState {
    pub integration: Arc<RwLock<Option<Integration>>>,
}

impl AppState {
    pub fn new(integration: Integration) -> Self {
        Self {
            integration: Arc::new(RwLock::new(Some(integration))),
        }
    }

    pub async fn unload(&self) -> Option<Integration> {
        self.integration.write().await.take()
    }
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);
