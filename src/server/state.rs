use crate::api::WebhookClient;
use crate::config::Config;
use std::sync::Arc;

/// Shared by all relay handlers; read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub webhook: Arc<WebhookClient>,
}

impl AppState {
    pub fn new(webhook: WebhookClient) -> Self {
        Self {
            webhook: Arc::new(webhook),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(WebhookClient::new(config))
    }
}
