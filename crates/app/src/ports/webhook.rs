//! Webhook port: fire-and-forget HTTP GET.

use async_trait::async_trait;

use vigil_domain::error::VigilError;

#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Perform a GET on `url`, reading and discarding the body.
    async fn get(&self, url: &str) -> Result<(), VigilError>;
}
