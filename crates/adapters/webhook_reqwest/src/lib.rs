//! # vigil-adapter-webhook-reqwest
//!
//! [`WebhookClient`] implementation backed by [reqwest](https://docs.rs/reqwest).
//!
//! A webhook notification is a plain GET: the body is read and discarded,
//! a non-success status is reported as an error.

use std::time::Duration;

use async_trait::async_trait;

use vigil_app::ports::WebhookClient;
use vigil_domain::error::VigilError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while calling a webhook.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("unable to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl From<WebhookError> for VigilError {
    fn from(err: WebhookError) -> Self {
        VigilError::evaluation(err)
    }
}

/// Configuration of the webhook client.
#[derive(Debug, Clone)]
pub struct Config {
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// # Errors
    ///
    /// Returns [`WebhookError::Client`] when the TLS backend cannot be initialised.
    pub fn build(self) -> Result<ReqwestWebhookClient, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(WebhookError::Client)?;
        Ok(ReqwestWebhookClient { client })
    }
}

/// Webhook client sharing one connection pool across calls.
#[derive(Debug, Clone)]
pub struct ReqwestWebhookClient {
    client: reqwest::Client,
}

impl ReqwestWebhookClient {
    async fn call(&self, url: &str) -> Result<(), reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        tracing::debug!(url, bytes = body.len(), "webhook answered");
        Ok(())
    }
}

#[async_trait]
impl WebhookClient for ReqwestWebhookClient {
    async fn get(&self, url: &str) -> Result<(), VigilError> {
        self.call(url).await.map_err(|source| WebhookError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(())
    }
}
