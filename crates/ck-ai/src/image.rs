//! Text-to-image client (ClipDrop-compatible API).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use tracing::{debug, info_span, Instrument};

use crate::error::{UpstreamError, UpstreamResult};
use crate::metrics::record_upstream_request;

const DEFAULT_API_URL: &str = "https://clipdrop-api.co/text-to-image/v1";

/// Image generation backend.
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Generate a PNG image for the prompt.
    async fn generate(&self, prompt: &str) -> UpstreamResult<Vec<u8>>;
}

/// ClipDrop configuration.
#[derive(Debug, Clone)]
pub struct ClipdropConfig {
    pub api_key: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl ClipdropConfig {
    /// Create config from environment variables.
    pub fn from_env() -> UpstreamResult<Self> {
        let api_key = std::env::var("CLIPDROP_API_KEY")
            .map_err(|_| UpstreamError::config("CLIPDROP_API_KEY not set"))?;

        Ok(Self {
            api_key,
            api_url: std::env::var("CLIPDROP_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(90),
        })
    }

    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            timeout: Duration::from_secs(90),
        }
    }
}

/// ClipDrop text-to-image client.
#[derive(Clone)]
pub struct ClipdropClient {
    http: Client,
    config: ClipdropConfig,
}

impl ClipdropClient {
    pub fn new(config: ClipdropConfig) -> UpstreamResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> UpstreamResult<Self> {
        Self::new(ClipdropConfig::from_env()?)
    }

    async fn send(&self, prompt: &str) -> UpstreamResult<Vec<u8>> {
        let form = Form::new().text("prompt", prompt.to_string());

        let response = self
            .http
            .post(&self.config.api_url)
            .header("x-api-key", &self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_http_status(status.as_u16(), text));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(UpstreamError::invalid_response("empty image body"));
        }

        debug!(bytes = bytes.len(), "Image received");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageClient for ClipdropClient {
    async fn generate(&self, prompt: &str) -> UpstreamResult<Vec<u8>> {
        let span = info_span!("image_request", prompt_chars = prompt.len());

        let start = Instant::now();
        let result = self.send(prompt).instrument(span).await;
        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_upstream_request("clipdrop", status, start.elapsed().as_millis() as f64);

        result
    }
}
