//! Identity provider REST client.
//!
//! Talks to the provider's backend API:
//! - `GET {base}/users/{id}` for the user record
//! - `PATCH {base}/users/{id}/metadata` for private metadata writes
//!
//! Requests are authenticated with the backend secret key and wrapped in
//! tracing spans and request metrics.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tracing::{debug, info_span, Instrument};

use crate::error::{IdentityError, IdentityResult};
use crate::metrics::record_request;
use crate::types::{Metadata, UpdateMetadataRequest, UserRecord};

/// Default identity provider backend API.
const DEFAULT_API_URL: &str = "https://api.clerk.com/v1";

// =============================================================================
// Configuration
// =============================================================================

/// Identity client configuration.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Backend API base URL (no trailing slash)
    pub api_url: String,
    /// Backend secret key
    pub secret_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl IdentityConfig {
    /// Create config from environment variables.
    pub fn from_env() -> IdentityResult<Self> {
        let secret_key = std::env::var("IDENTITY_SECRET_KEY")
            .map_err(|_| IdentityError::config("IDENTITY_SECRET_KEY must be set"))?;

        if secret_key.trim().is_empty() {
            return Err(IdentityError::config("IDENTITY_SECRET_KEY cannot be empty"));
        }

        let timeout_secs: u64 = std::env::var("IDENTITY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            api_url: std::env::var("IDENTITY_API_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            secret_key,
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(5),
        })
    }

    pub fn new(api_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Identity provider REST API client.
#[derive(Clone)]
pub struct IdentityClient {
    http: Client,
    config: IdentityConfig,
}

impl IdentityClient {
    /// Create a new identity client.
    pub fn new(config: IdentityConfig) -> IdentityResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("ck-identity/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(IdentityError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> IdentityResult<Self> {
        Self::new(IdentityConfig::from_env()?)
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.config.api_url, urlencoding::encode(user_id))
    }

    /// Fetch a user record.
    pub async fn get_user(&self, user_id: &str) -> IdentityResult<UserRecord> {
        let url = self.user_url(user_id);

        self.execute_request("get_user", user_id, async {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.config.secret_key)
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let user: UserRecord = response.json().await?;
                    Ok(user)
                }
                status => Err(Self::handle_error_response(status, response).await),
            }
        })
        .await
    }

    /// Replace a user's private metadata.
    pub async fn update_private_metadata(
        &self,
        user_id: &str,
        metadata: &Metadata,
    ) -> IdentityResult<()> {
        let url = format!("{}/metadata", self.user_url(user_id));
        let body = UpdateMetadataRequest {
            private_metadata: metadata,
        };

        self.execute_request("update_metadata", user_id, async {
            let response = self
                .http
                .patch(&url)
                .bearer_auth(&self.config.secret_key)
                .json(&body)
                .send()
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => {
                    debug!(user_id = %user_id, "Updated private metadata");
                    Ok(())
                }
                status => Err(Self::handle_error_response(status, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        user_id: &str,
        fut: F,
    ) -> IdentityResult<T>
    where
        F: std::future::Future<Output = IdentityResult<T>>,
    {
        let span = info_span!("identity_request", operation = %operation, user_id = %user_id);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(
        status: StatusCode,
        response: reqwest::Response,
    ) -> IdentityError {
        let body = response.text().await.unwrap_or_default();
        IdentityError::from_http_status(status.as_u16(), body)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> IdentityClient {
        IdentityClient::new(IdentityConfig::new(server.uri(), "sk_test")).unwrap()
    }

    #[test]
    #[serial]
    fn test_config_requires_secret_key() {
        std::env::remove_var("IDENTITY_SECRET_KEY");
        assert!(IdentityConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_config_default_values() {
        std::env::set_var("IDENTITY_SECRET_KEY", "sk_test");
        std::env::remove_var("IDENTITY_API_URL");
        std::env::remove_var("IDENTITY_TIMEOUT_SECS");
        let config = IdentityConfig::from_env().unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        std::env::remove_var("IDENTITY_SECRET_KEY");
    }

    #[tokio::test]
    async fn test_get_user_parses_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/user_1"))
            .and(header("authorization", "Bearer sk_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user_1",
                "private_metadata": {"credits": 4},
                "public_metadata": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = client_for(&server).await.get_user("user_1").await.unwrap();
        assert_eq!(user.id, "user_1");
        assert_eq!(user.credits(), Some(4));
    }

    #[tokio::test]
    async fn test_get_user_maps_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.get_user("ghost").await.unwrap_err();
        assert!(matches!(err, IdentityError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_user_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).await.get_user("user_1").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_update_metadata_sends_private_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/users/user_1/metadata"))
            .and(body_json(json!({"private_metadata": {"credits": 19, "theme": "dark"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "user_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut metadata = Metadata::new();
        metadata.insert("credits".to_string(), json!(19));
        metadata.insert("theme".to_string(), json!("dark"));

        client_for(&server)
            .await
            .update_private_metadata("user_1", &metadata)
            .await
            .unwrap();
    }
}
