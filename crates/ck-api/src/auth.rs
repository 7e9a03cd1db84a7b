//! Session token authentication.
//!
//! Session tokens are RS256 JWTs issued by the identity provider and
//! verified against its JWKS. The verified token becomes a
//! [`CallerContext`], which handlers take as an extractor.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use ck_models::Plan;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// JWKS cache TTL.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600); // 1 hour

/// Minimum spacing between refresh attempts, successful or not.
const JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub caller_id: String,
    pub plan: Plan,
}

impl CallerContext {
    pub fn new(caller_id: impl Into<String>, plan: Plan) -> Self {
        Self {
            caller_id: caller_id.into(),
            plan,
        }
    }

    pub fn is_premium(&self) -> bool {
        self.plan.is_premium()
    }
}

/// Verifies a bearer token and produces the caller it identifies.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> ApiResult<CallerContext>;
}

/// Claims read from a session token.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    /// Expiration
    pub exp: i64,
    /// Active plan, e.g. `u:premium`
    #[serde(default)]
    pub pla: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

impl SessionClaims {
    pub fn plan(&self) -> Plan {
        self.pla
            .as_deref()
            .or(self.plan.as_deref())
            .map(Plan::from_claim)
            .unwrap_or_default()
    }
}

impl From<SessionClaims> for CallerContext {
    fn from(claims: SessionClaims) -> Self {
        let plan = claims.plan();
        Self {
            caller_id: claims.sub,
            plan,
        }
    }
}

/// Token verification settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWKS endpoint of the identity provider
    pub jwks_url: String,
    /// Expected `iss`, if enforced
    pub issuer: Option<String>,
}

impl AuthConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ApiResult<Self> {
        let jwks_url = std::env::var("AUTH_JWKS_URL")
            .map_err(|_| ApiError::internal("AUTH_JWKS_URL not set"))?;

        Ok(Self {
            jwks_url,
            issuer: std::env::var("AUTH_ISSUER").ok().filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

#[derive(Debug, Deserialize)]
struct JwkKey {
    kid: Option<String>,
    #[serde(default)]
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

/// Cached JWKS keys.
pub struct JwksCache {
    http: Client,
    config: AuthConfig,
    keys: RwLock<HashMap<String, DecodingKey>>,
    last_refresh: RwLock<Option<Instant>>,
    last_attempt: RwLock<Option<Instant>>,
    min_refresh_interval: Duration,
}

impl JwksCache {
    /// Create a cache and load the current key set.
    pub async fn new(config: AuthConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::internal(format!("JWKS client: {}", e)))?;

        let cache = Self {
            http,
            config,
            keys: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
            last_attempt: RwLock::new(None),
            min_refresh_interval: JWKS_MIN_REFRESH_INTERVAL,
        };
        cache.refresh_keys().await?;

        Ok(cache)
    }

    /// Override the minimum spacing between refresh attempts.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    async fn refresh_keys(&self) -> ApiResult<()> {
        debug!(url = %self.config.jwks_url, "Refreshing JWKS keys");
        *self.last_attempt.write().await = Some(Instant::now());

        let jwks: JwksResponse = self
            .http
            .get(&self.config.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::internal(format!("JWKS fetch failed: {}", e)))?
            .json()
            .await
            .map_err(|e| ApiError::internal(format!("JWKS parse failed: {}", e)))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys.into_iter().filter(|k| k.kty == "RSA") {
            let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
                continue;
            };
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(err) => warn!(kid = %kid, "Skipping unusable JWK: {}", err),
            }
        }

        debug!("Refreshed {} JWKS keys", keys.len());
        *self.keys.write().await = keys;
        *self.last_refresh.write().await = Some(Instant::now());
        Ok(())
    }

    async fn get_key(&self, kid: &str) -> Option<DecodingKey> {
        let age = self.last_refresh.read().await.map(|t| t.elapsed());
        let since_attempt = self.last_attempt.read().await.map(|t| t.elapsed());
        let known = self.keys.read().await.contains_key(kid);

        // Refresh on expiry, or early when the token names a key we lack.
        // Failed attempts count toward the spacing; cached keys keep serving.
        let stale = age.map_or(true, |a| a > JWKS_CACHE_TTL);
        let due = since_attempt.map_or(true, |a| a > self.min_refresh_interval);
        if (stale || !known) && due {
            if let Err(e) = self.refresh_keys().await {
                warn!("Failed to refresh JWKS keys: {}", e);
            }
        }

        self.keys.read().await.get(kid).cloned()
    }
}

#[async_trait]
impl TokenVerifier for JwksCache {
    async fn verify(&self, token: &str) -> ApiResult<CallerContext> {
        let header = decode_header(token)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token header: {}", e)))?;

        let kid = header
            .kid
            .ok_or_else(|| ApiError::unauthorized("Token missing key ID"))?;

        let key = self
            .get_key(&kid)
            .await
            .ok_or_else(|| ApiError::unauthorized("Unknown key ID"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<SessionClaims>(token, &key, &validation)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))?;

        Ok(token_data.claims.into())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CallerContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::unauthorized("Missing bearer token"))?;

        state.auth.verify(bearer.token()).await
    }
}
