//! Application state.

use std::sync::Arc;

use anyhow::Context;
use ck_ai::{ClipdropClient, CompletionClient, ImageClient, OpenRouterClient, RetryPolicy};
use ck_identity::{CreditStore, IdentityClient, MetadataStore};
use ck_store::{CreationStore, MemoryCreationStore, PgCreationStore, StoreConfig};
use tracing::{info, warn};

use crate::auth::{AuthConfig, JwksCache, TokenVerifier};
use crate::config::ApiConfig;
use crate::services::{CreditGate, GenerationService};

/// External collaborators the server is built on.
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn TokenVerifier>,
    pub metadata: Arc<dyn MetadataStore>,
    pub creations: Arc<dyn CreationStore>,
    pub completions: Arc<dyn CompletionClient>,
    pub images: Arc<dyn ImageClient>,
}

impl Backends {
    /// Connect to every collaborator configured in the environment.
    ///
    /// Without `DATABASE_URL` creations are kept in memory.
    pub async fn from_env() -> anyhow::Result<Self> {
        let auth_config = AuthConfig::from_env()?;
        let auth = JwksCache::new(auth_config)
            .await
            .context("Failed to load JWKS")?;

        let metadata = IdentityClient::from_env().context("Failed to create identity client")?;

        let creations: Arc<dyn CreationStore> = match StoreConfig::from_env()? {
            Some(config) => Arc::new(
                PgCreationStore::connect(&config)
                    .await
                    .context("Failed to connect to creation database")?,
            ),
            None => {
                warn!("DATABASE_URL not set, creations are kept in memory and lost on restart");
                Arc::new(MemoryCreationStore::new())
            }
        };

        let completions =
            OpenRouterClient::from_env().context("Failed to create completion client")?;
        let images = ClipdropClient::from_env().context("Failed to create image client")?;

        info!("Backends initialized");

        Ok(Self {
            auth: Arc::new(auth),
            metadata: Arc::new(metadata),
            creations,
            completions: Arc::new(completions),
            images: Arc::new(images),
        })
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub auth: Arc<dyn TokenVerifier>,
    pub credits: CreditGate,
    pub creations: Arc<dyn CreationStore>,
    pub generation: GenerationService,
}

impl AppState {
    pub fn new(config: ApiConfig, backends: Backends) -> Self {
        let credits = CreditGate::new(CreditStore::new(backends.metadata));
        let generation = GenerationService::new(
            backends.completions,
            backends.images,
            Arc::clone(&backends.creations),
            credits.clone(),
            config.credit_costs,
        );

        Self {
            config,
            auth: backends.auth,
            credits,
            creations: backends.creations,
            generation,
        }
    }

    /// Create application state from the environment.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let backends = Backends::from_env().await?;
        Ok(Self::new(config, backends))
    }

    /// Override the upstream retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.generation = self.generation.with_retry_policy(retry);
        self
    }
}
