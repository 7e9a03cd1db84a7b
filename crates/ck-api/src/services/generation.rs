//! Generation pipeline.
//!
//! Every feature runs the same sequence: check credits, build the prompt,
//! call upstream through the retry wrapper, normalize, persist, charge.
//! Nothing is persisted or charged unless normalization succeeds.

use std::sync::Arc;

use ck_ai::normalize::{normalize_description, normalize_script, normalize_titles, to_data_uri};
use ck_ai::prompts::{
    build_description_prompt, build_script_prompt, build_thumbnail_prompt, build_title_prompt,
};
use ck_ai::{
    retry_with_backoff, CompletionClient, CompletionRequest, ImageClient, RetryPolicy,
    UpstreamError, UpstreamResult,
};
use ck_models::{
    Balance, CreationContent, CreditCosts, DescriptionRequest, NewCreation, ScriptRequest,
    ThumbnailRequest, TitleRequest,
};
use ck_store::CreationStore;
use serde::Serialize;
use tracing::{debug, info};
use validator::Validate;

use crate::auth::CallerContext;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::CreditGate;

const TITLE_MAX_TOKENS: u32 = 200;
const DESCRIPTION_MAX_TOKENS: u32 = 600;
const SCRIPT_MAX_TOKENS: u32 = 900;

const NO_CREDITS_MESSAGE: &str = "No credits left";

/// Successful generation response.
#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub success: bool,
    pub content: CreationContent,
    #[serde(rename = "remainingCredits")]
    pub remaining_credits: Balance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    Titles,
    Description,
    Script,
    Thumbnail,
}

impl Feature {
    fn as_str(&self) -> &'static str {
        match self {
            Feature::Titles => "titles",
            Feature::Description => "description",
            Feature::Script => "script",
            Feature::Thumbnail => "thumbnail",
        }
    }
}

/// Runs the generation features.
#[derive(Clone)]
pub struct GenerationService {
    completions: Arc<dyn CompletionClient>,
    images: Arc<dyn ImageClient>,
    creations: Arc<dyn CreationStore>,
    credits: CreditGate,
    retry: RetryPolicy,
    costs: CreditCosts,
}

impl GenerationService {
    pub fn new(
        completions: Arc<dyn CompletionClient>,
        images: Arc<dyn ImageClient>,
        creations: Arc<dyn CreationStore>,
        credits: CreditGate,
        costs: CreditCosts,
    ) -> Self {
        Self {
            completions,
            images,
            creations,
            credits,
            retry: RetryPolicy::default(),
            costs,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn titles(
        &self,
        caller: &CallerContext,
        req: TitleRequest,
    ) -> ApiResult<GenerationResponse> {
        let feature = Feature::Titles;
        let cost = self.costs.text;
        self.precheck(caller, feature, cost, NO_CREDITS_MESSAGE).await?;

        let prompt = self.validated(feature, &req, build_title_prompt)?;
        let raw = self.complete(feature, &prompt, TITLE_MAX_TOKENS).await?;
        let titles = self.normalized(feature, &raw, normalize_titles)?;

        self.finish(caller, feature, cost, &req.topic, CreationContent::Titles(titles))
            .await
    }

    pub async fn description(
        &self,
        caller: &CallerContext,
        req: DescriptionRequest,
    ) -> ApiResult<GenerationResponse> {
        let feature = Feature::Description;
        let cost = self.costs.text;
        self.precheck(caller, feature, cost, NO_CREDITS_MESSAGE).await?;

        let prompt = self.validated(feature, &req, build_description_prompt)?;
        let raw = self.complete(feature, &prompt, DESCRIPTION_MAX_TOKENS).await?;
        let description = self.normalized(feature, &raw, normalize_description)?;

        self.finish(
            caller,
            feature,
            cost,
            &req.topic,
            CreationContent::Description(description),
        )
        .await
    }

    pub async fn script(
        &self,
        caller: &CallerContext,
        req: ScriptRequest,
    ) -> ApiResult<GenerationResponse> {
        let feature = Feature::Script;
        let cost = self.costs.text;
        self.precheck(caller, feature, cost, NO_CREDITS_MESSAGE).await?;

        let prompt = self.validated(feature, &req, build_script_prompt)?;
        let raw = self.complete(feature, &prompt, SCRIPT_MAX_TOKENS).await?;
        let script = self.normalized(feature, &raw, normalize_script)?;

        self.finish(caller, feature, cost, &req.topic, CreationContent::Script(script))
            .await
    }

    pub async fn thumbnail(
        &self,
        caller: &CallerContext,
        req: ThumbnailRequest,
    ) -> ApiResult<GenerationResponse> {
        let feature = Feature::Thumbnail;
        let cost = self.costs.thumbnail;
        let message = format!(
            "Insufficient credits. Thumbnail generation requires {} credits.",
            cost
        );
        self.precheck(caller, feature, cost, message).await?;

        let prompt = self.validated(feature, &req, build_thumbnail_prompt)?;
        let images = Arc::clone(&self.images);
        let png = self
            .upstream(feature, || {
                let images = Arc::clone(&images);
                let prompt = prompt.clone();
                async move { images.generate(&prompt).await }
            })
            .await?;

        if png.is_empty() {
            metrics::record_generation(feature.as_str(), "upstream_failed");
            return Err(UpstreamError::invalid_response("empty image").into());
        }

        self.finish(
            caller,
            feature,
            cost,
            &req.prompt,
            CreationContent::Thumbnail(to_data_uri(&png)),
        )
        .await
    }

    async fn precheck(
        &self,
        caller: &CallerContext,
        feature: Feature,
        cost: i64,
        message: impl Into<String>,
    ) -> ApiResult<Balance> {
        self.credits
            .ensure(caller, cost, message)
            .await
            .inspect_err(|_| metrics::record_generation(feature.as_str(), "insufficient_credits"))
    }

    fn validated<R, F, E>(&self, feature: Feature, req: &R, build: F) -> ApiResult<String>
    where
        R: Validate,
        F: FnOnce(&R) -> Result<String, E>,
        ApiError: From<E>,
    {
        if let Err(e) = req.validate() {
            metrics::record_generation(feature.as_str(), "invalid_input");
            return Err(e.into());
        }

        build(req)
            .map_err(ApiError::from)
            .inspect_err(|_| metrics::record_generation(feature.as_str(), "invalid_input"))
    }

    async fn complete(&self, feature: Feature, prompt: &str, max_tokens: u32) -> ApiResult<String> {
        let request = CompletionRequest::new(prompt, max_tokens);
        let completions = Arc::clone(&self.completions);
        self.upstream(feature, || {
            let completions = Arc::clone(&completions);
            let request = request.clone();
            async move { completions.complete(&request).await }
        })
        .await
    }

    async fn upstream<T, F, Fut>(&self, feature: Feature, call: F) -> ApiResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = UpstreamResult<T>>,
    {
        retry_with_backoff(&self.retry, call).await.map_err(|e| {
            debug!(feature = feature.as_str(), retries = self.retry.retries, "Upstream gave up");
            metrics::record_generation(feature.as_str(), "upstream_failed");
            ApiError::from(e)
        })
    }

    fn normalized<T, E>(
        &self,
        feature: Feature,
        raw: &str,
        normalize: impl FnOnce(&str) -> Result<T, E>,
    ) -> ApiResult<T>
    where
        ApiError: From<E>,
    {
        normalize(raw).map_err(|e| {
            debug!(feature = feature.as_str(), raw_len = raw.len(), "Unusable upstream output");
            metrics::record_generation(feature.as_str(), "parse_failed");
            ApiError::from(e)
        })
    }

    async fn finish(
        &self,
        caller: &CallerContext,
        feature: Feature,
        cost: i64,
        prompt: &str,
        content: CreationContent,
    ) -> ApiResult<GenerationResponse> {
        let creation = self
            .creations
            .insert(NewCreation::new(&caller.caller_id, prompt, content))
            .await?;

        let remaining_credits = self.credits.charge(caller, cost, feature.as_str()).await;

        info!(
            user_id = %caller.caller_id,
            creation_id = %creation.id,
            feature = feature.as_str(),
            "Generation completed"
        );
        metrics::record_generation(feature.as_str(), "success");

        Ok(GenerationResponse {
            success: true,
            content: creation.content,
            remaining_credits,
        })
    }
}
