//! Generation request bodies.
//!
//! Required fields default to empty strings so that a missing `topic` is
//! reported as a validation failure rather than a JSON rejection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;


#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct TitleRequest {
    #[validate(length(max = 200))]
    pub platform: Option<String>,
    pub topic: String,
    #[validate(length(max = 1000))]
    pub keywords: Option<String>,
    #[validate(length(max = 200))]
    pub tone: Option<String>,
}

/// Call-to-action links, sent either as one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CtaLinks {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct DescriptionRequest {
    #[validate(length(max = 200))]
    pub platform: Option<String>,
    pub topic: String,
    #[validate(length(max = 200))]
    pub tone: Option<String>,
    #[serde(rename = "ctaLinks", alias = "links")]
    pub cta_links: Option<CtaLinks>,
}

impl DescriptionRequest {
    /// Non-empty CTA links, one per entry.
    pub fn links(&self) -> Vec<String> {
        let raw: Vec<&str> = match &self.cta_links {
            None => vec![],
            Some(CtaLinks::One(s)) => s.split(['\n', ',']).collect(),
            Some(CtaLinks::Many(v)) => v.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct ScriptRequest {
    #[validate(length(max = 200))]
    pub platform: Option<String>,
    pub topic: String,
    #[validate(length(max = 200))]
    pub audience: Option<String>,
    #[validate(length(max = 200))]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct ThumbnailRequest {
    pub prompt: String,
    #[validate(length(max = 200))]
    pub style: Option<String>,
    #[validate(length(max = 200))]
    pub platform: Option<String>,
}
