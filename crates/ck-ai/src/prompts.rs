//! Prompt builders for each generation feature.

use ck_models::{DescriptionRequest, ScriptRequest, ThumbnailRequest, TitleRequest};
use thiserror::Error;

/// Maximum length of the topic or thumbnail prompt, in characters.
pub const MAX_PROMPT_LENGTH: usize = 5000;

const DEFAULT_PLATFORM: &str = "YouTube";
const DEFAULT_TONE: &str = "engaging";

/// Invalid prompt input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("{0} required")]
    Missing(&'static str),

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },
}

impl PromptError {
    /// Message shown to the caller.
    pub fn user_message(&self) -> String {
        match self {
            Self::Missing("topic") => "Topic required".to_string(),
            Self::Missing("prompt") => "Prompt required".to_string(),
            other => other.to_string(),
        }
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, PromptError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PromptError::Missing(field));
    }
    if value.chars().count() > MAX_PROMPT_LENGTH {
        return Err(PromptError::TooLong {
            field,
            max: MAX_PROMPT_LENGTH,
        });
    }
    Ok(value)
}

fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

pub fn build_title_prompt(req: &TitleRequest) -> Result<String, PromptError> {
    let topic = required("topic", &req.topic)?;

    Ok(format!(
        "Generate EXACTLY 5 high CTR {platform} video titles.\n\
         Topic: {topic}\n\
         Keywords: {keywords}\n\
         Tone: {tone}\n\
         Rules:\n\
         - One title per line\n\
         - No numbering\n\
         - No markdown\n\
         - No explanations\n",
        platform = or_default(&req.platform, DEFAULT_PLATFORM),
        keywords = or_default(&req.keywords, "None"),
        tone = or_default(&req.tone, DEFAULT_TONE),
    ))
}

pub fn build_description_prompt(req: &DescriptionRequest) -> Result<String, PromptError> {
    let topic = required("topic", &req.topic)?;

    let mut prompt = format!(
        "Generate a {platform} video description.\n\n\
         Topic: {topic}\n\
         Tone: {tone}\n",
        platform = or_default(&req.platform, DEFAULT_PLATFORM),
        tone = or_default(&req.tone, DEFAULT_TONE),
    );

    let links = req.links();
    if !links.is_empty() {
        prompt.push_str("\nInclude these links at the end of the ABOUT section:\n");
        for link in &links {
            prompt.push_str(link);
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "\nReturn format:\n\n\
         ABOUT:\n\
         <description>\n\n\
         TIMESTAMPS:\n\
         00:00 Intro\n\
         00:30 Topic\n\n\
         HASHTAGS:\n\
         #tag1 #tag2 #tag3\n\n\
         No markdown.\n",
    );

    Ok(prompt)
}

pub fn build_script_prompt(req: &ScriptRequest) -> Result<String, PromptError> {
    let topic = required("topic", &req.topic)?;

    Ok(format!(
        "Create engaging {platform} video script.\n\
         Topic: {topic}\n\
         Audience: {audience}\n\
         Tone: {tone}\n\
         Structure:\n\
         - Hook\n\
         - Body\n\
         - Engagement prompts\n\
         - CTA ending\n\
         No markdown.\n",
        platform = or_default(&req.platform, DEFAULT_PLATFORM),
        audience = or_default(&req.audience, "General"),
        tone = or_default(&req.tone, DEFAULT_TONE),
    ))
}

pub fn build_thumbnail_prompt(req: &ThumbnailRequest) -> Result<String, PromptError> {
    let concept = required("prompt", &req.prompt)?;

    Ok(format!(
        "Professional clickable {platform} thumbnail.\n\
         Concept: {concept}\n\
         Style: {style}\n\
         High contrast, cinematic lighting, clean subject focus.\n",
        platform = or_default(&req.platform, "social media"),
        style = or_default(&req.style, "High contrast"),
    ))
}
