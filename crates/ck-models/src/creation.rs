//! Creation models.
//!
//! A creation is one generated artifact: a set of titles, a sectioned
//! description, a script or a thumbnail image.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kind of generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CreationType {
    Title,
    Description,
    Script,
    Thumbnail,
}

impl CreationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Script => "script",
            Self::Thumbnail => "thumbnail",
        }
    }
}

/// Parses a stored type tag.
///
/// Also accepts the `Generate <Kind>` tags written by earlier versions of
/// the service.
impl FromStr for CreationType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        let tag = tag
            .strip_prefix("Generate ")
            .or_else(|| tag.strip_prefix("generate "))
            .unwrap_or(tag);
        match tag.to_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "description" => Ok(Self::Description),
            "script" => Ok(Self::Script),
            "thumbnail" => Ok(Self::Thumbnail),
            _ => Err(ContentError::UnknownType(s.to_string())),
        }
    }
}

impl std::fmt::Display for CreationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sectioned video description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DescriptionContent {
    pub about: String,
    pub timestamps: String,
    pub hashtags: String,
}

/// Errors converting stored content back into typed content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Unknown creation type: {0}")]
    UnknownType(String),

    #[error("Stored {kind} content is not valid JSON: {source}")]
    InvalidJson {
        kind: CreationType,
        #[source]
        source: serde_json::Error,
    },
}

/// Generated content. The variant always matches the creation's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CreationContent {
    Titles(Vec<String>),
    Description(DescriptionContent),
    Script(String),
    /// `data:image/png;base64,...`
    Thumbnail(String),
}

impl CreationContent {
    /// Creation type implied by this content.
    pub fn kind(&self) -> CreationType {
        match self {
            Self::Titles(_) => CreationType::Title,
            Self::Description(_) => CreationType::Description,
            Self::Script(_) => CreationType::Script,
            Self::Thumbnail(_) => CreationType::Thumbnail,
        }
    }

    /// Encode for the TEXT content column.
    ///
    /// Structured content is JSON-serialized, plain text is stored verbatim.
    pub fn to_stored(&self) -> String {
        match self {
            // Serializing Vec<String> and a struct of Strings cannot fail
            Self::Titles(titles) => serde_json::to_string(titles).unwrap_or_default(),
            Self::Description(description) => {
                serde_json::to_string(description).unwrap_or_default()
            }
            Self::Script(text) | Self::Thumbnail(text) => text.clone(),
        }
    }

    /// Decode the TEXT content column for a creation of the given type.
    pub fn from_stored(kind: CreationType, stored: &str) -> Result<Self, ContentError> {
        match kind {
            CreationType::Title => serde_json::from_str(stored)
                .map(Self::Titles)
                .map_err(|source| ContentError::InvalidJson { kind, source }),
            CreationType::Description => serde_json::from_str(stored)
                .map(Self::Description)
                .map_err(|source| ContentError::InvalidJson { kind, source }),
            CreationType::Script => Ok(Self::Script(stored.to_string())),
            CreationType::Thumbnail => Ok(Self::Thumbnail(stored.to_string())),
        }
    }
}

/// A persisted creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Creation {
    pub id: Uuid,
    pub user_id: String,
    pub prompt: String,
    pub content: CreationContent,
    #[serde(rename = "type")]
    pub kind: CreationType,
    pub publish: bool,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Creation {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Add or remove a user from the like-set.
    ///
    /// Returns true if the user now likes the creation.
    pub fn toggle_like(&mut self, user_id: &str) -> bool {
        if self.likes.iter().any(|u| u == user_id) {
            self.likes.retain(|u| u != user_id);
            false
        } else {
            self.likes.push(user_id.to_string());
            true
        }
    }
}

/// Data required to insert a creation.
#[derive(Debug, Clone)]
pub struct NewCreation {
    pub user_id: String,
    pub prompt: String,
    pub content: CreationContent,
}

impl NewCreation {
    pub fn new(
        user_id: impl Into<String>,
        prompt: impl Into<String>,
        content: CreationContent,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            prompt: prompt.into(),
            content,
        }
    }

    pub fn kind(&self) -> CreationType {
        self.content.kind()
    }
}

/// Dashboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreationSummary {
    pub id: Uuid,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: CreationType,
    pub created_at: DateTime<Utc>,
}

impl From<&Creation> for CreationSummary {
    fn from(c: &Creation) -> Self {
        Self {
            id: c.id,
            prompt: c.prompt.clone(),
            kind: c.kind,
            created_at: c.created_at,
        }
    }
}

/// Community feed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishedCreation {
    pub id: Uuid,
    pub prompt: String,
    pub content: CreationContent,
    #[serde(rename = "type")]
    pub kind: CreationType,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Creation> for PublishedCreation {
    fn from(c: Creation) -> Self {
        Self {
            id: c.id,
            prompt: c.prompt,
            content: c.content,
            kind: c.kind,
            likes: c.likes,
            created_at: c.created_at,
        }
    }
}
