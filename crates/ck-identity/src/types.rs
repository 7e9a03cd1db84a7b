//! Identity provider API types.

use ck_models::Plan;
use serde::{Deserialize, Serialize};

/// Free-form per-user metadata object.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key holding the remaining credit count.
pub const CREDITS_KEY: &str = "credits";

/// Metadata key holding the plan name.
pub const PLAN_KEY: &str = "plan";

/// User record as returned by the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub private_metadata: Metadata,
    #[serde(default)]
    pub public_metadata: Metadata,
}

impl UserRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Plan from private metadata, falling back to public metadata.
    pub fn plan(&self) -> Plan {
        self.private_metadata
            .get(PLAN_KEY)
            .and_then(|v| v.as_str())
            .or_else(|| self.public_metadata.get(PLAN_KEY).and_then(|v| v.as_str()))
            .map(Plan::from_claim)
            .unwrap_or_default()
    }

    /// Stored credit count, if one has been written.
    ///
    /// Floats are truncated; non-numeric values count as absent.
    pub fn credits(&self) -> Option<i64> {
        let value = self.private_metadata.get(CREDITS_KEY)?;
        value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
    }
}

/// Body of a metadata update request.
#[derive(Debug, Serialize)]
pub struct UpdateMetadataRequest<'a> {
    pub private_metadata: &'a Metadata,
}
