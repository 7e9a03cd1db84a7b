//! Metadata store abstraction.

use async_trait::async_trait;

use crate::client::IdentityClient;
use crate::error::IdentityResult;
use crate::types::{Metadata, UserRecord};

/// Read/write access to a user's identity record and private metadata.
///
/// Writes replace the whole private metadata object; callers merge
/// before writing. No compare-and-swap is offered.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch the user record.
    async fn get_user(&self, user_id: &str) -> IdentityResult<UserRecord>;

    /// Write the user's private metadata.
    async fn update_private_metadata(
        &self,
        user_id: &str,
        metadata: &Metadata,
    ) -> IdentityResult<()>;
}

#[async_trait]
impl MetadataStore for IdentityClient {
    async fn get_user(&self, user_id: &str) -> IdentityResult<UserRecord> {
        IdentityClient::get_user(self, user_id).await
    }

    async fn update_private_metadata(
        &self,
        user_id: &str,
        metadata: &Metadata,
    ) -> IdentityResult<()> {
        IdentityClient::update_private_metadata(self, user_id, metadata).await
    }
}
