//! Creation store abstraction.

use async_trait::async_trait;
use ck_models::{Creation, CreationSummary, NewCreation, PublishedCreation};
use uuid::Uuid;

use crate::error::StoreResult;

/// Storage for creations.
///
/// Owner-scoped operations return `None`/`false` both when the row does not
/// exist and when it belongs to another user.
#[async_trait]
pub trait CreationStore: Send + Sync {
    /// Insert a new creation and return the stored row.
    async fn insert(&self, creation: NewCreation) -> StoreResult<Creation>;

    /// Fetch a creation owned by `user_id`.
    async fn get_owned(&self, id: Uuid, user_id: &str) -> StoreResult<Option<Creation>>;

    /// Delete a creation owned by `user_id`. Returns whether a row was removed.
    async fn delete_owned(&self, id: Uuid, user_id: &str) -> StoreResult<bool>;

    /// Flip the publish flag of a creation owned by `user_id`.
    ///
    /// Returns the new flag.
    async fn toggle_publish(&self, id: Uuid, user_id: &str) -> StoreResult<Option<bool>>;

    /// Add `user_id` to the like-set, or remove it if present.
    ///
    /// Any caller may like any creation. Returns the updated like-set.
    async fn toggle_like(&self, id: Uuid, user_id: &str) -> StoreResult<Option<Vec<String>>>;

    /// A page of the user's creations, newest first.
    async fn list_recent(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CreationSummary>>;

    /// Total creations owned by the user.
    async fn count_for_user(&self, user_id: &str) -> StoreResult<i64>;

    /// All published creations, newest first.
    async fn list_published(&self) -> StoreResult<Vec<PublishedCreation>>;

    /// Readiness check.
    async fn ping(&self) -> StoreResult<()>;
}
