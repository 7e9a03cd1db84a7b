//! In-memory creation store.
//!
//! Non-persistent; all data is lost when the process exits. Used when no
//! database is configured and in tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ck_models::{Creation, CreationSummary, NewCreation, PublishedCreation};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::repository::CreationStore;

/// Creation store held in process memory.
///
/// Rows are kept in insertion order, so reverse iteration is newest first.
#[derive(Clone, Default)]
pub struct MemoryCreationStore {
    rows: Arc<RwLock<Vec<Creation>>>,
}

impl MemoryCreationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Every stored row, oldest first.
    pub async fn snapshot(&self) -> Vec<Creation> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl CreationStore for MemoryCreationStore {
    async fn insert(&self, creation: NewCreation) -> StoreResult<Creation> {
        let kind = creation.kind();
        let row = Creation {
            id: Uuid::new_v4(),
            user_id: creation.user_id,
            prompt: creation.prompt,
            content: creation.content,
            kind,
            publish: false,
            likes: Vec::new(),
            created_at: Utc::now(),
        };

        self.rows.write().await.push(row.clone());
        Ok(row)
    }

    async fn get_owned(&self, id: Uuid, user_id: &str) -> StoreResult<Option<Creation>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|c| c.id == id && c.is_owned_by(user_id))
            .cloned())
    }

    async fn delete_owned(&self, id: Uuid, user_id: &str) -> StoreResult<bool> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|c| !(c.id == id && c.is_owned_by(user_id)));
        Ok(rows.len() < before)
    }

    async fn toggle_publish(&self, id: Uuid, user_id: &str) -> StoreResult<Option<bool>> {
        let mut rows = self.rows.write().await;
        Ok(rows
            .iter_mut()
            .find(|c| c.id == id && c.is_owned_by(user_id))
            .map(|c| {
                c.publish = !c.publish;
                c.publish
            }))
    }

    async fn toggle_like(&self, id: Uuid, user_id: &str) -> StoreResult<Option<Vec<String>>> {
        let mut rows = self.rows.write().await;
        Ok(rows.iter_mut().find(|c| c.id == id).map(|c| {
            c.toggle_like(user_id);
            c.likes.clone()
        }))
    }

    async fn list_recent(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CreationSummary>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .filter(|c| c.is_owned_by(user_id))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(CreationSummary::from)
            .collect())
    }

    async fn count_for_user(&self, user_id: &str) -> StoreResult<i64> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|c| c.is_owned_by(user_id)).count() as i64)
    }

    async fn list_published(&self) -> StoreResult<Vec<PublishedCreation>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .filter(|c| c.publish)
            .cloned()
            .map(PublishedCreation::from)
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
