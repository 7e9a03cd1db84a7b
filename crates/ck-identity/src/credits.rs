//! Credit balance kept in identity provider metadata.
//!
//! The balance lives in the user's private metadata under `credits`, and the
//! plan under `plan`. Premium users are never metered.
//!
//! # Concurrency
//! `deduct` is a read-modify-write with no precondition on the write. Two
//! concurrent requests for the same user can both read `N` and both write
//! `N - cost`, so one charge is lost. The over-spend is bounded by the number
//! of in-flight requests per user and is accepted.

use std::sync::Arc;

use ck_models::{Balance, INITIAL_FREE_CREDITS};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::IdentityResult;
use crate::metrics::record_credits_initialized;
use crate::store::MetadataStore;
use crate::types::{UserRecord, CREDITS_KEY};

/// Reads and debits per-user credit balances.
#[derive(Clone)]
pub struct CreditStore {
    store: Arc<dyn MetadataStore>,
}

impl CreditStore {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Current balance for a user.
    ///
    /// A free user with no stored balance is given `INITIAL_FREE_CREDITS`,
    /// which is written back alongside any existing metadata keys.
    pub async fn get_balance(&self, user_id: &str) -> IdentityResult<Balance> {
        let user = self.store.get_user(user_id).await?;
        self.balance_of(&user).await
    }

    /// Debit `cost` credits from a free user.
    ///
    /// Returns the balance after the debit. A balance smaller than `cost` is
    /// returned unchanged and nothing is written.
    pub async fn deduct(&self, user_id: &str, cost: i64) -> IdentityResult<Balance> {
        let user = self.store.get_user(user_id).await?;

        let current = match self.balance_of(&user).await? {
            Balance::Unlimited => return Ok(Balance::Unlimited),
            Balance::Limited(current) => current,
        };

        if current < cost {
            debug!(user_id = %user_id, current, cost, "Balance below cost, not deducting");
            return Ok(Balance::Limited(current));
        }

        let remaining = current - cost;
        self.write_credits(&user, remaining).await?;

        debug!(user_id = %user_id, cost, remaining, "Deducted credits");
        Ok(Balance::Limited(remaining))
    }

    async fn balance_of(&self, user: &UserRecord) -> IdentityResult<Balance> {
        if user.plan().is_premium() {
            return Ok(Balance::Unlimited);
        }

        match user.credits() {
            Some(credits) => Ok(Balance::Limited(credits)),
            None => {
                self.write_credits(user, INITIAL_FREE_CREDITS).await?;
                record_credits_initialized();
                info!(
                    user_id = %user.id,
                    credits = INITIAL_FREE_CREDITS,
                    "Initialized credit balance"
                );
                Ok(Balance::Limited(INITIAL_FREE_CREDITS))
            }
        }
    }

    async fn write_credits(&self, user: &UserRecord, credits: i64) -> IdentityResult<()> {
        let mut metadata = user.private_metadata.clone();
        metadata.insert(CREDITS_KEY.to_string(), Value::from(credits));
        self.store.update_private_metadata(&user.id, &metadata).await
    }
}
