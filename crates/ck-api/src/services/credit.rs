//! Credit gating for generation requests.
//!
//! Wraps [`CreditStore`] with the API's failure policy: an unreachable
//! identity service degrades a balance read to the initial allowance, and
//! a failed debit after a successful generation is reported as zero
//! remaining credits instead of failing the request.

use ck_identity::CreditStore;
use ck_models::{Balance, INITIAL_FREE_CREDITS};
use tracing::{debug, error, warn};

use crate::auth::CallerContext;
use crate::error::{ApiError, ApiResult};
use crate::metrics;

#[derive(Clone)]
pub struct CreditGate {
    store: CreditStore,
}

impl CreditGate {
    pub fn new(store: CreditStore) -> Self {
        Self { store }
    }

    /// Current balance of the caller.
    pub async fn balance(&self, caller: &CallerContext) -> Balance {
        if caller.is_premium() {
            return Balance::Unlimited;
        }

        match self.store.get_balance(&caller.caller_id).await {
            Ok(balance) => balance,
            Err(e) => {
                if e.is_unavailable() {
                    warn!(
                        user_id = %caller.caller_id,
                        "Identity service unavailable, assuming initial allowance: {}", e
                    );
                } else {
                    error!(
                        user_id = %caller.caller_id,
                        "Credit lookup failed, assuming initial allowance: {}", e
                    );
                }
                metrics::record_credit_fallback();
                Balance::Limited(INITIAL_FREE_CREDITS)
            }
        }
    }

    /// Reject the request when the caller cannot pay `cost`.
    pub async fn ensure(
        &self,
        caller: &CallerContext,
        cost: i64,
        message: impl Into<String>,
    ) -> ApiResult<Balance> {
        let balance = self.balance(caller).await;
        if !balance.covers(cost) {
            debug!(user_id = %caller.caller_id, cost, ?balance, "Insufficient credits");
            return Err(ApiError::insufficient_credits(message));
        }
        Ok(balance)
    }

    /// Debit `cost` after a successful generation.
    pub async fn charge(&self, caller: &CallerContext, cost: i64, feature: &str) -> Balance {
        if caller.is_premium() {
            return Balance::Unlimited;
        }

        match self.store.deduct(&caller.caller_id, cost).await {
            Ok(balance) => {
                if balance.is_unlimited() {
                    return balance;
                }
                metrics::record_credits_deducted(feature, cost);
                balance
            }
            Err(e) => {
                error!(
                    user_id = %caller.caller_id,
                    feature,
                    cost,
                    "Credit deduction failed after generation: {}", e
                );
                Balance::Limited(0)
            }
        }
    }
}
