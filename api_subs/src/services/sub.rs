use std::time::Duration;

use common::{
    error::{AppError, Res},
    tier::{self, Tier, TierLimits},
};
use uuid::Uuid;

use super::reconcile::{Reconciled, Reconciler};
use crate::models::sub::SubscriptionRecord;

/// Locally mirrored state for a user, as served by `GET /sub/current`.
#[derive(Debug)]
pub struct CurrentSubscription {
    pub tier: Tier,
    pub limits: TierLimits,
    pub subscription: Option<SubscriptionRecord>,
}

async fn customer_for(reconciler: &Reconciler, user_id: Uuid) -> Res<String> {
    reconciler
        .store()
        .customer_for_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No billing customer for this user".to_string()))
}

/// Reconciles the caller's own customer and waits for the result.
/// The whole call, provider round-trip included, is bounded by `timeout`.
pub async fn sync_for_user(
    reconciler: &Reconciler,
    user_id: Uuid,
    timeout: Duration,
) -> Res<Reconciled> {
    let customer_id = customer_for(reconciler, user_id).await?;

    match tokio::time::timeout(timeout, reconciler.reconcile(&customer_id, Some(user_id))).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!(
                "Sync for user {} (customer {}) timed out after {:?}",
                user_id,
                customer_id,
                timeout
            );
            Err(AppError::ServiceUnavailable(
                "Billing provider did not respond in time, try again".to_string(),
            ))
        }
    }
}

/// Reads the mirror without contacting the provider.
/// A user with no profile row is reported as free.
pub async fn current_for_user(reconciler: &Reconciler, user_id: Uuid) -> Res<CurrentSubscription> {
    let customer_id = customer_for(reconciler, user_id).await?;
    let store = reconciler.store();

    let subscription = store.subscription_for_customer(&customer_id).await?;
    let tier = store.tier_for_user(user_id).await?.unwrap_or(Tier::Free);

    Ok(CurrentSubscription {
        tier,
        limits: tier::limits_for(tier),
        subscription,
    })
}
