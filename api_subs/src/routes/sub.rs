use std::{sync::Arc, time::Duration};

use actix_web::{Responder, get, post, web};
use common::{
    env_config::Config,
    error::Res,
    http::Success,
    jwt::SessionClaims,
    tier::{self, Tier},
};

use crate::{
    dtos::sub::{CurrentSubscriptionResponse, PlansResponse, SyncResponse},
    services::{self, reconcile::Reconciler},
};

/// Lists the paid plans and the free tier allowance.
///
/// # Output
/// - Success: `{ plans: [{ planId, tier, dailyLimit, name, price, interval }], free: { dailyLimit } }`
///   where `dailyLimit: null` means unlimited and `price` is in cents
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/sub/plans');
/// const { plans, free } = await response.json();
/// ```
#[get("/plans")]
pub async fn get_plans() -> Res<impl Responder> {
    Success::ok(PlansResponse {
        plans: tier::PLAN_CATALOG,
        free: tier::limits_for(Tier::Free),
    })
}

/// Re-fetches the caller's subscription from Stripe and returns the resulting tier.
/// The user is taken from the session token only.
///
/// # Output
/// - Success: `{ success, tier, subscription_status, subscription_id, price_id, message }`
/// - Error: 401 without a valid session, 404 if the user never checked out,
///   503 if Stripe did not answer within `SYNC_TIMEOUT_SECS`, 500 otherwise
///
/// # Frontend Example
/// ```javascript
/// // after returning from the checkout redirect
/// const response = await fetch('/api/secured/sub/sync', {
///   method: 'POST',
///   headers: { 'Authorization': `Bearer ${session.access_token}` }
/// });
/// const { tier } = await response.json();
/// ```
#[post("/sync")]
pub async fn post_sync(
    claims: web::ReqData<SessionClaims>,
    reconciler: web::Data<Reconciler>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let timeout = Duration::from_secs(config.sync_timeout_secs);
    let outcome = services::sub::sync_for_user(&reconciler, claims.sub, timeout).await?;

    Success::ok(SyncResponse {
        success: true,
        tier: outcome.tier,
        subscription_status: outcome.record.status,
        subscription_id: outcome.record.subscription_id,
        price_id: outcome.record.price_id,
        message: format!("Subscription synced, current tier is {}", outcome.tier),
    })
}

/// Returns the caller's locally stored subscription, tier and daily limit.
#[get("/current")]
pub async fn get_current(
    claims: web::ReqData<SessionClaims>,
    reconciler: web::Data<Reconciler>,
) -> Res<impl Responder> {
    let current = services::sub::current_for_user(&reconciler, claims.sub).await?;

    Success::ok(CurrentSubscriptionResponse {
        tier: current.tier,
        limits: current.limits,
        subscription: current.subscription,
    })
}
