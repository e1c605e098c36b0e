use common::tier::{PlanEntry, Tier, TierLimits};
use serde::Serialize;

use crate::models::sub::{SubscriptionRecord, SubscriptionStatus};

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: &'static [PlanEntry],
    pub free: TierLimits,
}

/// Result of an on-demand sync. The raw fields are for diagnostic display.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub tier: Tier,
    pub subscription_status: SubscriptionStatus,
    pub subscription_id: Option<String>,
    pub price_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentSubscriptionResponse {
    pub tier: Tier,
    pub limits: TierLimits,
    pub subscription: Option<SubscriptionRecord>,
}
