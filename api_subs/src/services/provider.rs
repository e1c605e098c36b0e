use async_trait::async_trait;
use common::error::{AppError, Res};
use stripe::{Client, CustomerId, Expandable, ListSubscriptions, Subscription};

use crate::models::sub::{CardDisplay, SubscriptionSnapshot, SubscriptionStatus};

/// Read access to the billing provider's view of a customer.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Newest subscription for the customer in any status, or `None` when the
    /// customer has never subscribed. Transport, auth and rate-limit failures
    /// are returned as errors.
    async fn latest_subscription(&self, customer_id: &str) -> Res<Option<SubscriptionSnapshot>>;
}

pub struct StripeProvider {
    client: Client,
}

impl StripeProvider {
    pub fn new(client: Client) -> Self {
        StripeProvider { client }
    }
}

#[async_trait]
impl BillingProvider for StripeProvider {
    async fn latest_subscription(&self, customer_id: &str) -> Res<Option<SubscriptionSnapshot>> {
        let customer_id = customer_id
            .parse::<CustomerId>()
            .map_err(|e| AppError::Internal(format!("Invalid stored customer ID: {}", e)))?;

        // Stripe lists newest first
        let subscriptions = Subscription::list(
            &self.client,
            &ListSubscriptions {
                customer: Some(customer_id),
                status: Some(stripe::SubscriptionStatusFilter::All),
                limit: Some(1),
                expand: &["data.default_payment_method"],
                ..Default::default()
            },
        )
        .await
        .map_err(AppError::from)?;

        Ok(subscriptions.data.first().map(snapshot_from_stripe))
    }
}

fn snapshot_from_stripe(sub: &Subscription) -> SubscriptionSnapshot {
    let payment_method = match &sub.default_payment_method {
        Some(Expandable::Object(method)) => method.card.as_ref().map(|card| CardDisplay {
            brand: card.brand.to_string(),
            last4: card.last4.to_string(),
        }),
        _ => None,
    };

    SubscriptionSnapshot {
        subscription_id: sub.id.to_string(),
        price_id: sub
            .items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.to_string()),
        status: SubscriptionStatus::from_provider(&sub.status.to_string()),
        current_period_start: sub.current_period_start,
        current_period_end: sub.current_period_end,
        cancel_at_period_end: sub.cancel_at_period_end,
        payment_method,
    }
}
