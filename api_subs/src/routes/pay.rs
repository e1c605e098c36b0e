use std::sync::Arc;

use actix_web::{Responder, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
};
use log::{info, warn};

use crate::{
    dtos::pay::WebhookAck,
    services::{
        self,
        pay::WebhookAction,
        queue::{ReconcileJob, WebhookQueue},
    },
};

/// Handles Stripe webhook events for subscription changes.
///
/// # Input
/// - `payload`: Raw string containing the webhook event data
/// - `req`: HTTP request containing Stripe signature in headers
/// - `config`: Application configuration with webhook secret
/// - `queue`: Background reconcile queue
///
/// # Output
/// - Success: Returns 200 `{ "received": true }` once the event is verified and queued
/// - Error: Returns 400 for a missing or invalid signature, 503 when the queue is full
///
/// # Note
/// This endpoint is called by Stripe's servers, not by the frontend.
/// Reconciliation happens after the response is sent; its failures only show up in the logs.
///
/// # Stripe Configuration Example
/// 1. Go to Stripe Dashboard → Developers → Webhooks
/// 2. Add Endpoint: https://yourapp.com/api/pay/webhook
/// 3. Select `checkout.session.completed`, `customer.subscription.*` and `invoice.payment_*`
/// 4. Set the signing secret in your environment as STRIPE_WEBHOOK_SECRET
#[post("/webhook")]
pub async fn post_webhook(
    payload: String,
    req: actix_web::HttpRequest,
    config: web::Data<Arc<Config>>,
    queue: web::Data<WebhookQueue>,
) -> Res<impl Responder> {
    let signature = match req.headers().get("stripe-signature") {
        Some(signature) => signature.to_str().unwrap_or(""),
        None => return Err(AppError::BadRequest("Stripe signature missing".to_string())),
    };

    let event = services::pay::construct_event(
        &payload,
        signature,
        &config.stripe_webhook_secret,
        config.webhook_tolerance_secs,
    )?;

    match services::pay::classify_event(&event) {
        WebhookAction::Reconcile { customer_id } => {
            info!("Webhook {} ({}) queued for customer {}", event.id, event.type_, customer_id);
            queue.submit(ReconcileJob {
                event_id: event.id,
                event_type: event.type_,
                customer_id,
            })?;
        }
        WebhookAction::OneTimeCheckout => {
            info!("Webhook {}: one-time payment checkout, no subscription change", event.id);
        }
        WebhookAction::MissingCustomer => {
            warn!("Webhook {} ({}) has no customer id, skipped", event.id, event.type_);
        }
        WebhookAction::Ignore => {
            info!("Unhandled event type: {}", event.type_);
        }
    }

    Success::ok(WebhookAck { received: true })
}
