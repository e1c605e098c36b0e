use common::error::{AppError, Res};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Envelope of a Stripe webhook event. Only the fields needed to route the event
/// are read; subscription state is always re-fetched from Stripe.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: Value,
}

#[derive(Debug, PartialEq, Eq)]
pub enum WebhookAction {
    /// Subscription state may have changed for this customer.
    Reconcile { customer_id: String },
    /// One-time payment checkout, handled by the order flow.
    OneTimeCheckout,
    /// A subscription event that carries no customer id.
    MissingCustomer,
    Ignore,
}

/// Verifies a `Stripe-Signature` header (`t=<ts>,v1=<hex>[,v1=<hex>...]`) over the raw payload.
/// Rejects timestamps further than `tolerance_secs` from `now`.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Res<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        AppError::BadRequest("Webhook Error: missing timestamp in signature header".to_string())
    })?;
    if signatures.is_empty() {
        return Err(AppError::BadRequest(
            "Webhook Error: missing v1 signature in signature header".to_string(),
        ));
    }
    if now.abs_diff(timestamp) > tolerance_secs.max(0) as u64 {
        return Err(AppError::BadRequest(format!(
            "Webhook Error: timestamp outside tolerance ({}s)",
            tolerance_secs
        )));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());

    let matched = signatures.iter().any(|signature| {
        hex::decode(signature)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(AppError::BadRequest("Webhook Error: signature mismatch".to_string()))
    }
}

/// Creates an event for the webhook based on the request payload and signature.
/// Requires a webhook secret key.
pub fn construct_event(
    payload: &str,
    signature: &str,
    webhook_secret: &str,
    tolerance_secs: i64,
) -> Res<WebhookEvent> {
    if let Err(e) = verify_signature(
        payload,
        signature,
        webhook_secret,
        tolerance_secs,
        chrono::Utc::now().timestamp(),
    ) {
        log::error!("Error verifying webhook signature: {}", e);
        return Err(e);
    }

    serde_json::from_str(payload).map_err(|e| {
        log::error!("Error parsing webhook event: {}", e);
        AppError::BadRequest(format!("Webhook Error: {}", e))
    })
}

/// Decides what a verified event means for subscription state.
pub fn classify_event(event: &WebhookEvent) -> WebhookAction {
    let object = &event.data.object;

    match event.type_.as_str() {
        "checkout.session.completed" => match object.get("mode").and_then(Value::as_str) {
            Some("subscription") => reconcile_action(object),
            Some("payment") => WebhookAction::OneTimeCheckout,
            _ => WebhookAction::Ignore,
        },
        "customer.subscription.created"
        | "customer.subscription.updated"
        | "customer.subscription.deleted"
        | "invoice.payment_succeeded"
        | "invoice.payment_failed" => reconcile_action(object),
        _ => WebhookAction::Ignore,
    }
}

fn reconcile_action(object: &Value) -> WebhookAction {
    match customer_id(object) {
        Some(customer_id) => WebhookAction::Reconcile { customer_id },
        None => WebhookAction::MissingCustomer,
    }
}

/// `customer` is either an id string or an expanded customer object.
fn customer_id(object: &Value) -> Option<String> {
    match object.get("customer") {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(Value::Object(customer)) => customer
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
