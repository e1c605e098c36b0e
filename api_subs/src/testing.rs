//! In-memory store and scripted billing provider shared by the tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use common::{
    env_config::{Config, SessionConfig},
    error::{AppError, Res},
    tier::Tier,
};
use uuid::Uuid;

use crate::{
    models::sub::{SubscriptionRecord, SubscriptionSnapshot, SubscriptionStatus},
    services::{provider::BillingProvider, store::SubscriptionStore},
};

pub fn snapshot(status: SubscriptionStatus, price_id: &str) -> SubscriptionSnapshot {
    SubscriptionSnapshot {
        subscription_id: "sub_test".to_string(),
        price_id: Some(price_id.to_string()),
        status,
        current_period_start: 1_717_200_000,
        current_period_end: 1_719_792_000,
        cancel_at_period_end: false,
        payment_method: None,
    }
}

#[derive(Default)]
pub struct FakeProvider {
    subscriptions: Mutex<HashMap<String, SubscriptionSnapshot>>,
    failure: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn set(&self, customer_id: &str, snapshot: Option<SubscriptionSnapshot>) {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        match snapshot {
            Some(snapshot) => subscriptions.insert(customer_id.to_string(), snapshot),
            None => subscriptions.remove(customer_id),
        };
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn stall_for(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BillingProvider for FakeProvider {
    async fn latest_subscription(&self, customer_id: &str) -> Res<Option<SubscriptionSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().unwrap().clone();
        if let Some(message) = failure {
            return Err(AppError::Provider(message));
        }
        Ok(self.subscriptions.lock().unwrap().get(customer_id).cloned())
    }
}

#[derive(Default)]
struct StoreState {
    customers: HashMap<Uuid, String>,
    records: HashMap<String, SubscriptionRecord>,
    tiers: HashMap<Uuid, Tier>,
    tier_writes: usize,
    fail_tier_writes: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Links a fresh user to `customer_id` and returns the user id.
    pub fn link(&self, customer_id: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.state
            .lock()
            .unwrap()
            .customers
            .insert(user_id, customer_id.to_string());
        user_id
    }

    pub fn seed_tier(&self, user_id: Uuid, tier: Tier) {
        self.state.lock().unwrap().tiers.insert(user_id, tier);
    }

    pub fn record(&self, customer_id: &str) -> Option<SubscriptionRecord> {
        self.state.lock().unwrap().records.get(customer_id).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn tier(&self, user_id: Uuid) -> Option<Tier> {
        self.state.lock().unwrap().tiers.get(&user_id).copied()
    }

    pub fn tier_write_count(&self) -> usize {
        self.state.lock().unwrap().tier_writes
    }

    pub fn fail_tier_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_tier_writes = fail;
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn customer_for_user(&self, user_id: Uuid) -> Res<Option<String>> {
        Ok(self.state.lock().unwrap().customers.get(&user_id).cloned())
    }

    async fn user_for_customer(&self, customer_id: &str) -> Res<Option<Uuid>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .customers
            .iter()
            .find(|(_, customer)| customer.as_str() == customer_id)
            .map(|(user_id, _)| *user_id))
    }

    async fn subscription_for_customer(
        &self,
        customer_id: &str,
    ) -> Res<Option<SubscriptionRecord>> {
        Ok(self.record(customer_id))
    }

    async fn tier_for_user(&self, user_id: Uuid) -> Res<Option<Tier>> {
        Ok(self.tier(user_id))
    }

    async fn upsert_subscription(&self, record: &SubscriptionRecord) -> Res<()> {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(record.customer_id.clone(), record.clone());
        Ok(())
    }

    async fn set_user_tier(&self, user_id: Uuid, tier: Tier) -> Res<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_tier_writes {
            return Err(AppError::Internal("profile table unavailable".to_string()));
        }
        state.tier_writes += 1;
        state.tiers.insert(user_id, tier);
        Ok(())
    }
}

/// Builds a `Stripe-Signature` header for `payload` signed at `timestamp`.
pub fn sign(payload: &str, secret: &str, timestamp: i64) -> String {
    use hmac::{Hmac, Mac};

    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

pub const SESSION_SECRET: &str = "session-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";

pub fn config() -> Arc<Config> {
    Arc::new(Config {
        environment: "development".to_string(),
        database_url: String::new(),
        session: SessionConfig {
            secret: SESSION_SECRET.to_string(),
            audience: None,
        },
        server_host: "127.0.0.1".to_string(),
        server_port: 8080,
        num_workers: 1,
        cors_allowed_origin: "http://localhost:3000".to_string(),
        console_logging_enabled: false,
        stripe_secret_key: "sk_test".to_string(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
        webhook_tolerance_secs: 300,
        webhook_queue_capacity: 16,
        sync_timeout_secs: 1,
    })
}

/// A session token for `user_id` signed with [`SESSION_SECRET`].
pub fn session_token(user_id: Uuid) -> String {
    use jsonwebtoken::{EncodingKey, Header};

    let claims = common::jwt::SessionClaims {
        sub: user_id,
        exp: chrono::Utc::now().timestamp() as usize + 3600,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
    )
    .unwrap()
}
