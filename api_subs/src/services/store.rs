use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::{AppError, Res},
    tier::Tier,
};
use db::dtos::subscription::SubscriptionUpsert;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::sub::SubscriptionRecord;

/// Local persistence for the customer mapping, the subscription mirror and
/// the tier on the user profile.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn customer_for_user(&self, user_id: Uuid) -> Res<Option<String>>;

    async fn user_for_customer(&self, customer_id: &str) -> Res<Option<Uuid>>;

    async fn subscription_for_customer(&self, customer_id: &str)
    -> Res<Option<SubscriptionRecord>>;

    async fn tier_for_user(&self, user_id: Uuid) -> Res<Option<Tier>>;

    /// Overwrites the record keyed by `record.customer_id`.
    async fn upsert_subscription(&self, record: &SubscriptionRecord) -> Res<()>;

    async fn set_user_tier(&self, user_id: Uuid, tier: Tier) -> Res<()>;

    /// Writes the record and then, if given, the user's tier.
    ///
    /// This default runs the two writes one after the other. If the tier write
    /// fails the record stays written: the tier is re-derived from the record
    /// on the next reconcile, so the gap closes on its own. Stores that keep
    /// both in one database should override this with a transaction.
    async fn commit(&self, record: &SubscriptionRecord, tier_update: Option<(Uuid, Tier)>) -> Res<()> {
        self.upsert_subscription(record).await?;

        if let Some((user_id, tier)) = tier_update {
            if let Err(e) = self.set_user_tier(user_id, tier).await {
                log::error!(
                    "Partial write: subscription for customer {} saved but tier {} for user {} was not: {}",
                    record.customer_id,
                    tier,
                    user_id,
                    e
                );
                return Err(e);
            }
        }

        Ok(())
    }
}

pub struct PgSubscriptionStore {
    pool: Arc<PgPool>,
}

impl PgSubscriptionStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        PgSubscriptionStore { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn customer_for_user(&self, user_id: Uuid) -> Res<Option<String>> {
        let customer = db::customer::get_customer_by_user_id(&*self.pool, user_id).await?;
        Ok(customer.map(|c| c.stripe_customer_id))
    }

    async fn user_for_customer(&self, customer_id: &str) -> Res<Option<Uuid>> {
        let customer = db::customer::get_customer_by_stripe_id(&*self.pool, customer_id).await?;
        Ok(customer.map(|c| c.user_id))
    }

    async fn subscription_for_customer(
        &self,
        customer_id: &str,
    ) -> Res<Option<SubscriptionRecord>> {
        db::subscription::get_subscription_by_customer_id(&*self.pool, customer_id)
            .await?
            .map(SubscriptionRecord::try_from)
            .transpose()
            .map_err(AppError::Internal)
    }

    async fn tier_for_user(&self, user_id: Uuid) -> Res<Option<Tier>> {
        db::profile::get_profile_by_id(&*self.pool, user_id)
            .await?
            .map(|profile| profile.tier.parse::<Tier>())
            .transpose()
            .map_err(AppError::Internal)
    }

    async fn upsert_subscription(&self, record: &SubscriptionRecord) -> Res<()> {
        db::subscription::upsert_subscription(&*self.pool, &SubscriptionUpsert::from(record)).await
    }

    async fn set_user_tier(&self, user_id: Uuid, tier: Tier) -> Res<()> {
        if !db::profile::update_tier(&*self.pool, user_id, tier.as_str()).await? {
            log::warn!("No profile row for user {}, tier {} not stored", user_id, tier);
        }
        Ok(())
    }

    /// Both tables share one database, so record and tier commit together.
    async fn commit(&self, record: &SubscriptionRecord, tier_update: Option<(Uuid, Tier)>) -> Res<()> {
        let mut tx = self.pool.begin().await?;

        db::subscription::upsert_subscription(&mut *tx, &SubscriptionUpsert::from(record)).await?;

        if let Some((user_id, tier)) = tier_update {
            if !db::profile::update_tier(&mut *tx, user_id, tier.as_str()).await? {
                log::warn!("No profile row for user {}, tier {} not stored", user_id, tier);
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
