//! Snapshot-based reconciliation of a customer's subscription.
//!
//! Every call re-fetches the provider's current state and overwrites the local
//! mirror with it; nothing from a webhook payload is applied as a delta. The
//! outcome therefore depends only on what the provider reports at read time,
//! which makes repeated, duplicated and reordered triggers converge.
//!
//! Consistency model: the record and the tier are written through
//! [`SubscriptionStore::commit`]. Where the store cannot write both atomically,
//! a failed tier write leaves the record ahead of the tier until the next
//! reconcile re-derives it. Concurrent reconciles for one customer are not
//! serialized here; both write "current provider state", so they converge.

use std::sync::Arc;

use common::{error::Res, tier::Tier};
use log::{info, warn};
use uuid::Uuid;

use super::{provider::BillingProvider, store::SubscriptionStore};
use crate::models::sub::SubscriptionRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub tier: Tier,
    pub record: SubscriptionRecord,
    /// `None` when no user is linked to the customer; the tier was not written.
    pub user_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct Reconciler {
    provider: Arc<dyn BillingProvider>,
    store: Arc<dyn SubscriptionStore>,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn BillingProvider>, store: Arc<dyn SubscriptionStore>) -> Self {
        Reconciler { provider, store }
    }

    pub fn store(&self) -> &dyn SubscriptionStore {
        self.store.as_ref()
    }

    /// Fetches the customer's newest subscription from the provider and mirrors it
    /// locally, then writes the derived tier for the linked user.
    ///
    /// When `user_id` is `None` it is looked up from the customer mapping. A
    /// customer without a linked user still gets its record written; the tier
    /// write is skipped and the orphaned record is logged.
    pub async fn reconcile(&self, customer_id: &str, user_id: Option<Uuid>) -> Res<Reconciled> {
        let snapshot = self.provider.latest_subscription(customer_id).await?;

        let record = match snapshot {
            Some(snapshot) => SubscriptionRecord::from_snapshot(customer_id, snapshot),
            None => SubscriptionRecord::not_started(customer_id),
        };
        let tier = record.derived_tier();

        let user_id = match user_id {
            Some(user_id) => Some(user_id),
            None => self.store.user_for_customer(customer_id).await?,
        };
        if user_id.is_none() {
            warn!(
                "Customer {} has no linked user; storing subscription without a tier update",
                customer_id
            );
        }

        self.store
            .commit(&record, user_id.map(|user_id| (user_id, tier)))
            .await?;

        info!(
            "Reconciled customer {}: status={} price={} tier={}",
            customer_id,
            record.status,
            record.price_id.as_deref().unwrap_or("-"),
            tier
        );

        Ok(Reconciled {
            tier,
            record,
            user_id,
        })
    }
}
