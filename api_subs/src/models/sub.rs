use std::{fmt, str::FromStr};

use common::tier::{self, Tier};
use serde::{Deserialize, Serialize};

/// Local subscription status. `NotStarted` means the provider reports no
/// subscription at all for the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    NotStarted,
    Incomplete,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::NotStarted => "not_started",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
        }
    }

    /// Maps a status string reported by Stripe. `incomplete_expired` is terminal
    /// and becomes `Canceled`; anything unrecognized becomes `Incomplete`, which
    /// never unlocks a paid tier.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "incomplete_expired" => SubscriptionStatus::Canceled,
            other => other.parse().unwrap_or_else(|_| {
                log::warn!("Unrecognized subscription status from Stripe: {}", other);
                SubscriptionStatus::Incomplete
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(SubscriptionStatus::NotStarted),
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "unpaid" => Ok(SubscriptionStatus::Unpaid),
            "paused" => Ok(SubscriptionStatus::Paused),
            other => Err(format!("unknown subscription status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDisplay {
    pub brand: String,
    pub last4: String,
}

/// What the billing provider currently reports for a customer's newest subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub subscription_id: String,
    pub price_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: i64,
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
    pub payment_method: Option<CardDisplay>,
}

/// Local mirror of a customer's subscription, keyed by `customer_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    pub customer_id: String,
    pub subscription_id: Option<String>,
    pub price_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub payment_method_brand: Option<String>,
    pub payment_method_last4: Option<String>,
}

impl SubscriptionRecord {
    pub fn not_started(customer_id: &str) -> Self {
        SubscriptionRecord {
            customer_id: customer_id.to_string(),
            subscription_id: None,
            price_id: None,
            status: SubscriptionStatus::NotStarted,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            payment_method_brand: None,
            payment_method_last4: None,
        }
    }

    pub fn from_snapshot(customer_id: &str, snapshot: SubscriptionSnapshot) -> Self {
        let (payment_method_brand, payment_method_last4) = match snapshot.payment_method {
            Some(card) => (Some(card.brand), Some(card.last4)),
            None => (None, None),
        };
        SubscriptionRecord {
            customer_id: customer_id.to_string(),
            subscription_id: Some(snapshot.subscription_id),
            price_id: snapshot.price_id,
            status: snapshot.status,
            current_period_start: Some(snapshot.current_period_start),
            current_period_end: Some(snapshot.current_period_end),
            cancel_at_period_end: snapshot.cancel_at_period_end,
            payment_method_brand,
            payment_method_last4,
        }
    }

    /// The tier this record entitles its user to. Only `active` and `trialing`
    /// unlock the plan's tier; the period end and cancel flag play no part.
    pub fn derived_tier(&self) -> Tier {
        if !self.status.is_active() {
            return Tier::Free;
        }
        self.price_id
            .as_deref()
            .map(tier::tier_for_plan)
            .unwrap_or(Tier::Free)
    }
}

impl From<&SubscriptionRecord> for db::dtos::subscription::SubscriptionUpsert {
    fn from(record: &SubscriptionRecord) -> Self {
        db::dtos::subscription::SubscriptionUpsert {
            customer_id: record.customer_id.clone(),
            subscription_id: record.subscription_id.clone(),
            price_id: record.price_id.clone(),
            status: record.status.as_str().to_string(),
            current_period_start: record.current_period_start,
            current_period_end: record.current_period_end,
            cancel_at_period_end: record.cancel_at_period_end,
            payment_method_brand: record.payment_method_brand.clone(),
            payment_method_last4: record.payment_method_last4.clone(),
        }
    }
}

impl TryFrom<db::models::subscription::Subscription> for SubscriptionRecord {
    type Error = String;

    fn try_from(row: db::models::subscription::Subscription) -> Result<Self, Self::Error> {
        Ok(SubscriptionRecord {
            status: row.status.parse()?,
            customer_id: row.customer_id,
            subscription_id: row.subscription_id,
            price_id: row.price_id,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
            payment_method_brand: row.payment_method_brand,
            payment_method_last4: row.payment_method_last4,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: SubscriptionStatus, price_id: Option<&str>) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            subscription_id: "sub_1".to_string(),
            price_id: price_id.map(str::to_string),
            status,
            current_period_start: 1_700_000_000,
            current_period_end: 1_702_592_000,
            cancel_at_period_end: false,
            payment_method: None,
        }
    }

    #[test]
    fn active_and_trialing_unlock_plan_tier() {
        for status in [SubscriptionStatus::Active, SubscriptionStatus::Trialing] {
            let record =
                SubscriptionRecord::from_snapshot("cus_1", snapshot(status, Some("price_pro_monthly")));
            assert_eq!(record.derived_tier(), Tier::Pro, "{}", status);
        }
    }

    #[test]
    fn every_other_status_is_free() {
        for status in [
            SubscriptionStatus::NotStarted,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Unpaid,
            SubscriptionStatus::Paused,
        ] {
            let record =
                SubscriptionRecord::from_snapshot("cus_1", snapshot(status, Some("price_pro_monthly")));
            assert_eq!(record.derived_tier(), Tier::Free, "{}", status);
        }
        assert_eq!(SubscriptionRecord::not_started("cus_1").derived_tier(), Tier::Free);
    }

    #[test]
    fn active_with_unknown_or_missing_price_is_free() {
        let unknown = SubscriptionRecord::from_snapshot(
            "cus_1",
            snapshot(SubscriptionStatus::Active, Some("price_legacy")),
        );
        let missing =
            SubscriptionRecord::from_snapshot("cus_1", snapshot(SubscriptionStatus::Active, None));
        assert_eq!(unknown.derived_tier(), Tier::Free);
        assert_eq!(missing.derived_tier(), Tier::Free);
    }

    #[test]
    fn maps_provider_statuses() {
        assert_eq!(SubscriptionStatus::from_provider("active"), SubscriptionStatus::Active);
        assert_eq!(SubscriptionStatus::from_provider("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete_expired"),
            SubscriptionStatus::Canceled
        );
        assert_eq!(
            SubscriptionStatus::from_provider("something_new"),
            SubscriptionStatus::Incomplete
        );
    }

    #[test]
    fn snapshot_fields_are_copied_verbatim() {
        let mut snap = snapshot(SubscriptionStatus::Active, Some("price_lite_monthly"));
        snap.cancel_at_period_end = true;
        snap.payment_method = Some(CardDisplay {
            brand: "visa".to_string(),
            last4: "4242".to_string(),
        });

        let record = SubscriptionRecord::from_snapshot("cus_9", snap);
        assert_eq!(record.customer_id, "cus_9");
        assert_eq!(record.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(record.current_period_start, Some(1_700_000_000));
        assert_eq!(record.current_period_end, Some(1_702_592_000));
        assert!(record.cancel_at_period_end);
        assert_eq!(record.payment_method_brand.as_deref(), Some("visa"));
        assert_eq!(record.payment_method_last4.as_deref(), Some("4242"));
    }
}
