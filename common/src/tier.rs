//! Plan catalog: which Stripe price ids unlock which tier, and what each tier allows.
//!
//! The price ids below must match the prices configured in the Stripe dashboard.
//! A mismatch cannot be detected at runtime: an unknown price id simply resolves
//! to `Tier::Free`, so a misconfigured deployment never grants a paid tier.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Lite,
    Pro,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Lite => "lite",
            Tier::Pro => "pro",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "lite" => Ok(Tier::Lite),
            "pro" => Ok(Tier::Pro),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// Daily analysis allowance. Serialized as a number, or `null` when unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyLimit {
    Limited(u32),
    Unlimited,
}

impl Serialize for DailyLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DailyLimit::Limited(n) => serializer.serialize_u32(*n),
            DailyLimit::Unlimited => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierLimits {
    #[serde(rename = "dailyLimit")]
    pub daily_limit: DailyLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    pub plan_id: &'static str,
    pub tier: Tier,
    pub daily_limit: DailyLimit,
    pub name: &'static str,
    /// Price in cents.
    pub price: i64,
    pub interval: BillingInterval,
}

pub const FREE_DAILY_LIMIT: u32 = 3;
pub const LITE_DAILY_LIMIT: u32 = 25;

pub const PLAN_CATALOG: &[PlanEntry] = &[
    PlanEntry {
        plan_id: "price_lite_monthly",
        tier: Tier::Lite,
        daily_limit: DailyLimit::Limited(LITE_DAILY_LIMIT),
        name: "Lite",
        price: 999,
        interval: BillingInterval::Month,
    },
    PlanEntry {
        plan_id: "price_lite_yearly",
        tier: Tier::Lite,
        daily_limit: DailyLimit::Limited(LITE_DAILY_LIMIT),
        name: "Lite (annual)",
        price: 9_590,
        interval: BillingInterval::Year,
    },
    PlanEntry {
        plan_id: "price_pro_monthly",
        tier: Tier::Pro,
        daily_limit: DailyLimit::Unlimited,
        name: "Pro",
        price: 2_999,
        interval: BillingInterval::Month,
    },
    PlanEntry {
        plan_id: "price_pro_yearly",
        tier: Tier::Pro,
        daily_limit: DailyLimit::Unlimited,
        name: "Pro (annual)",
        price: 28_790,
        interval: BillingInterval::Year,
    },
];

/// Tier unlocked by a price id. Unknown ids map to `Tier::Free`.
pub fn tier_for_plan(plan_id: &str) -> Tier {
    PLAN_CATALOG
        .iter()
        .find(|entry| entry.plan_id == plan_id)
        .map(|entry| entry.tier)
        .unwrap_or(Tier::Free)
}

pub fn limits_for(tier: Tier) -> TierLimits {
    let daily_limit = match tier {
        Tier::Free => DailyLimit::Limited(FREE_DAILY_LIMIT),
        Tier::Lite => DailyLimit::Limited(LITE_DAILY_LIMIT),
        Tier::Pro => DailyLimit::Unlimited,
    };
    TierLimits { daily_limit }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_plans_resolve_to_their_tier() {
        assert_eq!(tier_for_plan("price_lite_monthly"), Tier::Lite);
        assert_eq!(tier_for_plan("price_pro_yearly"), Tier::Pro);
    }

    #[test]
    fn unknown_plan_is_free() {
        assert_eq!(tier_for_plan("price_does_not_exist"), Tier::Free);
        assert_eq!(tier_for_plan(""), Tier::Free);
    }

    #[test]
    fn catalog_limits_agree_with_tier_limits() {
        for entry in PLAN_CATALOG {
            assert_eq!(limits_for(entry.tier).daily_limit, entry.daily_limit, "{}", entry.plan_id);
        }
    }

    #[test]
    fn plan_ids_are_unique() {
        let mut ids: Vec<_> = PLAN_CATALOG.iter().map(|e| e.plan_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), PLAN_CATALOG.len());
    }

    #[test]
    fn serializes_for_front_end() {
        let json = serde_json::to_value(PLAN_CATALOG[2]).unwrap();
        assert_eq!(json["planId"], "price_pro_monthly");
        assert_eq!(json["tier"], "pro");
        assert_eq!(json["dailyLimit"], serde_json::Value::Null);
        assert_eq!(json["interval"], "month");

        let limits = serde_json::to_value(limits_for(Tier::Free)).unwrap();
        assert_eq!(limits["dailyLimit"], 3);
    }

    #[test]
    fn tier_round_trips_through_text() {
        assert_eq!("lite".parse::<Tier>(), Ok(Tier::Lite));
        assert!("gold".parse::<Tier>().is_err());
        assert_eq!(Tier::Pro.to_string(), "pro");
    }
}
