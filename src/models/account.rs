//! Accounts and their subscription state.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Free => "Free",
            Tier::Pro => "Pro",
        })
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Active,
    Trialing,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Maps a payments-provider subscription status onto ours. Statuses that
    /// end the subscription collapse into `Canceled`.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" | "unpaid" | "incomplete_expired" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::None,
        }
    }

    /// Tier the account is entitled to while in this status.
    pub fn entitled_tier(self) -> Tier {
        match self {
            SubscriptionStatus::Active
            | SubscriptionStatus::Trialing
            | SubscriptionStatus::PastDue => Tier::Pro,
            SubscriptionStatus::None | SubscriptionStatus::Canceled => Tier::Free,
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SubscriptionStatus::None),
            "active" => Ok(SubscriptionStatus::Active),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(format!("unknown subscription status '{other}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub tier: Tier,
    pub subscription_status: SubscriptionStatus,
    pub billing_customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_round_trips_through_str() {
        assert_eq!("pro".parse::<Tier>().unwrap(), Tier::Pro);
        assert_eq!("FREE".parse::<Tier>().unwrap(), Tier::Free);
        assert!("gold".parse::<Tier>().is_err());
    }

    #[test]
    fn provider_statuses_map_to_entitlements() {
        assert_eq!(SubscriptionStatus::from_provider("trialing").entitled_tier(), Tier::Pro);
        assert_eq!(SubscriptionStatus::from_provider("past_due").entitled_tier(), Tier::Pro);
        assert_eq!(SubscriptionStatus::from_provider("unpaid"), SubscriptionStatus::Canceled);
        assert_eq!(SubscriptionStatus::from_provider("incomplete"), SubscriptionStatus::None);
        assert_eq!(SubscriptionStatus::Canceled.entitled_tier(), Tier::Free);
    }
}
