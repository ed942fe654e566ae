//! Plans and price display.

use serde::Serialize;

use crate::config::BillingConfig;
use crate::limits::TierLimits;
use crate::models::Tier;

/// Currencies without minor units.
const ZERO_DECIMAL: &[&str] = &["JPY", "KRW", "VND", "CLP", "ISK", "HUF", "TWD", "UGX"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub tier: Tier,
    /// Smallest currency unit; `0` for the free plan.
    pub price_cents: u32,
    pub currency: String,
}

impl Plan {
    pub fn free() -> Self {
        Self { tier: Tier::Free, price_cents: 0, currency: "usd".into() }
    }

    pub fn pro(config: &BillingConfig) -> Self {
        Self {
            tier: Tier::Pro,
            price_cents: config.pro_price_cents,
            currency: config.currency.clone(),
        }
    }

    pub fn for_tier(tier: Tier, config: &BillingConfig) -> Self {
        match tier {
            Tier::Free => Self::free(),
            Tier::Pro => Self::pro(config),
        }
    }

    /// `"Free"` or e.g. `"$9.99/month"`.
    pub fn price_label(&self) -> String {
        if self.price_cents == 0 {
            "Free".to_string()
        } else {
            format!("{}/month", format_price(self.price_cents, &self.currency))
        }
    }

    /// Bullet points for the plan card.
    pub fn features(&self) -> Vec<String> {
        let limits = TierLimits::for_tier(self.tier);
        let count = |limit: Option<usize>, noun: &str| match limit {
            Some(n) => format!("Up to {n} {noun}"),
            None => format!("Unlimited {noun}"),
        };
        vec![
            count(limits.max_decks, "decks"),
            count(limits.max_cards_per_deck, "cards per deck"),
            format!("{} AI flashcard generations a month", limits.monthly_flashcard_generations),
            format!("{} AI practice tests a month", limits.monthly_test_generations),
            format!("{} AI gradings a month", limits.monthly_test_gradings),
        ]
    }
}

/// Formats an amount in the smallest currency unit.
///
/// `$`, `€`, `£` and `¥` prefix the amount; other currencies get their code
/// as a suffix (`12.00 CHF`). Zero-decimal currencies print no fraction.
/// Amounts are not grouped: `¥1200`, `$1234567.89`.
pub fn format_price(amount: u32, currency: &str) -> String {
    let code = currency.trim().to_ascii_uppercase();
    let number = if ZERO_DECIMAL.contains(&code.as_str()) {
        amount.to_string()
    } else {
        format!("{}.{:02}", amount / 100, amount % 100)
    };
    match code.as_str() {
        "USD" => format!("${number}"),
        "EUR" => format!("€{number}"),
        "GBP" => format!("£{number}"),
        "JPY" => format!("¥{number}"),
        _ => format!("{number} {code}"),
    }
}
