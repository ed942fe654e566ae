//! Subscription tier limits and their enforcement.
//!
//! Content limits (decks, cards per deck) are checked against the live row
//! counts. AI allowances are monthly counters: callers check
//! [`ensure_ai_allowance`] before calling the model and
//! [`record_ai_usage`] only after the model actually produced the result, so
//! heuristic fallbacks never consume allowance.

use chrono::NaiveDate;
use rusqlite::Connection;
use thiserror::Error;
use tracing::debug;

use crate::database::{db, usage};
use crate::error::AppError;
use crate::models::{Account, Tier, UsageKind, UsagePeriod, UsageSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierLimits {
    /// `None` means unlimited.
    pub max_decks: Option<usize>,
    pub max_cards_per_deck: Option<usize>,
    pub monthly_flashcard_generations: u32,
    pub monthly_test_generations: u32,
    pub monthly_test_gradings: u32,
}

pub const FREE_LIMITS: TierLimits = TierLimits {
    max_decks: Some(3),
    max_cards_per_deck: Some(50),
    monthly_flashcard_generations: 10,
    monthly_test_generations: 5,
    monthly_test_gradings: 5,
};

pub const PRO_LIMITS: TierLimits = TierLimits {
    max_decks: None,
    max_cards_per_deck: None,
    monthly_flashcard_generations: 500,
    monthly_test_generations: 200,
    monthly_test_gradings: 200,
};

impl TierLimits {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => FREE_LIMITS,
            Tier::Pro => PRO_LIMITS,
        }
    }

    pub fn monthly_allowance(&self, kind: UsageKind) -> u32 {
        match kind {
            UsageKind::FlashcardGeneration => self.monthly_flashcard_generations,
            UsageKind::TestGeneration => self.monthly_test_generations,
            UsageKind::TestGrading => self.monthly_test_gradings,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LimitError {
    #[error("the {tier} plan allows at most {limit} decks; upgrade to create more")]
    DeckLimit { tier: Tier, limit: usize },

    #[error("the {tier} plan allows at most {limit} cards per deck (this deck has {current})")]
    CardLimit { tier: Tier, limit: usize, current: usize },

    #[error("monthly limit reached for {}: {used}/{limit} on the {tier} plan", .kind.label())]
    AiLimit { tier: Tier, kind: UsageKind, limit: u32, used: u32 },
}

pub fn ensure_can_create_deck(account: &Account, conn: &Connection) -> Result<(), AppError> {
    let limits = TierLimits::for_tier(account.tier);
    if let Some(limit) = limits.max_decks {
        let current = db::count_decks(account.id, conn)?;
        if current >= limit {
            return Err(LimitError::DeckLimit { tier: account.tier, limit }.into());
        }
    }
    Ok(())
}

/// How many more cards the deck may hold; `None` when unlimited.
pub fn remaining_card_capacity(
    account: &Account,
    deck_id: i64,
    conn: &Connection,
) -> Result<Option<usize>, AppError> {
    let limits = TierLimits::for_tier(account.tier);
    match limits.max_cards_per_deck {
        Some(limit) => {
            let current = db::count_flashcards(deck_id, conn)?;
            Ok(Some(limit.saturating_sub(current)))
        }
        None => Ok(None),
    }
}

pub fn ensure_can_add_cards(
    account: &Account,
    deck_id: i64,
    count: usize,
    conn: &Connection,
) -> Result<(), AppError> {
    let limits = TierLimits::for_tier(account.tier);
    if let Some(limit) = limits.max_cards_per_deck {
        let current = db::count_flashcards(deck_id, conn)?;
        if current + count > limit {
            return Err(LimitError::CardLimit { tier: account.tier, limit, current }.into());
        }
    }
    Ok(())
}

fn snapshot(
    account: &Account,
    kind: UsageKind,
    today: NaiveDate,
    conn: &Connection,
) -> Result<UsageSnapshot, AppError> {
    let period = UsagePeriod::containing(today);
    let used = usage::get_usage(account.id, &period, kind, conn)?;
    Ok(UsageSnapshot {
        kind,
        period,
        used,
        limit: Some(TierLimits::for_tier(account.tier).monthly_allowance(kind)),
    })
}

/// Fails with [`LimitError::AiLimit`] when the month's allowance is used up.
pub fn ensure_ai_allowance(
    account: &Account,
    kind: UsageKind,
    today: NaiveDate,
    conn: &Connection,
) -> Result<UsageSnapshot, AppError> {
    let snap = snapshot(account, kind, today, conn)?;
    if let Some(limit) = snap.limit {
        if snap.used >= limit {
            return Err(LimitError::AiLimit {
                tier: account.tier,
                kind,
                limit,
                used: snap.used,
            }
            .into());
        }
    }
    Ok(snap)
}

pub fn record_ai_usage(
    account: &Account,
    kind: UsageKind,
    today: NaiveDate,
    conn: &Connection,
) -> Result<UsageSnapshot, AppError> {
    let period = UsagePeriod::containing(today);
    let used = usage::increment_usage(account.id, &period, kind, 1, conn)?;
    debug!(account_id = account.id, kind = kind.as_str(), used, "ai usage recorded");
    Ok(UsageSnapshot {
        kind,
        period,
        used,
        limit: Some(TierLimits::for_tier(account.tier).monthly_allowance(kind)),
    })
}

pub fn usage_summary(
    account: &Account,
    today: NaiveDate,
    conn: &Connection,
) -> Result<Vec<UsageSnapshot>, AppError> {
    UsageKind::ALL
        .iter()
        .map(|&kind| snapshot(account, kind, today, conn))
        .collect()
}
