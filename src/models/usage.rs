//! AI usage counters, bucketed per calendar month.
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    FlashcardGeneration,
    TestGeneration,
    TestGrading,
}

impl UsageKind {
    pub const ALL: [UsageKind; 3] = [
        UsageKind::FlashcardGeneration,
        UsageKind::TestGeneration,
        UsageKind::TestGrading,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UsageKind::FlashcardGeneration => "flashcard_generation",
            UsageKind::TestGeneration => "test_generation",
            UsageKind::TestGrading => "test_grading",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UsageKind::FlashcardGeneration => "AI flashcard generations",
            UsageKind::TestGeneration => "AI tests",
            UsageKind::TestGrading => "AI gradings",
        }
    }
}

/// A calendar month, stored as `YYYY-MM`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UsagePeriod(String);

impl UsagePeriod {
    pub fn containing(date: NaiveDate) -> Self {
        UsagePeriod(format!("{:04}-{:02}", date.year(), date.month()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub kind: UsageKind,
    pub period: UsagePeriod,
    pub used: u32,
    /// `None` means unlimited.
    pub limit: Option<u32>,
}

impl UsageSnapshot {
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|l| l.saturating_sub(self.used))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }

    pub fn display(&self) -> String {
        match self.limit {
            Some(limit) => format!("{}: {}/{}", self.kind.label(), self.used, limit),
            None => format!("{}: {} (unlimited)", self.kind.label(), self.used),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_is_year_month() {
        let d = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert_eq!(UsagePeriod::containing(d).as_str(), "2026-02");
    }

    #[test]
    fn snapshot_remaining() {
        let s = UsageSnapshot {
            kind: UsageKind::TestGeneration,
            period: UsagePeriod("2026-02".into()),
            used: 7,
            limit: Some(5),
        };
        assert_eq!(s.remaining(), Some(0));
        assert!(s.is_exhausted());
        assert_eq!(s.display(), "AI tests: 7/5");
    }
}
