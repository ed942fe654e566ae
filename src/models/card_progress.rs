//! Spaced-repetition state of a single flashcard.
use chrono::NaiveDate;
use serde::Serialize;

pub const DEFAULT_EASINESS: f64 = 2.5;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardProgress {
    pub flashcard_id: i64,
    pub easiness: f64,
    pub interval_days: i32,
    pub repetitions: i32,
    pub due_on: NaiveDate,
    pub last_reviewed_on: Option<NaiveDate>,
    pub total_reviews: i32,
    /// Reviews graded below 3.
    pub lapses: i32,
}

impl CardProgress {
    /// Progress of a card that has never been reviewed: due immediately.
    pub fn new(flashcard_id: i64, today: NaiveDate) -> Self {
        Self {
            flashcard_id,
            easiness: DEFAULT_EASINESS,
            interval_days: 0,
            repetitions: 0,
            due_on: today,
            last_reviewed_on: None,
            total_reviews: 0,
            lapses: 0,
        }
    }

    /// Share of reviews that were recalled (grade >= 3).
    pub fn retention(&self) -> Option<f64> {
        if self.total_reviews == 0 {
            return None;
        }
        Some(f64::from(self.total_reviews - self.lapses) / f64::from(self.total_reviews))
    }
}
