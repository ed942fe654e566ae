//! SM-2 (SuperMemo 2) spaced repetition scheduling.
//!
//! - Each card carries an easiness factor (EF) adjusted after every review
//! - Grades 0-2 reset the repetition count and count as a lapse
//! - Grades 3-5 grow the interval: 1 day, then 6 days, then interval × EF
//! - EF never drops below 1.3

use super::CardProgress;
use chrono::{Days, NaiveDate};

pub const MIN_EASINESS: f64 = 1.3;
pub const MAX_QUALITY: u8 = 5;
/// Lowest grade that counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

/// Returns the progress after reviewing the card on `today` with `quality`
/// (0 = complete blackout, 5 = perfect response; larger values are clamped).
pub fn calculate_next_review(progress: &CardProgress, quality: u8, today: NaiveDate) -> CardProgress {
    let quality = quality.min(MAX_QUALITY);
    let q = f64::from(quality);

    let easiness =
        (progress.easiness + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02))).max(MIN_EASINESS);

    let passed = quality >= PASSING_QUALITY;
    let (interval_days, repetitions) = if passed {
        let reps = progress.repetitions + 1;
        let interval = match reps {
            1 => 1,
            2 => 6,
            _ => (f64::from(progress.interval_days) * easiness).round() as i32,
        };
        (interval, reps)
    } else {
        (0, 0)
    };

    let due_on = today
        .checked_add_days(Days::new(interval_days.max(0) as u64))
        .unwrap_or(NaiveDate::MAX);

    CardProgress {
        flashcard_id: progress.flashcard_id,
        easiness,
        interval_days,
        repetitions,
        due_on,
        last_reviewed_on: Some(today),
        total_reviews: progress.total_reviews + 1,
        lapses: progress.lapses + i32::from(!passed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn progress(easiness: f64, interval_days: i32, repetitions: i32) -> CardProgress {
        CardProgress {
            easiness,
            interval_days,
            repetitions,
            ..CardProgress::new(1, day(1))
        }
    }

    #[test]
    fn test_first_review() {
        let next = calculate_next_review(&progress(2.5, 0, 0), 4, day(1));
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.due_on, day(2));
        assert_eq!(next.last_reviewed_on, Some(day(1)));
        assert_eq!(next.total_reviews, 1);
        assert_eq!(next.lapses, 0);
    }

    #[test]
    fn test_second_review() {
        let next = calculate_next_review(&progress(2.5, 1, 1), 4, day(2));
        assert_eq!(next.interval_days, 6);
        assert_eq!(next.repetitions, 2);
        assert_eq!(next.due_on, day(8));
    }

    #[test]
    fn test_third_review_multiplies_by_easiness() {
        let next = calculate_next_review(&progress(2.5, 6, 2), 5, day(8));
        // EF rises to 2.6 on a perfect answer; 6 × 2.6 = 15.6
        assert_eq!(next.interval_days, 16);
        assert_eq!(next.repetitions, 3);
    }

    #[test]
    fn test_quality_below_3_resets_and_counts_lapse() {
        let next = calculate_next_review(&progress(2.5, 10, 5), 2, day(3));
        assert_eq!(next.interval_days, 0);
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.due_on, day(3));
        assert_eq!(next.lapses, 1);
        assert!(next.easiness < 2.5);
    }

    #[test]
    fn test_ef_floor() {
        let next = calculate_next_review(&progress(MIN_EASINESS, 1, 1), 0, day(1));
        assert!(next.easiness >= MIN_EASINESS);
    }

    #[test]
    fn test_quality_is_clamped() {
        let clamped = calculate_next_review(&progress(2.5, 0, 0), 9, day(1));
        let perfect = calculate_next_review(&progress(2.5, 0, 0), 5, day(1));
        assert_eq!(clamped, perfect);
    }
}
