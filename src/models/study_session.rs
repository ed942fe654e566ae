//! Study session management for spaced repetition practice.
//! Handles multi-round flashcard review with SM-2 scheduling.

use super::sm2::{self, PASSING_QUALITY};
use super::{CardProgress, Flashcard, StudyCard};
use chrono::NaiveDate;
use serde::Serialize;

/// A study session with multiple review rounds.
/// Cards that aren't mastered (grade < 3) are repeated in subsequent rounds.
///
/// The session only holds state; persisting the progress returned by
/// [`StudySession::grade_current_card`] is up to the caller.
pub struct StudySession {
    pub deck_id: i64,
    pub deck_name: String,
    pub started_on: NaiveDate,
    pub cards: Vec<StudyCard>,
    pub current_round_cards: Vec<usize>,
    pub current_index: usize,
    pub show_back: bool,
    pub round_number: usize,
}

/// Outcome of a finished (or abandoned) session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StudySummary {
    pub deck_id: i64,
    pub started_on: NaiveDate,
    pub rounds: usize,
    pub cards_studied: usize,
    /// Cards recalled on the first attempt.
    pub cards_passed: usize,
}

impl StudySession {
    /// Creates a session from cards that are due for review.
    pub fn new_from_due_cards(
        deck_id: i64,
        deck_name: String,
        cards: Vec<(Flashcard, CardProgress)>,
        today: NaiveDate,
    ) -> Self {
        let cards: Vec<StudyCard> = cards
            .into_iter()
            .map(|(fc, progress)| StudyCard::new(fc, progress))
            .collect();
        let indices = (0..cards.len()).collect();

        Self {
            deck_id,
            deck_name,
            started_on: today,
            cards,
            current_round_cards: indices,
            current_index: 0,
            show_back: false,
            round_number: 1,
        }
    }

    pub fn current_card(&self) -> Option<&StudyCard> {
        self.current_round_cards
            .get(self.current_index)
            .and_then(|&idx| self.cards.get(idx))
    }

    pub fn toggle_back(&mut self) {
        self.show_back = !self.show_back;
    }

    pub fn next_card(&mut self) {
        if self.current_index + 1 < self.current_round_cards.len() {
            self.current_index += 1;
            self.show_back = false;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with the cards that weren't mastered.
    /// If none remain, the session is complete.
    fn start_next_round(&mut self) {
        let failed: Vec<usize> = self
            .current_round_cards
            .iter()
            .copied()
            .filter(|&idx| self.cards.get(idx).is_some_and(|card| !card.is_learned))
            .collect();

        if failed.is_empty() {
            return;
        }

        self.current_round_cards = failed;
        self.current_index = 0;
        self.show_back = false;
        self.round_number += 1;
    }

    /// Grades the current card with SM-2 and returns its new progress.
    pub fn grade_current_card(&mut self, quality: u8, today: NaiveDate) -> Option<CardProgress> {
        let idx = *self.current_round_cards.get(self.current_index)?;
        let card = self.cards.get_mut(idx)?;

        card.record_attempt(quality >= PASSING_QUALITY);
        let next = sm2::calculate_next_review(&card.progress, quality, today);
        card.progress = next.clone();
        Some(next)
    }

    pub fn learned_count(&self) -> usize {
        self.current_round_cards
            .iter()
            .filter(|&&idx| self.cards.get(idx).is_some_and(|card| card.is_learned))
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round_cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.learned_count()
    }

    /// True when the current round is empty or every card in it passed.
    pub fn is_completed(&self) -> bool {
        self.current_round_cards.is_empty() || self.learned_count() == self.total_count()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Review): {} cards to retry",
                self.round_number,
                self.total_count()
            )
        }
    }

    pub fn summary(&self) -> StudySummary {
        let studied: Vec<&StudyCard> = self.cards.iter().filter(|c| c.attempts > 0).collect();
        StudySummary {
            deck_id: self.deck_id,
            started_on: self.started_on,
            rounds: self.round_number,
            cards_studied: studied.len(),
            cards_passed: studied
                .iter()
                .filter(|c| c.attempts == 1 && c.is_learned)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    fn session(n: usize) -> StudySession {
        let cards = (0..n)
            .map(|i| {
                let mut fc = Flashcard::new(format!("front {i}"), format!("back {i}"));
                fc.id = i as i64 + 1;
                let progress = CardProgress::new(fc.id, today());
                (fc, progress)
            })
            .collect();
        StudySession::new_from_due_cards(1, "Deck".into(), cards, today())
    }

    #[test]
    fn all_passed_completes_in_one_round() {
        let mut s = session(2);
        for _ in 0..2 {
            assert!(s.grade_current_card(4, today()).is_some());
            s.next_card();
        }
        assert!(s.is_completed());
        assert_eq!(s.round_number, 1);
        let summary = s.summary();
        assert_eq!(summary.cards_studied, 2);
        assert_eq!(summary.cards_passed, 2);
    }

    #[test]
    fn failed_cards_repeat_in_next_round() {
        let mut s = session(3);
        s.grade_current_card(5, today());
        s.next_card();
        s.grade_current_card(1, today());
        s.next_card();
        s.grade_current_card(4, today());
        s.next_card();

        assert_eq!(s.round_number, 2);
        assert_eq!(s.total_count(), 1);
        assert!(!s.is_completed());
        assert_eq!(s.current_card().unwrap().flashcard.front, "front 1");
        assert!(s.phase_message().contains("Review"));

        s.grade_current_card(3, today());
        s.next_card();
        assert!(s.is_completed());

        let summary = s.summary();
        assert_eq!(summary.rounds, 2);
        assert_eq!(summary.cards_studied, 3);
        assert_eq!(summary.cards_passed, 2);
    }

    #[test]
    fn grading_returns_updated_progress() {
        let mut s = session(1);
        let progress = s.grade_current_card(4, today()).unwrap();
        assert_eq!(progress.flashcard_id, 1);
        assert_eq!(progress.repetitions, 1);
        assert_eq!(s.cards[0].progress, progress);
    }

    #[test]
    fn empty_session_is_complete_and_safe() {
        let mut s = session(0);
        assert!(s.is_completed());
        assert!(s.current_card().is_none());
        assert!(s.grade_current_card(5, today()).is_none());
        s.next_card();
        assert_eq!(s.remaining_count(), 0);
    }
}
