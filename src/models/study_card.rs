//! Wrapper for flashcards that tracks progress within one study session.
use super::{CardProgress, Flashcard};

#[derive(Clone, Debug)]
pub struct StudyCard {
    pub flashcard: Flashcard,
    pub progress: CardProgress,
    /// Passed (grade >= 3) in the current round.
    pub is_learned: bool,
    pub attempts: u32,
}

impl StudyCard {
    pub fn new(flashcard: Flashcard, progress: CardProgress) -> Self {
        Self {
            flashcard,
            progress,
            is_learned: false,
            attempts: 0,
        }
    }

    pub fn record_attempt(&mut self, passed: bool) {
        self.attempts += 1;
        self.is_learned = passed;
    }
}
