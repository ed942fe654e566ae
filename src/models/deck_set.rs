//! Container for the decks listed on the main screen
use super::DeckSummary;

#[derive(Clone, Default)]
pub struct DeckSet {
    pub decks: Vec<DeckSummary>,
}

impl DeckSet {
    pub fn position_of(&self, deck_id: i64) -> Option<usize> {
        self.decks.iter().position(|d| d.id == deck_id)
    }

    pub fn total_cards(&self) -> usize {
        self.decks.iter().map(|d| d.card_count).sum()
    }
}
