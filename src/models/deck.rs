//! Deck is a named set of flashcards owned by an account
use super::Flashcard;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deck {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub flashcards: Vec<Flashcard>,
}

impl Default for Deck {
    fn default() -> Self {
        Self {
            id: 0,
            name: "My Deck".to_string(),
            description: String::new(),
            flashcards: Vec::new(),
        }
    }
}

/// Deck row without its cards, as shown in deck lists.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeckSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub card_count: usize,
    pub due_count: usize,
}
