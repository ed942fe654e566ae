//! JSON import/export for flashcard decks.
//! Saves and loads `Deck` structures to/from JSON files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::AppError;
use crate::models::Deck;

/// Exports a deck to a pretty-printed JSON file at `path`.
pub fn export_json_to_path(deck: &Deck, path: &Path) -> Result<(), AppError> {
    let json_string = serde_json::to_string_pretty(deck)?;
    fs::write(path, json_string)?;
    info!(deck = %deck.name, path = %path.display(), cards = deck.flashcards.len(), "deck exported");
    Ok(())
}

/// Imports a deck from a JSON file. See [`parse_deck`].
pub fn import_json(path: &Path) -> Result<Deck, AppError> {
    let contents = fs::read_to_string(path)?;
    let deck = parse_deck(&contents)?;
    info!(deck = %deck.name, path = %path.display(), "deck read from file");
    Ok(deck)
}

/// Parses and cleans a deck: trimmed name, blank cards dropped, repeated
/// fronts keep their first occurrence.
pub fn parse_deck(contents: &str) -> Result<Deck, AppError> {
    let mut deck: Deck = serde_json::from_str(contents)?;
    deck.name = deck.name.trim().to_string();
    if deck.name.is_empty() {
        return Err(AppError::Validation("deck name is empty".into()));
    }
    deck.description = deck.description.trim().to_string();

    let mut seen = HashSet::new();
    deck.flashcards = deck
        .flashcards
        .iter()
        .filter_map(|c| c.normalized())
        .filter(|c| seen.insert(c.front.to_lowercase()))
        .collect();
    Ok(deck)
}
