//! Flashcard generation from a topic or pasted study material.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{info, warn};

use super::json::parse_json;
use super::prompts::{PromptKind, Prompts};
use super::{AiError, Generated};
use crate::llm::LlmProvider;
use crate::models::Flashcard;

pub const MAX_GENERATED_CARDS: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct FlashcardRequest {
    pub topic: String,
    pub source_text: String,
    pub count: usize,
}

impl FlashcardRequest {
    fn validate(&self) -> Result<(), AiError> {
        if self.count == 0 || self.count > MAX_GENERATED_CARDS {
            return Err(AiError::InvalidRequest(format!(
                "card count must be between 1 and {MAX_GENERATED_CARDS}"
            )));
        }
        if self.topic.trim().is_empty() && self.source_text.trim().is_empty() {
            return Err(AiError::InvalidRequest("a topic or source text is required".into()));
        }
        Ok(())
    }
}

pub fn generate_flashcards(
    provider: &LlmProvider,
    prompts: &Prompts,
    request: &FlashcardRequest,
) -> Result<Generated<Flashcard>, AiError> {
    request.validate()?;

    let count = request.count.to_string();
    let topic = non_blank(&request.topic, "(derive it from the material)");
    let source = non_blank(&request.source_text, "(none given, use general knowledge of the topic)");
    let prompt = prompts.render(
        PromptKind::Flashcards,
        &[("count", &count), ("topic", topic), ("source", source)],
    );

    match provider.complete(&prompt) {
        Ok(reply) => {
            let cards = parse_flashcards(&reply, request.count);
            if !cards.is_empty() {
                info!(count = cards.len(), provider = provider.name(), "generated flashcards");
                return Ok(Generated::ai(cards));
            }
            warn!("model reply held no usable flashcards, using fallback");
        }
        Err(e) => warn!(error = %e, provider = provider.name(), "flashcard generation failed, using fallback"),
    }

    let cards = fallback_flashcards(&request.source_text, request.count);
    if cards.is_empty() {
        return Err(AiError::NothingGenerated(
            "the AI is unavailable and the source text has no 'term: definition' lines".into(),
        ));
    }
    info!(count = cards.len(), "extracted flashcards from source text");
    Ok(Generated::fallback(cards))
}

fn non_blank<'a>(s: &'a str, default: &'a str) -> &'a str {
    if s.trim().is_empty() { default } else { s.trim() }
}

/// Accepts a bare array or an object wrapping it under `flashcards`/`cards`.
/// Items that don't look like flashcards are skipped.
pub fn parse_flashcards(reply: &str, max: usize) -> Vec<Flashcard> {
    let Some(value) = parse_json::<Value>(reply) else {
        return Vec::new();
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("flashcards").or_else(|| map.remove("cards")) {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let cards = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Flashcard>(item).ok());
    dedupe(cards, max)
}

/// Trims, drops blanks, keeps the first card per front (case-insensitive).
fn dedupe(cards: impl Iterator<Item = Flashcard>, max: usize) -> Vec<Flashcard> {
    let mut seen = HashSet::new();
    cards
        .filter_map(|c| c.normalized())
        .filter(|c| seen.insert(c.front.to_lowercase()))
        .take(max)
        .collect()
}

const SEPARATORS: [&str; 4] = [":", " - ", " – ", "="];

/// Reads `term: definition`, `term - definition` and `term = definition`
/// lines, ignoring list bullets and numbering.
pub fn fallback_flashcards(source: &str, max: usize) -> Vec<Flashcard> {
    let cards = source.lines().filter_map(|line| {
        let line = strip_bullet(line.trim());
        let (at, sep) = SEPARATORS
            .iter()
            .filter_map(|sep| line.find(sep).map(|at| (at, *sep)))
            .min_by_key(|(at, _)| *at)?;
        let front = line[..at].trim();
        let back = line[at + sep.len()..].trim();
        // Long "fronts" are sentences that merely contain a colon.
        if front.chars().count() > 80 {
            return None;
        }
        Some(Flashcard::new(front, back))
    });
    dedupe(cards, max)
}

fn strip_bullet(line: &str) -> &str {
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }
    line
}
