//! Test-question generation from a deck's flashcards.
//!
//! Model output is validated question by question; whatever survives is
//! topped up with templated questions built from the cards themselves.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::json::parse_json;
use super::prompts::{PromptKind, Prompts};
use super::{AiError, Generated};
use crate::llm::LlmProvider;
use crate::models::{Deck, Flashcard, QuestionKind, TestQuestion};

pub const MAX_TEST_QUESTIONS: usize = 30;
pub const DEFAULT_TEST_QUESTIONS: usize = 10;
const MC_OPTIONS: usize = 4;
const TOPIC_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, Copy)]
pub struct QuestionRequest {
    pub count: usize,
}

impl Default for QuestionRequest {
    fn default() -> Self {
        Self { count: DEFAULT_TEST_QUESTIONS }
    }
}

pub fn generate_questions(
    provider: &LlmProvider,
    prompts: &Prompts,
    deck: &Deck,
    request: QuestionRequest,
) -> Result<Generated<TestQuestion>, AiError> {
    if request.count == 0 || request.count > MAX_TEST_QUESTIONS {
        return Err(AiError::InvalidRequest(format!(
            "question count must be between 1 and {MAX_TEST_QUESTIONS}"
        )));
    }
    if deck.flashcards.is_empty() {
        return Err(AiError::NoFlashcards);
    }

    let cards: String = deck
        .flashcards
        .iter()
        .map(|c| format!("- {} => {}", c.front, c.back))
        .collect::<Vec<_>>()
        .join("\n");
    let count = request.count.to_string();
    let prompt = prompts.render(
        PromptKind::Questions,
        &[("deck_name", &deck.name), ("count", &count), ("cards", &cards)],
    );

    let mut questions = match provider.complete(&prompt) {
        Ok(reply) => parse_questions(&reply, deck),
        Err(e) => {
            warn!(error = %e, provider = provider.name(), "question generation failed, using templates");
            Vec::new()
        }
    };
    questions.truncate(request.count);

    let from_model = questions.len();
    if from_model < request.count {
        let mut seen: HashSet<String> = questions.iter().map(|q| q.prompt.to_lowercase()).collect();
        for q in templated_questions(deck, request.count) {
            if questions.len() >= request.count {
                break;
            }
            if seen.insert(q.prompt.to_lowercase()) {
                questions.push(q);
            }
        }
    }
    info!(
        total = questions.len(),
        from_model,
        deck = %deck.name,
        "generated test questions"
    );

    if from_model > 0 {
        Ok(Generated::ai(questions))
    } else {
        Ok(Generated::fallback(questions))
    }
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(rename = "type", alias = "kind", default)]
    kind: String,
    #[serde(default)]
    topic: String,
    #[serde(alias = "prompt", default)]
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(alias = "correct_answer", default)]
    answer: Value,
    #[serde(default)]
    explanation: String,
}

/// Valid questions from a model reply; malformed entries are dropped.
pub fn parse_questions(reply: &str, deck: &Deck) -> Vec<TestQuestion> {
    let Some(value) = parse_json::<Value>(reply) else {
        debug!("question reply held no JSON");
        return Vec::new();
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawQuestion>(item).ok())
        .filter_map(|raw| convert(raw, deck))
        .filter(|q| seen.insert(q.prompt.to_lowercase()))
        .collect()
}

fn convert(raw: RawQuestion, deck: &Deck) -> Option<TestQuestion> {
    let prompt = raw.question.trim().to_string();
    if prompt.is_empty() {
        return None;
    }
    let kind_name = raw.kind.trim().to_lowercase().replace(['-', ' ', '/'], "_");
    let kind = match kind_name.as_str() {
        "multiple_choice" | "mc" | "multiple" | "choice" => {
            let options: Vec<String> = raw
                .options
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            if options.len() < 2 {
                return None;
            }
            let correct_index = choice_index(&raw.answer, &options)?;
            QuestionKind::MultipleChoice { options, correct_index }
        }
        "true_false" | "tf" | "boolean" | "true_or_false" => QuestionKind::TrueFalse {
            answer: bool_answer(&raw.answer)?,
        },
        "short_answer" | "short" | "open" | "open_ended" => {
            let expected = match &raw.answer {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            if expected.is_empty() {
                return None;
            }
            QuestionKind::ShortAnswer { expected }
        }
        other => {
            debug!(kind = other, "dropping question of unknown type");
            return None;
        }
    };

    let card = matching_card(&prompt, deck);
    let topic = match raw.topic.trim() {
        "" => card.map(topic_for).unwrap_or_else(|| deck.name.clone()),
        t => t.to_string(),
    };
    Some(TestQuestion {
        id: 0,
        topic,
        prompt,
        kind,
        explanation: raw.explanation.trim().to_string(),
        flashcard_id: card.map(|c| c.id).filter(|id| *id > 0),
    })
}

/// Accepts an index, a numeric string, the option text or a letter (`"B"`).
fn choice_index(answer: &Value, options: &[String]) -> Option<usize> {
    let index = match answer {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => {
            let s = s.trim();
            let letter = s.trim_end_matches([')', '.']);
            if let Ok(n) = s.parse::<usize>() {
                Some(n)
            } else if let Some(pos) = options.iter().position(|o| o.eq_ignore_ascii_case(s)) {
                Some(pos)
            } else if letter.len() == 1 && letter.chars().all(|c| c.is_ascii_alphabetic()) {
                let c = letter.to_ascii_lowercase().as_bytes()[0];
                Some((c - b'a') as usize)
            } else {
                None
            }
        }
        _ => None,
    }?;
    (index < options.len()).then_some(index)
}

fn bool_answer(answer: &Value) -> Option<bool> {
    match answer {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" => Some(true),
            "false" | "f" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn matching_card<'a>(prompt: &str, deck: &'a Deck) -> Option<&'a Flashcard> {
    let prompt = prompt.to_lowercase();
    deck.flashcards
        .iter()
        .filter(|c| !c.front.trim().is_empty())
        .find(|c| prompt.contains(&c.front.to_lowercase()))
}

fn topic_for(card: &Flashcard) -> String {
    let front = card.front.trim();
    if front.chars().count() <= TOPIC_MAX_CHARS {
        front.to_string()
    } else {
        let cut: String = front.chars().take(TOPIC_MAX_CHARS - 1).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Deterministic questions straight from the cards.
///
/// Cycles through the cards; each pass shifts the question type so a card
/// that appears twice is asked in a different form.
pub fn templated_questions(deck: &Deck, count: usize) -> Vec<TestQuestion> {
    let cards = &deck.flashcards;
    let n = cards.len();
    if n == 0 {
        return Vec::new();
    }
    (0..count.min(n * 3))
        .map(|i| {
            let card = &cards[i % n];
            let others: Vec<&Flashcard> = cards
                .iter()
                .filter(|c| !c.back.eq_ignore_ascii_case(&card.back))
                .collect();
            let (prompt, kind, explanation) = match (i + i / n) % 3 {
                0 if !others.is_empty() => multiple_choice(card, &others, i),
                1 => true_false(card, &others, i),
                _ => short_answer(card),
            };
            TestQuestion {
                id: 0,
                topic: topic_for(card),
                prompt,
                kind,
                explanation,
                flashcard_id: (card.id > 0).then_some(card.id),
            }
        })
        .collect()
}

fn multiple_choice(card: &Flashcard, others: &[&Flashcard], i: usize) -> (String, QuestionKind, String) {
    let mut distractors: Vec<String> = Vec::new();
    for other in others.iter().cycle().skip(i % others.len()).take(others.len()) {
        if distractors.len() + 1 >= MC_OPTIONS {
            break;
        }
        if !distractors.iter().any(|d| d.eq_ignore_ascii_case(&other.back)) {
            distractors.push(other.back.clone());
        }
    }
    let correct_index = i % (distractors.len() + 1);
    let mut options = distractors;
    options.insert(correct_index, card.back.clone());
    (
        format!("Which of these matches \"{}\"?", card.front),
        QuestionKind::MultipleChoice { options, correct_index },
        format!("\"{}\" means \"{}\".", card.front, card.back),
    )
}

fn true_false(card: &Flashcard, others: &[&Flashcard], i: usize) -> (String, QuestionKind, String) {
    let use_other = !others.is_empty() && i % 2 == 0;
    let (shown, answer) = if use_other {
        (&others[i % others.len()].back, false)
    } else {
        (&card.back, true)
    };
    (
        format!("True or false: \"{}\" means \"{}\".", card.front, shown),
        QuestionKind::TrueFalse { answer },
        format!("\"{}\" means \"{}\".", card.front, card.back),
    )
}

fn short_answer(card: &Flashcard) -> (String, QuestionKind, String) {
    (
        format!("What does \"{}\" mean?", card.front),
        QuestionKind::ShortAnswer { expected: card.back.clone() },
        String::new(),
    )
}
