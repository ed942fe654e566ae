//! Short-answer grading: one batched model call, keyword recall as fallback.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::ai::json::parse_json;
use crate::ai::{PromptKind, Prompts};
use crate::llm::LlmProvider;
use crate::models::GradedResponse;

/// Minimum score counted as a correct answer.
pub const PASS_SCORE: f64 = 0.6;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "of", "to", "in", "on", "at", "for", "and", "or", "is", "are", "was",
    "were", "be", "by", "it", "its", "as", "that", "this", "with", "from", "which", "who",
];

#[derive(Debug, Clone)]
pub struct ShortAnswerItem<'a> {
    pub question_id: i64,
    pub prompt: &'a str,
    pub expected: &'a str,
    pub answer: &'a str,
}

#[derive(Debug, Deserialize)]
struct RawGrade {
    id: usize,
    score: f64,
    #[serde(default)]
    feedback: String,
}

/// Grades every item. Returns whether the model contributed any grade.
pub fn grade_short_answers(
    provider: &LlmProvider,
    prompts: &Prompts,
    items: &[ShortAnswerItem<'_>],
) -> (Vec<GradedResponse>, bool) {
    // Blank answers never reach the model.
    let answered: Vec<usize> = (0..items.len())
        .filter(|&i| !items[i].answer.trim().is_empty())
        .collect();

    let mut from_model: HashMap<usize, RawGrade> = HashMap::new();
    if !answered.is_empty() {
        let listing = answered
            .iter()
            .map(|&i| {
                let item = &items[i];
                format!(
                    "id: {}\nQuestion: {}\nExpected answer: {}\nStudent answer: {}",
                    i + 1,
                    item.prompt,
                    item.expected,
                    item.answer.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = prompts.render(PromptKind::ShortAnswerGrading, &[("answers", &listing)]);

        match provider.complete(&prompt) {
            Ok(reply) => {
                for grade in parse_json::<Vec<RawGrade>>(&reply).unwrap_or_default() {
                    if grade.id >= 1 && grade.id <= items.len() && grade.score.is_finite() {
                        from_model.insert(grade.id - 1, grade);
                    }
                }
                debug!(graded = from_model.len(), asked = answered.len(), "model graded short answers");
            }
            Err(e) => warn!(error = %e, provider = provider.name(), "short-answer grading failed, using keyword match"),
        }
    }

    let mut used_model = false;
    let graded = items
        .iter()
        .enumerate()
        .map(|(i, item)| match from_model.remove(&i) {
            Some(raw) if !item.answer.trim().is_empty() => {
                used_model = true;
                let score = raw.score.clamp(0.0, 1.0);
                let feedback = match raw.feedback.trim() {
                    "" => default_feedback(score, item.expected),
                    f => f.to_string(),
                };
                response(item, score, feedback)
            }
            _ => grade_heuristic(item),
        })
        .collect();
    (graded, used_model)
}

/// Exact normalized match scores 1.0; otherwise the share of the expected
/// answer's keywords found in the learner's answer.
pub fn grade_heuristic(item: &ShortAnswerItem<'_>) -> GradedResponse {
    let score = keyword_score(item.expected, item.answer);
    let feedback = if item.answer.trim().is_empty() {
        format!("No answer given. Expected: \"{}\".", item.expected)
    } else {
        default_feedback(score, item.expected)
    };
    response(item, score, feedback)
}

pub fn keyword_score(expected: &str, answer: &str) -> f64 {
    let expected_norm = normalize(expected);
    let answer_norm = normalize(answer);
    if answer_norm.is_empty() {
        return 0.0;
    }
    if expected_norm == answer_norm {
        return 1.0;
    }

    let expected_keys: HashSet<&str> = keywords(&expected_norm).collect();
    if expected_keys.is_empty() {
        return 0.0;
    }
    let given: Vec<&str> = keywords(&answer_norm).collect();
    let hits = expected_keys
        .iter()
        .filter(|k| given.iter().any(|g| same_word(k, g)))
        .count();
    hits as f64 / expected_keys.len() as f64
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn keywords(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
}

/// Equal, or a plural/suffix variant of a word of 4+ characters.
fn same_word(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.chars().count() >= 4 && long.starts_with(short) && long.len() - short.len() <= 2
}

fn default_feedback(score: f64, expected: &str) -> String {
    if score >= PASS_SCORE {
        "Good, your answer covers the key points.".to_string()
    } else if score > 0.0 {
        format!("Partly right. Expected: \"{expected}\".")
    } else {
        format!("Not quite. Expected: \"{expected}\".")
    }
}

fn response(item: &ShortAnswerItem<'_>, score: f64, feedback: String) -> GradedResponse {
    GradedResponse {
        question_id: item.question_id,
        answer: item.answer.trim().to_string(),
        score,
        is_correct: score >= PASS_SCORE,
        feedback,
    }
}
