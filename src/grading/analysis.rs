//! Narrative feedback for a graded test.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::topics::{Consistency, Mastery, OverallResult, TopicStats};
use super::QuestionReview;
use crate::ai::json::parse_json;
use crate::ai::{PromptKind, Prompts, Source};
use crate::llm::LlmProvider;

const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Asks the model for an analysis; builds one from the numbers when that
/// fails or the reply has no summary.
pub fn analyze(
    provider: &LlmProvider,
    prompts: &Prompts,
    deck_name: &str,
    overall: &OverallResult,
    topics: &[TopicStats],
    reviews: &[QuestionReview],
) -> (Analysis, Source) {
    let topic_lines = topics
        .iter()
        .map(|t| format!("- {}: {}/{}, {:.0}%", t.topic, t.correct, t.questions, t.percent))
        .collect::<Vec<_>>()
        .join("\n");
    let missed: Vec<String> = reviews
        .iter()
        .filter(|r| !r.is_correct)
        .map(|r| format!("- {} (correct answer: {})", r.prompt, r.correct_answer))
        .collect();
    let missed = if missed.is_empty() { "none".to_string() } else { missed.join("\n") };
    let score = format!("{:.0}", overall.percent);
    let grade = overall.grade.to_string();

    let prompt = prompts.render(
        PromptKind::Analysis,
        &[
            ("deck_name", deck_name),
            ("score", &score),
            ("grade", &grade),
            ("topics", &topic_lines),
            ("missed", &missed),
        ],
    );

    match provider.complete(&prompt) {
        Ok(reply) => match parse_json::<Analysis>(&reply) {
            Some(analysis) if !analysis.summary.trim().is_empty() => {
                return (clean(analysis), Source::Ai);
            }
            _ => warn!("analysis reply unusable, using template"),
        },
        Err(e) => warn!(error = %e, provider = provider.name(), "test analysis failed, using template"),
    }
    (templated_analysis(overall, topics), Source::Fallback)
}

fn clean(a: Analysis) -> Analysis {
    let tidy = |items: Vec<String>| -> Vec<String> {
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };
    Analysis {
        summary: a.summary.trim().to_string(),
        strengths: tidy(a.strengths),
        weaknesses: tidy(a.weaknesses),
        recommendations: tidy(a.recommendations),
    }
}

pub fn templated_analysis(overall: &OverallResult, topics: &[TopicStats]) -> Analysis {
    let mut summary = format!(
        "You scored {:.0}% (grade {}) with {} of {} questions correct across {} topic{}.",
        overall.percent,
        overall.grade,
        overall.correct,
        overall.questions,
        topics.len(),
        if topics.len() == 1 { "" } else { "s" },
    );
    match overall.consistency {
        Consistency::Consistent => summary.push_str(" Your results were even across topics."),
        Consistency::Mixed => summary.push_str(" Some topics went better than others."),
        Consistency::Uneven => summary.push_str(" Your results varied a lot between topics."),
    }

    let line = |t: &TopicStats| format!("{}: {:.0}% ({})", t.topic, t.percent, t.mastery.label());
    // Topics arrive weakest first.
    let strengths = topics.iter().rev().filter(|t| t.mastery.is_strength()).map(line).collect();
    let weaknesses: Vec<String> = topics.iter().filter(|t| !t.mastery.is_strength()).map(line).collect();

    let mut recommendations: Vec<String> = topics
        .iter()
        .filter(|t| t.mastery == Mastery::NeedsReview)
        .take(MAX_RECOMMENDATIONS)
        .map(|t| format!("Study the cards on \"{}\" again before your next test.", t.topic))
        .collect();
    if recommendations.is_empty() && !weaknesses.is_empty() {
        recommendations.push("Run a study session on this deck to firm up the topics still developing.".to_string());
    }
    if overall.consistency == Consistency::Uneven {
        recommendations.push("Spend most of your study time on your weakest topics first.".to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("Keep it up with short daily study sessions.".to_string());
    }

    Analysis { summary, strengths, weaknesses, recommendations }
}
