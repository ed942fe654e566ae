//! Comprehensive test grading.
//!
//! Pipeline: objective questions are graded locally, short answers in one
//! batched model call (keyword recall when that fails), then scores are
//! aggregated per topic and overall, and finally an analysis is written.
//! [`disclosure`] shapes the finished report for the results screen.

pub mod analysis;
pub mod disclosure;
pub mod objective;
pub mod short_answer;
pub mod topics;

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::ai::Prompts;
use crate::llm::LlmProvider;
use crate::models::{GradedResponse, QuestionKind, TestQuestion, TestResponse, TestSession};

pub use analysis::Analysis;
pub use disclosure::{disclose, DisclosedReport, DisclosureLevel};
pub use short_answer::ShortAnswerItem;
pub use topics::{Consistency, Mastery, OverallResult, TopicStats};

/// One question as shown on the results screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionReview {
    pub question_id: i64,
    pub topic: String,
    pub prompt: String,
    pub kind: &'static str,
    pub answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub score: f64,
    pub feedback: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradingReport {
    pub test_id: i64,
    pub deck_name: String,
    /// In question order, ready to persist.
    pub responses: Vec<GradedResponse>,
    pub questions: Vec<QuestionReview>,
    /// Weakest first.
    pub topics: Vec<TopicStats>,
    pub overall: OverallResult,
    pub analysis: Analysis,
    /// Model calls that produced usable output.
    pub ai_calls: u32,
}

impl GradingReport {
    pub fn used_ai(&self) -> bool {
        self.ai_calls > 0
    }
}

/// Grades `responses` against `test`. Questions without a response count as
/// unanswered.
pub fn grade_test(
    provider: &LlmProvider,
    prompts: &Prompts,
    test: &TestSession,
    deck_name: &str,
    responses: &[TestResponse],
) -> GradingReport {
    let answers: HashMap<i64, &str> = responses
        .iter()
        .map(|r| (r.question_id, r.answer.as_str()))
        .collect();
    let answer_for = |q: &TestQuestion| answers.get(&q.id).copied().unwrap_or("");

    let mut graded: Vec<Option<GradedResponse>> = Vec::with_capacity(test.questions.len());
    let mut short_items = Vec::new();
    let mut short_slots = Vec::new();
    for (slot, q) in test.questions.iter().enumerate() {
        match &q.kind {
            QuestionKind::ShortAnswer { expected } => {
                short_items.push(ShortAnswerItem {
                    question_id: q.id,
                    prompt: &q.prompt,
                    expected,
                    answer: answer_for(q),
                });
                short_slots.push(slot);
                graded.push(None);
            }
            _ => graded.push(Some(objective::grade_objective(q, answer_for(q)))),
        }
    }

    let mut ai_calls = 0;
    if !short_items.is_empty() {
        let (short_graded, used_model) = short_answer::grade_short_answers(provider, prompts, &short_items);
        if used_model {
            ai_calls += 1;
        }
        for (slot, g) in short_slots.into_iter().zip(short_graded) {
            graded[slot] = Some(g);
        }
    }
    let graded: Vec<GradedResponse> = graded.into_iter().flatten().collect();

    let report = build_report(Some((provider, prompts)), test, deck_name, graded, ai_calls);
    info!(
        test_id = test.id,
        percent = report.overall.percent,
        grade = %report.overall.grade,
        ai_calls = report.ai_calls,
        "graded test"
    );
    report
}

/// Rebuilds a report from responses graded earlier, without any model call.
pub fn report_from_saved(test: &TestSession, deck_name: &str, graded: Vec<GradedResponse>) -> GradingReport {
    build_report(None, test, deck_name, graded, 0)
}

fn build_report(
    model: Option<(&LlmProvider, &Prompts)>,
    test: &TestSession,
    deck_name: &str,
    graded: Vec<GradedResponse>,
    mut ai_calls: u32,
) -> GradingReport {
    let topics = topics::aggregate_topics(&test.questions, &graded);
    let overall = topics::overall_result(&graded, &topics);
    let questions = reviews(&test.questions, &graded);

    let analysis = match model {
        Some((provider, prompts)) => {
            let (analysis, source) =
                analysis::analyze(provider, prompts, deck_name, &overall, &topics, &questions);
            if source == crate::ai::Source::Ai {
                ai_calls += 1;
            }
            analysis
        }
        None => analysis::templated_analysis(&overall, &topics),
    };

    GradingReport {
        test_id: test.id,
        deck_name: deck_name.to_string(),
        responses: graded,
        questions,
        topics,
        overall,
        analysis,
        ai_calls,
    }
}

fn reviews(questions: &[TestQuestion], graded: &[GradedResponse]) -> Vec<QuestionReview> {
    questions
        .iter()
        .filter_map(|q| {
            let g = graded.iter().find(|g| g.question_id == q.id)?;
            Some(QuestionReview {
                question_id: q.id,
                topic: q.topic.clone(),
                prompt: q.prompt.clone(),
                kind: q.kind.label(),
                answer: display_answer(q, &g.answer),
                correct_answer: q.correct_answer(),
                is_correct: g.is_correct,
                score: g.score,
                feedback: g.feedback.clone(),
                explanation: q.explanation.clone(),
            })
        })
        .collect()
}

/// The learner's answer in words: option text for multiple choice.
pub fn display_answer(question: &TestQuestion, answer: &str) -> String {
    let answer = answer.trim();
    match &question.kind {
        QuestionKind::MultipleChoice { options, .. } => objective::chosen_option(answer, options)
            .and_then(|i| options.get(i).cloned())
            .unwrap_or_else(|| answer.to_string()),
        QuestionKind::TrueFalse { .. } => match answer.to_lowercase().as_str() {
            "true" => "True".to_string(),
            "false" => "False".to_string(),
            _ => answer.to_string(),
        },
        QuestionKind::ShortAnswer { .. } => answer.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{OfflineProvider, ScriptedProvider};
    use crate::models::TestStatus;

    fn test_session() -> TestSession {
        let q = |id: i64, topic: &str, kind: QuestionKind| TestQuestion {
            id,
            topic: topic.into(),
            prompt: format!("Question {id}"),
            kind,
            explanation: String::new(),
            flashcard_id: None,
        };
        TestSession {
            id: 3,
            deck_id: 1,
            created_at: "2026-01-01 10:00:00".into(),
            status: TestStatus::InProgress,
            score_percent: None,
            questions: vec![
                q(1, "Cells", QuestionKind::MultipleChoice {
                    options: vec!["a".into(), "b".into(), "c".into()],
                    correct_index: 2,
                }),
                q(2, "Cells", QuestionKind::TrueFalse { answer: true }),
                q(3, "Genes", QuestionKind::ShortAnswer { expected: "Holds genetic material".into() }),
                q(4, "Genes", QuestionKind::ShortAnswer { expected: "Builds proteins".into() }),
            ],
        }
    }

    fn answers(pairs: &[(i64, &str)]) -> Vec<TestResponse> {
        pairs
            .iter()
            .map(|(id, a)| TestResponse { question_id: *id, answer: a.to_string() })
            .collect()
    }

    #[test]
    fn offline_grading_runs_whole_pipeline() {
        let provider = LlmProvider::Offline(OfflineProvider);
        let test = test_session();
        let report = grade_test(
            &provider,
            &Prompts::builtin(),
            &test,
            "Biology",
            &answers(&[(1, "2"), (2, "false"), (3, "genetic material holder")]),
        );

        assert_eq!(report.responses.len(), 4);
        assert_eq!(
            report.responses.iter().map(|r| r.question_id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert!(report.responses[0].is_correct);
        assert!(!report.responses[1].is_correct);
        assert!(report.responses[2].is_correct);
        assert!(!report.responses[3].is_correct); // unanswered
        assert_eq!(report.overall.correct, 2);
        assert_eq!(report.topics.len(), 2);
        assert!(!report.used_ai());
        assert_eq!(report.questions[0].answer, "c");
        assert_eq!(report.questions[1].answer, "False");
    }

    #[test]
    fn counts_successful_model_calls() {
        let provider = LlmProvider::Scripted(ScriptedProvider::new([
            r#"[{"id": 1, "score": 1.0, "feedback": "Right."}, {"id": 2, "score": 0.2, "feedback": "No."}]"#,
            r#"{"summary": "Good effort.", "strengths": [], "weaknesses": [], "recommendations": []}"#,
        ]));
        let test = test_session();
        let report = grade_test(
            &provider,
            &Prompts::builtin(),
            &test,
            "Biology",
            &answers(&[(1, "c"), (2, "true"), (3, "dna"), (4, "energy")]),
        );
        assert_eq!(report.ai_calls, 2);
        assert_eq!(report.analysis.summary, "Good effort.");
        assert_eq!(report.responses[2].feedback, "Right.");
        assert_eq!(report.overall.correct, 3);
    }

    #[test]
    fn rebuilds_report_from_saved_responses() {
        let test = test_session();
        let graded = vec![GradedResponse {
            question_id: 2,
            answer: "true".into(),
            score: 1.0,
            is_correct: true,
            feedback: "Correct.".into(),
        }];
        let report = report_from_saved(&test, "Biology", graded);
        assert_eq!(report.questions.len(), 1);
        assert_eq!(report.overall.percent, 100.0);
        assert_eq!(report.ai_calls, 0);
    }
}
