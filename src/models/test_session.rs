//! Graded quizzes generated from a deck's flashcards.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_index: usize,
    },
    TrueFalse {
        answer: bool,
    },
    ShortAnswer {
        expected: String,
    },
}

impl QuestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple choice",
            QuestionKind::TrueFalse { .. } => "true/false",
            QuestionKind::ShortAnswer { .. } => "short answer",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestQuestion {
    #[serde(default)]
    pub id: i64,
    pub topic: String,
    pub prompt: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub flashcard_id: Option<i64>,
}

impl TestQuestion {
    /// The correct answer as it would be shown to the learner.
    pub fn correct_answer(&self) -> String {
        match &self.kind {
            QuestionKind::MultipleChoice { options, correct_index } => {
                options.get(*correct_index).cloned().unwrap_or_default()
            }
            QuestionKind::TrueFalse { answer } => {
                if *answer { "True".to_string() } else { "False".to_string() }
            }
            QuestionKind::ShortAnswer { expected } => expected.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    #[default]
    InProgress,
    Graded,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::InProgress => "in_progress",
            TestStatus::Graded => "graded",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(TestStatus::InProgress),
            "graded" => Ok(TestStatus::Graded),
            other => Err(format!("unknown test status '{other}'")),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TestSession {
    pub id: i64,
    pub deck_id: i64,
    pub created_at: String,
    pub status: TestStatus,
    pub score_percent: Option<f64>,
    pub questions: Vec<TestQuestion>,
}

/// The learner's raw answer to one question.
///
/// Multiple choice answers hold the option index, true/false answers
/// `"true"`/`"false"`, short answers free text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResponse {
    pub question_id: i64,
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GradedResponse {
    pub question_id: i64,
    pub answer: String,
    /// 0.0 ..= 1.0
    pub score: f64,
    pub is_correct: bool,
    pub feedback: String,
}
