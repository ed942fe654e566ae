//! Per-topic aggregation and the overall result.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{GradedResponse, TestQuestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mastery {
    NeedsReview,
    Developing,
    Proficient,
    Mastered,
}

impl Mastery {
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 85.0 {
            Mastery::Mastered
        } else if percent >= 70.0 {
            Mastery::Proficient
        } else if percent >= 50.0 {
            Mastery::Developing
        } else {
            Mastery::NeedsReview
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mastery::Mastered => "Mastered",
            Mastery::Proficient => "Proficient",
            Mastery::Developing => "Developing",
            Mastery::NeedsReview => "Needs review",
        }
    }

    pub fn is_strength(self) -> bool {
        self >= Mastery::Proficient
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStats {
    pub topic: String,
    pub questions: usize,
    pub correct: usize,
    /// Mean score, 0.0 ..= 1.0.
    pub mean: f64,
    /// Population variance of the scores.
    pub variance: f64,
    pub percent: f64,
    pub mastery: Mastery,
}

/// Groups graded responses by their question's topic, weakest topic first.
/// Responses without a matching question are ignored.
pub fn aggregate_topics(questions: &[TestQuestion], graded: &[GradedResponse]) -> Vec<TopicStats> {
    let mut groups: BTreeMap<&str, Vec<&GradedResponse>> = BTreeMap::new();
    for response in graded {
        if let Some(q) = questions.iter().find(|q| q.id == response.question_id) {
            groups.entry(q.topic.trim()).or_default().push(response);
        }
    }

    let mut topics: Vec<TopicStats> = groups
        .into_iter()
        .map(|(topic, responses)| {
            let scores: Vec<f64> = responses.iter().map(|r| r.score).collect();
            let (mean, variance) = mean_and_variance(&scores);
            let percent = mean * 100.0;
            TopicStats {
                topic: if topic.is_empty() { "General".to_string() } else { topic.to_string() },
                questions: responses.len(),
                correct: responses.iter().filter(|r| r.is_correct).count(),
                mean,
                variance,
                percent,
                mastery: Mastery::from_percent(percent),
            }
        })
        .collect();

    topics.sort_by(|a, b| a.percent.total_cmp(&b.percent).then_with(|| a.topic.cmp(&b.topic)));
    topics
}

/// `(mean, population variance)`; `(0, 0)` for no values.
pub fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    Consistent,
    Mixed,
    Uneven,
}

impl Consistency {
    /// From the variance of topic means.
    pub fn from_variance(variance: f64) -> Self {
        if variance <= 0.02 {
            Consistency::Consistent
        } else if variance <= 0.06 {
            Consistency::Mixed
        } else {
            Consistency::Uneven
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Consistency::Consistent => "Consistent",
            Consistency::Mixed => "Mixed",
            Consistency::Uneven => "Uneven",
        }
    }
}

pub fn letter_grade(percent: f64) -> char {
    match percent {
        p if p >= 90.0 => 'A',
        p if p >= 80.0 => 'B',
        p if p >= 70.0 => 'C',
        p if p >= 60.0 => 'D',
        _ => 'F',
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallResult {
    pub questions: usize,
    pub correct: usize,
    /// Mean score over all questions, as a percentage.
    pub percent: f64,
    pub grade: char,
    pub consistency: Consistency,
}

pub fn overall_result(graded: &[GradedResponse], topics: &[TopicStats]) -> OverallResult {
    let scores: Vec<f64> = graded.iter().map(|r| r.score).collect();
    let (mean, _) = mean_and_variance(&scores);
    let topic_means: Vec<f64> = topics.iter().map(|t| t.mean).collect();
    let (_, spread) = mean_and_variance(&topic_means);
    let percent = mean * 100.0;
    OverallResult {
        questions: graded.len(),
        correct: graded.iter().filter(|r| r.is_correct).count(),
        percent,
        grade: letter_grade(percent),
        consistency: Consistency::from_variance(spread),
    }
}
