//! Progressive disclosure of a grading report.
//!
//! The results screen starts at the headline and reveals topic breakdowns
//! and per-question feedback on request.

use serde::Serialize;

use super::analysis::Analysis;
use super::topics::{OverallResult, TopicStats};
use super::{GradingReport, QuestionReview};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureLevel {
    #[default]
    Summary,
    Topics,
    Questions,
}

impl DisclosureLevel {
    /// The next level; `Questions` stays where it is.
    pub fn next(self) -> Self {
        match self {
            DisclosureLevel::Summary => DisclosureLevel::Topics,
            DisclosureLevel::Topics | DisclosureLevel::Questions => DisclosureLevel::Questions,
        }
    }

    /// Label for the button that reveals the next level.
    pub fn reveal_label(self) -> Option<&'static str> {
        match self {
            DisclosureLevel::Summary => Some("Show topic breakdown"),
            DisclosureLevel::Topics => Some("Show every question"),
            DisclosureLevel::Questions => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisclosedReport {
    pub level: DisclosureLevel,
    pub overall: OverallResult,
    pub summary: String,
    /// Present from [`DisclosureLevel::Topics`].
    pub topics: Option<Vec<TopicStats>>,
    pub analysis: Option<Analysis>,
    /// Present at [`DisclosureLevel::Questions`].
    pub questions: Option<Vec<QuestionReview>>,
}

pub fn disclose(report: &GradingReport, level: DisclosureLevel) -> DisclosedReport {
    let show_topics = level >= DisclosureLevel::Topics;
    DisclosedReport {
        level,
        overall: report.overall.clone(),
        summary: report.analysis.summary.clone(),
        topics: show_topics.then(|| report.topics.clone()),
        analysis: show_topics.then(|| report.analysis.clone()),
        questions: (level >= DisclosureLevel::Questions).then(|| report.questions.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::topics::Consistency;

    fn report() -> GradingReport {
        GradingReport {
            test_id: 1,
            deck_name: "Biology".into(),
            responses: Vec::new(),
            questions: Vec::new(),
            topics: Vec::new(),
            overall: OverallResult { questions: 0, correct: 0, percent: 0.0, grade: 'F', consistency: Consistency::Consistent },
            analysis: Analysis {
                summary: "s".into(),
                strengths: vec![],
                weaknesses: vec![],
                recommendations: vec![],
            },
            ai_calls: 0,
        }
    }

    #[test]
    fn levels_step_and_saturate() {
        let mut level = DisclosureLevel::default();
        assert_eq!(level, DisclosureLevel::Summary);
        level = level.next();
        assert_eq!(level, DisclosureLevel::Topics);
        level = level.next().next();
        assert_eq!(level, DisclosureLevel::Questions);
        assert_eq!(level.reveal_label(), None);
    }

    #[test]
    fn disclose_reveals_sections_in_order() {
        let r = report();

        let summary = disclose(&r, DisclosureLevel::Summary);
        assert_eq!(summary.summary, "s");
        assert!(summary.topics.is_none() && summary.analysis.is_none() && summary.questions.is_none());

        let topics = disclose(&r, DisclosureLevel::Topics);
        assert!(topics.topics.is_some() && topics.analysis.is_some());
        assert!(topics.questions.is_none());

        let all = disclose(&r, DisclosureLevel::Questions);
        assert!(all.questions.is_some());
    }
}
