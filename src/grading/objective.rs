//! Multiple-choice and true/false grading. No model involved.

use crate::models::{GradedResponse, QuestionKind, TestQuestion};

/// Grades an objective question. Short-answer questions are never passed
/// here; they go through [`super::short_answer`].
pub fn grade_objective(question: &TestQuestion, answer: &str) -> GradedResponse {
    let answer = answer.trim();
    let is_correct = match &question.kind {
        QuestionKind::MultipleChoice { options, correct_index } => {
            chosen_option(answer, options) == Some(*correct_index)
        }
        QuestionKind::TrueFalse { answer: expected } => parse_bool(answer) == Some(*expected),
        QuestionKind::ShortAnswer { .. } => false,
    };

    let feedback = if answer.is_empty() {
        format!("No answer given. The correct answer is \"{}\".", question.correct_answer())
    } else if is_correct {
        "Correct.".to_string()
    } else {
        format!("The correct answer is \"{}\".", question.correct_answer())
    };

    GradedResponse {
        question_id: question.id,
        answer: answer.to_string(),
        score: if is_correct { 1.0 } else { 0.0 },
        is_correct,
        feedback,
    }
}

/// Index of the chosen option: the stored index, or the option text.
pub fn chosen_option(answer: &str, options: &[String]) -> Option<usize> {
    answer
        .parse::<usize>()
        .ok()
        .filter(|i| *i < options.len())
        .or_else(|| options.iter().position(|o| o.eq_ignore_ascii_case(answer)))
}

fn parse_bool(answer: &str) -> Option<bool> {
    match answer.to_lowercase().as_str() {
        "true" | "t" | "yes" => Some(true),
        "false" | "f" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(kind: QuestionKind) -> TestQuestion {
        TestQuestion {
            id: 9,
            topic: "t".into(),
            prompt: "p".into(),
            kind,
            explanation: String::new(),
            flashcard_id: None,
        }
    }

    #[test]
    fn multiple_choice_by_index_or_text() {
        let q = question(QuestionKind::MultipleChoice {
            options: vec!["red".into(), "green".into()],
            correct_index: 1,
        });
        assert!(grade_objective(&q, "1").is_correct);
        assert!(grade_objective(&q, "Green").is_correct);

        let wrong = grade_objective(&q, "0");
        assert!(!wrong.is_correct);
        assert_eq!(wrong.score, 0.0);
        assert!(wrong.feedback.contains("green"));
        assert_eq!(wrong.question_id, 9);
    }

    #[test]
    fn true_false() {
        let q = question(QuestionKind::TrueFalse { answer: false });
        assert!(grade_objective(&q, "false").is_correct);
        assert!(!grade_objective(&q, "true").is_correct);

        let blank = grade_objective(&q, "  ");
        assert!(!blank.is_correct);
        assert!(blank.feedback.starts_with("No answer given"));
    }
}
