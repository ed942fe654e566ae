//! Persistence of generated tests, their questions and graded responses.

use crate::models::{GradedResponse, QuestionKind, TestQuestion, TestSession, TestStatus};
use rusqlite::{Connection, Result, params};
use serde::Serialize;

use super::db::{conversion_err, ensure_deck_owned, now_timestamp};

/// Row of the test history list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestSessionRow {
    pub id: i64,
    pub deck_id: i64,
    pub created_at: String,
    pub status: TestStatus,
    pub score_percent: Option<f64>,
    pub question_count: usize,
}

/// Stores a new test and its questions in one transaction.
/// The returned session carries the assigned question ids.
pub fn create_test_session(
    account_id: i64,
    deck_id: i64,
    questions: &[TestQuestion],
    conn: &Connection,
) -> Result<TestSession> {
    ensure_deck_owned(account_id, deck_id, conn)?;

    let tx = conn.unchecked_transaction()?;
    let created_at = now_timestamp();
    tx.execute(
        "INSERT INTO test_sessions (account_id, deck_id, created_at, status)
         VALUES (?1, ?2, ?3, ?4)",
        params![account_id, deck_id, created_at, TestStatus::InProgress.as_str()],
    )?;
    let test_id = tx.last_insert_rowid();

    let mut stored = Vec::with_capacity(questions.len());
    for (position, question) in questions.iter().enumerate() {
        let kind_json = serde_json::to_string(&question.kind)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        tx.execute(
            "INSERT INTO test_questions
                (test_session_id, position, topic, prompt, kind_json, explanation, flashcard_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                test_id,
                position as i64,
                question.topic,
                question.prompt,
                kind_json,
                question.explanation,
                question.flashcard_id
            ],
        )?;
        stored.push(TestQuestion {
            id: tx.last_insert_rowid(),
            ..question.clone()
        });
    }
    tx.commit()?;

    Ok(TestSession {
        id: test_id,
        deck_id,
        created_at,
        status: TestStatus::InProgress,
        score_percent: None,
        questions: stored,
    })
}

pub fn load_test_session(account_id: i64, test_id: i64, conn: &Connection) -> Result<TestSession> {
    let (deck_id, created_at, status, score_percent): (i64, String, String, Option<f64>) = conn
        .query_row(
            "SELECT deck_id, created_at, status, score_percent
             FROM test_sessions WHERE id = ?1 AND account_id = ?2",
            params![test_id, account_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

    let mut stmt = conn.prepare(
        "SELECT id, topic, prompt, kind_json, explanation, flashcard_id
         FROM test_questions WHERE test_session_id = ?1 ORDER BY position",
    )?;
    let questions = stmt
        .query_map(params![test_id], |row| {
            let kind_json: String = row.get(3)?;
            let kind: QuestionKind = serde_json::from_str(&kind_json)
                .map_err(|e| conversion_err(3, format!("bad question kind: {e}")))?;
            Ok(TestQuestion {
                id: row.get(0)?,
                topic: row.get(1)?,
                prompt: row.get(2)?,
                kind,
                explanation: row.get(4)?,
                flashcard_id: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(TestSession {
        id: test_id,
        deck_id,
        created_at,
        status: status.parse().map_err(|e| conversion_err(2, e))?,
        score_percent,
        questions,
    })
}

/// Replaces the graded responses of a test and marks it graded.
///
/// Runs on the given connection without its own transaction so the caller
/// can commit the responses together with the usage they consumed.
pub fn save_graded_responses(
    account_id: i64,
    test_id: i64,
    responses: &[GradedResponse],
    score_percent: f64,
    conn: &Connection,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE test_sessions SET status = ?1, score_percent = ?2 WHERE id = ?3 AND account_id = ?4",
        params![TestStatus::Graded.as_str(), score_percent, test_id, account_id],
    )?;
    if changed == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }

    for r in responses {
        conn.execute(
            "INSERT OR REPLACE INTO test_responses (question_id, answer, score, is_correct, feedback)
             SELECT ?1, ?2, ?3, ?4, ?5
             WHERE EXISTS (SELECT 1 FROM test_questions WHERE id = ?1 AND test_session_id = ?6)",
            params![r.question_id, r.answer, r.score, r.is_correct, r.feedback, test_id],
        )?;
    }
    Ok(())
}

pub fn load_graded_responses(test_id: i64, conn: &Connection) -> Result<Vec<GradedResponse>> {
    let mut stmt = conn.prepare(
        "SELECT r.question_id, r.answer, r.score, r.is_correct, r.feedback
         FROM test_responses r
         JOIN test_questions q ON q.id = r.question_id
         WHERE q.test_session_id = ?1
         ORDER BY q.position",
    )?;
    let rows = stmt
        .query_map(params![test_id], |row| {
            Ok(GradedResponse {
                question_id: row.get(0)?,
                answer: row.get(1)?,
                score: row.get(2)?,
                is_correct: row.get(3)?,
                feedback: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

/// Test history of an account, newest first, optionally for one deck.
pub fn list_test_sessions(
    account_id: i64,
    deck_id: Option<i64>,
    conn: &Connection,
) -> Result<Vec<TestSessionRow>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.deck_id, t.created_at, t.status, t.score_percent, COUNT(q.id)
         FROM test_sessions t
         LEFT JOIN test_questions q ON q.test_session_id = t.id
         WHERE t.account_id = ?1 AND (?2 IS NULL OR t.deck_id = ?2)
         GROUP BY t.id
         ORDER BY t.id DESC",
    )?;
    let rows = stmt
        .query_map(params![account_id, deck_id], |row| {
            let status: String = row.get(3)?;
            Ok(TestSessionRow {
                id: row.get(0)?,
                deck_id: row.get(1)?,
                created_at: row.get(2)?,
                status: status.parse().map_err(|e| conversion_err(3, e))?,
                score_percent: row.get(4)?,
                question_count: row.get::<_, i64>(5)? as usize,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::{ensure_account, init_in_memory, new_deck};

    fn questions() -> Vec<TestQuestion> {
        vec![
            TestQuestion {
                id: 0,
                topic: "Greetings".into(),
                prompt: "What does 'cześć' mean?".into(),
                kind: QuestionKind::MultipleChoice {
                    options: vec!["hello".into(), "please".into()],
                    correct_index: 0,
                },
                explanation: String::new(),
                flashcard_id: None,
            },
            TestQuestion {
                id: 0,
                topic: "Manners".into(),
                prompt: "Translate 'proszę'".into(),
                kind: QuestionKind::ShortAnswer { expected: "please".into() },
                explanation: "Common word".into(),
                flashcard_id: None,
            },
        ]
    }

    #[test]
    fn create_then_load_preserves_questions() {
        let conn = init_in_memory().unwrap();
        let account = ensure_account("t@example.com", &conn).unwrap();
        let deck_id = new_deck(account.id, "D", "", &conn).unwrap();

        let created = create_test_session(account.id, deck_id, &questions(), &conn).unwrap();
        assert!(created.questions.iter().all(|q| q.id > 0));

        let loaded = load_test_session(account.id, created.id, &conn).unwrap();
        assert_eq!(loaded.status, TestStatus::InProgress);
        assert_eq!(loaded.questions, created.questions);
    }

    #[test]
    fn grading_marks_session_and_stores_responses() {
        let conn = init_in_memory().unwrap();
        let account = ensure_account("t@example.com", &conn).unwrap();
        let deck_id = new_deck(account.id, "D", "", &conn).unwrap();
        let test = create_test_session(account.id, deck_id, &questions(), &conn).unwrap();

        let graded = vec![
            GradedResponse {
                question_id: test.questions[0].id,
                answer: "0".into(),
                score: 1.0,
                is_correct: true,
                feedback: "Correct".into(),
            },
            GradedResponse {
                question_id: 9999,
                answer: "x".into(),
                score: 0.0,
                is_correct: false,
                feedback: String::new(),
            },
        ];
        save_graded_responses(account.id, test.id, &graded, 50.0, &conn).unwrap();

        let stored = load_graded_responses(test.id, &conn).unwrap();
        assert_eq!(stored.len(), 1, "responses to foreign questions are dropped");
        assert!(stored[0].is_correct);

        let rows = list_test_sessions(account.id, Some(deck_id), &conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, TestStatus::Graded);
        assert_eq!(rows[0].score_percent, Some(50.0));
        assert_eq!(rows[0].question_count, 2);
    }

    #[test]
    fn grading_joins_the_callers_transaction() {
        let conn = init_in_memory().unwrap();
        let account = ensure_account("t@example.com", &conn).unwrap();
        let deck_id = new_deck(account.id, "D", "", &conn).unwrap();
        let test = create_test_session(account.id, deck_id, &questions(), &conn).unwrap();
        let graded = vec![GradedResponse {
            question_id: test.questions[1].id,
            answer: "please".into(),
            score: 1.0,
            is_correct: true,
            feedback: "Correct".into(),
        }];

        let tx = conn.unchecked_transaction().unwrap();
        save_graded_responses(account.id, test.id, &graded, 100.0, &tx).unwrap();
        drop(tx);
        assert!(load_graded_responses(test.id, &conn).unwrap().is_empty());
        let loaded = load_test_session(account.id, test.id, &conn).unwrap();
        assert_eq!(loaded.status, TestStatus::InProgress);

        let tx = conn.unchecked_transaction().unwrap();
        save_graded_responses(account.id, test.id, &graded, 100.0, &tx).unwrap();
        tx.commit().unwrap();
        assert_eq!(load_graded_responses(test.id, &conn).unwrap().len(), 1);
        let loaded = load_test_session(account.id, test.id, &conn).unwrap();
        assert_eq!(loaded.status, TestStatus::Graded);
        assert_eq!(loaded.score_percent, Some(100.0));
    }

    #[test]
    fn other_account_cannot_load_test() {
        let conn = init_in_memory().unwrap();
        let owner = ensure_account("o@example.com", &conn).unwrap();
        let other = ensure_account("x@example.com", &conn).unwrap();
        let deck_id = new_deck(owner.id, "D", "", &conn).unwrap();
        let test = create_test_session(owner.id, deck_id, &questions(), &conn).unwrap();

        assert!(load_test_session(other.id, test.id, &conn).is_err());
        assert!(save_graded_responses(other.id, test.id, &[], 0.0, &conn).is_err());
        assert!(list_test_sessions(other.id, None, &conn).unwrap().is_empty());
    }
}
