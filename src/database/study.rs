//! Study session history.

use crate::models::StudySummary;
use rusqlite::{Connection, Result, params};
use serde::Serialize;

use super::db::now_timestamp;

/// Lifetime study totals of an account.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StudyStats {
    pub sessions: usize,
    pub cards_studied: usize,
    pub cards_passed: usize,
}

impl StudyStats {
    pub fn first_try_rate(&self) -> Option<f64> {
        if self.cards_studied == 0 {
            return None;
        }
        Some(self.cards_passed as f64 / self.cards_studied as f64)
    }
}

pub fn record_study_session(
    account_id: i64,
    summary: &StudySummary,
    conn: &Connection,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO study_sessions
            (account_id, deck_id, started_on, finished_at, rounds, cards_studied, cards_passed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            account_id,
            summary.deck_id,
            summary.started_on.to_string(),
            now_timestamp(),
            summary.rounds as i64,
            summary.cards_studied as i64,
            summary.cards_passed as i64
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn study_stats(account_id: i64, conn: &Connection) -> Result<StudyStats> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(cards_studied), 0), COALESCE(SUM(cards_passed), 0)
         FROM study_sessions WHERE account_id = ?1",
        params![account_id],
        |row| {
            Ok(StudyStats {
                sessions: row.get::<_, i64>(0)? as usize,
                cards_studied: row.get::<_, i64>(1)? as usize,
                cards_passed: row.get::<_, i64>(2)? as usize,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::{ensure_account, get_current_date, init_in_memory, new_deck};

    #[test]
    fn stats_sum_recorded_sessions() {
        let conn = init_in_memory().unwrap();
        let account = ensure_account("s@example.com", &conn).unwrap();
        let deck_id = new_deck(account.id, "D", "", &conn).unwrap();
        let today = get_current_date(&conn).unwrap();

        assert_eq!(study_stats(account.id, &conn).unwrap(), StudyStats::default());

        for (studied, passed) in [(10, 7), (4, 4)] {
            let summary = StudySummary {
                deck_id,
                started_on: today,
                rounds: 2,
                cards_studied: studied,
                cards_passed: passed,
            };
            record_study_session(account.id, &summary, &conn).unwrap();
        }

        let stats = study_stats(account.id, &conn).unwrap();
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.cards_studied, 14);
        assert_eq!(stats.cards_passed, 11);
        assert!((stats.first_try_rate().unwrap() - 11.0 / 14.0).abs() < 1e-9);
    }
}
