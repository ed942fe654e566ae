//! Database operations for the flashcard application
//!
//! Handles SQLite initialization, the simulated current date, accounts, and
//! CRUD for decks, flashcards and their SM-2 progress. Every deck and card
//! query is scoped by the owning account: touching a row owned by someone
//! else behaves exactly like touching a row that does not exist
//! (`QueryReturnedNoRows`).

use crate::models::{
    Account, CardProgress, Deck, DeckSummary, Flashcard, SubscriptionStatus, Tier,
};
use chrono::{Days, Local, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        tier TEXT NOT NULL DEFAULT 'free',
        subscription_status TEXT NOT NULL DEFAULT 'none',
        billing_customer_id TEXT,
        subscription_id TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS decks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        name TEXT NOT NULL COLLATE NOCASE,
        description TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE,
        UNIQUE(account_id, name)
    );

    CREATE TABLE IF NOT EXISTS flashcards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        deck_id INTEGER NOT NULL,
        front TEXT NOT NULL COLLATE NOCASE,
        back TEXT NOT NULL,
        FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE,
        UNIQUE(deck_id, front)
    );

    CREATE TABLE IF NOT EXISTS card_progress (
        flashcard_id INTEGER PRIMARY KEY,
        easiness REAL NOT NULL DEFAULT 2.5,
        interval_days INTEGER NOT NULL DEFAULT 0,
        repetitions INTEGER NOT NULL DEFAULT 0,
        due_on TEXT NOT NULL,
        last_reviewed_on TEXT,
        total_reviews INTEGER NOT NULL DEFAULT 0,
        lapses INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS study_sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        deck_id INTEGER NOT NULL,
        started_on TEXT NOT NULL,
        finished_at TEXT NOT NULL,
        rounds INTEGER NOT NULL,
        cards_studied INTEGER NOT NULL,
        cards_passed INTEGER NOT NULL,
        FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE,
        FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS test_sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        deck_id INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'in_progress',
        score_percent REAL,
        FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE,
        FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS test_questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        test_session_id INTEGER NOT NULL,
        position INTEGER NOT NULL,
        topic TEXT NOT NULL,
        prompt TEXT NOT NULL,
        kind_json TEXT NOT NULL,
        explanation TEXT NOT NULL DEFAULT '',
        flashcard_id INTEGER,
        FOREIGN KEY (test_session_id) REFERENCES test_sessions(id) ON DELETE CASCADE,
        FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS test_responses (
        question_id INTEGER PRIMARY KEY,
        answer TEXT NOT NULL,
        score REAL NOT NULL,
        is_correct INTEGER NOT NULL,
        feedback TEXT NOT NULL DEFAULT '',
        FOREIGN KEY (question_id) REFERENCES test_questions(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS usage_counters (
        account_id INTEGER NOT NULL,
        period TEXT NOT NULL,
        kind TEXT NOT NULL,
        count INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (account_id, period, kind),
        FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS billing_events (
        event_id TEXT PRIMARY KEY,
        event_type TEXT NOT NULL,
        received_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS app_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Opens (creating if needed) the database file and its tables.
/// The parent directory must already exist.
///
/// The simulated current date is initialized to today on first run.
pub fn init_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    // The desktop app and the webhook server share this file.
    conn.busy_timeout(BUSY_TIMEOUT)?;
    create_schema(&conn)?;
    info!(path = %path.display(), "database ready");
    Ok(conn)
}

/// In-memory database with the full schema; used by tests and demos.
pub fn init_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.execute_batch(SCHEMA)?;

    let today = Local::now().date_naive();
    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![today.to_string()],
    )?;
    Ok(())
}

pub(crate) fn conversion_err(col: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, Type::Text, msg.into())
}

pub(crate) fn parse_date(col: usize, value: &str) -> Result<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .map_err(|e| conversion_err(col, format!("bad date '{value}': {e}")))
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Retrieves the simulated current date
pub fn get_current_date(conn: &Connection) -> Result<NaiveDate> {
    let value: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;
    parse_date(0, &value)
}

/// Advances the current date by one day (for exercising spaced repetition)
pub fn advance_day(conn: &Connection) -> Result<NaiveDate> {
    let next = get_current_date(conn)?
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX);
    conn.execute(
        "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
        params![next.to_string()],
    )?;
    Ok(next)
}

// Accounts

fn account_from_row(row: &Row<'_>) -> Result<Account> {
    let tier: String = row.get(2)?;
    let status: String = row.get(3)?;
    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        tier: tier.parse::<Tier>().map_err(|e| conversion_err(2, e))?,
        subscription_status: status
            .parse::<SubscriptionStatus>()
            .map_err(|e| conversion_err(3, e))?,
        billing_customer_id: row.get(4)?,
        subscription_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const ACCOUNT_COLUMNS: &str =
    "id, email, tier, subscription_status, billing_customer_id, subscription_id, created_at";

/// Returns the account for `email`, creating a free one if needed.
pub fn ensure_account(email: &str, conn: &Connection) -> Result<Account> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO accounts (email, created_at) VALUES (?1, ?2)",
        params![email, now_timestamp()],
    )?;
    if inserted > 0 {
        info!(%email, "account created");
    }
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
        params![email],
        account_from_row,
    )
}

pub fn get_account(account_id: i64, conn: &Connection) -> Result<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
        params![account_id],
        account_from_row,
    )
}

pub fn find_account_by_customer(customer_id: &str, conn: &Connection) -> Result<Option<Account>> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE billing_customer_id = ?1"),
        params![customer_id],
        account_from_row,
    )
    .optional()
}

pub fn find_account_by_subscription(
    subscription_id: &str,
    conn: &Connection,
) -> Result<Option<Account>> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE subscription_id = ?1"),
        params![subscription_id],
        account_from_row,
    )
    .optional()
}

/// Updates tier and subscription status. Provider ids passed as `None` keep
/// their stored value.
pub fn update_subscription(
    account_id: i64,
    tier: Tier,
    status: SubscriptionStatus,
    customer_id: Option<&str>,
    subscription_id: Option<&str>,
    conn: &Connection,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE accounts
         SET tier = ?1,
             subscription_status = ?2,
             billing_customer_id = COALESCE(?3, billing_customer_id),
             subscription_id = COALESCE(?4, subscription_id)
         WHERE id = ?5",
        params![tier.as_str(), status.as_str(), customer_id, subscription_id, account_id],
    )?;
    if changed == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    info!(account_id, tier = tier.as_str(), status = status.as_str(), "subscription updated");
    Ok(())
}

// Decks

/// Creates a new deck and returns its id
pub fn new_deck(account_id: i64, name: &str, description: &str, conn: &Connection) -> Result<i64> {
    conn.execute(
        "INSERT INTO decks (account_id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![account_id, name, description, now_timestamp()],
    )?;
    let id = conn.last_insert_rowid();
    debug!(account_id, deck_id = id, %name, "deck created");
    Ok(id)
}

pub fn update_deck(
    account_id: i64,
    deck_id: i64,
    name: &str,
    description: &str,
    conn: &Connection,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE decks SET name = ?1, description = ?2 WHERE id = ?3 AND account_id = ?4",
        params![name, description, deck_id, account_id],
    )?;
    if changed == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}

/// Deletes a deck; flashcards, progress and tests go with it.
pub fn delete_deck(account_id: i64, deck_id: i64, conn: &Connection) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM decks WHERE id = ?1 AND account_id = ?2",
        params![deck_id, account_id],
    )?;
    if changed == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    debug!(account_id, deck_id, "deck deleted");
    Ok(())
}

/// Fails with `QueryReturnedNoRows` unless the deck belongs to the account
pub fn ensure_deck_owned(account_id: i64, deck_id: i64, conn: &Connection) -> Result<()> {
    conn.query_row(
        "SELECT 1 FROM decks WHERE id = ?1 AND account_id = ?2",
        params![deck_id, account_id],
        |_| Ok(()),
    )
}

pub fn count_decks(account_id: i64, conn: &Connection) -> Result<usize> {
    conn.query_row(
        "SELECT COUNT(*) FROM decks WHERE account_id = ?1",
        params![account_id],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n as usize)
}

pub fn find_deck_by_name(account_id: i64, name: &str, conn: &Connection) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM decks WHERE account_id = ?1 AND name = ?2",
        params![account_id, name],
        |row| row.get(0),
    )
    .optional()
}

/// Lists the account's decks with card counts and cards due on `today`
pub fn list_deck_summaries(
    account_id: i64,
    today: NaiveDate,
    conn: &Connection,
) -> Result<Vec<DeckSummary>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.name, d.description,
                COUNT(f.id),
                COALESCE(SUM(CASE WHEN p.due_on <= ?2 THEN 1 ELSE 0 END), 0)
         FROM decks d
         LEFT JOIN flashcards f ON f.deck_id = d.id
         LEFT JOIN card_progress p ON p.flashcard_id = f.id
         WHERE d.account_id = ?1
         GROUP BY d.id
         ORDER BY d.created_at, d.id",
    )?;

    let decks = stmt
        .query_map(params![account_id, today.to_string()], |row| {
            Ok(DeckSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                card_count: row.get::<_, i64>(3)? as usize,
                due_count: row.get::<_, i64>(4)? as usize,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(decks)
}

/// Loads a deck with all of its flashcards
pub fn load_deck(account_id: i64, deck_id: i64, conn: &Connection) -> Result<Deck> {
    let (name, description): (String, String) = conn.query_row(
        "SELECT name, description FROM decks WHERE id = ?1 AND account_id = ?2",
        params![deck_id, account_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(Deck {
        id: deck_id,
        name,
        description,
        flashcards: get_flashcards_for_deck(deck_id, conn)?,
    })
}

// Flashcards

/// Adds a flashcard and initializes its SM-2 progress.
///
/// Returns `None` when the deck already has a card with the same front.
pub fn add_flashcard(
    account_id: i64,
    deck_id: i64,
    front: &str,
    back: &str,
    conn: &Connection,
) -> Result<Option<i64>> {
    ensure_deck_owned(account_id, deck_id, conn)?;

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO flashcards (deck_id, front, back) VALUES (?1, ?2, ?3)",
        params![deck_id, front, back],
    )?;
    if inserted == 0 {
        return Ok(None);
    }
    let flashcard_id = conn.last_insert_rowid();

    let today = get_current_date(conn)?;
    conn.execute(
        "INSERT OR IGNORE INTO card_progress (flashcard_id, due_on) VALUES (?1, ?2)",
        params![flashcard_id, today.to_string()],
    )?;

    Ok(Some(flashcard_id))
}

pub fn update_flashcard(
    account_id: i64,
    flashcard_id: i64,
    front: &str,
    back: &str,
    conn: &Connection,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE flashcards SET front = ?1, back = ?2
         WHERE id = ?3 AND deck_id IN (SELECT id FROM decks WHERE account_id = ?4)",
        params![front, back, flashcard_id, account_id],
    )?;
    if changed == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}

pub fn delete_flashcard(account_id: i64, flashcard_id: i64, conn: &Connection) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM flashcards
         WHERE id = ?1 AND deck_id IN (SELECT id FROM decks WHERE account_id = ?2)",
        params![flashcard_id, account_id],
    )?;
    if changed == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}

/// Retrieves all flashcards of a deck in insertion order.
/// Callers are expected to have checked ownership.
pub fn get_flashcards_for_deck(deck_id: i64, conn: &Connection) -> Result<Vec<Flashcard>> {
    let mut stmt =
        conn.prepare("SELECT id, front, back FROM flashcards WHERE deck_id = ?1 ORDER BY id")?;

    let flashcards = stmt
        .query_map(params![deck_id], |row| {
            Ok(Flashcard {
                id: row.get(0)?,
                front: row.get(1)?,
                back: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(flashcards)
}

pub fn count_flashcards(deck_id: i64, conn: &Connection) -> Result<usize> {
    conn.query_row(
        "SELECT COUNT(*) FROM flashcards WHERE deck_id = ?1",
        params![deck_id],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n as usize)
}

// Progress

/// Stores SM-2 progress for a flashcard after a review.
/// Fails with `QueryReturnedNoRows` when the card is not the account's.
pub fn update_card_progress(account_id: i64, progress: &CardProgress, conn: &Connection) -> Result<()> {
    let changed = conn.execute(
        "UPDATE card_progress
         SET easiness = ?1, interval_days = ?2, repetitions = ?3, due_on = ?4,
             last_reviewed_on = ?5, total_reviews = ?6, lapses = ?7
         WHERE flashcard_id = ?8
           AND flashcard_id IN (SELECT f.id FROM flashcards f
                                JOIN decks d ON d.id = f.deck_id
                                WHERE d.account_id = ?9)",
        params![
            progress.easiness,
            progress.interval_days,
            progress.repetitions,
            progress.due_on.to_string(),
            progress.last_reviewed_on.map(|d| d.to_string()),
            progress.total_reviews,
            progress.lapses,
            progress.flashcard_id,
            account_id
        ],
    )?;
    if changed == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}

/// Retrieves flashcards of a deck due on the current date, oldest first
pub fn get_flashcards_due_for_review(
    account_id: i64,
    deck_id: i64,
    conn: &Connection,
) -> Result<Vec<(Flashcard, CardProgress)>> {
    ensure_deck_owned(account_id, deck_id, conn)?;
    let today = get_current_date(conn)?;

    let mut stmt = conn.prepare(
        "SELECT f.id, f.front, f.back, p.easiness, p.interval_days, p.repetitions,
                p.due_on, p.last_reviewed_on, p.total_reviews, p.lapses
         FROM flashcards f
         JOIN card_progress p ON f.id = p.flashcard_id
         WHERE f.deck_id = ?1 AND p.due_on <= ?2
         ORDER BY p.due_on ASC, f.id ASC",
    )?;

    let cards = stmt
        .query_map(params![deck_id, today.to_string()], |row| {
            let id: i64 = row.get(0)?;
            let due_on: String = row.get(6)?;
            let last_reviewed_on: Option<String> = row.get(7)?;
            Ok((
                Flashcard {
                    id,
                    front: row.get(1)?,
                    back: row.get(2)?,
                },
                CardProgress {
                    flashcard_id: id,
                    easiness: row.get(3)?,
                    interval_days: row.get(4)?,
                    repetitions: row.get(5)?,
                    due_on: parse_date(6, &due_on)?,
                    last_reviewed_on: last_reviewed_on
                        .as_deref()
                        .map(|d| parse_date(7, d))
                        .transpose()?,
                    total_reviews: row.get(8)?,
                    lapses: row.get(9)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Connection, Account) {
        let conn = init_in_memory().unwrap();
        let account = ensure_account("a@example.com", &conn).unwrap();
        (conn, account)
    }

    #[test]
    fn ensure_account_is_idempotent() {
        let (conn, account) = setup();
        let again = ensure_account("a@example.com", &conn).unwrap();
        assert_eq!(account.id, again.id);
        assert_eq!(again.tier, Tier::Free);
        assert_eq!(again.subscription_status, SubscriptionStatus::None);
    }

    #[test]
    fn advance_day_moves_date_forward() {
        let (conn, _) = setup();
        let before = get_current_date(&conn).unwrap();
        let after = advance_day(&conn).unwrap();
        assert_eq!(after, before.succ_opt().unwrap());
        assert_eq!(get_current_date(&conn).unwrap(), after);
    }

    #[test]
    fn deck_crud_and_summary() {
        let (conn, account) = setup();
        let deck_id = new_deck(account.id, "Polish", "basics", &conn).unwrap();
        add_flashcard(account.id, deck_id, "cześć", "hello", &conn).unwrap();
        add_flashcard(account.id, deck_id, "proszę", "please", &conn).unwrap();

        let summaries = list_deck_summaries(account.id, get_current_date(&conn).unwrap(), &conn)
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].card_count, 2);
        assert_eq!(summaries[0].due_count, 2);

        update_deck(account.id, deck_id, "Polish 1", "", &conn).unwrap();
        let deck = load_deck(account.id, deck_id, &conn).unwrap();
        assert_eq!(deck.name, "Polish 1");
        assert_eq!(deck.flashcards.len(), 2);

        delete_deck(account.id, deck_id, &conn).unwrap();
        assert_eq!(count_decks(account.id, &conn).unwrap(), 0);
        assert_eq!(count_flashcards(deck_id, &conn).unwrap(), 0);
    }

    #[test]
    fn deck_names_are_unique_per_account_ignoring_case() {
        let (conn, account) = setup();
        new_deck(account.id, "Spanish", "", &conn).unwrap();
        assert!(new_deck(account.id, "spanish", "", &conn).is_err());

        let other = ensure_account("b@example.com", &conn).unwrap();
        assert!(new_deck(other.id, "Spanish", "", &conn).is_ok());
    }

    #[test]
    fn file_database_waits_for_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let conn = init_database(&dir.path().join("flashcards.db")).unwrap();
        let timeout: i64 = conn.query_row("PRAGMA busy_timeout", [], |r| r.get(0)).unwrap();
        assert_eq!(timeout, 5000);
        assert!(ensure_account("a@example.com", &conn).is_ok());
    }

    #[test]
    fn duplicate_front_ignores_case() {
        let (conn, account) = setup();
        let deck_id = new_deck(account.id, "Biology", "", &conn).unwrap();
        assert!(add_flashcard(account.id, deck_id, "cell", "unit of life", &conn).unwrap().is_some());
        assert!(add_flashcard(account.id, deck_id, "Cell", "unit of life", &conn).unwrap().is_none());
        assert_eq!(count_flashcards(deck_id, &conn).unwrap(), 1);
    }

    #[test]
    fn duplicate_front_is_ignored() {
        let (conn, account) = setup();
        let deck_id = new_deck(account.id, "D", "", &conn).unwrap();
        assert!(add_flashcard(account.id, deck_id, "a", "1", &conn).unwrap().is_some());
        assert!(add_flashcard(account.id, deck_id, "a", "2", &conn).unwrap().is_none());
        assert_eq!(count_flashcards(deck_id, &conn).unwrap(), 1);
    }

    #[test]
    fn other_accounts_cannot_touch_deck() {
        let (conn, owner) = setup();
        let intruder = ensure_account("x@example.com", &conn).unwrap();
        let deck_id = new_deck(owner.id, "Mine", "", &conn).unwrap();
        let card_id = add_flashcard(owner.id, deck_id, "q", "a", &conn).unwrap().unwrap();

        assert!(matches!(
            load_deck(intruder.id, deck_id, &conn),
            Err(rusqlite::Error::QueryReturnedNoRows)
        ));
        assert!(add_flashcard(intruder.id, deck_id, "x", "y", &conn).is_err());
        assert!(update_flashcard(intruder.id, card_id, "x", "y", &conn).is_err());
        assert!(delete_flashcard(intruder.id, card_id, &conn).is_err());
        assert!(delete_deck(intruder.id, deck_id, &conn).is_err());
        assert_eq!(count_flashcards(deck_id, &conn).unwrap(), 1);
    }

    #[test]
    fn due_cards_follow_progress() {
        let (conn, account) = setup();
        let deck_id = new_deck(account.id, "D", "", &conn).unwrap();
        add_flashcard(account.id, deck_id, "a", "1", &conn).unwrap();
        add_flashcard(account.id, deck_id, "b", "2", &conn).unwrap();

        let due = get_flashcards_due_for_review(account.id, deck_id, &conn).unwrap();
        assert_eq!(due.len(), 2);

        let today = get_current_date(&conn).unwrap();
        let reviewed = crate::models::sm2::calculate_next_review(&due[0].1, 5, today);
        update_card_progress(account.id, &reviewed, &conn).unwrap();

        let due = get_flashcards_due_for_review(account.id, deck_id, &conn).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0.front, "b");

        advance_day(&conn).unwrap();
        let due = get_flashcards_due_for_review(account.id, deck_id, &conn).unwrap();
        assert_eq!(due.len(), 2);
        let stored = due.iter().find(|(f, _)| f.front == "a").unwrap();
        assert_eq!(stored.1.total_reviews, 1);
        assert_eq!(stored.1.last_reviewed_on, Some(today));
    }

    #[test]
    fn subscription_update_keeps_ids_when_none() {
        let (conn, account) = setup();
        update_subscription(
            account.id,
            Tier::Pro,
            SubscriptionStatus::Active,
            Some("cus_1"),
            Some("sub_1"),
            &conn,
        )
        .unwrap();
        update_subscription(account.id, Tier::Free, SubscriptionStatus::Canceled, None, None, &conn)
            .unwrap();

        let stored = get_account(account.id, &conn).unwrap();
        assert_eq!(stored.tier, Tier::Free);
        assert_eq!(stored.billing_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(
            find_account_by_customer("cus_1", &conn).unwrap().map(|a| a.id),
            Some(account.id)
        );
        assert_eq!(
            find_account_by_subscription("sub_1", &conn).unwrap().map(|a| a.id),
            Some(account.id)
        );
        assert!(update_subscription(999, Tier::Pro, SubscriptionStatus::Active, None, None, &conn)
            .is_err());
    }
}
