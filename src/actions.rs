//! Action layer between the UI and everything else.
//!
//! Every public method of [`Actions`] returns an [`ActionResult`]: failures
//! are logged and turned into a message the UI can show, never a panic. The
//! database mutex is only held for the SQLite work of an action, never while
//! a model or payments request is in flight, so actions are safe to run on a
//! worker thread while the UI keeps reading.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::{self, FlashcardRequest, Prompts, QuestionRequest, Source};
use crate::billing::{PaymentsClient, Plan};
use crate::config::Config;
use crate::database::db;
use crate::database::study::{self, StudyStats};
use crate::database::test_sessions::{self, TestSessionRow};
use crate::error::AppError;
use crate::export::json::{export_json_to_path, import_json};
use crate::grading::{self, GradingReport};
use crate::limits;
use crate::llm::{LlmProvider, OfflineProvider};
use crate::models::{
    Account, CardProgress, Deck, DeckSet, Flashcard, StudySession, StudySummary, TestResponse,
    TestSession, TestStatus, Tier, UsageKind, UsageSnapshot,
};

const SAMPLE_DECK: (&str, &str) = ("Polish Vocabulary", "Everyday words and phrases");
const SAMPLE_CARDS: [(&str, &str); 3] = [("cześć", "hello"), ("dziękuję", "thank you"), ("proszę", "please")];

/// Outcome of an action as the UI sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }

    fn from_result(action: &'static str, result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                warn!(action, error = %e, "action failed");
                Self::err(e.to_string())
            }
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.data, self.error) {
            (Some(data), _) if self.success => Ok(data),
            (_, Some(error)) => Err(error),
            _ => Err("action returned no data".to_string()),
        }
    }
}

/// What an AI generation request added to a deck.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub added: usize,
    /// Generated cards whose front already existed in the deck.
    pub duplicates: usize,
    /// Generated cards dropped because the deck hit its card limit.
    pub over_limit: usize,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub deck_id: i64,
    pub name: String,
    pub cards: usize,
}

#[derive(Clone)]
pub struct Actions {
    conn: Arc<Mutex<Connection>>,
    provider: LlmProvider,
    prompts: Arc<Prompts>,
    config: Arc<Config>,
    account_id: i64,
}

impl Actions {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        provider: LlmProvider,
        prompts: Prompts,
        config: Config,
        account_id: i64,
    ) -> Self {
        Self {
            conn,
            provider,
            prompts: Arc::new(prompts),
            config: Arc::new(config),
            account_id,
        }
    }

    /// Opens the configured database and acts as the configured account,
    /// creating both on first run.
    pub fn open(config: Config, provider: LlmProvider) -> Result<Self, AppError> {
        fs::create_dir_all(&config.data_dir)?;
        let conn = db::init_database(&config.database_path)?;
        let account = db::ensure_account(&config.account_email, &conn)?;
        let prompts = Prompts::load(config.prompts_dir.as_deref());
        info!(
            account_id = account.id,
            tier = account.tier.as_str(),
            provider = provider.name(),
            database = %config.database_path.display(),
            "actions ready"
        );
        Ok(Self::new(Arc::new(Mutex::new(conn)), provider, prompts, config, account.id))
    }

    pub fn account_id(&self) -> i64 {
        self.account_id
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, AppError>) -> Result<T, AppError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".into()))?;
        f(&conn)
    }

    fn load_account(&self, conn: &Connection) -> Result<Account, AppError> {
        db::get_account(self.account_id, conn).map_err(|e| AppError::from_lookup(e, "account"))
    }

    fn owned_deck(&self, deck_id: i64, conn: &Connection) -> Result<Deck, AppError> {
        db::load_deck(self.account_id, deck_id, conn)
            .map_err(|e| AppError::from_lookup(e, &format!("deck {deck_id}")))
    }

    // Account, plan and date

    pub fn account(&self) -> ActionResult<Account> {
        ActionResult::from_result("account", self.with_conn(|conn| self.load_account(conn)))
    }

    pub fn plans(&self) -> Vec<Plan> {
        vec![Plan::free(), Plan::pro(&self.config.billing)]
    }

    pub fn usage_summary(&self) -> ActionResult<Vec<UsageSnapshot>> {
        let result = self.with_conn(|conn| {
            let account = self.load_account(conn)?;
            let today = db::get_current_date(conn)?;
            limits::usage_summary(&account, today, conn)
        });
        ActionResult::from_result("usage_summary", result)
    }

    pub fn current_date(&self) -> ActionResult<NaiveDate> {
        let result = self.with_conn(|conn| Ok(db::get_current_date(conn)?));
        ActionResult::from_result("current_date", result)
    }

    pub fn advance_day(&self) -> ActionResult<NaiveDate> {
        let result = self.with_conn(|conn| Ok(db::advance_day(conn)?));
        ActionResult::from_result("advance_day", result)
    }

    // Decks

    pub fn list_decks(&self) -> ActionResult<DeckSet> {
        let result = self.with_conn(|conn| {
            let today = db::get_current_date(conn)?;
            let decks = db::list_deck_summaries(self.account_id, today, conn)?;
            Ok(DeckSet { decks })
        });
        ActionResult::from_result("list_decks", result)
    }

    pub fn load_deck(&self, deck_id: i64) -> ActionResult<Deck> {
        ActionResult::from_result("load_deck", self.with_conn(|conn| self.owned_deck(deck_id, conn)))
    }

    pub fn create_deck(&self, name: &str, description: &str) -> ActionResult<i64> {
        let result = (|| -> Result<i64, AppError> {
            let name = deck_name(name)?;
            self.with_conn(|conn| {
                let account = self.load_account(conn)?;
                limits::ensure_can_create_deck(&account, conn)?;
                if db::find_deck_by_name(self.account_id, name, conn)?.is_some() {
                    return Err(AppError::Validation(format!("a deck named '{name}' already exists")));
                }
                let id = db::new_deck(self.account_id, name, description.trim(), conn)?;
                info!(account_id = self.account_id, deck_id = id, %name, "deck created");
                Ok(id)
            })
        })();
        ActionResult::from_result("create_deck", result)
    }

    pub fn update_deck(&self, deck_id: i64, name: &str, description: &str) -> ActionResult<()> {
        let result = (|| -> Result<(), AppError> {
            let name = deck_name(name)?;
            self.with_conn(|conn| {
                db::update_deck(self.account_id, deck_id, name, description.trim(), conn).map_err(|e| {
                    unique_violation(e, &format!("deck {deck_id}"), || {
                        format!("a deck named '{name}' already exists")
                    })
                })
            })
        })();
        ActionResult::from_result("update_deck", result)
    }

    pub fn delete_deck(&self, deck_id: i64) -> ActionResult<()> {
        let result = self.with_conn(|conn| {
            db::delete_deck(self.account_id, deck_id, conn)
                .map_err(|e| AppError::from_lookup(e, &format!("deck {deck_id}")))?;
            info!(account_id = self.account_id, deck_id, "deck deleted");
            Ok(())
        });
        ActionResult::from_result("delete_deck", result)
    }

    /// Gives an account without decks a small deck to study. Returns the new
    /// deck id, or `None` when the account already has decks.
    pub fn seed_sample_deck(&self) -> ActionResult<Option<i64>> {
        let has_decks = match self.list_decks().into_result() {
            Ok(set) => !set.decks.is_empty(),
            Err(e) => return ActionResult::err(e),
        };
        if has_decks {
            return ActionResult::ok(None);
        }
        let deck_id = match self.create_deck(SAMPLE_DECK.0, SAMPLE_DECK.1).into_result() {
            Ok(id) => id,
            Err(e) => return ActionResult::err(e),
        };

        let mut added = 0;
        for (front, back) in SAMPLE_CARDS {
            match self.add_flashcard(deck_id, front, back).into_result() {
                Ok(_) => added += 1,
                Err(e) => warn!(deck_id, front, error = %e, "sample card not added"),
            }
        }
        info!(deck_id, added, "sample deck created");
        ActionResult::ok(Some(deck_id))
    }

    // Flashcards

    pub fn add_flashcard(&self, deck_id: i64, front: &str, back: &str) -> ActionResult<i64> {
        let result = (|| -> Result<i64, AppError> {
            let card = card_fields(front, back)?;
            self.with_conn(|conn| {
                let account = self.load_account(conn)?;
                db::ensure_deck_owned(self.account_id, deck_id, conn)
                    .map_err(|e| AppError::from_lookup(e, &format!("deck {deck_id}")))?;
                limits::ensure_can_add_cards(&account, deck_id, 1, conn)?;
                db::add_flashcard(self.account_id, deck_id, &card.front, &card.back, conn)?
                    .ok_or_else(|| AppError::Validation(format!("the deck already has a card '{}'", card.front)))
            })
        })();
        ActionResult::from_result("add_flashcard", result)
    }

    pub fn update_flashcard(&self, flashcard_id: i64, front: &str, back: &str) -> ActionResult<()> {
        let result = (|| -> Result<(), AppError> {
            let card = card_fields(front, back)?;
            self.with_conn(|conn| {
                db::update_flashcard(self.account_id, flashcard_id, &card.front, &card.back, conn).map_err(|e| {
                    unique_violation(e, &format!("flashcard {flashcard_id}"), || {
                        format!("the deck already has a card '{}'", card.front)
                    })
                })
            })
        })();
        ActionResult::from_result("update_flashcard", result)
    }

    pub fn delete_flashcard(&self, flashcard_id: i64) -> ActionResult<()> {
        let result = self.with_conn(|conn| {
            db::delete_flashcard(self.account_id, flashcard_id, conn)
                .map_err(|e| AppError::from_lookup(e, &format!("flashcard {flashcard_id}")))
        });
        ActionResult::from_result("delete_flashcard", result)
    }

    /// Generates cards into a deck. The request count is clamped to the
    /// deck's remaining capacity; usage is only recorded when the model
    /// produced the cards.
    pub fn generate_flashcards(&self, deck_id: i64, request: FlashcardRequest) -> ActionResult<GenerationSummary> {
        ActionResult::from_result("generate_flashcards", self.try_generate_flashcards(deck_id, request))
    }

    fn try_generate_flashcards(
        &self,
        deck_id: i64,
        mut request: FlashcardRequest,
    ) -> Result<GenerationSummary, AppError> {
        let account = self.with_conn(|conn| {
            let account = self.load_account(conn)?;
            db::ensure_deck_owned(self.account_id, deck_id, conn)
                .map_err(|e| AppError::from_lookup(e, &format!("deck {deck_id}")))?;
            let today = db::get_current_date(conn)?;
            limits::ensure_ai_allowance(&account, UsageKind::FlashcardGeneration, today, conn)?;
            if let Some(capacity) = limits::remaining_card_capacity(&account, deck_id, conn)? {
                if capacity == 0 {
                    // Full deck: report the card limit.
                    limits::ensure_can_add_cards(&account, deck_id, 1, conn)?;
                }
                request.count = request.count.min(capacity);
            }
            Ok(account)
        })?;

        let generated = ai::generate_flashcards(&self.provider, &self.prompts, &request)?;

        self.with_conn(|conn| {
            let capacity = limits::remaining_card_capacity(&account, deck_id, conn)?;
            let tx = conn.unchecked_transaction()?;
            let mut summary = GenerationSummary {
                added: 0,
                duplicates: 0,
                over_limit: 0,
                source: generated.source,
            };
            for card in &generated.items {
                if capacity.is_some_and(|c| summary.added >= c) {
                    summary.over_limit += 1;
                    continue;
                }
                match db::add_flashcard(self.account_id, deck_id, &card.front, &card.back, &tx)? {
                    Some(_) => summary.added += 1,
                    None => summary.duplicates += 1,
                }
            }
            if generated.used_ai() {
                let today = db::get_current_date(&tx)?;
                limits::record_ai_usage(&account, UsageKind::FlashcardGeneration, today, &tx)?;
            }
            tx.commit()?;
            info!(
                deck_id,
                added = summary.added,
                duplicates = summary.duplicates,
                over_limit = summary.over_limit,
                source = ?summary.source,
                "flashcards generated"
            );
            Ok(summary)
        })
    }

    // Study

    /// Starts a session over the deck's cards due today.
    pub fn start_study(&self, deck_id: i64) -> ActionResult<StudySession> {
        let result = self.with_conn(|conn| {
            let deck = self.owned_deck(deck_id, conn)?;
            let due = db::get_flashcards_due_for_review(self.account_id, deck_id, conn)?;
            if due.is_empty() {
                return Err(AppError::Validation(format!("no cards in '{}' are due today", deck.name)));
            }
            let today = db::get_current_date(conn)?;
            debug!(deck_id, due = due.len(), "study session started");
            Ok(StudySession::new_from_due_cards(deck_id, deck.name, due, today))
        });
        ActionResult::from_result("start_study", result)
    }

    /// Persists the progress returned by [`StudySession::grade_current_card`].
    pub fn record_review(&self, progress: &CardProgress) -> ActionResult<()> {
        let result = self.with_conn(|conn| {
            db::update_card_progress(self.account_id, progress, conn)
                .map_err(|e| AppError::from_lookup(e, &format!("flashcard {}", progress.flashcard_id)))
        });
        ActionResult::from_result("record_review", result)
    }

    /// Stores the session in the history. Sessions where nothing was graded
    /// are dropped and yield `None`.
    pub fn finish_study(&self, summary: &StudySummary) -> ActionResult<Option<i64>> {
        let result = self.with_conn(|conn| {
            if summary.cards_studied == 0 {
                return Ok(None);
            }
            db::ensure_deck_owned(self.account_id, summary.deck_id, conn)
                .map_err(|e| AppError::from_lookup(e, &format!("deck {}", summary.deck_id)))?;
            let id = study::record_study_session(self.account_id, summary, conn)?;
            info!(
                deck_id = summary.deck_id,
                rounds = summary.rounds,
                studied = summary.cards_studied,
                passed = summary.cards_passed,
                "study session recorded"
            );
            Ok(Some(id))
        });
        ActionResult::from_result("finish_study", result)
    }

    pub fn study_stats(&self) -> ActionResult<StudyStats> {
        let result = self.with_conn(|conn| Ok(study::study_stats(self.account_id, conn)?));
        ActionResult::from_result("study_stats", result)
    }

    // Tests

    pub fn create_test(&self, deck_id: i64, request: QuestionRequest) -> ActionResult<TestSession> {
        ActionResult::from_result("create_test", self.try_create_test(deck_id, request))
    }

    fn try_create_test(&self, deck_id: i64, request: QuestionRequest) -> Result<TestSession, AppError> {
        let (account, deck) = self.with_conn(|conn| {
            let account = self.load_account(conn)?;
            let deck = self.owned_deck(deck_id, conn)?;
            let today = db::get_current_date(conn)?;
            limits::ensure_ai_allowance(&account, UsageKind::TestGeneration, today, conn)?;
            Ok((account, deck))
        })?;

        let generated = ai::generate_questions(&self.provider, &self.prompts, &deck, request)?;

        self.with_conn(|conn| {
            let test = test_sessions::create_test_session(self.account_id, deck_id, &generated.items, conn)?;
            if generated.used_ai() {
                let today = db::get_current_date(conn)?;
                limits::record_ai_usage(&account, UsageKind::TestGeneration, today, conn)?;
            }
            info!(
                test_id = test.id,
                deck_id,
                questions = test.questions.len(),
                source = ?generated.source,
                "test created"
            );
            Ok(test)
        })
    }

    pub fn load_test(&self, test_id: i64) -> ActionResult<TestSession> {
        let result = self.with_conn(|conn| {
            test_sessions::load_test_session(self.account_id, test_id, conn)
                .map_err(|e| AppError::from_lookup(e, &format!("test {test_id}")))
        });
        ActionResult::from_result("load_test", result)
    }

    pub fn list_tests(&self, deck_id: Option<i64>) -> ActionResult<Vec<TestSessionRow>> {
        let result = self.with_conn(|conn| Ok(test_sessions::list_test_sessions(self.account_id, deck_id, conn)?));
        ActionResult::from_result("list_tests", result)
    }

    /// Grades and stores a test. When the month's grading allowance is used
    /// up the test is still graded, without the model.
    pub fn submit_test(&self, test_id: i64, responses: &[TestResponse]) -> ActionResult<GradingReport> {
        ActionResult::from_result("submit_test", self.try_submit_test(test_id, responses))
    }

    fn try_submit_test(&self, test_id: i64, responses: &[TestResponse]) -> Result<GradingReport, AppError> {
        let (account, test, deck_name, provider) = self.with_conn(|conn| {
            let account = self.load_account(conn)?;
            let test = test_sessions::load_test_session(self.account_id, test_id, conn)
                .map_err(|e| AppError::from_lookup(e, &format!("test {test_id}")))?;
            if test.status == TestStatus::Graded {
                return Err(AppError::Validation(format!("test {test_id} was already submitted")));
            }
            let deck = self.owned_deck(test.deck_id, conn)?;
            let today = db::get_current_date(conn)?;
            let provider = match limits::ensure_ai_allowance(&account, UsageKind::TestGrading, today, conn) {
                Ok(_) => self.provider.clone(),
                Err(AppError::Limit(e)) => {
                    info!(test_id, reason = %e, "grading without the model");
                    LlmProvider::Offline(OfflineProvider)
                }
                Err(e) => return Err(e),
            };
            Ok((account, test, deck.name, provider))
        })?;

        let report = grading::grade_test(&provider, &self.prompts, &test, &deck_name, responses);

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            test_sessions::save_graded_responses(
                self.account_id,
                test_id,
                &report.responses,
                report.overall.percent,
                &tx,
            )?;
            if report.used_ai() {
                let today = db::get_current_date(&tx)?;
                limits::record_ai_usage(&account, UsageKind::TestGrading, today, &tx)?;
            }
            tx.commit()?;
            Ok(())
        })?;
        Ok(report)
    }

    /// Rebuilds the report of a graded test from the stored responses.
    pub fn view_test_report(&self, test_id: i64) -> ActionResult<GradingReport> {
        let result = self.with_conn(|conn| {
            let test = test_sessions::load_test_session(self.account_id, test_id, conn)
                .map_err(|e| AppError::from_lookup(e, &format!("test {test_id}")))?;
            if test.status != TestStatus::Graded {
                return Err(AppError::Validation(format!("test {test_id} has not been submitted")));
            }
            let deck = self.owned_deck(test.deck_id, conn)?;
            let graded = test_sessions::load_graded_responses(test_id, conn)?;
            Ok(grading::report_from_saved(&test, &deck.name, graded))
        });
        ActionResult::from_result("view_test_report", result)
    }

    // Billing

    /// Returns the hosted checkout URL for upgrading to Pro.
    pub fn start_checkout(&self) -> ActionResult<String> {
        let result = (|| -> Result<String, AppError> {
            let account = self.with_conn(|conn| self.load_account(conn))?;
            if account.tier == Tier::Pro {
                return Err(AppError::Validation("the account is already on the Pro plan".into()));
            }
            let client = PaymentsClient::from_config(&self.config)?;
            let session = client.create_checkout_session(&account, &self.config.billing)?;
            Ok(session.url)
        })();
        ActionResult::from_result("start_checkout", result)
    }

    /// Returns the billing portal URL for managing an existing subscription.
    pub fn open_billing_portal(&self) -> ActionResult<String> {
        let result = (|| -> Result<String, AppError> {
            let account = self.with_conn(|conn| self.load_account(conn))?;
            let client = PaymentsClient::from_config(&self.config)?;
            let session = client.create_portal_session(&account, &self.config.billing.portal_return_url)?;
            Ok(session.url)
        })();
        ActionResult::from_result("open_billing_portal", result)
    }

    // Import / export

    /// Imports a deck file as a new deck, within the plan's limits.
    pub fn import_deck(&self, path: &Path) -> ActionResult<ImportSummary> {
        let result = (|| -> Result<ImportSummary, AppError> {
            let deck = import_json(path)?;
            self.with_conn(|conn| {
                let account = self.load_account(conn)?;
                limits::ensure_can_create_deck(&account, conn)?;
                if db::find_deck_by_name(self.account_id, &deck.name, conn)?.is_some() {
                    return Err(AppError::Validation(format!(
                        "a deck named '{}' already exists; rename it in the file",
                        deck.name
                    )));
                }
                let tx = conn.unchecked_transaction()?;
                let deck_id = db::new_deck(self.account_id, &deck.name, &deck.description, &tx)?;
                limits::ensure_can_add_cards(&account, deck_id, deck.flashcards.len(), &tx)?;
                let mut cards = 0;
                for card in &deck.flashcards {
                    if db::add_flashcard(self.account_id, deck_id, &card.front, &card.back, &tx)?.is_some() {
                        cards += 1;
                    }
                }
                tx.commit()?;
                info!(deck_id, name = %deck.name, cards, "deck imported");
                Ok(ImportSummary { deck_id, name: deck.name, cards })
            })
        })();
        ActionResult::from_result("import_deck", result)
    }

    /// Writes the deck to `path`; returns the number of cards exported.
    pub fn export_deck(&self, deck_id: i64, path: &Path) -> ActionResult<usize> {
        let result = (|| -> Result<usize, AppError> {
            let deck = self.with_conn(|conn| self.owned_deck(deck_id, conn))?;
            export_json_to_path(&deck, path)?;
            Ok(deck.flashcards.len())
        })();
        ActionResult::from_result("export_deck", result)
    }
}

fn deck_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("deck name is required".into()));
    }
    Ok(name)
}

fn card_fields(front: &str, back: &str) -> Result<Flashcard, AppError> {
    Flashcard::new(front, back)
        .normalized()
        .ok_or_else(|| AppError::Validation("both sides of a flashcard are required".into()))
}

/// UNIQUE violations become validation errors, missing rows `NotFound`.
fn unique_violation(err: rusqlite::Error, what: &str, message: impl FnOnce() -> String) -> AppError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            AppError::Validation(message())
        }
        other => AppError::from_lookup(other, what),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;

    fn actions(provider: LlmProvider) -> (Actions, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::test_default(dir.path());
        let conn = db::init_in_memory().unwrap();
        let account = db::ensure_account(&config.account_email, &conn).unwrap();
        let actions = Actions::new(
            Arc::new(Mutex::new(conn)),
            provider,
            Prompts::builtin(),
            config,
            account.id,
        );
        (actions, dir)
    }

    fn offline() -> LlmProvider {
        LlmProvider::Offline(OfflineProvider)
    }

    #[test]
    fn action_result_carries_error_text() {
        let ok: ActionResult<i32> = ActionResult::ok(3);
        assert!(ok.success);
        assert_eq!(ok.into_result(), Ok(3));

        let failed: ActionResult<i32> = ActionResult::from_result("test", Err(AppError::not_found("deck 9")));
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("deck 9 not found"));
        assert_eq!(failed.into_result(), Err("deck 9 not found".to_string()));
    }

    #[test]
    fn action_result_serializes_like_a_response() {
        let failed: ActionResult<()> = ActionResult::err("nope");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "data": null, "error": "nope"}));
    }

    #[test]
    fn deck_names_are_trimmed_and_unique() {
        let (actions, _dir) = actions(offline());
        let id = actions.create_deck("  Spanish ", "").into_result().unwrap();
        assert_eq!(actions.load_deck(id).into_result().unwrap().name, "Spanish");

        let dup = actions.create_deck("Spanish", "again");
        assert!(dup.error.unwrap().contains("already exists"));
        assert!(!actions.create_deck("   ", "").success);
    }

    #[test]
    fn renaming_onto_existing_deck_is_validation_error() {
        let (actions, _dir) = actions(offline());
        actions.create_deck("A", "").into_result().unwrap();
        let b = actions.create_deck("B", "").into_result().unwrap();
        let err = actions.update_deck(b, "A", "").into_result().unwrap_err();
        assert!(err.contains("already exists"), "{err}");
        assert!(actions.update_deck(999, "C", "").into_result().unwrap_err().contains("not found"));
    }

    #[test]
    fn duplicate_card_front_is_rejected() {
        let (actions, _dir) = actions(offline());
        let deck = actions.create_deck("Words", "").into_result().unwrap();
        actions.add_flashcard(deck, "hola", "hello").into_result().unwrap();
        let err = actions.add_flashcard(deck, " hola ", "hi").into_result().unwrap_err();
        assert!(err.contains("already has a card"));
        assert!(!actions.add_flashcard(deck, "", "x").success);
    }

    #[test]
    fn generation_records_usage_only_for_model_output() {
        let scripted = ScriptedProvider::new([r#"[{"front": "sol", "back": "sun"}, {"front": "luna", "back": "moon"}]"#]);
        let (actions, _dir) = actions(LlmProvider::Scripted(scripted));
        let deck = actions.create_deck("Spanish", "").into_result().unwrap();

        let request = FlashcardRequest { topic: "space".into(), source_text: String::new(), count: 5 };
        let summary = actions.generate_flashcards(deck, request).into_result().unwrap();
        assert_eq!(summary.added, 2);
        assert_eq!(summary.source, Source::Ai);

        // Script exhausted: falls back to the pasted text.
        let request = FlashcardRequest {
            topic: String::new(),
            source_text: "agua: water\nsol: sun".into(),
            count: 5,
        };
        let summary = actions.generate_flashcards(deck, request).into_result().unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.source, Source::Fallback);

        let usage = actions.usage_summary().into_result().unwrap();
        let flashcards = usage.iter().find(|u| u.kind == UsageKind::FlashcardGeneration).unwrap();
        assert_eq!(flashcards.used, 1);
    }

    #[test]
    fn checkout_needs_payments_key() {
        let (actions, _dir) = actions(offline());
        let err = actions.start_checkout().into_result().unwrap_err();
        assert!(err.contains("PAYMENTS_SECRET_KEY"), "{err}");
    }
}
