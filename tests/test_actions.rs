//! End-to-end tests of the action layer over an in-memory database.
//!
//! The model is either offline (every AI feature takes its fallback) or a
//! scripted provider replaying canned replies.

use std::fs;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde_json::json;
use tempfile::TempDir;

use flashcards_app::ai::{FlashcardRequest, Prompts, QuestionRequest, Source};
use flashcards_app::billing::{apply_event, parse_event, EventOutcome};
use flashcards_app::config::Config;
use flashcards_app::database::{db, usage};
use flashcards_app::llm::{LlmProvider, OfflineProvider, ScriptedProvider};
use flashcards_app::models::{QuestionKind, TestResponse, TestSession, Tier, UsageKind, UsagePeriod};
use flashcards_app::Actions;

// ── helpers ──────────────────────────────────────────────────────────────────

struct Harness {
    actions: Actions,
    conn: Arc<Mutex<Connection>>,
    dir: TempDir,
}

fn harness(provider: LlmProvider) -> Harness {
    let dir = TempDir::new().expect("tempdir");
    let config = Config::test_default(dir.path());
    let conn = db::init_in_memory().unwrap();
    let account = db::ensure_account(&config.account_email, &conn).unwrap();
    let conn = Arc::new(Mutex::new(conn));
    let actions = Actions::new(conn.clone(), provider, Prompts::builtin(), config, account.id);
    Harness { actions, conn, dir }
}

fn offline() -> LlmProvider {
    LlmProvider::Offline(OfflineProvider)
}

/// Same database, acting as a different account.
fn other_account(h: &Harness) -> Actions {
    let dir = h.dir.path();
    let account = db::ensure_account("intruder@example.com", &h.conn.lock().unwrap()).unwrap();
    Actions::new(h.conn.clone(), offline(), Prompts::builtin(), Config::test_default(dir), account.id)
}

fn deck_with_cards(actions: &Actions, name: &str, cards: &[(&str, &str)]) -> i64 {
    let deck_id = actions.create_deck(name, "").into_result().unwrap();
    for (front, back) in cards {
        actions.add_flashcard(deck_id, front, back).into_result().unwrap();
    }
    deck_id
}

const POLISH: &[(&str, &str)] = &[
    ("cześć", "hello"),
    ("dziękuję", "thank you"),
    ("proszę", "please"),
];

fn used(actions: &Actions, kind: UsageKind) -> u32 {
    let usage = actions.usage_summary().into_result().unwrap();
    usage.iter().find(|u| u.kind == kind).unwrap().used
}

/// The correct answer for each question, in the form the test screen sends.
fn perfect_answers(test: &TestSession) -> Vec<TestResponse> {
    test.questions
        .iter()
        .map(|q| TestResponse {
            question_id: q.id,
            answer: match &q.kind {
                QuestionKind::MultipleChoice { correct_index, .. } => correct_index.to_string(),
                QuestionKind::TrueFalse { answer } => answer.to_string(),
                QuestionKind::ShortAnswer { expected } => expected.clone(),
            },
        })
        .collect()
}

// ── tier limits ──────────────────────────────────────────────────────────────

#[test]
fn free_tier_is_capped_at_three_decks() {
    let h = harness(offline());
    for name in ["One", "Two", "Three"] {
        assert!(h.actions.create_deck(name, "").success);
    }

    let fourth = h.actions.create_deck("Four", "");
    assert!(!fourth.success);
    assert!(fourth.error.unwrap().contains("at most 3 decks"));
    assert_eq!(h.actions.list_decks().into_result().unwrap().decks.len(), 3);
}

#[test]
fn free_tier_is_capped_at_fifty_cards_per_deck() {
    let h = harness(offline());
    let deck_id = h.actions.create_deck("Big", "").into_result().unwrap();
    for i in 0..50 {
        h.actions.add_flashcard(deck_id, &format!("front {i}"), "back").into_result().unwrap();
    }

    let err = h.actions.add_flashcard(deck_id, "one more", "back").into_result().unwrap_err();
    assert!(err.contains("50 cards per deck"), "{err}");

    let request = FlashcardRequest {
        topic: String::new(),
        source_text: "extra: card".into(),
        count: 5,
    };
    assert!(!h.actions.generate_flashcards(deck_id, request).success);
}

#[test]
fn upgrade_webhook_lifts_the_deck_limit() {
    let h = harness(offline());
    for name in ["One", "Two", "Three"] {
        h.actions.create_deck(name, "").into_result().unwrap();
    }

    let payload = json!({
        "id": "evt_upgrade",
        "type": "checkout.session.completed",
        "data": {"object": {
            "client_reference_id": h.actions.account_id().to_string(),
            "customer": "cus_42",
            "subscription": "sub_42"
        }}
    })
    .to_string();
    let event = parse_event(payload.as_bytes()).unwrap();
    let outcome = apply_event(&event, &h.conn.lock().unwrap()).unwrap();
    assert!(matches!(outcome, EventOutcome::Applied { tier: Tier::Pro, .. }));

    let account = h.actions.account().into_result().unwrap();
    assert_eq!(account.tier, Tier::Pro);
    assert_eq!(account.billing_customer_id.as_deref(), Some("cus_42"));
    assert!(h.actions.create_deck("Four", "").success);

    let err = h.actions.start_checkout().into_result().unwrap_err();
    assert!(err.contains("already on the Pro plan"));
}

// ── flashcards ───────────────────────────────────────────────────────────────

#[test]
fn generation_is_clamped_to_remaining_capacity() {
    let cards: Vec<_> = (0..10).map(|i| json!({"front": format!("term {i}"), "back": "meaning"})).collect();
    let scripted = ScriptedProvider::new([json!(cards).to_string()]);
    let h = harness(LlmProvider::Scripted(scripted.clone()));
    let deck_id = h.actions.create_deck("Almost full", "").into_result().unwrap();
    for i in 0..47 {
        h.actions.add_flashcard(deck_id, &format!("existing {i}"), "x").into_result().unwrap();
    }

    let request = FlashcardRequest { topic: "terms".into(), source_text: String::new(), count: 10 };
    let summary = h.actions.generate_flashcards(deck_id, request).into_result().unwrap();

    assert_eq!(summary.added, 3);
    assert_eq!(summary.source, Source::Ai);
    assert!(scripted.prompts()[0].contains("Write at most 3 flashcards"));
    assert_eq!(h.actions.load_deck(deck_id).into_result().unwrap().flashcards.len(), 50);
    assert_eq!(used(&h.actions, UsageKind::FlashcardGeneration), 1);
}

#[test]
fn offline_generation_does_not_consume_allowance() {
    let h = harness(offline());
    let deck_id = h.actions.create_deck("Biology", "").into_result().unwrap();

    let request = FlashcardRequest {
        topic: String::new(),
        source_text: "- Mitochondria: powerhouse of the cell\n- Ribosome = protein factory\nnot a card".into(),
        count: 10,
    };
    let summary = h.actions.generate_flashcards(deck_id, request).into_result().unwrap();
    assert_eq!(summary.added, 2);
    assert_eq!(summary.source, Source::Fallback);
    assert_eq!(used(&h.actions, UsageKind::FlashcardGeneration), 0);

    let nothing = FlashcardRequest { topic: "cells".into(), source_text: String::new(), count: 5 };
    assert!(!h.actions.generate_flashcards(deck_id, nothing).success);
}

#[test]
fn exhausted_generation_allowance_blocks_the_model() {
    let scripted = ScriptedProvider::new([r#"[{"front": "a", "back": "b"}]"#]);
    let h = harness(LlmProvider::Scripted(scripted.clone()));
    let deck_id = h.actions.create_deck("Deck", "").into_result().unwrap();
    {
        let conn = h.conn.lock().unwrap();
        let today = db::get_current_date(&conn).unwrap();
        let period = UsagePeriod::containing(today);
        usage::increment_usage(h.actions.account_id(), &period, UsageKind::FlashcardGeneration, 10, &conn)
            .unwrap();
    }

    let request = FlashcardRequest { topic: "letters".into(), source_text: String::new(), count: 1 };
    let err = h.actions.generate_flashcards(deck_id, request).into_result().unwrap_err();
    assert!(err.contains("monthly limit reached"), "{err}");
    assert_eq!(scripted.remaining(), 1, "model must not be called");
}

#[test]
fn card_crud_round_trip() {
    let h = harness(offline());
    let deck_id = deck_with_cards(&h.actions, "Polish", POLISH);
    let deck = h.actions.load_deck(deck_id).into_result().unwrap();
    let card_id = deck.flashcards[0].id;

    h.actions.update_flashcard(card_id, "hej", "hi").into_result().unwrap();
    let err = h.actions.update_flashcard(card_id, "proszę", "x").into_result().unwrap_err();
    assert!(err.contains("already has a card"), "{err}");

    h.actions.delete_flashcard(card_id).into_result().unwrap();
    let deck = h.actions.load_deck(deck_id).into_result().unwrap();
    assert_eq!(deck.flashcards.len(), 2);
    assert!(deck.flashcards.iter().all(|c| c.front != "hej"));
}

#[test]
fn sample_deck_is_seeded_once() {
    let h = harness(offline());
    let deck_id = h.actions.seed_sample_deck().into_result().unwrap().expect("new deck");
    let deck = h.actions.load_deck(deck_id).into_result().unwrap();
    assert_eq!(deck.flashcards.len(), 3);

    assert_eq!(h.actions.seed_sample_deck().into_result().unwrap(), None);
    assert_eq!(h.actions.list_decks().into_result().unwrap().decks.len(), 1);
}

#[test]
fn sample_deck_skips_accounts_with_decks() {
    let h = harness(offline());
    deck_with_cards(&h.actions, "Mine", POLISH);
    assert_eq!(h.actions.seed_sample_deck().into_result().unwrap(), None);
    assert_eq!(h.actions.list_decks().into_result().unwrap().decks.len(), 1);
}

// ── ownership ────────────────────────────────────────────────────────────────

#[test]
fn other_accounts_cannot_touch_a_deck() {
    let h = harness(offline());
    let deck_id = deck_with_cards(&h.actions, "Private", POLISH);
    let card_id = h.actions.load_deck(deck_id).into_result().unwrap().flashcards[0].id;
    let intruder = other_account(&h);

    assert!(intruder.load_deck(deck_id).error.unwrap().contains("not found"));
    assert!(!intruder.delete_deck(deck_id).success);
    assert!(!intruder.add_flashcard(deck_id, "x", "y").success);
    assert!(!intruder.delete_flashcard(card_id).success);
    assert!(!intruder.start_study(deck_id).success);
    assert!(intruder.list_decks().into_result().unwrap().decks.is_empty());

    let session = h.actions.start_study(deck_id).into_result().unwrap();
    let progress = session.cards[0].progress.clone();
    assert!(!intruder.record_review(&progress).success);
    assert!(h.actions.record_review(&progress).success);
}

// ── study ────────────────────────────────────────────────────────────────────

#[test]
fn study_session_schedules_cards_for_tomorrow() {
    let h = harness(offline());
    let deck_id = deck_with_cards(&h.actions, "Polish", POLISH);
    let today = h.actions.current_date().into_result().unwrap();

    let mut session = h.actions.start_study(deck_id).into_result().unwrap();
    assert_eq!(session.total_count(), 3);
    while !session.is_completed() {
        session.toggle_back();
        let progress = session.grade_current_card(5, today).unwrap();
        h.actions.record_review(&progress).into_result().unwrap();
        session.next_card();
    }

    let recorded = h.actions.finish_study(&session.summary()).into_result().unwrap();
    assert!(recorded.is_some());
    let stats = h.actions.study_stats().into_result().unwrap();
    assert_eq!((stats.sessions, stats.cards_studied, stats.cards_passed), (1, 3, 3));

    assert!(h.actions.start_study(deck_id).error.unwrap().contains("due today"));
    let tomorrow = h.actions.advance_day().into_result().unwrap();
    assert_eq!(tomorrow, today.succ_opt().unwrap());
    let decks = h.actions.list_decks().into_result().unwrap();
    assert_eq!(decks.decks[0].due_count, 3);
}

#[test]
fn empty_study_session_is_not_recorded() {
    let h = harness(offline());
    let deck_id = deck_with_cards(&h.actions, "Polish", POLISH);
    let session = h.actions.start_study(deck_id).into_result().unwrap();
    assert_eq!(h.actions.finish_study(&session.summary()).into_result().unwrap(), None);
}

// ── tests and grading ────────────────────────────────────────────────────────

#[test]
fn offline_test_is_templated_and_graded_locally() {
    let h = harness(offline());
    let deck_id = deck_with_cards(&h.actions, "Polish", POLISH);

    let test = h.actions.create_test(deck_id, QuestionRequest { count: 6 }).into_result().unwrap();
    assert!(!test.questions.is_empty() && test.questions.len() <= 6);
    assert_eq!(used(&h.actions, UsageKind::TestGeneration), 0);

    let report = h.actions.submit_test(test.id, &perfect_answers(&test)).into_result().unwrap();
    assert_eq!(report.overall.percent, 100.0);
    assert_eq!(report.overall.grade, 'A');
    assert!(!report.used_ai());
    assert_eq!(used(&h.actions, UsageKind::TestGrading), 0);

    let rows = h.actions.list_tests(Some(deck_id)).into_result().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].score_percent, Some(100.0));

    let saved = h.actions.view_test_report(test.id).into_result().unwrap();
    assert_eq!(saved.overall, report.overall);
    assert_eq!(saved.questions.len(), test.questions.len());

    let again = h.actions.submit_test(test.id, &perfect_answers(&test));
    assert!(again.error.unwrap().contains("already submitted"));
}

#[test]
fn ai_test_counts_generation_and_grading() {
    let questions = json!([
        {
            "type": "multiple_choice",
            "topic": "Greetings",
            "question": "What does cześć mean?",
            "options": ["hello", "goodbye", "please", "thanks"],
            "answer": "A"
        },
        {
            "type": "true_false",
            "topic": "Manners",
            "question": "proszę means please",
            "answer": true
        }
    ])
    .to_string();
    let analysis = json!({
        "summary": "Greetings are solid; manners need another look.",
        "strengths": ["Greetings"],
        "weaknesses": ["Manners"],
        "recommendations": ["Review the polite phrases"]
    })
    .to_string();
    let scripted = ScriptedProvider::new([questions, analysis]);
    let h = harness(LlmProvider::Scripted(scripted.clone()));
    let deck_id = deck_with_cards(&h.actions, "Polish", POLISH);

    let test = h.actions.create_test(deck_id, QuestionRequest { count: 2 }).into_result().unwrap();
    assert_eq!(test.questions.len(), 2);
    assert_eq!(used(&h.actions, UsageKind::TestGeneration), 1);

    let responses = vec![
        TestResponse { question_id: test.questions[0].id, answer: "0".into() },
        TestResponse { question_id: test.questions[1].id, answer: "false".into() },
    ];
    let report = h.actions.submit_test(test.id, &responses).into_result().unwrap();
    assert_eq!(report.overall.percent, 50.0);
    assert_eq!(report.analysis.summary, "Greetings are solid; manners need another look.");
    assert_eq!(report.topics[0].topic, "Manners", "weakest topic first");
    assert_eq!(used(&h.actions, UsageKind::TestGrading), 1);
    assert_eq!(scripted.remaining(), 0);
}

#[test]
fn exhausted_grading_allowance_still_grades() {
    let scripted = ScriptedProvider::new(Vec::<String>::new());
    let h = harness(LlmProvider::Scripted(scripted.clone()));
    let deck_id = deck_with_cards(&h.actions, "Polish", POLISH);
    let test = h.actions.create_test(deck_id, QuestionRequest { count: 3 }).into_result().unwrap();
    {
        let conn = h.conn.lock().unwrap();
        let today = db::get_current_date(&conn).unwrap();
        let period = UsagePeriod::containing(today);
        usage::increment_usage(h.actions.account_id(), &period, UsageKind::TestGrading, 5, &conn).unwrap();
    }
    let prompts_before = scripted.prompts().len();

    let report = h.actions.submit_test(test.id, &perfect_answers(&test)).into_result().unwrap();
    assert_eq!(report.overall.percent, 100.0);
    assert_eq!(scripted.prompts().len(), prompts_before, "grading must skip the model");
    assert_eq!(used(&h.actions, UsageKind::TestGrading), 5);
}

#[test]
fn test_needs_flashcards() {
    let h = harness(offline());
    let deck_id = h.actions.create_deck("Empty", "").into_result().unwrap();
    let err = h.actions.create_test(deck_id, QuestionRequest::default()).into_result().unwrap_err();
    assert!(err.contains("no flashcards"), "{err}");
}

// ── import / export ──────────────────────────────────────────────────────────

#[test]
fn export_then_import_under_new_name() {
    let h = harness(offline());
    let deck_id = deck_with_cards(&h.actions, "Polish", POLISH);
    let path = h.dir.path().join("polish.json");

    assert_eq!(h.actions.export_deck(deck_id, &path).into_result().unwrap(), 3);

    let err = h.actions.import_deck(&path).into_result().unwrap_err();
    assert!(err.contains("already exists"), "{err}");

    let renamed = fs::read_to_string(&path).unwrap().replace("\"Polish\"", "\"Polish (copy)\"");
    fs::write(&path, renamed).unwrap();
    let summary = h.actions.import_deck(&path).into_result().unwrap();
    assert_eq!(summary.name, "Polish (copy)");
    assert_eq!(summary.cards, 3);
    assert_eq!(h.actions.list_decks().into_result().unwrap().decks.len(), 2);
}

#[test]
fn oversized_import_leaves_no_deck_behind() {
    let h = harness(offline());
    let cards: Vec<_> = (0..51).map(|i| json!({"front": format!("f{i}"), "back": "b"})).collect();
    let path = h.dir.path().join("big.json");
    fs::write(&path, json!({"name": "Huge", "flashcards": cards}).to_string()).unwrap();

    let err = h.actions.import_deck(&path).into_result().unwrap_err();
    assert!(err.contains("50 cards per deck"), "{err}");
    assert!(h.actions.list_decks().into_result().unwrap().decks.is_empty());
}
