//! Main application UI and state management.
//! Handles the deck and card screens, study sessions, tests and billing.
//!
//! Database-only actions run inline. Anything that may call the model or the
//! payments API runs on a worker thread; results come back through a channel
//! polled every frame.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use chrono::{Local, NaiveDate};
use eframe::egui;

use crate::actions::{ActionResult, Actions, GenerationSummary, ImportSummary};
use crate::ai::{FlashcardRequest, QuestionRequest, Source, MAX_GENERATED_CARDS, MAX_TEST_QUESTIONS};
use crate::database::study::StudyStats;
use crate::database::test_sessions::TestSessionRow;
use crate::grading::{disclose, DisclosureLevel, GradingReport};
use crate::models::{
    Account, Deck, DeckSet, QuestionKind, StudySession, TestResponse, TestSession, Tier,
    UsageSnapshot,
};

/// Application screen states
#[derive(Default, PartialEq)]
enum AppScreen {
    #[default]
    Main,
    Study,
    Test,
    Results,
}

/// Results sent back by worker threads
enum JobResult {
    Generated(ActionResult<GenerationSummary>),
    TestCreated(ActionResult<TestSession>),
    Graded(ActionResult<GradingReport>),
    CheckoutUrl(ActionResult<String>),
    PortalUrl(ActionResult<String>),
}

/// User input collected while rendering, applied afterwards
enum UiAction {
    NextDay,
    RefreshAccount,
    ShowPlans(bool),
    Upgrade,
    ManageBilling,
    DismissStatus,
    Import,
    Export(i64),
    SelectDeck(i64),
    CreateDeck,
    SaveDeck,
    AskDeleteDeck(i64),
    ConfirmDeleteDeck,
    CancelDeleteDeck,
    AddCard,
    EditCard(i64),
    SaveCard,
    CancelEditCard,
    DeleteCard(i64),
    Generate,
    StartStudy(i64),
    RevealBack,
    Grade(u8),
    LeaveStudy,
    CreateTest(i64),
    ResumeTest(i64),
    SubmitTest,
    ViewReport(i64),
    RevealMore,
    BackToMain,
}

struct StatusMessage {
    text: String,
    is_error: bool,
}

struct CardEdit {
    id: i64,
    front: String,
    back: String,
}

/// Main application state
pub struct MyApp {
    actions: Actions,
    show_confirmation_dialog: bool,
    allowed_to_close: bool,
    current_screen: AppScreen,

    account: Option<Account>,
    usage: Vec<UsageSnapshot>,
    stats: StudyStats,
    today: NaiveDate,
    show_plans: bool,

    decks: DeckSet,
    selected_deck: Option<Deck>,
    tests: Vec<TestSessionRow>,
    new_deck_name: String,
    new_deck_description: String,
    edit_deck_name: String,
    edit_deck_description: String,
    pending_delete_deck: Option<i64>,
    current_front: String,
    current_back: String,
    card_edit: Option<CardEdit>,

    gen_topic: String,
    gen_source: String,
    gen_count: usize,
    test_question_count: usize,

    study_session: Option<StudySession>,
    active_test: Option<TestSession>,
    test_answers: HashMap<i64, String>,
    report: Option<GradingReport>,
    disclosure: DisclosureLevel,

    status: Option<StatusMessage>,
    busy: Option<&'static str>,
    jobs_tx: Sender<JobResult>,
    jobs_rx: Receiver<JobResult>,
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(result) = self.jobs_rx.try_recv() {
            self.handle_job(result, ctx);
        }

        let mut actions = Vec::new();
        self.render_header(ctx, &mut actions);
        self.render_status(ctx, &mut actions);
        match self.current_screen {
            AppScreen::Main => self.render_main_screen(ctx, &mut actions),
            AppScreen::Study => self.render_study_screen(ctx, &mut actions),
            AppScreen::Test => self.render_test_screen(ctx, &mut actions),
            AppScreen::Results => self.render_results_screen(ctx, &mut actions),
        }
        self.render_dialogs(ctx, &mut actions);

        // Execute deferred actions
        for action in actions {
            self.apply(action, ctx);
        }

        // Handle window close requests with confirmation dialog
        if ctx.input(|i| i.viewport().close_requested()) && !self.allowed_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_confirmation_dialog = true;
        }

        if self.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = false;
                        }

                        if ui.button("Yes").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }
    }
}

impl MyApp {
    pub fn new(actions: Actions) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel();
        let mut app = Self {
            actions,
            show_confirmation_dialog: false,
            allowed_to_close: false,
            current_screen: AppScreen::Main,
            account: None,
            usage: Vec::new(),
            stats: StudyStats::default(),
            today: Local::now().date_naive(),
            show_plans: false,
            decks: DeckSet::default(),
            selected_deck: None,
            tests: Vec::new(),
            new_deck_name: String::new(),
            new_deck_description: String::new(),
            edit_deck_name: String::new(),
            edit_deck_description: String::new(),
            pending_delete_deck: None,
            current_front: String::new(),
            current_back: String::new(),
            card_edit: None,
            gen_topic: String::new(),
            gen_source: String::new(),
            gen_count: 10,
            test_question_count: 10,
            study_session: None,
            active_test: None,
            test_answers: HashMap::new(),
            report: None,
            disclosure: DisclosureLevel::default(),
            status: None,
            busy: None,
            jobs_tx,
            jobs_rx,
        };
        app.refresh();
        if let Some(first) = app.decks.decks.first().map(|d| d.id) {
            app.select_deck(first);
        }
        app
    }

    fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage { text: text.into(), is_error: false });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage { text: text.into(), is_error: true });
    }

    /// Unwraps an action result, showing its error in the status bar.
    fn take<T>(&mut self, result: ActionResult<T>) -> Option<T> {
        match result.into_result() {
            Ok(data) => Some(data),
            Err(e) => {
                self.set_error(e);
                None
            }
        }
    }

    /// Reloads everything shown on the main screen.
    fn refresh(&mut self) {
        if let Some(account) = self.take(self.actions.account()) {
            self.account = Some(account);
        }
        if let Some(usage) = self.take(self.actions.usage_summary()) {
            self.usage = usage;
        }
        if let Some(stats) = self.take(self.actions.study_stats()) {
            self.stats = stats;
        }
        if let Some(today) = self.take(self.actions.current_date()) {
            self.today = today;
        }
        if let Some(decks) = self.take(self.actions.list_decks()) {
            self.decks = decks;
        }
        if let Some(deck_id) = self.selected_deck.as_ref().map(|d| d.id) {
            if self.decks.position_of(deck_id).is_some() {
                self.reload_selected(deck_id);
            } else {
                self.selected_deck = None;
                self.tests.clear();
            }
        }
    }

    fn reload_selected(&mut self, deck_id: i64) {
        if let Some(deck) = self.take(self.actions.load_deck(deck_id)) {
            self.selected_deck = Some(deck);
        }
        if let Some(tests) = self.take(self.actions.list_tests(Some(deck_id))) {
            self.tests = tests;
        }
    }

    fn select_deck(&mut self, deck_id: i64) {
        self.reload_selected(deck_id);
        if let Some(deck) = &self.selected_deck {
            self.edit_deck_name = deck.name.clone();
            self.edit_deck_description = deck.description.clone();
        }
        self.card_edit = None;
    }

    fn spawn_job(
        &mut self,
        ctx: &egui::Context,
        label: &'static str,
        job: impl FnOnce(&Actions) -> JobResult + Send + 'static,
    ) {
        if let Some(current) = self.busy {
            self.set_error(format!("Still working: {current}"));
            return;
        }
        self.busy = Some(label);
        let actions = self.actions.clone();
        let tx = self.jobs_tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let _ = tx.send(job(&actions));
            ctx.request_repaint();
        });
    }

    fn handle_job(&mut self, result: JobResult, ctx: &egui::Context) {
        self.busy = None;
        match result {
            JobResult::Generated(result) => {
                if let Some(summary) = self.take(result) {
                    let mut text = format!("Added {} cards", summary.added);
                    if summary.duplicates > 0 {
                        text.push_str(&format!(", skipped {} duplicates", summary.duplicates));
                    }
                    if summary.over_limit > 0 {
                        text.push_str(&format!(", {} over the plan's card limit", summary.over_limit));
                    }
                    if summary.source == Source::Fallback {
                        text.push_str(" (extracted from your text, AI unavailable)");
                    }
                    self.set_info(text);
                    self.gen_source.clear();
                }
                self.refresh();
            }
            JobResult::TestCreated(result) => {
                if let Some(test) = self.take(result) {
                    self.test_answers.clear();
                    self.active_test = Some(test);
                    self.current_screen = AppScreen::Test;
                }
                self.refresh();
            }
            JobResult::Graded(result) => {
                if let Some(report) = self.take(result) {
                    self.show_report(report);
                }
                self.refresh();
            }
            JobResult::CheckoutUrl(result) | JobResult::PortalUrl(result) => {
                if let Some(url) = self.take(result) {
                    ctx.open_url(egui::OpenUrl::new_tab(url));
                    self.set_info("Opened the billing page in your browser. Use Refresh once you are done.");
                }
            }
        }
    }

    fn show_report(&mut self, report: GradingReport) {
        self.report = Some(report);
        self.disclosure = DisclosureLevel::default();
        self.active_test = None;
        self.current_screen = AppScreen::Results;
    }

    fn apply(&mut self, action: UiAction, ctx: &egui::Context) {
        match action {
            UiAction::NextDay => {
                if let Some(today) = self.take(self.actions.advance_day()) {
                    self.today = today;
                }
                self.refresh();
            }
            UiAction::RefreshAccount => {
                self.refresh();
                self.set_info("Account refreshed");
            }
            UiAction::ShowPlans(show) => self.show_plans = show,
            UiAction::Upgrade => {
                self.show_plans = false;
                self.spawn_job(ctx, "opening checkout", |a| JobResult::CheckoutUrl(a.start_checkout()));
            }
            UiAction::ManageBilling => {
                self.spawn_job(ctx, "opening billing portal", |a| JobResult::PortalUrl(a.open_billing_portal()));
            }
            UiAction::DismissStatus => self.status = None,
            UiAction::Import => self.handle_import(),
            UiAction::Export(deck_id) => self.handle_export(deck_id),
            UiAction::SelectDeck(deck_id) => self.select_deck(deck_id),
            UiAction::CreateDeck => {
                let result = self.actions.create_deck(&self.new_deck_name, &self.new_deck_description);
                if let Some(deck_id) = self.take(result) {
                    self.new_deck_name.clear();
                    self.new_deck_description.clear();
                    self.refresh();
                    self.select_deck(deck_id);
                }
            }
            UiAction::SaveDeck => {
                if let Some(deck_id) = self.selected_deck.as_ref().map(|d| d.id) {
                    let result = self
                        .actions
                        .update_deck(deck_id, &self.edit_deck_name, &self.edit_deck_description);
                    if self.take(result).is_some() {
                        self.set_info("Deck saved");
                        self.refresh();
                    }
                }
            }
            UiAction::AskDeleteDeck(deck_id) => self.pending_delete_deck = Some(deck_id),
            UiAction::CancelDeleteDeck => self.pending_delete_deck = None,
            UiAction::ConfirmDeleteDeck => {
                if let Some(deck_id) = self.pending_delete_deck.take() {
                    if self.take(self.actions.delete_deck(deck_id)).is_some() {
                        self.set_info("Deck deleted");
                    }
                    self.refresh();
                }
            }
            UiAction::AddCard => {
                if let Some(deck_id) = self.selected_deck.as_ref().map(|d| d.id) {
                    let result = self.actions.add_flashcard(deck_id, &self.current_front, &self.current_back);
                    if self.take(result).is_some() {
                        self.current_front.clear();
                        self.current_back.clear();
                        self.refresh();
                    }
                }
            }
            UiAction::EditCard(card_id) => {
                let card = self
                    .selected_deck
                    .as_ref()
                    .and_then(|d| d.flashcards.iter().find(|c| c.id == card_id));
                if let Some(card) = card {
                    self.card_edit = Some(CardEdit {
                        id: card.id,
                        front: card.front.clone(),
                        back: card.back.clone(),
                    });
                }
            }
            UiAction::SaveCard => {
                if let Some(edit) = self.card_edit.take() {
                    let result = self.actions.update_flashcard(edit.id, &edit.front, &edit.back);
                    if self.take(result).is_none() {
                        self.card_edit = Some(edit);
                    }
                    self.refresh();
                }
            }
            UiAction::CancelEditCard => self.card_edit = None,
            UiAction::DeleteCard(card_id) => {
                let _ = self.take(self.actions.delete_flashcard(card_id));
                self.refresh();
            }
            UiAction::Generate => {
                if let Some(deck_id) = self.selected_deck.as_ref().map(|d| d.id) {
                    let request = FlashcardRequest {
                        topic: self.gen_topic.clone(),
                        source_text: self.gen_source.clone(),
                        count: self.gen_count,
                    };
                    self.spawn_job(ctx, "generating flashcards", move |a| {
                        JobResult::Generated(a.generate_flashcards(deck_id, request))
                    });
                }
            }
            UiAction::StartStudy(deck_id) => {
                if let Some(session) = self.take(self.actions.start_study(deck_id)) {
                    self.study_session = Some(session);
                    self.current_screen = AppScreen::Study;
                }
            }
            UiAction::RevealBack => {
                if let Some(session) = &mut self.study_session {
                    session.toggle_back();
                }
            }
            UiAction::Grade(quality) => {
                let today = self.today;
                let progress = self
                    .study_session
                    .as_mut()
                    .and_then(|session| session.grade_current_card(quality, today));
                if let Some(progress) = progress {
                    let _ = self.take(self.actions.record_review(&progress));
                }
                // After grading, move to next card
                if let Some(session) = &mut self.study_session {
                    session.next_card();
                }
            }
            UiAction::LeaveStudy => {
                if let Some(session) = self.study_session.take() {
                    let summary = session.summary();
                    if let Some(Some(_)) = self.take(self.actions.finish_study(&summary)) {
                        self.set_info(format!(
                            "Studied {} cards, {} on the first try",
                            summary.cards_studied, summary.cards_passed
                        ));
                    }
                }
                self.current_screen = AppScreen::Main;
                self.refresh();
            }
            UiAction::CreateTest(deck_id) => {
                let request = QuestionRequest { count: self.test_question_count };
                self.spawn_job(ctx, "writing a practice test", move |a| {
                    JobResult::TestCreated(a.create_test(deck_id, request))
                });
            }
            UiAction::ResumeTest(test_id) => {
                if let Some(test) = self.take(self.actions.load_test(test_id)) {
                    self.test_answers.clear();
                    self.active_test = Some(test);
                    self.current_screen = AppScreen::Test;
                }
            }
            UiAction::SubmitTest => {
                if let Some(test) = &self.active_test {
                    let test_id = test.id;
                    let responses: Vec<TestResponse> = test
                        .questions
                        .iter()
                        .map(|q| TestResponse {
                            question_id: q.id,
                            answer: self.test_answers.get(&q.id).cloned().unwrap_or_default(),
                        })
                        .collect();
                    self.spawn_job(ctx, "grading the test", move |a| {
                        JobResult::Graded(a.submit_test(test_id, &responses))
                    });
                }
            }
            UiAction::ViewReport(test_id) => {
                if let Some(report) = self.take(self.actions.view_test_report(test_id)) {
                    self.show_report(report);
                }
            }
            UiAction::RevealMore => self.disclosure = self.disclosure.next(),
            UiAction::BackToMain => {
                self.active_test = None;
                self.report = None;
                self.current_screen = AppScreen::Main;
                self.refresh();
            }
        }
    }

    /// Plan, usage and date bar shown on every screen
    fn render_header(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.today.format("%Y-%m-%d").to_string());
                if ui.button("Next Day").clicked() {
                    actions.push(UiAction::NextDay);
                }
                ui.separator();

                if let Some(account) = &self.account {
                    ui.label(format!("{} plan ({})", account.tier, account.subscription_status.as_str()));
                    if account.tier == Tier::Free && ui.button("Upgrade").clicked() {
                        actions.push(UiAction::ShowPlans(true));
                    }
                    if account.billing_customer_id.is_some() && ui.button("Manage billing").clicked() {
                        actions.push(UiAction::ManageBilling);
                    }
                    if ui.button("Refresh").clicked() {
                        actions.push(UiAction::RefreshAccount);
                    }
                }

                ui.separator();
                ui.weak(format!("AI: {}", self.actions.provider_name()));

                if let Some(label) = self.busy {
                    ui.separator();
                    ui.spinner();
                    ui.label(label);
                }
            });
            ui.horizontal_wrapped(|ui| {
                if self.stats.sessions > 0 {
                    let mut text = format!(
                        "{} sessions, {} cards studied",
                        self.stats.sessions, self.stats.cards_studied
                    );
                    if let Some(rate) = self.stats.first_try_rate() {
                        text.push_str(&format!(" ({:.0}% on the first try)", rate * 100.0));
                    }
                    ui.weak(text);
                    ui.separator();
                }
                for snapshot in &self.usage {
                    let text = snapshot.display();
                    if snapshot.is_exhausted() {
                        ui.colored_label(egui::Color32::LIGHT_RED, text);
                    } else {
                        ui.weak(text);
                    }
                }
            });
        });
    }

    fn render_status(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let Some(status) = &self.status else {
            return;
        };
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if status.is_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, &status.text);
                } else {
                    ui.label(&status.text);
                }
                if ui.small_button("x").clicked() {
                    actions.push(UiAction::DismissStatus);
                }
            });
        });
    }

    fn render_dialogs(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        if self.show_plans {
            egui::Window::new("Plans")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        for plan in self.actions.plans() {
                            ui.group(|ui| {
                                ui.vertical(|ui| {
                                    ui.heading(plan.tier.to_string());
                                    ui.label(plan.price_label());
                                    for feature in plan.features() {
                                        ui.label(format!("• {feature}"));
                                    }
                                    if plan.tier == Tier::Pro && ui.button("Upgrade to Pro").clicked() {
                                        actions.push(UiAction::Upgrade);
                                    }
                                });
                            });
                        }
                    });
                    if ui.button("Close").clicked() {
                        actions.push(UiAction::ShowPlans(false));
                    }
                });
        }

        if let Some(deck_id) = self.pending_delete_deck {
            let name = self
                .decks
                .decks
                .iter()
                .find(|d| d.id == deck_id)
                .map(|d| d.name.clone())
                .unwrap_or_default();
            egui::Window::new("Delete deck?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(format!("'{name}' and all of its cards and tests will be deleted."));
                    ui.horizontal(|ui| {
                        if ui.button("Cancel").clicked() {
                            actions.push(UiAction::CancelDeleteDeck);
                        }
                        if ui.button("Delete").clicked() {
                            actions.push(UiAction::ConfirmDeleteDeck);
                        }
                    });
                });
        }

        if let Some(edit) = &mut self.card_edit {
            egui::Window::new("Edit flashcard")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Front:");
                        ui.text_edit_singleline(&mut edit.front);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Back:");
                        ui.text_edit_singleline(&mut edit.back);
                    });
                    ui.horizontal(|ui| {
                        if ui.button("Cancel").clicked() {
                            actions.push(UiAction::CancelEditCard);
                        }
                        if ui.button("Save").clicked() {
                            actions.push(UiAction::SaveCard);
                        }
                    });
                });
        }
    }

    /// Renders the main screen with deck management interface
    fn render_main_screen(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().id_salt("main_screen").show(ui, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Import Deck").clicked() {
                        actions.push(UiAction::Import);
                    }
                    if let Some(deck) = &self.selected_deck {
                        if ui.button(format!("Export '{}'", deck.name)).clicked() {
                            actions.push(UiAction::Export(deck.id));
                        }
                    }
                });
                ui.separator();

                // Deck creation section
                ui.heading("Create New Deck");
                ui.horizontal(|ui| {
                    ui.label("Name:");
                    ui.text_edit_singleline(&mut self.new_deck_name);
                });
                ui.horizontal(|ui| {
                    ui.label("Description:");
                    ui.text_edit_singleline(&mut self.new_deck_description);
                    if ui.button("Create Deck").clicked() {
                        actions.push(UiAction::CreateDeck);
                    }
                });
                ui.separator();

                ui.heading(format!(
                    "Decks ({}, {} cards)",
                    self.decks.decks.len(),
                    self.decks.total_cards()
                ));
                let selected_id = self.selected_deck.as_ref().map(|d| d.id);
                egui::ScrollArea::vertical()
                    .id_salt("decks_list")
                    .max_height(160.0)
                    .show(ui, |ui| {
                        for (i, deck) in self.decks.decks.iter().enumerate() {
                            ui.horizontal(|ui| {
                                let label = format!(
                                    "{}. {} ({} cards, {} due)",
                                    i + 1,
                                    deck.name,
                                    deck.card_count,
                                    deck.due_count
                                );
                                if ui.selectable_label(selected_id == Some(deck.id), label).clicked() {
                                    actions.push(UiAction::SelectDeck(deck.id));
                                }
                                if ui
                                    .add_enabled(deck.due_count > 0, egui::Button::new("Study"))
                                    .clicked()
                                {
                                    actions.push(UiAction::StartStudy(deck.id));
                                }
                                if ui.button("Delete").clicked() {
                                    actions.push(UiAction::AskDeleteDeck(deck.id));
                                }
                            });
                        }
                    });
                ui.separator();

                if self.selected_deck.is_some() {
                    self.render_selected_deck(ui, actions);
                } else {
                    ui.label("Select a deck to add flashcards");
                }
            });
        });
    }

    fn render_selected_deck(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let Some(deck) = &self.selected_deck else {
            return;
        };
        let busy = self.busy.is_some();

        ui.heading(format!("Selected Deck: {}", deck.name));
        ui.horizontal(|ui| {
            ui.label("Name:");
            ui.text_edit_singleline(&mut self.edit_deck_name);
        });
        ui.horizontal(|ui| {
            ui.label("Description:");
            ui.text_edit_singleline(&mut self.edit_deck_description);
            if ui.button("Save").clicked() {
                actions.push(UiAction::SaveDeck);
            }
        });
        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Front:");
            ui.text_edit_singleline(&mut self.current_front);
        });
        ui.horizontal(|ui| {
            ui.label("Back:");
            ui.text_edit_singleline(&mut self.current_back);
        });
        if ui.button("Add Flashcard").clicked() {
            actions.push(UiAction::AddCard);
        }
        ui.separator();

        ui.collapsing("Generate flashcards with AI", |ui| {
            ui.horizontal(|ui| {
                ui.label("Topic:");
                ui.text_edit_singleline(&mut self.gen_topic);
            });
            ui.label("Study material (optional, 'term: definition' lines also work offline):");
            ui.add(egui::TextEdit::multiline(&mut self.gen_source).desired_rows(4));
            ui.horizontal(|ui| {
                ui.label("Cards:");
                ui.add(egui::DragValue::new(&mut self.gen_count).range(1..=MAX_GENERATED_CARDS));
                if ui.add_enabled(!busy, egui::Button::new("Generate")).clicked() {
                    actions.push(UiAction::Generate);
                }
            });
        });

        ui.collapsing("Practice tests", |ui| {
            ui.horizontal(|ui| {
                ui.label("Questions:");
                ui.add(egui::DragValue::new(&mut self.test_question_count).range(1..=MAX_TEST_QUESTIONS));
                let can_test = !busy && !deck.flashcards.is_empty();
                if ui.add_enabled(can_test, egui::Button::new("New test")).clicked() {
                    actions.push(UiAction::CreateTest(deck.id));
                }
            });
            for row in &self.tests {
                ui.horizontal(|ui| {
                    let date = row.created_at.get(..10).unwrap_or(&row.created_at);
                    match row.score_percent {
                        Some(score) => {
                            ui.label(format!("{date}: {} questions, {score:.0}%", row.question_count));
                            if ui.small_button("Report").clicked() {
                                actions.push(UiAction::ViewReport(row.id));
                            }
                        }
                        None => {
                            ui.weak(format!("{date}: {} questions, not submitted", row.question_count));
                            if ui.add_enabled(!busy, egui::Button::new("Resume").small()).clicked() {
                                actions.push(UiAction::ResumeTest(row.id));
                            }
                        }
                    }
                });
            }
        });
        ui.separator();

        ui.heading(format!("Flashcards ({})", deck.flashcards.len()));
        egui::ScrollArea::vertical()
            .id_salt("flashcards_list")
            .max_height(240.0)
            .show(ui, |ui| {
                for (i, flashcard) in deck.flashcards.iter().enumerate() {
                    ui.group(|ui| {
                        ui.horizontal(|ui| {
                            ui.vertical(|ui| {
                                ui.label(format!("{}. Front: {}", i + 1, flashcard.front));
                                ui.label(format!("   Back: {}", flashcard.back));
                            });
                            if ui.small_button("Edit").clicked() {
                                actions.push(UiAction::EditCard(flashcard.id));
                            }
                            if ui.small_button("Delete").clicked() {
                                actions.push(UiAction::DeleteCard(flashcard.id));
                            }
                        });
                    });
                }
            });
    }

    /// Renders the study screen with flashcard review interface
    fn render_study_screen(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &self.study_session else {
                return;
            };
            ui.heading(format!("Studying: {}", session.deck_name));
            ui.label(session.phase_message());
            ui.label(format!(
                "Progress: {} / {} learned ({} remaining)",
                session.learned_count(),
                session.total_count(),
                session.remaining_count()
            ));
            ui.add_space(20.0);

            if session.is_completed() {
                ui.heading("Congratulations!");
                ui.label("Every due card in this deck is reviewed.");
                ui.add_space(20.0);
                if ui.button("Back to Main Screen").clicked() {
                    actions.push(UiAction::LeaveStudy);
                }
                return;
            }

            let Some(card) = session.current_card() else {
                return;
            };
            ui.group(|ui| {
                ui.set_min_height(200.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(20.0);
                    ui.heading("Front:");
                    ui.label(&card.flashcard.front);
                    ui.add_space(20.0);
                    if session.show_back {
                        ui.heading("Back:");
                        ui.label(&card.flashcard.back);
                        if let Some(rate) = card.progress.retention() {
                            ui.weak(format!("Recalled {:.0}% of the time", rate * 100.0));
                        }
                    } else {
                        ui.label("(Click 'Show Back' to reveal)");
                    }
                    ui.add_space(20.0);
                });
            });
            ui.add_space(20.0);

            if !session.show_back {
                if ui.button("Show Back").clicked() {
                    actions.push(UiAction::RevealBack);
                }
            } else if !card.is_learned {
                // Quality rating buttons (0-5), only after revealing the back
                ui.label("Rate your response:");
                ui.horizontal(|ui| {
                    for (quality, label) in [(0, "0 - Blackout"), (1, "1 - Wrong"), (2, "2 - Wrong (familiar)")] {
                        if ui.button(label).clicked() {
                            actions.push(UiAction::Grade(quality));
                        }
                    }
                });
                ui.horizontal(|ui| {
                    for (quality, label) in [(3, "3 - Difficult"), (4, "4 - Correct"), (5, "5 - Perfect")] {
                        if ui.button(label).clicked() {
                            actions.push(UiAction::Grade(quality));
                        }
                    }
                });
            }

            ui.add_space(20.0);
            if ui.button("Back to Main Screen").clicked() {
                actions.push(UiAction::LeaveStudy);
            }
        });
    }

    fn render_test_screen(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let busy = self.busy.is_some();
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(test) = &self.active_test else {
                return;
            };
            ui.heading(format!("Practice test ({} questions)", test.questions.len()));
            ui.separator();

            egui::ScrollArea::vertical().id_salt("test_questions").show(ui, |ui| {
                for (i, question) in test.questions.iter().enumerate() {
                    let answer = self.test_answers.entry(question.id).or_default();
                    ui.group(|ui| {
                        ui.weak(format!("{} · {}", question.topic, question.kind.label()));
                        ui.label(format!("{}. {}", i + 1, question.prompt));
                        match &question.kind {
                            QuestionKind::MultipleChoice { options, .. } => {
                                for (index, option) in options.iter().enumerate() {
                                    ui.radio_value(answer, index.to_string(), option.as_str());
                                }
                            }
                            QuestionKind::TrueFalse { .. } => {
                                ui.horizontal(|ui| {
                                    ui.radio_value(answer, "true".to_string(), "True");
                                    ui.radio_value(answer, "false".to_string(), "False");
                                });
                            }
                            QuestionKind::ShortAnswer { .. } => {
                                ui.add(egui::TextEdit::multiline(answer).desired_rows(2));
                            }
                        }
                    });
                }
                ui.add_space(10.0);

                ui.horizontal(|ui| {
                    if ui.add_enabled(!busy, egui::Button::new("Submit answers")).clicked() {
                        actions.push(UiAction::SubmitTest);
                    }
                    if ui.button("Back to Main Screen").clicked() {
                        actions.push(UiAction::BackToMain);
                    }
                });
            });
        });
    }

    /// Report with progressive disclosure: headline first, then topics,
    /// then every question.
    fn render_results_screen(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(report) = &self.report else {
                return;
            };
            let view = disclose(report, self.disclosure);
            let overall = &view.overall;

            egui::ScrollArea::vertical().id_salt("results").show(ui, |ui| {
                ui.heading(format!("Results: {}", report.deck_name));
                ui.label(
                    egui::RichText::new(format!(
                        "{}  ·  {:.0}%  ·  {} of {} correct",
                        overall.grade, overall.percent, overall.correct, overall.questions
                    ))
                    .size(22.0),
                );
                ui.label(&view.summary);
                ui.separator();

                if let Some(topics) = &view.topics {
                    ui.heading("Topics");
                    ui.label(format!("Consistency across topics: {}", overall.consistency.label()));
                    egui::Grid::new("topics_grid").striped(true).show(ui, |ui| {
                        ui.strong("Topic");
                        ui.strong("Score");
                        ui.strong("Correct");
                        ui.strong("Mastery");
                        ui.end_row();
                        for topic in topics {
                            ui.label(&topic.topic);
                            ui.label(format!("{:.0}%", topic.percent));
                            ui.label(format!("{}/{}", topic.correct, topic.questions));
                            ui.label(topic.mastery.label());
                            ui.end_row();
                        }
                    });
                }

                if let Some(analysis) = &view.analysis {
                    for (title, items) in [
                        ("Strengths", &analysis.strengths),
                        ("To work on", &analysis.weaknesses),
                        ("Next steps", &analysis.recommendations),
                    ] {
                        if items.is_empty() {
                            continue;
                        }
                        ui.add_space(8.0);
                        ui.strong(title);
                        for item in items {
                            ui.label(format!("• {item}"));
                        }
                    }
                    ui.separator();
                }

                if let Some(questions) = &view.questions {
                    ui.heading("Questions");
                    for (i, q) in questions.iter().enumerate() {
                        ui.group(|ui| {
                            let mark = if q.is_correct { "✔" } else { "✘" };
                            ui.label(format!("{mark} {}. {}", i + 1, q.prompt));
                            let answer = if q.answer.is_empty() { "(no answer)" } else { q.answer.as_str() };
                            ui.label(format!("Your answer: {answer}"));
                            if !q.is_correct {
                                ui.label(format!("Correct answer: {}", q.correct_answer));
                            }
                            if !q.feedback.is_empty() {
                                ui.weak(&q.feedback);
                            }
                            if !q.explanation.is_empty() {
                                ui.weak(&q.explanation);
                            }
                        });
                    }
                }

                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    if let Some(label) = view.level.reveal_label() {
                        if ui.button(label).clicked() {
                            actions.push(UiAction::RevealMore);
                        }
                    }
                    if ui.button("Back to Main Screen").clicked() {
                        actions.push(UiAction::BackToMain);
                    }
                });
            });
        });
    }

    /// Handles deck export to JSON file
    fn handle_export(&mut self, deck_id: i64) {
        let name = self
            .selected_deck
            .as_ref()
            .filter(|d| d.id == deck_id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| "deck".to_string());
        // Open file save dialog
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(format!("{name}.json"))
            .add_filter("JSON files", &["json"])
            .save_file()
        else {
            return;
        };
        if let Some(cards) = self.take(self.actions.export_deck(deck_id, &path)) {
            self.set_info(format!("Deck '{name}' exported with {cards} cards"));
        }
    }

    /// Handles deck import from JSON file
    fn handle_import(&mut self) {
        // Open file selection dialog
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        else {
            return;
        };
        let result = self.actions.import_deck(&path);
        if let Some(ImportSummary { deck_id, name, cards }) = self.take(result) {
            self.set_info(format!("Deck '{name}' imported with {cards} cards"));
            self.refresh();
            self.select_deck(deck_id);
        }
    }
}
