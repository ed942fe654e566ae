mod app;
use flashcards_app::*;

use app::MyApp;
use flashcards_app::llm::{LlmProvider, OfflineProvider};
use tracing::{info, warn};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();

    let config = config::load(None)?;
    std::fs::create_dir_all(&config.data_dir)?;
    logger::init(&config.log_level, false, Some(&config.log_file()))?;

    let provider = match llm::providers::build(&config.llm, config.llm_api_key.clone()) {
        Ok(provider) => provider,
        Err(e) => {
            warn!(error = %e, "LLM provider unavailable, AI features use their fallbacks");
            LlmProvider::Offline(OfflineProvider)
        }
    };

    if provider.is_offline() {
        info!("running without a model; AI features use their offline fallbacks");
    }

    let actions = Actions::open(config, provider)?;
    if let Some(e) = actions.seed_sample_deck().error {
        warn!(error = %e, "sample deck not created");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([760.0, 820.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Flashcards",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp::new(actions)))),
    )
    .map_err(|e| AppError::Internal(format!("ui failed: {e}")))
}
