//! Payments webhook receiver.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger (`--log-level` beats `RUST_LOG` and the config)
//!   4. Open the database shared with the desktop app
//!   5. Serve until Ctrl-C

use std::sync::{Arc, Mutex};

use tracing::info;

use flashcards_app::config;
use flashcards_app::database::db;
use flashcards_app::error::AppError;
use flashcards_app::logger;
use flashcards_app::webhook_server::{self, WebhookState};

struct CliArgs {
    config_path: Option<String>,
    bind: Option<String>,
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();
    let config = config::load(args.config_path.as_deref().map(std::path::Path::new))?;

    let level = args.log_level.as_deref().unwrap_or(config.log_level.as_str());
    logger::init(level, args.log_level.is_some(), None)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let conn = db::init_database(&config.database_path)?;
    let state = WebhookState::from_config(&config, Arc::new(Mutex::new(conn)))?;

    let bind = args.bind.unwrap_or_else(|| config.webhook.bind.clone());
    info!(
        %bind,
        database = %config.database_path.display(),
        tolerance_secs = state.tolerance_secs,
        "starting webhook server"
    );

    webhook_server::serve(&bind, state, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
        }
    })
    .await
}

fn parse_cli_args() -> CliArgs {
    let mut args = CliArgs { config_path: None, bind: None, log_level: None };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: flashcards-webhook [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                Print help");
                println!("  -f, --config <PATH>       Configuration file (default: config/default.toml)");
                println!("  -b, --bind <ADDR>         Listen address (default: [webhook] bind)");
                println!("      --log-level <LEVEL>   error | warn | info | debug | trace");
                std::process::exit(0);
            }
            "-f" | "--config" => args.config_path = Some(required_value(&arg, iter.next())),
            "-b" | "--bind" => args.bind = Some(required_value(&arg, iter.next())),
            "--log-level" => args.log_level = Some(required_value(&arg, iter.next())),
            other => {
                eprintln!("error: unknown argument '{other}'");
                std::process::exit(1);
            }
        }
    }
    args
}

fn required_value(flag: &str, value: Option<String>) -> String {
    match value {
        Some(v) => v,
        None => {
            eprintln!("error: {flag} requires a value");
            std::process::exit(1);
        }
    }
}
