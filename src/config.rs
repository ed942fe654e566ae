//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the working directory (built-in
//! defaults apply when the file is absent), then applies
//! `FLASHCARDS_DATA_DIR` and `FLASHCARDS_LOG_LEVEL`. API keys and webhook
//! secrets are only ever taken from the environment.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Gemini provider settings (`[llm.gemini]`).
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL up to and including the API version, e.g. `.../v1beta`.
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Active provider: `"offline"` or `"gemini"`.
    pub provider: String,
    pub gemini: GeminiConfig,
}

/// Payments provider settings (`[billing]`).
#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub api_base_url: String,
    /// Provider-side price identifier for the Pro plan.
    pub pro_price_id: String,
    /// Display price of the Pro plan in minor units.
    pub pro_price_cents: u32,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub portal_return_url: String,
    /// Maximum accepted age of a webhook signature timestamp.
    pub webhook_tolerance_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub bind: String,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Local account the desktop app acts as.
    pub account_email: String,
    /// Directory for the database and log file (already expanded, no `~`).
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub log_level: String,
    /// Optional directory whose `*.txt` files override the built-in prompts.
    pub prompts_dir: Option<PathBuf>,
    pub llm: LlmConfig,
    /// From `GEMINI_API_KEY`.
    pub llm_api_key: Option<String>,
    pub billing: BillingConfig,
    /// From `PAYMENTS_SECRET_KEY`.
    pub payments_secret_key: Option<String>,
    /// From `PAYMENTS_WEBHOOK_SECRET`.
    pub payments_webhook_secret: Option<String>,
    pub webhook: WebhookConfig,
}

impl Config {
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("flashcards.log")
    }
}

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    app: RawApp,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    billing: RawBilling,
    #[serde(default)]
    webhook: RawWebhook,
}

#[derive(Deserialize)]
struct RawApp {
    #[serde(default = "default_account_email")]
    account_email: String,
    #[serde(default = "default_data_dir")]
    data_dir: String,
    #[serde(default = "default_database_file")]
    database_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    prompts_dir: Option<String>,
}

impl Default for RawApp {
    fn default() -> Self {
        Self {
            account_email: default_account_email(),
            data_dir: default_data_dir(),
            database_file: default_database_file(),
            log_level: default_log_level(),
            prompts_dir: None,
        }
    }
}

fn default_account_email() -> String { "local@flashcards.app".to_string() }
fn default_data_dir() -> String { "~/.flashcards".to_string() }
fn default_database_file() -> String { "db.sqlite3".to_string() }
fn default_log_level() -> String { "info".to_string() }

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    gemini: RawGemini,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), gemini: RawGemini::default() }
    }
}

#[derive(Deserialize)]
struct RawGemini {
    #[serde(default = "default_gemini_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_gemini_model")]
    model: String,
    #[serde(default = "default_gemini_temperature")]
    temperature: f32,
    #[serde(default = "default_gemini_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawGemini {
    fn default() -> Self {
        Self {
            api_base_url: default_gemini_api_base_url(),
            model: default_gemini_model(),
            temperature: default_gemini_temperature(),
            timeout_seconds: default_gemini_timeout_seconds(),
        }
    }
}

fn default_llm_provider() -> String { "offline".to_string() }
fn default_gemini_api_base_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_gemini_model() -> String { "gemini-1.5-flash".to_string() }
fn default_gemini_temperature() -> f32 { 0.4 }
fn default_gemini_timeout_seconds() -> u64 { 60 }

#[derive(Deserialize)]
struct RawBilling {
    #[serde(default = "default_billing_api_base_url")]
    api_base_url: String,
    #[serde(default)]
    pro_price_id: String,
    #[serde(default = "default_pro_price_cents")]
    pro_price_cents: u32,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default = "default_success_url")]
    success_url: String,
    #[serde(default = "default_cancel_url")]
    cancel_url: String,
    #[serde(default = "default_portal_return_url")]
    portal_return_url: String,
    #[serde(default = "default_webhook_tolerance_seconds")]
    webhook_tolerance_seconds: u64,
}

impl Default for RawBilling {
    fn default() -> Self {
        Self {
            api_base_url: default_billing_api_base_url(),
            pro_price_id: String::new(),
            pro_price_cents: default_pro_price_cents(),
            currency: default_currency(),
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
            portal_return_url: default_portal_return_url(),
            webhook_tolerance_seconds: default_webhook_tolerance_seconds(),
        }
    }
}

fn default_billing_api_base_url() -> String { "https://api.stripe.com/v1".to_string() }
fn default_pro_price_cents() -> u32 { 999 }
fn default_currency() -> String { "usd".to_string() }
fn default_success_url() -> String { "https://flashcards.app/billing/success".to_string() }
fn default_cancel_url() -> String { "https://flashcards.app/billing/cancel".to_string() }
fn default_portal_return_url() -> String { "https://flashcards.app/account".to_string() }
fn default_webhook_tolerance_seconds() -> u64 { 300 }

#[derive(Deserialize)]
struct RawWebhook {
    #[serde(default = "default_webhook_bind")]
    bind: String,
}

impl Default for RawWebhook {
    fn default() -> Self {
        Self { bind: default_webhook_bind() }
    }
}

fn default_webhook_bind() -> String { "127.0.0.1:8787".to_string() }

/// Load config from `path` (or `config/default.toml`), then apply env overrides.
pub fn load(path: Option<&Path>) -> Result<Config, AppError> {
    let data_dir_override = env::var("FLASHCARDS_DATA_DIR").ok();
    let log_level_override = env::var("FLASHCARDS_LOG_LEVEL").ok();

    let raw = match path {
        Some(p) => Some(read_raw(p)?),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() { Some(read_raw(default)?) } else { None }
        }
    };

    let mut config = resolve(
        raw.unwrap_or_default(),
        data_dir_override.as_deref(),
        log_level_override.as_deref(),
    );
    config.llm_api_key = non_empty_env("GEMINI_API_KEY");
    config.payments_secret_key = non_empty_env("PAYMENTS_SECRET_KEY");
    config.payments_webhook_secret = non_empty_env("PAYMENTS_WEBHOOK_SECRET");
    Ok(config)
}

/// Loader with explicit overrides. Tests pass overrides directly instead of
/// mutating env vars; secrets are left unset.
pub fn load_from(
    path: &Path,
    data_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = read_raw(path)?;
    Ok(resolve(raw, data_dir_override, log_level_override))
}

fn read_raw(path: &Path) -> Result<RawConfig, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    toml::from_str(&text)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))
}

fn resolve(
    raw: RawConfig,
    data_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Config {
    let app = raw.app;
    let data_dir = expand_home(data_dir_override.unwrap_or(&app.data_dir));
    let database_path = {
        let p = expand_home(&app.database_file);
        if p.is_absolute() { p } else { data_dir.join(p) }
    };

    Config {
        account_email: app.account_email,
        data_dir,
        database_path,
        log_level: log_level_override.unwrap_or(&app.log_level).to_string(),
        prompts_dir: app.prompts_dir.map(|d| expand_home(&d)),
        llm: LlmConfig {
            provider: raw.llm.provider,
            gemini: GeminiConfig {
                api_base_url: raw.llm.gemini.api_base_url,
                model: raw.llm.gemini.model,
                temperature: raw.llm.gemini.temperature,
                timeout_seconds: raw.llm.gemini.timeout_seconds,
            },
        },
        llm_api_key: None,
        billing: BillingConfig {
            api_base_url: raw.billing.api_base_url,
            pro_price_id: raw.billing.pro_price_id,
            pro_price_cents: raw.billing.pro_price_cents,
            currency: raw.billing.currency,
            success_url: raw.billing.success_url,
            cancel_url: raw.billing.cancel_url,
            portal_return_url: raw.billing.portal_return_url,
            webhook_tolerance_seconds: raw.billing.webhook_tolerance_seconds,
        },
        payments_secret_key: None,
        payments_webhook_secret: None,
        webhook: WebhookConfig { bind: raw.webhook.bind },
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Offline config rooted at `data_dir`: no API keys, no network.
    pub fn test_default(data_dir: &Path) -> Self {
        let mut config = resolve(RawConfig::default(), data_dir.to_str(), None);
        config.billing.api_base_url = "http://127.0.0.1:0/v1".to_string();
        config.billing.pro_price_id = "price_test_pro".to_string();
        config.payments_webhook_secret = Some("whsec_test".to_string());
        config
    }
}
