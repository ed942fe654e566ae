//! HTTP endpoint for payments webhooks.
//!
//! ```text
//! GET  /health
//! POST /webhooks/billing
//! ```
//!
//! SQLite work runs on the blocking pool; the connection is shared with a
//! mutex.

use std::future::Future;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rusqlite::Connection;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::billing::webhook::{self, EventOutcome, SIGNATURE_HEADER};
use crate::config::Config;
use crate::error::AppError;

#[derive(Clone)]
pub struct WebhookState {
    pub conn: Arc<Mutex<Connection>>,
    pub secret: Arc<str>,
    pub tolerance_secs: u64,
}

impl WebhookState {
    /// Fails when `PAYMENTS_WEBHOOK_SECRET` is not configured.
    pub fn from_config(config: &Config, conn: Arc<Mutex<Connection>>) -> Result<Self, AppError> {
        let secret = config
            .payments_webhook_secret
            .as_deref()
            .ok_or_else(|| AppError::Config("PAYMENTS_WEBHOOK_SECRET is not set".into()))?;
        Ok(Self {
            conn,
            secret: Arc::from(secret),
            tolerance_secs: config.billing.webhook_tolerance_seconds,
        })
    }
}

pub fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/billing", post(billing_webhook))
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn serve(
    bind_addr: &str,
    state: WebhookState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Config(format!("webhook bind failed on {bind_addr}: {e}")))?;
    info!(%bind_addr, "webhook server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("webhook server shut down");
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn bad_request(message: String) -> Response {
    warn!(%message, "rejected webhook");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn server_error(message: String) -> Response {
    error!(%message, "webhook processing failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
}

async fn billing_webhook(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        return bad_request("missing signature header".into());
    };
    let now = chrono::Utc::now().timestamp();
    if let Err(e) = webhook::verify_signature(&body, signature, &state.secret, now, state.tolerance_secs) {
        return bad_request(e.to_string());
    }
    let event = match webhook::parse_event(&body) {
        Ok(event) => event,
        Err(e) => return bad_request(e.to_string()),
    };

    let conn = state.conn.clone();
    let applied = tokio::task::spawn_blocking(move || {
        let conn = conn
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".into()))?;
        webhook::apply_event(&event, &conn)
    })
    .await;

    match applied {
        Ok(Ok(EventOutcome::Duplicate)) => Json(json!({ "received": true, "duplicate": true })).into_response(),
        Ok(Ok(_)) => Json(json!({ "received": true })).into_response(),
        // 5xx makes the provider retry later.
        Ok(Err(e)) => server_error(e.to_string()),
        Err(e) => server_error(format!("worker failed: {e}")),
    }
}
