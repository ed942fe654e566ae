//! Payments webhooks: signature verification and subscription updates.
//!
//! Signatures follow the `t=<unix>,v1=<hex hmac>` scheme: the HMAC-SHA256 of
//! `"<t>.<raw body>"` keyed with the endpoint secret. Events are applied
//! inside a transaction together with their idempotency record, so a
//! redelivered event is a no-op.

use hmac::{Hmac, Mac};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, info, warn};

use super::BillingError;
use crate::database::{billing, db};
use crate::error::AppError;
use crate::models::{Account, SubscriptionStatus, Tier};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Checks `header` against `payload`. `now` is the current unix time.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: u64,
) -> Result<(), BillingError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => {
                if let Ok(sig) = hex::decode(v) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| BillingError::InvalidSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(BillingError::InvalidSignature("missing v1 signature".into()));
    }
    if now.abs_diff(timestamp) > tolerance_secs {
        return Err(BillingError::InvalidSignature("timestamp outside tolerance".into()));
    }

    for sig in &signatures {
        let mut mac = keyed_mac(secret)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(sig).is_ok() {
            return Ok(());
        }
    }
    Err(BillingError::InvalidSignature("no matching signature".into()))
}

/// Builds a signature header for `payload`, as the provider would send it.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, BillingError> {
    let mut mac = keyed_mac(secret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let sig = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={sig}"))
}

fn keyed_mac(secret: &str) -> Result<HmacSha256, BillingError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BillingError::InvalidSignature(format!("bad secret: {e}")))
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, BillingError> {
    serde_json::from_slice(payload).map_err(|e| BillingError::InvalidPayload(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    Applied { account_id: i64, tier: Tier, status: SubscriptionStatus },
    Ignored { reason: String },
    Duplicate,
}

/// Applies a verified event to the account it concerns.
pub fn apply_event(event: &WebhookEvent, conn: &Connection) -> Result<EventOutcome, AppError> {
    let tx = conn.unchecked_transaction()?;
    if !billing::mark_event_processed(&event.id, &event.event_type, &tx)? {
        debug!(event_id = %event.id, "webhook event already processed");
        return Ok(EventOutcome::Duplicate);
    }

    let outcome = apply_to_account(event, &tx)?;
    tx.commit()?;

    match &outcome {
        EventOutcome::Applied { account_id, tier, status } => info!(
            event_id = %event.id,
            event_type = %event.event_type,
            account_id,
            tier = tier.as_str(),
            status = status.as_str(),
            "webhook event applied"
        ),
        EventOutcome::Ignored { reason } => {
            debug!(event_id = %event.id, event_type = %event.event_type, %reason, "webhook event ignored")
        }
        EventOutcome::Duplicate => {}
    }
    Ok(outcome)
}

fn apply_to_account(event: &WebhookEvent, conn: &Connection) -> Result<EventOutcome, AppError> {
    let obj = &event.data.object;
    // `None` keeps the stored tier.
    let (tier, status, customer, subscription) = match event.event_type.as_str() {
        "checkout.session.completed" => (
            Some(Tier::Pro),
            SubscriptionStatus::Active,
            id_field(obj, "customer"),
            id_field(obj, "subscription"),
        ),
        "customer.subscription.updated" => {
            let raw = obj.get("status").and_then(Value::as_str).unwrap_or_default();
            let status = SubscriptionStatus::from_provider(raw);
            if status == SubscriptionStatus::None {
                return Ok(ignored(format!("subscription status '{raw}' is not tracked")));
            }
            (Some(status.entitled_tier()), status, id_field(obj, "customer"), id_field(obj, "id"))
        }
        "customer.subscription.deleted" => (
            Some(Tier::Free),
            SubscriptionStatus::Canceled,
            id_field(obj, "customer"),
            id_field(obj, "id"),
        ),
        "invoice.payment_failed" => (
            None,
            SubscriptionStatus::PastDue,
            id_field(obj, "customer"),
            id_field(obj, "subscription"),
        ),
        other => return Ok(ignored(format!("unhandled event type '{other}'"))),
    };

    let Some(account) = find_account(obj, customer.as_deref(), subscription.as_deref(), conn)? else {
        warn!(event_id = %event.id, event_type = %event.event_type, "webhook event for unknown account");
        return Ok(ignored("no matching account".to_string()));
    };

    let tier = match tier {
        Some(tier) => tier,
        // Deliveries arrive out of order; a failed invoice must not revive
        // a subscription that already ended.
        None if matches!(
            account.subscription_status,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        ) => account.tier,
        None => {
            return Ok(ignored(format!(
                "payment failure for a {} subscription",
                account.subscription_status.as_str()
            )));
        }
    };

    db::update_subscription(account.id, tier, status, customer.as_deref(), subscription.as_deref(), conn)?;
    Ok(EventOutcome::Applied { account_id: account.id, tier, status })
}

fn ignored(reason: String) -> EventOutcome {
    EventOutcome::Ignored { reason }
}

/// Reads an id that may be a plain string or an expanded object.
fn id_field(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(inner) => inner.get("id").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

/// Account lookup: our own reference first, then provider ids.
fn find_account(
    obj: &Value,
    customer: Option<&str>,
    subscription: Option<&str>,
    conn: &Connection,
) -> Result<Option<Account>, AppError> {
    let reference = obj
        .get("client_reference_id")
        .and_then(Value::as_str)
        .or_else(|| obj.pointer("/metadata/account_id").and_then(Value::as_str))
        .and_then(|s| s.parse::<i64>().ok());
    if let Some(id) = reference {
        if let Some(account) = db::get_account(id, conn).optional()? {
            return Ok(Some(account));
        }
    }
    if let Some(sub) = subscription {
        if let Some(account) = db::find_account_by_subscription(sub, conn)? {
            return Ok(Some(account));
        }
    }
    match customer {
        Some(cus) => Ok(db::find_account_by_customer(cus, conn)?),
        None => Ok(None),
    }
}
