//! Webhook event bookkeeping.

use rusqlite::{Connection, Result, params};

use super::db::now_timestamp;

/// Records a webhook event id. Returns `false` if it was seen before.
pub fn mark_event_processed(event_id: &str, event_type: &str, conn: &Connection) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO billing_events (event_id, event_type, received_at) VALUES (?1, ?2, ?3)",
        params![event_id, event_type, now_timestamp()],
    )?;
    Ok(inserted == 1)
}
