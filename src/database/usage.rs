//! Monthly AI usage counters.

use crate::models::{UsageKind, UsagePeriod};
use rusqlite::{Connection, OptionalExtension, Result, params};

pub fn get_usage(
    account_id: i64,
    period: &UsagePeriod,
    kind: UsageKind,
    conn: &Connection,
) -> Result<u32> {
    let count: Option<i64> = conn
        .query_row(
            "SELECT count FROM usage_counters WHERE account_id = ?1 AND period = ?2 AND kind = ?3",
            params![account_id, period.as_str(), kind.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(count.unwrap_or(0) as u32)
}

/// Adds `amount` to the counter and returns the new total.
pub fn increment_usage(
    account_id: i64,
    period: &UsagePeriod,
    kind: UsageKind,
    amount: u32,
    conn: &Connection,
) -> Result<u32> {
    conn.execute(
        "INSERT INTO usage_counters (account_id, period, kind, count) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(account_id, period, kind) DO UPDATE SET count = count + excluded.count",
        params![account_id, period.as_str(), kind.as_str(), amount],
    )?;
    get_usage(account_id, period, kind, conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::{ensure_account, init_in_memory};
    use chrono::NaiveDate;

    #[test]
    fn counters_are_per_period_and_kind() {
        let conn = init_in_memory().unwrap();
        let account = ensure_account("u@example.com", &conn).unwrap();
        let march = UsagePeriod::containing(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        let april = UsagePeriod::containing(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());

        assert_eq!(get_usage(account.id, &march, UsageKind::TestGeneration, &conn).unwrap(), 0);
        assert_eq!(
            increment_usage(account.id, &march, UsageKind::TestGeneration, 1, &conn).unwrap(),
            1
        );
        assert_eq!(
            increment_usage(account.id, &march, UsageKind::TestGeneration, 2, &conn).unwrap(),
            3
        );

        assert_eq!(get_usage(account.id, &april, UsageKind::TestGeneration, &conn).unwrap(), 0);
        assert_eq!(
            get_usage(account.id, &march, UsageKind::FlashcardGeneration, &conn).unwrap(),
            0
        );
    }
}
