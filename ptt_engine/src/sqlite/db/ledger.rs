//! The append-only audit ledger.
use sqlx::SqliteConnection;

use crate::db_types::{LedgerEntry, NewLedgerEntry};

pub async fn insert_entry(entry: NewLedgerEntry, conn: &mut SqliteConnection) -> Result<LedgerEntry, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (ptt_id, kind, from_org, to_org, amount, memo)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(entry.ptt_id)
    .bind(entry.kind)
    .bind(entry.from_org)
    .bind(entry.to_org)
    .bind(entry.amount)
    .bind(entry.memo)
    .fetch_one(conn)
    .await
}

pub async fn fetch_entries_for_org(org_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE from_org = $1 OR to_org = $1 ORDER BY id ASC")
        .bind(org_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_entries_for_ptt(ptt_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE ptt_id = $1 ORDER BY id ASC").bind(ptt_id).fetch_all(conn).await
}
