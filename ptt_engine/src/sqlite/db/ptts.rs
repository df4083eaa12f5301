//! Token rows, their status history, and application of ledger plans.
use chrono::Duration;
use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use super::{ledger, organizations};
use crate::{
    db_types::{LedgerEntry, LockConditions, NewPttRequest, PttStatus, PttToken},
    lifecycle::LedgerPlan,
    ptt_objects::{PttQueryFilter, StatusChange},
    traits::PttFlowError,
};

/// Inserts a new token in the `requested` state. The importer is both the original importer and the current owner.
pub async fn insert_ptt(
    importer_id: i64,
    request: NewPttRequest,
    conn: &mut SqliteConnection,
) -> Result<PttToken, PttFlowError> {
    let ptt: PttToken = sqlx::query_as(
        r#"
            INSERT INTO ptt_tokens (
                amount,
                currency,
                status,
                maturity_date,
                backing_type,
                issuer_bank,
                current_owner,
                original_importer,
                exporter
            ) VALUES ($1, $2, 'requested', $3, $4, $5, $6, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(request.amount)
    .bind(request.currency)
    .bind(request.maturity_date)
    .bind(request.backing_type)
    .bind(request.issuer_bank)
    .bind(importer_id)
    .bind(request.exporter)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ PTT #{} requested by org #{importer_id} for {}", ptt.id, ptt.amount);
    Ok(ptt)
}

pub async fn fetch_ptt(ptt_id: i64, conn: &mut SqliteConnection) -> Result<Option<PttToken>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ptt_tokens WHERE id = $1").bind(ptt_id).fetch_optional(conn).await
}

/// Like [`fetch_ptt`], but a missing token is an error.
pub async fn ptt_by_id(ptt_id: i64, conn: &mut SqliteConnection) -> Result<PttToken, PttFlowError> {
    fetch_ptt(ptt_id, conn).await?.ok_or(PttFlowError::PttNotFound(ptt_id))
}

pub async fn fetch_ptts_for_org(org_id: i64, conn: &mut SqliteConnection) -> Result<Vec<PttToken>, sqlx::Error> {
    search_ptts(PttQueryFilter::default().with_org_id(org_id), conn).await
}

/// Fetches tokens according to criteria specified in the `PttQueryFilter`
///
/// Resulting tokens are ordered by `created_at` in ascending order
pub async fn search_ptts(query: PttQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<PttToken>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM ptt_tokens ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(org_id) = query.org_id {
        where_clause.push("(original_importer = ");
        where_clause.push_bind_unseparated(org_id);
        where_clause.push_unseparated(" OR issuer_bank = ");
        where_clause.push_bind_unseparated(org_id);
        where_clause.push_unseparated(" OR current_owner = ");
        where_clause.push_bind_unseparated(org_id);
        where_clause.push_unseparated(" OR exporter = ");
        where_clause.push_bind_unseparated(org_id);
        where_clause.push_unseparated(")");
    }
    if let Some(bank) = query.issuer_bank {
        where_clause.push("issuer_bank = ");
        where_clause.push_bind_unseparated(bank);
    }
    if let Some(owner) = query.current_owner {
        where_clause.push("current_owner = ");
        where_clause.push_bind_unseparated(owner);
    }
    if let Some(currency) = query.currency {
        where_clause.push("currency = ");
        where_clause.push_bind_unseparated(currency);
    }
    if let Some(backing) = query.backing_type {
        where_clause.push("backing_type = ");
        where_clause.push_bind_unseparated(backing);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("datetime(created_at) >= datetime(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("datetime(created_at) <= datetime(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let tokens = builder.build_query_as::<PttToken>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_ptts: {:?}", tokens.len());
    Ok(tokens)
}

pub async fn fetch_status_history(
    ptt_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusChange>, sqlx::Error> {
    sqlx::query_as(
        "SELECT ptt_id, old_status, new_status, changed_at FROM ptt_status_history WHERE ptt_id = $1 ORDER BY id ASC",
    )
    .bind(ptt_id)
    .fetch_all(conn)
    .await
}

pub async fn set_conditions(
    ptt_id: i64,
    conditions: LockConditions,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ptt_tokens SET conditions = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(Json(conditions))
        .bind(ptt_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_exporter(ptt_id: i64, exporter_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ptt_tokens SET exporter = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(exporter_id)
        .bind(ptt_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Applies a ledger plan: the status change (compare-and-set against the plan's starting status), any ownership
/// change, every balance movement and every audit row.
///
/// This is not atomic. You must embed this call inside a transaction and pass `&mut *tx` as the connection argument.
pub async fn apply_plan(
    plan: &LedgerPlan,
    conn: &mut SqliteConnection,
) -> Result<(PttToken, Vec<LedgerEntry>), PttFlowError> {
    let ptt: Option<PttToken> = sqlx::query_as(
        r#"
            UPDATE ptt_tokens SET
                status = $1,
                current_owner = COALESCE($2, current_owner),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(plan.to_status)
    .bind(plan.new_owner)
    .bind(plan.ptt_id)
    .bind(plan.from_status)
    .fetch_optional(&mut *conn)
    .await?;
    let ptt = ptt.ok_or(PttFlowError::ConcurrentModification(plan.ptt_id))?;
    for movement in &plan.movements {
        organizations::apply_movement(movement, &mut *conn).await?;
    }
    let mut entries = Vec::with_capacity(plan.entries.len());
    for entry in &plan.entries {
        entries.push(ledger::insert_entry(entry.clone(), &mut *conn).await?);
    }
    debug!("🗃️ PTT #{} moved {} -> {}", ptt.id, plan.from_status, plan.to_status);
    Ok((ptt, entries))
}

/// Ids of `requested` tokens that were created more than `older_than` ago.
pub async fn stale_request_ids(older_than: Duration, conn: &mut SqliteConnection) -> Result<Vec<i64>, sqlx::Error> {
    let modifier = format!("-{} seconds", older_than.num_seconds());
    let ids: Vec<(i64,)> = sqlx::query_as(
        "SELECT id FROM ptt_tokens WHERE status = 'requested' AND created_at <= datetime('now', $1) ORDER BY id",
    )
    .bind(modifier)
    .fetch_all(conn)
    .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}
