//! The maker/checker queue.
use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{ActionStatus, NewPendingAction, PendingAction},
    traits::ApprovalApiError,
};

pub async fn insert_pending_action(
    action: NewPendingAction,
    conn: &mut SqliteConnection,
) -> Result<PendingAction, sqlx::Error> {
    let action: PendingAction = sqlx::query_as(
        r#"
            INSERT INTO pending_actions (action_type, target_id, ptt_id, org_id, maker_id, memo)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(action.action_type)
    .bind(action.target_id)
    .bind(action.ptt_id)
    .bind(action.org_id)
    .bind(action.maker_id)
    .bind(action.memo)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Pending action #{} ({}) queued by user #{}", action.id, action.action_type, action.maker_id);
    Ok(action)
}

pub async fn fetch_pending_action(
    action_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PendingAction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM pending_actions WHERE id = $1").bind(action_id).fetch_optional(conn).await
}

pub async fn fetch_pending_actions(
    org_id: Option<i64>,
    status: Option<ActionStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PendingAction>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM pending_actions ");
    if org_id.is_some() || status.is_some() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(org_id) = org_id {
        where_clause.push("org_id = ");
        where_clause.push_bind_unseparated(org_id);
    }
    if let Some(status) = status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status);
    }
    builder.push(" ORDER BY id DESC");
    builder.build_query_as::<PendingAction>().fetch_all(conn).await
}

/// Rejects every action still waiting for a checker on the token, recording `reason`. Returns the affected actions.
pub async fn reject_pending_for_ptt(
    ptt_id: i64,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PendingAction>, sqlx::Error> {
    let actions: Vec<PendingAction> = sqlx::query_as(
        r#"
            UPDATE pending_actions SET status = 'rejected', reason = $1, decided_at = CURRENT_TIMESTAMP
            WHERE ptt_id = $2 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(ptt_id)
    .fetch_all(conn)
    .await?;
    if !actions.is_empty() {
        debug!("🗃️ {} pending actions on PTT #{ptt_id} rejected: {reason}", actions.len());
    }
    Ok(actions)
}

/// Compare-and-set update of an action's status. Fails with [`ApprovalApiError::AlreadyDecided`] if the action is no
/// longer in the `from` state.
pub async fn transition_action(
    action_id: i64,
    from: ActionStatus,
    to: ActionStatus,
    checker_id: Option<i64>,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<PendingAction, ApprovalApiError> {
    let decided = to != ActionStatus::Pending;
    let action: Option<PendingAction> = sqlx::query_as(
        r#"
            UPDATE pending_actions SET
                status = $1,
                checker_id = $2,
                reason = $3,
                decided_at = CASE WHEN $4 THEN CURRENT_TIMESTAMP ELSE NULL END
            WHERE id = $5 AND status = $6
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(checker_id)
    .bind(reason)
    .bind(decided)
    .bind(action_id)
    .bind(from)
    .fetch_optional(&mut *conn)
    .await?;
    match action {
        Some(a) => Ok(a),
        None => match fetch_pending_action(action_id, conn).await? {
            Some(_) => Err(ApprovalApiError::AlreadyDecided(action_id)),
            None => Err(ApprovalApiError::ActionNotFound(action_id)),
        },
    }
}
