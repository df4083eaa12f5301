//! Organizations and their treasury / credit balances.
use log::{debug, trace};
use sqlx::SqliteConnection;

use super::{is_constraint_violation, is_unique_violation};
use crate::{
    db_types::{Money, NewOrganization, Organization},
    lifecycle::{BalanceMovement, LifecycleError},
    traits::PttFlowError,
};

pub async fn insert_organization(
    org: NewOrganization,
    conn: &mut SqliteConnection,
) -> Result<Organization, PttFlowError> {
    let org: Organization = sqlx::query_as(
        r#"
            INSERT INTO organizations (name, org_type, treasury_balance, credit_limit)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(org.name)
    .bind(org.org_type)
    .bind(org.treasury_balance)
    .bind(org.credit_limit)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            PttFlowError::InvalidRequest("An organization with that name already exists".into())
        } else {
            PttFlowError::from(e)
        }
    })?;
    debug!("🗃️ Organization #{} ({}) created as {}", org.id, org.name, org.org_type);
    Ok(org)
}

pub async fn fetch_organization(org_id: i64, conn: &mut SqliteConnection) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM organizations WHERE id = $1").bind(org_id).fetch_optional(conn).await
}

pub async fn fetch_organizations(conn: &mut SqliteConnection) -> Result<Vec<Organization>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM organizations ORDER BY id").fetch_all(conn).await
}

/// Like [`fetch_organization`], but a missing organization is an error.
pub async fn organization_by_id(org_id: i64, conn: &mut SqliteConnection) -> Result<Organization, PttFlowError> {
    fetch_organization(org_id, conn).await?.ok_or(PttFlowError::OrganizationNotFound(org_id))
}

/// Applies a balance movement. This is not atomic on its own; call it inside the transaction that also changes the
/// token status. Table constraints reject negative treasuries and credit above the limit, which aborts the
/// transaction.
pub async fn apply_movement(
    movement: &BalanceMovement,
    conn: &mut SqliteConnection,
) -> Result<Organization, PttFlowError> {
    trace!(
        "🗃️ Adjusting org #{}: treasury {}, credit used {}",
        movement.org_id,
        movement.treasury_delta,
        movement.credit_used_delta
    );
    let result: Result<Option<Organization>, sqlx::Error> = sqlx::query_as(
        r#"
            UPDATE organizations SET
                treasury_balance = treasury_balance + $1,
                credit_used = credit_used + $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(movement.treasury_delta)
    .bind(movement.credit_used_delta)
    .bind(movement.org_id)
    .fetch_optional(&mut *conn)
    .await;
    let org = match result {
        Err(e) if is_constraint_violation(&e) => return Err(constraint_breach(movement, conn).await),
        other => other?,
    };
    org.ok_or(PttFlowError::OrganizationNotFound(movement.org_id))
}

/// Explains which balance a rejected movement would have pushed out of range.
async fn constraint_breach(movement: &BalanceMovement, conn: &mut SqliteConnection) -> PttFlowError {
    let org = match organization_by_id(movement.org_id, conn).await {
        Ok(org) => org,
        Err(e) => return e,
    };
    if movement.treasury_delta.is_negative() && (org.treasury_balance + movement.treasury_delta).is_negative() {
        LifecycleError::InsufficientTreasury {
            org_id: org.id,
            required: -movement.treasury_delta,
            available: org.treasury_balance,
        }
        .into()
    } else if movement.credit_used_delta.is_positive() {
        LifecycleError::CreditLimitExceeded {
            org_id: org.id,
            requested: movement.credit_used_delta,
            available: org.available_credit(),
        }
        .into()
    } else {
        PttFlowError::InvalidRequest(format!(
            "Balance change for organization {} would breach its treasury or credit constraints",
            movement.org_id
        ))
    }
}

pub async fn set_credit_limit(
    org_id: i64,
    limit: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE organizations SET credit_limit = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(limit)
    .bind(org_id)
    .fetch_optional(conn)
    .await
}
