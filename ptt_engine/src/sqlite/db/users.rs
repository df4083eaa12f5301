//! Sqlite database operations for users and role assignments
//!
//! Generally clients should never call these methods directly, and prefer to use the [`AuthManagement`] trait methods
//! that are implemented on the [`SqliteDatabase`] struct instead.
//!
//! [`AuthManagement`]: crate::traits::AuthManagement
//! [`SqliteDatabase`]: crate::SqliteDatabase
use std::{collections::HashMap, str::FromStr};

use log::{debug, error};
use sqlx::{QueryBuilder, Row, SqliteConnection};

use super::is_unique_violation;
use crate::{
    db_types::{Actor, NewUser, Role, UserAccount},
    traits::AuthApiError,
};

pub async fn insert_user(
    user: &NewUser,
    api_key_hash: &str,
    conn: &mut SqliteConnection,
) -> Result<UserAccount, AuthApiError> {
    let account: UserAccount = sqlx::query_as(
        r#"
            INSERT INTO users (org_id, name, email, api_key_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, org_id, name, email, created_at, updated_at;
        "#,
    )
    .bind(user.org_id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(api_key_hash)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AuthApiError::UserAlreadyExists
        } else if e.as_database_error().map(|de| de.is_foreign_key_violation()).unwrap_or(false) {
            AuthApiError::OrganizationNotFound(user.org_id)
        } else {
            AuthApiError::from(e)
        }
    })?;
    debug!("🗃️ User #{} ({}) created for org #{}", account.id, account.name, account.org_id);
    Ok(account)
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, sqlx::Error> {
    sqlx::query_as("SELECT id, org_id, name, email, created_at, updated_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_users_for_org(org_id: i64, conn: &mut SqliteConnection) -> Result<Vec<UserAccount>, sqlx::Error> {
    sqlx::query_as("SELECT id, org_id, name, email, created_at, updated_at FROM users WHERE org_id = $1 ORDER BY id")
        .bind(org_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_actor_for_key_hash(
    api_key_hash: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Actor>, AuthApiError> {
    let row: Option<(i64, i64)> = sqlx::query_as("SELECT id, org_id FROM users WHERE api_key_hash = $1")
        .bind(api_key_hash)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some((user_id, org_id)) => {
            let roles = roles_for_user(user_id, conn).await?;
            Ok(Some(Actor::new(user_id, org_id, roles)))
        },
        None => Ok(None),
    }
}

pub async fn roles_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Role>, AuthApiError> {
    let result = sqlx::query(
        r#"SELECT name FROM
            role_assignments LEFT JOIN roles ON role_assignments.role_id = roles.id
            WHERE user_id = $1
            ORDER BY roles.id"#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    let roles = result
        .iter()
        .map(|r| r.try_get::<String, _>("name").map_err(AuthApiError::from))
        .map(|name| name.and_then(|n| Role::from_str(&n).map_err(|_| AuthApiError::RoleNotFound)))
        .collect::<Result<Vec<Role>, _>>()?;
    Ok(roles)
}

pub async fn user_has_roles(user_id: i64, roles: &[Role], conn: &mut SqliteConnection) -> Result<(), AuthApiError> {
    if roles.is_empty() {
        return Ok(());
    }
    let held = roles_for_user(user_id, conn).await?;
    let missing = roles.iter().filter(|r| !held.contains(r)).count();
    if missing == 0 {
        Ok(())
    } else {
        Err(AuthApiError::RoleNotAllowed(missing))
    }
}

async fn fetch_roles(conn: &mut SqliteConnection) -> Result<HashMap<Role, i64>, AuthApiError> {
    let result: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM roles").fetch_all(conn).await?;
    let roles = result
        .into_iter()
        .map(|(id, name)| name.parse::<Role>().map(|role| (role, id)).map_err(|_| AuthApiError::RoleNotFound))
        .collect::<Result<HashMap<_, _>, _>>()?;
    debug!("🗃️ Fetched current roles table: {:?}", roles);
    Ok(roles)
}

pub async fn assign_roles(user_id: i64, roles: &[Role], conn: &mut SqliteConnection) -> Result<(), AuthApiError> {
    if roles.is_empty() {
        return Ok(());
    }
    let all_roles = fetch_roles(conn).await?;
    let role_ids = roles
        .iter()
        .map(|r| all_roles.get(r).ok_or(AuthApiError::RoleNotFound).copied())
        .collect::<Result<Vec<i64>, _>>()?;

    let mut qb = QueryBuilder::new("INSERT OR IGNORE INTO role_assignments (user_id, role_id) VALUES ");
    let mut values = qb.separated(", ");
    for role_id in role_ids {
        values.push("(");
        values.push_bind_unseparated(user_id);
        values.push_unseparated(", ");
        values.push_bind_unseparated(role_id);
        values.push_unseparated(")");
    }
    let res = qb.build().execute(conn).await.map_err(|e| {
        if e.as_database_error().map(|de| de.is_foreign_key_violation()).unwrap_or(false) {
            AuthApiError::UserNotFound(user_id)
        } else {
            AuthApiError::from(e)
        }
    })?;
    if res.rows_affected() > roles.len() as u64 {
        error!("🗃️ Expected to insert at most {} roles, but inserted {}", roles.len(), res.rows_affected());
        return Err(AuthApiError::DatabaseError(
            "Inserted unexpected number of Roles. Report this to the developers".to_string(),
        ));
    }
    Ok(())
}

pub async fn remove_roles(user_id: i64, roles: &[Role], conn: &mut SqliteConnection) -> Result<u64, AuthApiError> {
    if roles.is_empty() {
        return Ok(0);
    }
    let all_roles = fetch_roles(conn).await?;
    let role_ids = roles
        .iter()
        .map(|r| all_roles.get(r).ok_or(AuthApiError::RoleNotFound).copied())
        .collect::<Result<Vec<i64>, _>>()?;

    let mut qb = QueryBuilder::new("DELETE FROM role_assignments WHERE user_id = ");
    qb.push_bind(user_id);
    qb.push(" AND role_id IN (");
    let mut values = qb.separated(", ");
    role_ids.iter().for_each(|id| {
        values.push_bind(*id);
    });
    qb.push(")");
    let res = qb.build().execute(conn).await?;
    Ok(res.rows_affected())
}

pub async fn count_admins(conn: &mut SqliteConnection) -> Result<i64, AuthApiError> {
    let row = sqlx::query(
        r#"SELECT count(*) AS "count"
            FROM role_assignments LEFT JOIN roles ON role_assignments.role_id = roles.id
            WHERE roles.name = 'admin'"#,
    )
    .fetch_one(conn)
    .await?;
    Ok(row.try_get::<i64, _>("count")?)
}
