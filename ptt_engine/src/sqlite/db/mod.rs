//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod approvals;
pub mod documents;
pub mod ledger;
pub mod offers;
pub mod organizations;
pub mod ptts;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/ptt_store.db";

pub fn db_url() -> String {
    let result = env::var("PTT_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ PTT_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

pub(crate) fn is_unique_violation(e: &SqlxError) -> bool {
    e.as_database_error().map(|de| de.is_unique_violation()).unwrap_or(false)
}

pub(crate) fn is_constraint_violation(e: &SqlxError) -> bool {
    e.as_database_error().map(|de| de.is_check_violation() || de.is_foreign_key_violation()).unwrap_or(false)
}
