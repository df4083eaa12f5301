//! SQLite backend for the PTT engine.
//!
//! [`db`] holds the per-table functions. [`SqliteDatabase`] composes them into transactions and implements the
//! backend traits.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
