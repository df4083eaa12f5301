//! # PTT engine public API
//!
//! The `ptt_api` module exposes the programmatic API of the engine. Each API wraps a backend that implements the
//! traits it needs, so callers only pull in what they use.
//!
//! * [`ptt_flow_api`] drives the token lifecycle. It checks *who* may perform each step and publishes events after
//!   every committed status change.
//! * [`approval_api`] is the maker/checker gate in front of issuance and offer acceptance.
//! * [`accounts_api`] provides read-only queries over organizations, tokens, documents, offers and the ledger.
//! * [`auth_api`] creates users, hands out API keys, authenticates them and manages [`Role`]s.
//!
//! # API usage
//!
//! ```rust,ignore
//! use ptt_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/ptt_store.db", 5).await?;
//! let api = AccountApi::new(db);
//! let summary = api.org_summary(3).await?;
//! ```
//!
//! [`Role`]: crate::db_types::Role

pub mod accounts_api;
pub mod approval_api;
pub mod auth_api;
pub mod ptt_flow_api;
pub mod ptt_objects;
