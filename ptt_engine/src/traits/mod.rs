//! #  Backend contracts
//!
//! This module defines the behaviour a database backend must expose in order to host the PTT engine.
//!
//! * [`PttDatabase`] performs the lifecycle mutations. Every method is a single atomic unit: the status change, the
//!   balance movements and the audit rows either all land or none do.
//! * [`AccountManagement`] provides read-only queries over organizations, tokens, documents, offers and the ledger.
//! * [`AuthManagement`] manages users, their API key hashes and their roles.
//! * [`ApprovalManagement`] stores the maker/checker queue of pending actions.
mod account_management;
mod approval_management;
mod auth_management;
mod data_objects;
mod ptt_database;

pub use account_management::{AccountApiError, AccountManagement};
pub use approval_management::{ApprovalApiError, ApprovalManagement};
pub use auth_management::{AuthApiError, AuthManagement};
pub use data_objects::{DocumentReviewResult, OfferAcceptance, SettlementResult};
pub use ptt_database::{PttDatabase, PttFlowError};
