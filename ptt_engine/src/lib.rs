//! PTT Engine
//!
//! The engine holds the business rules of a Promissory Trade Token: an instrument that an importer's bank issues
//! against treasury or credit backing, that is locked with shipping conditions and handed to an exporter, becomes
//! redeemable once the importer accepts the shipping documents, may be sold at a discount to a funder, and is finally
//! settled by the issuing bank.
//!
//! The library is divided into these sections:
//! 1. The data types ([`mod@db_types`]) and the lifecycle state machine ([`mod@lifecycle`]). The state machine is pure:
//!    it says which transitions are legal and which balance movements each one needs.
//! 2. Backend contracts ([`mod@traits`]) and the SQLite backend that implements them. A backend applies each status
//!    change together with its balance movements and audit rows in a single transaction.
//! 3. The public API ([`mod@ptt_api`]). [`PttFlowApi`] checks who may act, [`ApprovalApi`] is the maker/checker gate,
//!    and [`AccountApi`] and [`AuthApi`] cover queries and users.
//!
//! The engine also emits events ([`mod@events`]) after committed changes. Subscribe with [`events::EventHooks`].
pub mod db_types;
pub mod events;
pub mod lifecycle;
mod ptt_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase};
pub use ptt_api::{
    accounts_api::AccountApi,
    approval_api::{ActionOutcome, ApprovalApi, GatePolicy},
    auth_api::{generate_api_key, hash_api_key, AuthApi},
    ptt_flow_api::PttFlowApi,
    ptt_objects,
};
pub use traits::{
    AccountApiError,
    AccountManagement,
    ApprovalApiError,
    ApprovalManagement,
    AuthApiError,
    AuthManagement,
    PttDatabase,
    PttFlowError,
};
