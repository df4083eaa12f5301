use std::fmt::Display;

use ptt_common::Money;
use ptt_engine::{
    db_types::{ActionStatus, DiscountOffer, PendingAction, PttToken, Role, UserAccount},
    ActionOutcome,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdateRequest {
    pub user_id: i64,
    #[serde(default)]
    pub apply: Vec<Role>,
    #[serde(default)]
    pub revoke: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

/// The response to creating a user. The API key is shown here and never again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedUser {
    pub user: UserAccount,
    pub roles: Vec<Role>,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferParams {
    pub exporter_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonParams {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferParams {
    pub amount: Money,
}

/// Optional body for the gated routes. The memo is stored with the pending action when a checker must approve it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionMemo {
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryParams {
    pub org_id: i64,
    pub amount: Money,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditLimitParams {
    pub org_id: i64,
    pub limit: Money,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingActionQuery {
    pub status: Option<ActionStatus>,
    /// Only honoured for users with `ReadAll`. Everyone else sees their own organization's queue.
    pub org_id: Option<i64>,
}

/// A token on the marketplace together with its open offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketListing {
    pub ptt: PttToken,
    pub offers: Vec<DiscountOffer>,
}

impl From<(PttToken, Vec<DiscountOffer>)> for MarketListing {
    fn from((ptt, offers): (PttToken, Vec<DiscountOffer>)) -> Self {
        Self { ptt, offers }
    }
}

/// The response to a checker approving a pending action: the decided action and what executing it did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub action: PendingAction,
    pub outcome: ActionOutcome,
}
