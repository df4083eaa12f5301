use thiserror::Error;

use crate::{
    db_types::{ActionStatus, NewPendingAction, PendingAction},
    traits::PttFlowError,
};

#[derive(Debug, Clone, Error)]
pub enum ApprovalApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Pending action {0} does not exist")]
    ActionNotFound(i64),
    #[error("Pending action {0} has already been decided")]
    AlreadyDecided(i64),
    #[error("{0}")]
    NotPermitted(String),
    #[error("A rejection must give a reason")]
    MissingReason,
    #[error("{0}")]
    InvalidAction(PttFlowError),
    #[error("The approved action could not be executed. {0}")]
    ExecutionFailed(#[from] PttFlowError),
}

impl From<sqlx::Error> for ApprovalApiError {
    fn from(e: sqlx::Error) -> Self {
        ApprovalApiError::DatabaseError(e.to_string())
    }
}

/// Storage for the maker/checker queue.
///
/// A pending action moves from `pending` to exactly one of `approved` or `rejected`. The transitions are
/// compare-and-set: only one checker can win a decision, and a second attempt gets
/// [`ApprovalApiError::AlreadyDecided`].
#[allow(async_fn_in_trait)]
pub trait ApprovalManagement {
    async fn insert_pending_action(&self, action: NewPendingAction) -> Result<PendingAction, ApprovalApiError>;

    async fn fetch_pending_action(&self, action_id: i64) -> Result<Option<PendingAction>, ApprovalApiError>;

    /// Lists actions, newest first, optionally restricted to one organization and/or one status.
    async fn fetch_pending_actions(
        &self,
        org_id: Option<i64>,
        status: Option<ActionStatus>,
    ) -> Result<Vec<PendingAction>, ApprovalApiError>;

    /// Records the approval (`pending` -> `approved`) for `checker_id`. This must happen before the underlying
    /// mutation runs.
    async fn mark_approved(&self, action_id: i64, checker_id: i64) -> Result<PendingAction, ApprovalApiError>;

    /// Undoes [`Self::mark_approved`] when the underlying mutation could not be executed. The action returns to
    /// `pending` and keeps the failure message in `reason`.
    async fn revert_approval(&self, action_id: i64, failure: &str) -> Result<PendingAction, ApprovalApiError>;

    /// `pending` -> `rejected`, recording the checker and the reason.
    async fn mark_rejected(
        &self,
        action_id: i64,
        checker_id: i64,
        reason: &str,
    ) -> Result<PendingAction, ApprovalApiError>;
}
