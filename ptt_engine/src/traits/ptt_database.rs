use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{
        DocumentReview,
        LockConditions,
        Money,
        NewDocument,
        NewOrganization,
        NewPttRequest,
        Organization,
        PttStatus,
        PttToken,
        ShippingDocument,
        DiscountOffer,
    },
    lifecycle::LifecycleError,
    traits::{
        data_objects::{DocumentReviewResult, OfferAcceptance, SettlementResult},
        AccountApiError,
        AccountManagement,
    },
};

/// The `PttDatabase` trait defines the lifecycle mutations of a Promissory Trade Token.
///
/// Implementations must make every method atomic. For a status change, the backend re-reads the token and the
/// organizations involved inside the transaction, builds the ledger plan with the functions in
/// [`crate::lifecycle`], and then applies the status change, ownership change, balance movements and audit rows
/// together. If any step fails, nothing is written.
///
/// These methods check *state* (is the transition legal, is there enough credit). They do not check *who* is asking;
/// that is the job of [`crate::PttFlowApi`].
#[allow(async_fn_in_trait)]
pub trait PttDatabase: Clone + AccountManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn insert_organization(&self, org: NewOrganization) -> Result<Organization, PttFlowError>;

    /// Stores a new token in the `requested` state, owned by the importer.
    async fn insert_ptt_request(&self, importer_id: i64, request: NewPttRequest) -> Result<PttToken, PttFlowError>;

    /// `requested` -> `issued`. Commits the importer's credit.
    async fn issue_ptt(&self, ptt_id: i64) -> Result<PttToken, PttFlowError>;

    /// `issued` -> `locked`, storing the conditions the exporter must satisfy.
    async fn lock_ptt(&self, ptt_id: i64, conditions: LockConditions) -> Result<PttToken, PttFlowError>;

    /// `locked` -> `transferred`. Ownership passes to the exporter.
    async fn transfer_ptt(&self, ptt_id: i64, exporter_id: i64) -> Result<PttToken, PttFlowError>;

    /// Records the metadata of a shipping document. The token must be `transferred`.
    async fn insert_document(
        &self,
        ptt_id: i64,
        uploaded_by: i64,
        document: NewDocument,
    ) -> Result<ShippingDocument, PttFlowError>;

    /// Approves or rejects a pending document. When an approval completes the set of required documents, the token
    /// moves to `redeemable` in the same transaction.
    async fn review_document(&self, doc_id: i64, review: DocumentReview) -> Result<DocumentReviewResult, PttFlowError>;

    /// Lists a discount offer against a `redeemable` token.
    async fn insert_offer(&self, ptt_id: i64, funder_id: i64, amount: Money) -> Result<DiscountOffer, PttFlowError>;

    /// `redeemable` -> `discounted`. The funder pays the holder, becomes the owner, and competing offers are closed.
    async fn accept_offer(&self, offer_id: i64) -> Result<OfferAcceptance, PttFlowError>;

    async fn withdraw_offer(&self, offer_id: i64) -> Result<DiscountOffer, PttFlowError>;

    /// `redeemable | discounted` -> `settled`. Debits the issuing bank, credits the holder, releases the importer's
    /// credit and writes the settlement audit row.
    async fn settle_ptt(&self, ptt_id: i64) -> Result<SettlementResult, PttFlowError>;

    /// `requested | issued | locked` -> `cancelled`, releasing committed credit.
    async fn cancel_ptt(&self, ptt_id: i64, reason: &str) -> Result<PttToken, PttFlowError>;

    /// Deposits (positive `delta`) or withdraws (negative `delta`) treasury funds, with an audit row.
    async fn adjust_treasury(&self, org_id: i64, delta: Money, memo: &str) -> Result<Organization, PttFlowError>;

    /// Sets the organization's credit limit. The new limit may not be lower than the credit already in use.
    async fn set_credit_limit(&self, org_id: i64, limit: Money) -> Result<Organization, PttFlowError>;

    /// Cancels every `requested` token that has waited longer than `older_than` for issuance.
    async fn expire_stale_requests(&self, older_than: Duration) -> Result<Vec<PttToken>, PttFlowError>;

    /// Closes the connection pool.
    async fn close(&mut self) -> Result<(), PttFlowError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PttFlowError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("{0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("{0}")]
    AccountError(#[from] AccountApiError),
    #[error("The requested token {0} does not exist")]
    PttNotFound(i64),
    #[error("The requested organization {0} does not exist")]
    OrganizationNotFound(i64),
    #[error("The requested document {0} does not exist")]
    DocumentNotFound(i64),
    #[error("Document {0} has already been reviewed")]
    DocumentAlreadyReviewed(i64),
    #[error("The requested offer {0} does not exist")]
    OfferNotFound(i64),
    #[error("Offer {0} is no longer open")]
    OfferNotOpen(i64),
    #[error("Token {ptt_id} was expected to be {expected}, but it is {actual}")]
    UnexpectedStatus { ptt_id: i64, expected: PttStatus, actual: PttStatus },
    #[error("Token {0} was modified concurrently. Try again.")]
    ConcurrentModification(i64),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("Not permitted. {0}")]
    Forbidden(String),
}

impl From<sqlx::Error> for PttFlowError {
    fn from(e: sqlx::Error) -> Self {
        PttFlowError::DatabaseError(e.to_string())
    }
}
