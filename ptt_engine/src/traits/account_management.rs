use thiserror::Error;

use crate::{
    db_types::{DiscountOffer, LedgerEntry, Organization, PttStatus, PttToken, ShippingDocument},
    ptt_objects::{PttQueryFilter, StatusChange},
};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// The `AccountManagement` trait defines read-only queries over the organizations taking part in trades and the
/// tokens, documents, offers and ledger rows that belong to them.
///
/// Queries for records that do not exist return `Ok(None)` (or an empty vector), rather than an error.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    async fn fetch_organization(&self, org_id: i64) -> Result<Option<Organization>, AccountApiError>;

    async fn fetch_organizations(&self) -> Result<Vec<Organization>, AccountApiError>;

    async fn fetch_ptt(&self, ptt_id: i64) -> Result<Option<PttToken>, AccountApiError>;

    /// Fetches every token the organization takes part in, whether as the original importer, issuing bank, named
    /// exporter or current owner. Results are ordered by creation time.
    async fn fetch_ptts_for_org(&self, org_id: i64) -> Result<Vec<PttToken>, AccountApiError>;

    async fn search_ptts(&self, query: PttQueryFilter) -> Result<Vec<PttToken>, AccountApiError>;

    /// The audit trail of status changes for a token, oldest first.
    async fn fetch_status_history(&self, ptt_id: i64) -> Result<Vec<StatusChange>, AccountApiError>;

    async fn fetch_document(&self, doc_id: i64) -> Result<Option<ShippingDocument>, AccountApiError>;

    async fn fetch_documents_for_ptt(&self, ptt_id: i64) -> Result<Vec<ShippingDocument>, AccountApiError>;

    async fn fetch_offer(&self, offer_id: i64) -> Result<Option<DiscountOffer>, AccountApiError>;

    async fn fetch_offers_for_ptt(&self, ptt_id: i64) -> Result<Vec<DiscountOffer>, AccountApiError>;

    /// All tokens currently listed on the marketplace (status `redeemable`) together with their open offers.
    async fn fetch_marketplace(&self) -> Result<Vec<(PttToken, Vec<DiscountOffer>)>, AccountApiError> {
        let listed = self.search_ptts(PttQueryFilter::default().with_status(PttStatus::Redeemable)).await?;
        let mut result = Vec::with_capacity(listed.len());
        for ptt in listed {
            let offers = self.fetch_offers_for_ptt(ptt.id).await?;
            let open = offers.into_iter().filter(|o| o.status == crate::db_types::OfferStatus::Open).collect();
            result.push((ptt, open));
        }
        Ok(result)
    }

    async fn fetch_ledger_for_org(&self, org_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError>;

    async fn fetch_ledger_for_ptt(&self, ptt_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError>;
}
