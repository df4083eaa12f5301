//! Read-only queries over organizations and the records attached to their trades.

use std::fmt::Debug;

use log::trace;

use crate::{
    db_types::{Actor, DiscountOffer, LedgerEntry, Organization, PttToken, Role, ShippingDocument},
    ptt_objects::{OrgSummary, PttQueryFilter, StatusChange},
    traits::{AccountApiError, AccountManagement},
};

/// The `AccountApi` provides a unified API for the read side of the engine.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn organization(&self, org_id: i64) -> Result<Option<Organization>, AccountApiError> {
        self.db.fetch_organization(org_id).await
    }

    pub async fn organizations(&self) -> Result<Vec<Organization>, AccountApiError> {
        self.db.fetch_organizations().await
    }

    /// Balances plus a per-status count of the tokens the organization takes part in. `None` if the organization
    /// does not exist.
    pub async fn org_summary(&self, org_id: i64) -> Result<Option<OrgSummary>, AccountApiError> {
        let Some(org) = self.db.fetch_organization(org_id).await? else {
            return Ok(None);
        };
        let tokens = self.db.fetch_ptts_for_org(org_id).await?;
        trace!("💻️ Building summary for org #{org_id} over {} tokens", tokens.len());
        Ok(Some(OrgSummary::new(org, &tokens)))
    }

    pub async fn ptt(&self, ptt_id: i64) -> Result<Option<PttToken>, AccountApiError> {
        self.db.fetch_ptt(ptt_id).await
    }

    /// Fetches a token, but only if the actor's organization takes part in it, or the actor may read everything.
    pub async fn ptt_for_actor(&self, actor: &Actor, ptt_id: i64) -> Result<Option<PttToken>, AccountApiError> {
        let ptt = self.db.fetch_ptt(ptt_id).await?;
        Ok(ptt.filter(|p| can_see(actor, p)))
    }

    pub async fn ptts_for_org(&self, org_id: i64) -> Result<Vec<PttToken>, AccountApiError> {
        self.db.fetch_ptts_for_org(org_id).await
    }

    pub async fn search_ptts(&self, query: PttQueryFilter) -> Result<Vec<PttToken>, AccountApiError> {
        self.db.search_ptts(query).await
    }

    pub async fn status_history(&self, ptt_id: i64) -> Result<Vec<StatusChange>, AccountApiError> {
        self.db.fetch_status_history(ptt_id).await
    }

    pub async fn document(&self, doc_id: i64) -> Result<Option<ShippingDocument>, AccountApiError> {
        self.db.fetch_document(doc_id).await
    }

    pub async fn documents_for_ptt(&self, ptt_id: i64) -> Result<Vec<ShippingDocument>, AccountApiError> {
        self.db.fetch_documents_for_ptt(ptt_id).await
    }

    pub async fn offer(&self, offer_id: i64) -> Result<Option<DiscountOffer>, AccountApiError> {
        self.db.fetch_offer(offer_id).await
    }

    pub async fn offers_for_ptt(&self, ptt_id: i64) -> Result<Vec<DiscountOffer>, AccountApiError> {
        self.db.fetch_offers_for_ptt(ptt_id).await
    }

    /// Redeemable tokens, each with the offers still open against it.
    pub async fn marketplace(&self) -> Result<Vec<(PttToken, Vec<DiscountOffer>)>, AccountApiError> {
        self.db.fetch_marketplace().await
    }

    pub async fn ledger_for_org(&self, org_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError> {
        self.db.fetch_ledger_for_org(org_id).await
    }

    pub async fn ledger_for_ptt(&self, ptt_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError> {
        self.db.fetch_ledger_for_ptt(ptt_id).await
    }
}

fn can_see(actor: &Actor, ptt: &PttToken) -> bool {
    actor.has_role(Role::ReadAll) ||
        actor.is_admin() ||
        [Some(ptt.original_importer), Some(ptt.issuer_bank), Some(ptt.current_owner), ptt.exporter]
            .contains(&Some(actor.org_id))
}
