use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{
        Actor,
        DiscountOffer,
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
    },
    events::{EventProducers, PttSettledEvent, PttStatusChangedEvent},
    traits::{DocumentReviewResult, OfferAcceptance, PttDatabase, PttFlowError, SettlementResult},
};

/// `PttFlowApi` drives a token through its lifecycle on behalf of an [`Actor`].
///
/// Every method checks that the actor's organization plays the right part in the trade (issuing bank, importer,
/// holder and so on) before calling the backend, which in turn checks that the transition is legal. Admins may act
/// for any organization. Once the backend has committed, a [`PttStatusChangedEvent`] is published.
///
/// Gated actions are not gated here. Route them through [`crate::ApprovalApi`] first.
pub struct PttFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PttFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PttFlowApi")
    }
}

impl<B: Clone> Clone for PttFlowApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> PttFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn ensure_org(actor: &Actor, org_id: i64, part: &str) -> Result<(), PttFlowError> {
    if actor.org_id == org_id || actor.is_admin() {
        Ok(())
    } else {
        Err(PttFlowError::Forbidden(format!("Only the {part} (organization {org_id}) may do this")))
    }
}

fn ensure_admin(actor: &Actor) -> Result<(), PttFlowError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(PttFlowError::Forbidden("Only administrators may do this".into()))
    }
}

impl<B> PttFlowApi<B>
where B: PttDatabase
{
    async fn ptt(&self, ptt_id: i64) -> Result<PttToken, PttFlowError> {
        self.db.fetch_ptt(ptt_id).await?.ok_or(PttFlowError::PttNotFound(ptt_id))
    }

    async fn offer(&self, offer_id: i64) -> Result<DiscountOffer, PttFlowError> {
        self.db.fetch_offer(offer_id).await?.ok_or(PttFlowError::OfferNotFound(offer_id))
    }

    async fn publish_status_change(&self, ptt: &PttToken, old_status: PttStatus) {
        trace!("🔄️ Notifying status change hook subscribers for PTT #{}", ptt.id);
        self.producers.publish_status_changed(PttStatusChangedEvent::new(ptt.clone(), old_status)).await;
    }

    /// An importer asks its bank for a new token. The maturity date must lie in the future.
    pub async fn request_ptt(&self, actor: &Actor, request: NewPttRequest) -> Result<PttToken, PttFlowError> {
        if request.maturity_date <= Utc::now().date_naive() {
            return Err(PttFlowError::InvalidRequest("The maturity date must be in the future".into()));
        }
        let ptt = self.db.insert_ptt_request(actor.org_id, request).await?;
        info!("🔄️ PTT #{} for {} {} requested by org #{}", ptt.id, ptt.amount, ptt.currency, actor.org_id);
        Ok(ptt)
    }

    pub async fn issue_ptt(&self, actor: &Actor, ptt_id: i64) -> Result<PttToken, PttFlowError> {
        let ptt = self.ptt(ptt_id).await?;
        ensure_org(actor, ptt.issuer_bank, "issuing bank")?;
        let issued = self.db.issue_ptt(ptt_id).await?;
        self.publish_status_change(&issued, ptt.status).await;
        Ok(issued)
    }

    pub async fn lock_ptt(
        &self,
        actor: &Actor,
        ptt_id: i64,
        conditions: LockConditions,
    ) -> Result<PttToken, PttFlowError> {
        let ptt = self.ptt(ptt_id).await?;
        ensure_org(actor, ptt.original_importer, "importer")?;
        let locked = self.db.lock_ptt(ptt_id, conditions).await?;
        self.publish_status_change(&locked, ptt.status).await;
        Ok(locked)
    }

    pub async fn transfer_ptt(&self, actor: &Actor, ptt_id: i64, exporter_id: i64) -> Result<PttToken, PttFlowError> {
        let ptt = self.ptt(ptt_id).await?;
        ensure_org(actor, ptt.original_importer, "importer")?;
        let transferred = self.db.transfer_ptt(ptt_id, exporter_id).await?;
        self.publish_status_change(&transferred, ptt.status).await;
        Ok(transferred)
    }

    /// The exporter holding the token records a shipping document. Only the metadata is stored.
    pub async fn upload_document(
        &self,
        actor: &Actor,
        ptt_id: i64,
        document: NewDocument,
    ) -> Result<ShippingDocument, PttFlowError> {
        let ptt = self.ptt(ptt_id).await?;
        ensure_org(actor, ptt.current_owner, "exporter holding the token")?;
        let doc = self.db.insert_document(ptt_id, actor.user_id, document).await?;
        debug!("🔄️ Document #{} ({}) uploaded for PTT #{ptt_id}", doc.id, doc.document_type);
        Ok(doc)
    }

    pub async fn approve_document(&self, actor: &Actor, doc_id: i64) -> Result<DocumentReviewResult, PttFlowError> {
        self.review_document(actor, doc_id, DocumentReview::Approve).await
    }

    pub async fn reject_document(
        &self,
        actor: &Actor,
        doc_id: i64,
        reason: &str,
    ) -> Result<DocumentReviewResult, PttFlowError> {
        if reason.trim().is_empty() {
            return Err(PttFlowError::InvalidRequest("A rejected document needs a reason".into()));
        }
        self.review_document(actor, doc_id, DocumentReview::Reject(reason.trim().to_string())).await
    }

    async fn review_document(
        &self,
        actor: &Actor,
        doc_id: i64,
        review: DocumentReview,
    ) -> Result<DocumentReviewResult, PttFlowError> {
        let doc = self.db.fetch_document(doc_id).await?.ok_or(PttFlowError::DocumentNotFound(doc_id))?;
        let ptt = self.ptt(doc.ptt_id).await?;
        ensure_org(actor, ptt.original_importer, "importer")?;
        let result = self.db.review_document(doc_id, review).await?;
        if result.promoted {
            self.publish_status_change(&result.ptt, ptt.status).await;
        }
        Ok(result)
    }

    pub async fn make_offer(&self, actor: &Actor, ptt_id: i64, amount: Money) -> Result<DiscountOffer, PttFlowError> {
        let offer = self.db.insert_offer(ptt_id, actor.org_id, amount).await?;
        info!("🔄️ Funder #{} offers {amount} for PTT #{ptt_id}", actor.org_id);
        Ok(offer)
    }

    /// The holder sells the token to the funder behind `offer_id`.
    pub async fn accept_offer(&self, actor: &Actor, offer_id: i64) -> Result<OfferAcceptance, PttFlowError> {
        let offer = self.offer(offer_id).await?;
        let ptt = self.ptt(offer.ptt_id).await?;
        ensure_org(actor, ptt.current_owner, "token holder")?;
        let result = self.db.accept_offer(offer_id).await?;
        self.publish_status_change(&result.ptt, ptt.status).await;
        Ok(result)
    }

    pub async fn withdraw_offer(&self, actor: &Actor, offer_id: i64) -> Result<DiscountOffer, PttFlowError> {
        let offer = self.offer(offer_id).await?;
        ensure_org(actor, offer.funder_org, "funder that made the offer")?;
        self.db.withdraw_offer(offer_id).await
    }

    /// The issuing bank pays out the face value to whoever holds the token.
    pub async fn settle_payment(&self, actor: &Actor, ptt_id: i64) -> Result<SettlementResult, PttFlowError> {
        let ptt = self.ptt(ptt_id).await?;
        ensure_org(actor, ptt.issuer_bank, "issuing bank")?;
        let result = self.db.settle_ptt(ptt_id).await?;
        self.publish_status_change(&result.ptt, ptt.status).await;
        self.producers.publish_settled(PttSettledEvent::new(result.ptt.clone(), result.ledger.clone())).await;
        Ok(result)
    }

    /// Either the importer or the issuing bank may cancel a token that has not yet reached the exporter.
    pub async fn cancel_ptt(&self, actor: &Actor, ptt_id: i64, reason: &str) -> Result<PttToken, PttFlowError> {
        let ptt = self.ptt(ptt_id).await?;
        if actor.org_id != ptt.original_importer && actor.org_id != ptt.issuer_bank && !actor.is_admin() {
            return Err(PttFlowError::Forbidden("Only the importer or the issuing bank may cancel a token".into()));
        }
        if reason.trim().is_empty() {
            return Err(PttFlowError::InvalidRequest("A cancellation needs a reason".into()));
        }
        let cancelled = self.db.cancel_ptt(ptt_id, reason.trim()).await?;
        self.publish_status_change(&cancelled, ptt.status).await;
        Ok(cancelled)
    }

    pub async fn create_organization(&self, actor: &Actor, org: NewOrganization) -> Result<Organization, PttFlowError> {
        ensure_admin(actor)?;
        if org.name.trim().is_empty() {
            return Err(PttFlowError::InvalidRequest("An organization needs a name".into()));
        }
        if org.treasury_balance.is_negative() || org.credit_limit.is_negative() {
            return Err(PttFlowError::InvalidRequest("Opening balances may not be negative".into()));
        }
        let org = self.db.insert_organization(org).await?;
        info!("🔄️ Organization #{} ({}, {}) created", org.id, org.name, org.org_type);
        Ok(org)
    }

    pub async fn deposit(
        &self,
        actor: &Actor,
        org_id: i64,
        amount: Money,
        memo: &str,
    ) -> Result<Organization, PttFlowError> {
        ensure_admin(actor)?;
        if !amount.is_positive() {
            return Err(PttFlowError::InvalidRequest("A deposit must be positive".into()));
        }
        self.db.adjust_treasury(org_id, amount, memo).await
    }

    pub async fn withdraw(
        &self,
        actor: &Actor,
        org_id: i64,
        amount: Money,
        memo: &str,
    ) -> Result<Organization, PttFlowError> {
        ensure_admin(actor)?;
        if !amount.is_positive() {
            return Err(PttFlowError::InvalidRequest("A withdrawal must be positive".into()));
        }
        self.db.adjust_treasury(org_id, -amount, memo).await
    }

    pub async fn set_credit_limit(&self, actor: &Actor, org_id: i64, limit: Money) -> Result<Organization, PttFlowError> {
        ensure_admin(actor)?;
        self.db.set_credit_limit(org_id, limit).await
    }

    /// Cancels requests that have waited longer than `timeout` to be issued. Called by the expiry worker.
    pub async fn expire_stale_requests(&self, timeout: Duration) -> Result<Vec<PttToken>, PttFlowError> {
        let expired = self.db.expire_stale_requests(timeout).await?;
        for ptt in &expired {
            self.publish_status_change(ptt, PttStatus::Requested).await;
        }
        Ok(expired)
    }
}
