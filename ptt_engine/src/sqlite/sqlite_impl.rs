//! `SqliteDatabase` is a concrete implementation of a PTT engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! Every mutation follows the same shape: open a transaction, re-read the rows involved, ask [`crate::lifecycle`] for
//! a plan, apply it with [`ptts::apply_plan`] and commit. Dropping the transaction on an early return rolls it back.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{approvals, db_url, documents, ledger, new_pool, offers, organizations, ptts, users};
use crate::{
    db_types::{
        ActionStatus,
        Actor,
        DiscountOffer,
        DocumentReview,
        DocumentStatus,
        LedgerEntry,
        LedgerKind,
        LockConditions,
        Money,
        NewDocument,
        NewLedgerEntry,
        NewOrganization,
        NewPendingAction,
        NewPttRequest,
        NewUser,
        OfferStatus,
        OrgType,
        Organization,
        PendingAction,
        PttStatus,
        PttToken,
        Role,
        ShippingDocument,
        UserAccount,
    },
    lifecycle::{
        cancellation_plan,
        discount_plan,
        issuance_plan,
        settlement_plan,
        status_plan,
        transfer_plan,
        BalanceMovement,
        LifecycleError,
    },
    ptt_objects::{PttQueryFilter, StatusChange},
    traits::{
        AccountApiError,
        AccountManagement,
        ApprovalApiError,
        ApprovalManagement,
        AuthApiError,
        AuthManagement,
        DocumentReviewResult,
        OfferAcceptance,
        PttDatabase,
        PttFlowError,
        SettlementResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `PTT_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. This is idempotent.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete for {}", self.url);
        Ok(())
    }
}

fn expect_status(ptt: &PttToken, expected: PttStatus) -> Result<(), PttFlowError> {
    if ptt.status == expected {
        Ok(())
    } else {
        Err(PttFlowError::UnexpectedStatus { ptt_id: ptt.id, expected, actual: ptt.status })
    }
}

fn expect_org_type(org: &Organization, expected: OrgType) -> Result<(), PttFlowError> {
    if org.org_type == expected {
        Ok(())
    } else {
        Err(PttFlowError::InvalidRequest(format!(
            "Organization {} is a {}, but a {expected} is required",
            org.id, org.org_type
        )))
    }
}

/// Once a token reaches a terminal status, its open offers and queued approvals can never go through. Both are
/// rejected in the same transaction.
async fn close_out(ptt_id: i64, reason: &str, conn: &mut SqliteConnection) -> Result<(), PttFlowError> {
    let offers = offers::reject_open_offers(ptt_id, &mut *conn).await?;
    if !offers.is_empty() {
        debug!("🗃️ Open offers {offers:?} on PTT #{ptt_id} rejected");
    }
    approvals::reject_pending_for_ptt(ptt_id, reason, conn).await?;
    Ok(())
}

impl PttDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_organization(&self, org: NewOrganization) -> Result<Organization, PttFlowError> {
        let mut conn = self.pool.acquire().await?;
        organizations::insert_organization(org, &mut conn).await
    }

    async fn insert_ptt_request(&self, importer_id: i64, request: NewPttRequest) -> Result<PttToken, PttFlowError> {
        if !request.amount.is_positive() {
            return Err(PttFlowError::InvalidRequest("The token amount must be positive".into()));
        }
        let mut tx = self.pool.begin().await?;
        let importer = organizations::organization_by_id(importer_id, &mut tx).await?;
        expect_org_type(&importer, OrgType::Importer)?;
        let bank = organizations::organization_by_id(request.issuer_bank, &mut tx).await?;
        expect_org_type(&bank, OrgType::Bank)?;
        if let Some(exporter_id) = request.exporter {
            let exporter = organizations::organization_by_id(exporter_id, &mut tx).await?;
            expect_org_type(&exporter, OrgType::Exporter)?;
        }
        let ptt = ptts::insert_ptt(importer_id, request, &mut tx).await?;
        tx.commit().await?;
        Ok(ptt)
    }

    async fn issue_ptt(&self, ptt_id: i64) -> Result<PttToken, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let ptt = ptts::ptt_by_id(ptt_id, &mut tx).await?;
        let importer = organizations::organization_by_id(ptt.original_importer, &mut tx).await?;
        let bank = organizations::organization_by_id(ptt.issuer_bank, &mut tx).await?;
        let plan = issuance_plan(&ptt, &importer, &bank)?;
        let (ptt, _) = ptts::apply_plan(&plan, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ PTT #{ptt_id} issued by bank #{} against the credit of org #{}", ptt.issuer_bank, importer.id);
        Ok(ptt)
    }

    async fn lock_ptt(&self, ptt_id: i64, conditions: LockConditions) -> Result<PttToken, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let ptt = ptts::ptt_by_id(ptt_id, &mut tx).await?;
        let plan = status_plan(&ptt, PttStatus::Locked)?;
        ptts::set_conditions(ptt_id, conditions, &mut tx).await?;
        let (ptt, _) = ptts::apply_plan(&plan, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ PTT #{ptt_id} locked with {} required documents", ptt.required_documents().len());
        Ok(ptt)
    }

    async fn transfer_ptt(&self, ptt_id: i64, exporter_id: i64) -> Result<PttToken, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let ptt = ptts::ptt_by_id(ptt_id, &mut tx).await?;
        if let Some(named) = ptt.exporter.filter(|named| *named != exporter_id) {
            return Err(PttFlowError::InvalidRequest(format!(
                "Token {ptt_id} names exporter {named}, and cannot be transferred to {exporter_id}"
            )));
        }
        let exporter = organizations::organization_by_id(exporter_id, &mut tx).await?;
        expect_org_type(&exporter, OrgType::Exporter)?;
        let plan = transfer_plan(&ptt, exporter_id)?;
        ptts::set_exporter(ptt_id, exporter_id, &mut tx).await?;
        let (ptt, _) = ptts::apply_plan(&plan, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ PTT #{ptt_id} transferred to exporter #{exporter_id}");
        Ok(ptt)
    }

    async fn insert_document(
        &self,
        ptt_id: i64,
        uploaded_by: i64,
        document: NewDocument,
    ) -> Result<ShippingDocument, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let ptt = ptts::ptt_by_id(ptt_id, &mut tx).await?;
        expect_status(&ptt, PttStatus::Transferred)?;
        let doc = documents::insert_document(ptt_id, uploaded_by, document, &mut tx).await?;
        tx.commit().await?;
        Ok(doc)
    }

    async fn review_document(&self, doc_id: i64, review: DocumentReview) -> Result<DocumentReviewResult, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let doc = documents::fetch_document(doc_id, &mut tx).await?.ok_or(PttFlowError::DocumentNotFound(doc_id))?;
        let ptt = ptts::ptt_by_id(doc.ptt_id, &mut tx).await?;
        expect_status(&ptt, PttStatus::Transferred)?;
        let (status, reason) = match review {
            DocumentReview::Approve => (DocumentStatus::Approved, None),
            DocumentReview::Reject(reason) => (DocumentStatus::Rejected, Some(reason)),
        };
        let document = documents::set_document_status(doc_id, status, reason, &mut tx).await?;
        let mut promoted = false;
        let mut ptt = ptt;
        if document.status == DocumentStatus::Approved {
            let approved = documents::approved_types(ptt.id, &mut tx).await?;
            let required = ptt.required_documents();
            let complete = if required.is_empty() {
                !approved.is_empty()
            } else {
                required.iter().all(|t| approved.contains(t))
            };
            if complete {
                let plan = status_plan(&ptt, PttStatus::Redeemable)?;
                let (updated, _) = ptts::apply_plan(&plan, &mut tx).await?;
                ptt = updated;
                promoted = true;
            }
        }
        tx.commit().await?;
        if promoted {
            info!("🗃️ PTT #{} has a complete document set and is now redeemable", ptt.id);
        } else {
            debug!("🗃️ Document #{doc_id} for PTT #{} marked {}", ptt.id, document.status);
        }
        Ok(DocumentReviewResult { document, ptt, promoted })
    }

    async fn insert_offer(&self, ptt_id: i64, funder_id: i64, amount: Money) -> Result<DiscountOffer, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let ptt = ptts::ptt_by_id(ptt_id, &mut tx).await?;
        expect_status(&ptt, PttStatus::Redeemable)?;
        if !amount.is_positive() || amount > ptt.amount {
            return Err(PttFlowError::InvalidRequest(format!(
                "An offer must be positive and no more than the face value of {}",
                ptt.amount
            )));
        }
        let funder = organizations::organization_by_id(funder_id, &mut tx).await?;
        expect_org_type(&funder, OrgType::Funder)?;
        let offer = offers::insert_offer(ptt_id, funder_id, amount, &mut tx).await?;
        tx.commit().await?;
        Ok(offer)
    }

    async fn accept_offer(&self, offer_id: i64) -> Result<OfferAcceptance, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let offer = offers::fetch_offer(offer_id, &mut tx).await?.ok_or(PttFlowError::OfferNotFound(offer_id))?;
        if offer.status != OfferStatus::Open {
            return Err(PttFlowError::OfferNotOpen(offer_id));
        }
        let ptt = ptts::ptt_by_id(offer.ptt_id, &mut tx).await?;
        let funder = organizations::organization_by_id(offer.funder_org, &mut tx).await?;
        let plan = discount_plan(&ptt, &offer, &funder)?;
        let (ptt, _) = ptts::apply_plan(&plan, &mut tx).await?;
        let offer = offers::close_offer(offer_id, OfferStatus::Accepted, &mut tx).await?;
        let rejected_offers = offers::reject_competing_offers(ptt.id, offer_id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Offer #{offer_id} accepted. PTT #{} discounted to funder #{} for {}",
            ptt.id, offer.funder_org, offer.offer_amount
        );
        Ok(OfferAcceptance { ptt, offer, rejected_offers })
    }

    async fn withdraw_offer(&self, offer_id: i64) -> Result<DiscountOffer, PttFlowError> {
        let mut conn = self.pool.acquire().await?;
        offers::fetch_offer(offer_id, &mut conn).await?.ok_or(PttFlowError::OfferNotFound(offer_id))?;
        offers::close_offer(offer_id, OfferStatus::Withdrawn, &mut conn).await
    }

    async fn settle_ptt(&self, ptt_id: i64) -> Result<SettlementResult, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let ptt = ptts::ptt_by_id(ptt_id, &mut tx).await?;
        let bank = organizations::organization_by_id(ptt.issuer_bank, &mut tx).await?;
        let plan = settlement_plan(&ptt, &bank)?;
        let (ptt, ledger) = ptts::apply_plan(&plan, &mut tx).await?;
        close_out(ptt_id, "The token was settled", &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ PTT #{ptt_id} settled. {} paid by bank #{} to org #{}", ptt.amount, bank.id, ptt.current_owner);
        Ok(SettlementResult { ptt, ledger })
    }

    async fn cancel_ptt(&self, ptt_id: i64, reason: &str) -> Result<PttToken, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let ptt = ptts::ptt_by_id(ptt_id, &mut tx).await?;
        let plan = cancellation_plan(&ptt, reason)?;
        let (ptt, _) = ptts::apply_plan(&plan, &mut tx).await?;
        close_out(ptt_id, &format!("The token was cancelled: {reason}"), &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ PTT #{ptt_id} cancelled. {reason}");
        Ok(ptt)
    }

    async fn adjust_treasury(&self, org_id: i64, delta: Money, memo: &str) -> Result<Organization, PttFlowError> {
        if delta.is_zero() {
            return Err(PttFlowError::InvalidRequest("A treasury adjustment cannot be zero".into()));
        }
        let mut tx = self.pool.begin().await?;
        let org = organizations::organization_by_id(org_id, &mut tx).await?;
        let new_balance = org.treasury_balance.checked_add(delta).ok_or_else(|| {
            PttFlowError::InvalidRequest(format!(
                "Adjusting the treasury of organization {org_id} by {delta} would overflow its balance"
            ))
        })?;
        if new_balance.is_negative() {
            return Err(LifecycleError::InsufficientTreasury {
                org_id,
                required: -delta,
                available: org.treasury_balance,
            }
            .into());
        }
        let org = organizations::apply_movement(&BalanceMovement::treasury(org_id, delta), &mut tx).await?;
        let (kind, from_org, to_org, amount) = if delta.is_positive() {
            (LedgerKind::Deposit, None, Some(org_id), delta)
        } else {
            (LedgerKind::Withdrawal, Some(org_id), None, -delta)
        };
        let entry = NewLedgerEntry { ptt_id: None, kind, from_org, to_org, amount, memo: Some(memo.to_string()) };
        ledger::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Treasury of org #{org_id} adjusted by {delta}. New balance {}", org.treasury_balance);
        Ok(org)
    }

    async fn set_credit_limit(&self, org_id: i64, limit: Money) -> Result<Organization, PttFlowError> {
        if limit.is_negative() {
            return Err(PttFlowError::InvalidRequest("A credit limit cannot be negative".into()));
        }
        let mut tx = self.pool.begin().await?;
        let org = organizations::organization_by_id(org_id, &mut tx).await?;
        if limit < org.credit_used {
            return Err(PttFlowError::InvalidRequest(format!(
                "Organization {org_id} already uses {} of credit. The limit cannot be set to {limit}",
                org.credit_used
            )));
        }
        let org = organizations::set_credit_limit(org_id, limit, &mut tx)
            .await?
            .ok_or(PttFlowError::OrganizationNotFound(org_id))?;
        tx.commit().await?;
        info!("🗃️ Credit limit of org #{org_id} set to {limit}");
        Ok(org)
    }

    async fn expire_stale_requests(&self, older_than: Duration) -> Result<Vec<PttToken>, PttFlowError> {
        let mut tx = self.pool.begin().await?;
        let ids = ptts::stale_request_ids(older_than, &mut tx).await?;
        let mut expired = Vec::with_capacity(ids.len());
        let reason = format!("The request was not issued within {} hours", older_than.num_hours());
        for id in ids {
            let ptt = ptts::ptt_by_id(id, &mut tx).await?;
            let plan = cancellation_plan(&ptt, &reason)?;
            match ptts::apply_plan(&plan, &mut tx).await {
                Ok((ptt, _)) => {
                    close_out(ptt.id, &reason, &mut tx).await?;
                    expired.push(ptt)
                },
                Err(PttFlowError::ConcurrentModification(id)) => {
                    warn!("🗃️ PTT #{id} changed while it was being expired. Skipping it.");
                },
                Err(e) => return Err(e),
            }
        }
        tx.commit().await?;
        if !expired.is_empty() {
            info!("🗃️ {} stale PTT requests expired", expired.len());
        }
        Ok(expired)
    }

    async fn close(&mut self) -> Result<(), PttFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_organization(&self, org_id: i64) -> Result<Option<Organization>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let org = organizations::fetch_organization(org_id, &mut conn).await?;
        Ok(org)
    }

    async fn fetch_organizations(&self) -> Result<Vec<Organization>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let orgs = organizations::fetch_organizations(&mut conn).await?;
        Ok(orgs)
    }

    async fn fetch_ptt(&self, ptt_id: i64) -> Result<Option<PttToken>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let ptt = ptts::fetch_ptt(ptt_id, &mut conn).await?;
        Ok(ptt)
    }

    async fn fetch_ptts_for_org(&self, org_id: i64) -> Result<Vec<PttToken>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let tokens = ptts::fetch_ptts_for_org(org_id, &mut conn).await?;
        Ok(tokens)
    }

    async fn search_ptts(&self, query: PttQueryFilter) -> Result<Vec<PttToken>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let tokens = ptts::search_ptts(query, &mut conn).await?;
        Ok(tokens)
    }

    async fn fetch_status_history(&self, ptt_id: i64) -> Result<Vec<StatusChange>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let history = ptts::fetch_status_history(ptt_id, &mut conn).await?;
        Ok(history)
    }

    async fn fetch_document(&self, doc_id: i64) -> Result<Option<ShippingDocument>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let doc = documents::fetch_document(doc_id, &mut conn).await?;
        Ok(doc)
    }

    async fn fetch_documents_for_ptt(&self, ptt_id: i64) -> Result<Vec<ShippingDocument>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let docs = documents::fetch_documents_for_ptt(ptt_id, &mut conn).await?;
        Ok(docs)
    }

    async fn fetch_offer(&self, offer_id: i64) -> Result<Option<DiscountOffer>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let offer = offers::fetch_offer(offer_id, &mut conn).await?;
        Ok(offer)
    }

    async fn fetch_offers_for_ptt(&self, ptt_id: i64) -> Result<Vec<DiscountOffer>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let offers = offers::fetch_offers_for_ptt(ptt_id, &mut conn).await?;
        Ok(offers)
    }

    async fn fetch_ledger_for_org(&self, org_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::fetch_entries_for_org(org_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_ledger_for_ptt(&self, ptt_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::fetch_entries_for_ptt(ptt_id, &mut conn).await?;
        Ok(entries)
    }
}

impl AuthManagement for SqliteDatabase {
    async fn insert_user(&self, user: NewUser, api_key_hash: &str) -> Result<UserAccount, AuthApiError> {
        let mut tx = self.pool.begin().await?;
        let account = users::insert_user(&user, api_key_hash, &mut tx).await?;
        let mut roles = user.roles.clone();
        if !roles.contains(&Role::User) {
            roles.insert(0, Role::User);
        }
        users::assign_roles(account.id, &roles, &mut tx).await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_users_for_org(&self, org_id: i64) -> Result<Vec<UserAccount>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        let accounts = users::fetch_users_for_org(org_id, &mut conn).await?;
        Ok(accounts)
    }

    async fn fetch_actor_for_key_hash(&self, api_key_hash: &str) -> Result<Option<Actor>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_actor_for_key_hash(api_key_hash, &mut conn).await
    }

    async fn fetch_roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        users::roles_for_user(user_id, &mut conn).await
    }

    async fn check_user_has_roles(&self, user_id: i64, roles: &[Role]) -> Result<(), AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        users::user_has_roles(user_id, roles, &mut conn).await
    }

    async fn assign_roles(&self, user_id: i64, roles: &[Role]) -> Result<(), AuthApiError> {
        let mut tx = self.pool.begin().await?;
        users::fetch_user(user_id, &mut tx).await?.ok_or(AuthApiError::UserNotFound(user_id))?;
        users::assign_roles(user_id, roles, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_roles(&self, user_id: i64, roles: &[Role]) -> Result<u64, AuthApiError> {
        let mut tx = self.pool.begin().await?;
        let count = users::remove_roles(user_id, roles, &mut tx).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn count_admins(&self) -> Result<i64, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        users::count_admins(&mut conn).await
    }
}

impl ApprovalManagement for SqliteDatabase {
    async fn insert_pending_action(&self, action: NewPendingAction) -> Result<PendingAction, ApprovalApiError> {
        let mut conn = self.pool.acquire().await?;
        let action = approvals::insert_pending_action(action, &mut conn).await?;
        Ok(action)
    }

    async fn fetch_pending_action(&self, action_id: i64) -> Result<Option<PendingAction>, ApprovalApiError> {
        let mut conn = self.pool.acquire().await?;
        let action = approvals::fetch_pending_action(action_id, &mut conn).await?;
        Ok(action)
    }

    async fn fetch_pending_actions(
        &self,
        org_id: Option<i64>,
        status: Option<ActionStatus>,
    ) -> Result<Vec<PendingAction>, ApprovalApiError> {
        let mut conn = self.pool.acquire().await?;
        let actions = approvals::fetch_pending_actions(org_id, status, &mut conn).await?;
        Ok(actions)
    }

    async fn mark_approved(&self, action_id: i64, checker_id: i64) -> Result<PendingAction, ApprovalApiError> {
        let mut conn = self.pool.acquire().await?;
        approvals::transition_action(
            action_id,
            ActionStatus::Pending,
            ActionStatus::Approved,
            Some(checker_id),
            None,
            &mut conn,
        )
        .await
    }

    async fn revert_approval(&self, action_id: i64, failure: &str) -> Result<PendingAction, ApprovalApiError> {
        let mut conn = self.pool.acquire().await?;
        approvals::transition_action(
            action_id,
            ActionStatus::Approved,
            ActionStatus::Pending,
            None,
            Some(failure),
            &mut conn,
        )
        .await
    }

    async fn mark_rejected(
        &self,
        action_id: i64,
        checker_id: i64,
        reason: &str,
    ) -> Result<PendingAction, ApprovalApiError> {
        let mut conn = self.pool.acquire().await?;
        approvals::transition_action(
            action_id,
            ActionStatus::Pending,
            ActionStatus::Rejected,
            Some(checker_id),
            Some(reason),
            &mut conn,
        )
        .await
    }
}
