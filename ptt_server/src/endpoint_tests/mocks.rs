use chrono::Duration;
use mockall::mock;
use ptt_engine::{
    db_types::{
        ActionStatus,
        Actor,
        DiscountOffer,
        DocumentReview,
        LedgerEntry,
        LockConditions,
        Money,
        NewDocument,
        NewOrganization,
        NewPendingAction,
        NewPttRequest,
        NewUser,
        Organization,
        PendingAction,
        PttToken,
        Role,
        ShippingDocument,
        UserAccount,
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

mock! {
    pub AccountManager {}
    impl AccountManagement for AccountManager {
        async fn fetch_organization(&self, org_id: i64) -> Result<Option<Organization>, AccountApiError>;
        async fn fetch_organizations(&self) -> Result<Vec<Organization>, AccountApiError>;
        async fn fetch_ptt(&self, ptt_id: i64) -> Result<Option<PttToken>, AccountApiError>;
        async fn fetch_ptts_for_org(&self, org_id: i64) -> Result<Vec<PttToken>, AccountApiError>;
        async fn search_ptts(&self, query: PttQueryFilter) -> Result<Vec<PttToken>, AccountApiError>;
        async fn fetch_status_history(&self, ptt_id: i64) -> Result<Vec<StatusChange>, AccountApiError>;
        async fn fetch_document(&self, doc_id: i64) -> Result<Option<ShippingDocument>, AccountApiError>;
        async fn fetch_documents_for_ptt(&self, ptt_id: i64) -> Result<Vec<ShippingDocument>, AccountApiError>;
        async fn fetch_offer(&self, offer_id: i64) -> Result<Option<DiscountOffer>, AccountApiError>;
        async fn fetch_offers_for_ptt(&self, ptt_id: i64) -> Result<Vec<DiscountOffer>, AccountApiError>;
        async fn fetch_ledger_for_org(&self, org_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError>;
        async fn fetch_ledger_for_ptt(&self, ptt_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError>;
    }
}

mock! {
    pub AuthManager {}
    impl AuthManagement for AuthManager {
        async fn insert_user(&self, user: NewUser, api_key_hash: &str) -> Result<UserAccount, AuthApiError>;
        async fn fetch_user(&self, user_id: i64) -> Result<Option<UserAccount>, AuthApiError>;
        async fn fetch_users_for_org(&self, org_id: i64) -> Result<Vec<UserAccount>, AuthApiError>;
        async fn fetch_actor_for_key_hash(&self, api_key_hash: &str) -> Result<Option<Actor>, AuthApiError>;
        async fn fetch_roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AuthApiError>;
        async fn check_user_has_roles(&self, user_id: i64, roles: &[Role]) -> Result<(), AuthApiError>;
        async fn assign_roles(&self, user_id: i64, roles: &[Role]) -> Result<(), AuthApiError>;
        async fn remove_roles(&self, user_id: i64, roles: &[Role]) -> Result<u64, AuthApiError>;
        async fn count_admins(&self) -> Result<i64, AuthApiError>;
    }
}

// The lifecycle and approval routes need a single backend type that does everything.
mock! {
    pub PttBackend {}
    impl Clone for PttBackend {
        fn clone(&self) -> Self;
    }
    impl AccountManagement for PttBackend {
        async fn fetch_organization(&self, org_id: i64) -> Result<Option<Organization>, AccountApiError>;
        async fn fetch_organizations(&self) -> Result<Vec<Organization>, AccountApiError>;
        async fn fetch_ptt(&self, ptt_id: i64) -> Result<Option<PttToken>, AccountApiError>;
        async fn fetch_ptts_for_org(&self, org_id: i64) -> Result<Vec<PttToken>, AccountApiError>;
        async fn search_ptts(&self, query: PttQueryFilter) -> Result<Vec<PttToken>, AccountApiError>;
        async fn fetch_status_history(&self, ptt_id: i64) -> Result<Vec<StatusChange>, AccountApiError>;
        async fn fetch_document(&self, doc_id: i64) -> Result<Option<ShippingDocument>, AccountApiError>;
        async fn fetch_documents_for_ptt(&self, ptt_id: i64) -> Result<Vec<ShippingDocument>, AccountApiError>;
        async fn fetch_offer(&self, offer_id: i64) -> Result<Option<DiscountOffer>, AccountApiError>;
        async fn fetch_offers_for_ptt(&self, ptt_id: i64) -> Result<Vec<DiscountOffer>, AccountApiError>;
        async fn fetch_ledger_for_org(&self, org_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError>;
        async fn fetch_ledger_for_ptt(&self, ptt_id: i64) -> Result<Vec<LedgerEntry>, AccountApiError>;
    }
    impl PttDatabase for PttBackend {
        fn url(&self) -> &str;
        async fn insert_organization(&self, org: NewOrganization) -> Result<Organization, PttFlowError>;
        async fn insert_ptt_request(&self, importer_id: i64, request: NewPttRequest) -> Result<PttToken, PttFlowError>;
        async fn issue_ptt(&self, ptt_id: i64) -> Result<PttToken, PttFlowError>;
        async fn lock_ptt(&self, ptt_id: i64, conditions: LockConditions) -> Result<PttToken, PttFlowError>;
        async fn transfer_ptt(&self, ptt_id: i64, exporter_id: i64) -> Result<PttToken, PttFlowError>;
        async fn insert_document(&self, ptt_id: i64, uploaded_by: i64, document: NewDocument) -> Result<ShippingDocument, PttFlowError>;
        async fn review_document(&self, doc_id: i64, review: DocumentReview) -> Result<DocumentReviewResult, PttFlowError>;
        async fn insert_offer(&self, ptt_id: i64, funder_id: i64, amount: Money) -> Result<DiscountOffer, PttFlowError>;
        async fn accept_offer(&self, offer_id: i64) -> Result<OfferAcceptance, PttFlowError>;
        async fn withdraw_offer(&self, offer_id: i64) -> Result<DiscountOffer, PttFlowError>;
        async fn settle_ptt(&self, ptt_id: i64) -> Result<SettlementResult, PttFlowError>;
        async fn cancel_ptt(&self, ptt_id: i64, reason: &str) -> Result<PttToken, PttFlowError>;
        async fn adjust_treasury(&self, org_id: i64, delta: Money, memo: &str) -> Result<Organization, PttFlowError>;
        async fn set_credit_limit(&self, org_id: i64, limit: Money) -> Result<Organization, PttFlowError>;
        async fn expire_stale_requests(&self, older_than: Duration) -> Result<Vec<PttToken>, PttFlowError>;
    }
    impl ApprovalManagement for PttBackend {
        async fn insert_pending_action(&self, action: NewPendingAction) -> Result<PendingAction, ApprovalApiError>;
        async fn fetch_pending_action(&self, action_id: i64) -> Result<Option<PendingAction>, ApprovalApiError>;
        async fn fetch_pending_actions(&self, org_id: Option<i64>, status: Option<ActionStatus>) -> Result<Vec<PendingAction>, ApprovalApiError>;
        async fn mark_approved(&self, action_id: i64, checker_id: i64) -> Result<PendingAction, ApprovalApiError>;
        async fn revert_approval(&self, action_id: i64, failure: &str) -> Result<PendingAction, ApprovalApiError>;
        async fn mark_rejected(&self, action_id: i64, checker_id: i64, reason: &str) -> Result<PendingAction, ApprovalApiError>;
    }
}
