//! The maker/checker gate.
//!
//! Some actions are too consequential to be carried out by a single person. When a user who holds `Maker` (and
//! neither `Checker` nor `Admin`) attempts a gated action, the action is queued as a [`PendingAction`] instead of
//! being executed. A second user from the same organization holding `Checker` (or any `Admin`) then either approves
//! it, which executes the underlying mutation, or rejects it with a reason, which changes nothing else.
//!
//! The approval is recorded before the mutation runs. If the mutation then fails (the token moved on in the
//! meantime, say), the approval is reverted and the action returns to the queue with the failure noted in `reason`.
use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{ActionStatus, ActionType, Actor, NewPendingAction, PendingAction, PttStatus, PttToken, Role},
    events::{ActionDecidedEvent, EventProducers},
    lifecycle::check_transition,
    ptt_api::ptt_flow_api::PttFlowApi,
    traits::{
        ApprovalApiError,
        ApprovalManagement,
        OfferAcceptance,
        PttDatabase,
        PttFlowError,
        SettlementResult,
    },
};

/// The set of action types that must pass the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    gated: Vec<ActionType>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self { gated: vec![ActionType::IssuePtt, ActionType::AcceptOffer] }
    }
}

impl GatePolicy {
    pub fn new(gated: Vec<ActionType>) -> Self {
        Self { gated }
    }

    /// Adds or removes `settle_ptt` from the gated set.
    pub fn with_settlement_gated(mut self, gated: bool) -> Self {
        self.gated.retain(|a| *a != ActionType::SettlePtt);
        if gated {
            self.gated.push(ActionType::SettlePtt);
        }
        self
    }

    pub fn is_gated(&self, action: ActionType) -> bool {
        self.gated.contains(&action)
    }

    /// True iff `action` is gated and the roles make the user a maker without authority to approve.
    pub fn requires_approval(&self, roles: &[Role], action: ActionType) -> bool {
        self.is_gated(action) &&
            roles.contains(&Role::Maker) &&
            !roles.contains(&Role::Checker) &&
            !roles.contains(&Role::Admin)
    }
}

/// What an approved action did once executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Issued { ptt: PttToken },
    OfferAccepted(OfferAcceptance),
    Settled(SettlementResult),
}

pub struct ApprovalApi<B> {
    db: B,
    flow: PttFlowApi<B>,
    policy: GatePolicy,
    producers: EventProducers,
}

impl<B> Debug for ApprovalApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApprovalApi ({:?})", self.policy)
    }
}

impl<B: Clone> ApprovalApi<B> {
    pub fn new(db: B, producers: EventProducers, policy: GatePolicy) -> Self {
        let flow = PttFlowApi::new(db.clone(), producers.clone());
        Self { db, flow, policy, producers }
    }
}

impl<B> ApprovalApi<B> {
    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    pub fn requires_approval(&self, roles: &[Role], action: ActionType) -> bool {
        self.policy.requires_approval(roles, action)
    }
}

fn ensure_can_decide(checker: &Actor, action: &PendingAction) -> Result<(), ApprovalApiError> {
    if action.status != ActionStatus::Pending {
        return Err(ApprovalApiError::AlreadyDecided(action.id));
    }
    if !checker.has_role(Role::Checker) && !checker.is_admin() {
        return Err(ApprovalApiError::NotPermitted("Only checkers may decide pending actions".into()));
    }
    if checker.user_id == action.maker_id {
        return Err(ApprovalApiError::NotPermitted("The maker of an action cannot also decide it".into()));
    }
    if checker.org_id != action.org_id && !checker.is_admin() {
        return Err(ApprovalApiError::NotPermitted(format!(
            "Action {} belongs to organization {}",
            action.id, action.org_id
        )));
    }
    Ok(())
}

impl<B> ApprovalApi<B>
where B: PttDatabase + ApprovalManagement
{
    /// Queues a gated action. Nothing about the token changes until a checker approves it.
    ///
    /// `target_id` is the token id for `issue_ptt` and `settle_ptt`, and the offer id for `accept_offer`. The target
    /// is checked now, so that obviously doomed actions never reach the queue.
    pub async fn submit(
        &self,
        maker: &Actor,
        action_type: ActionType,
        target_id: i64,
        memo: Option<String>,
    ) -> Result<PendingAction, ApprovalApiError> {
        if !maker.has_role(Role::Maker) {
            return Err(ApprovalApiError::NotPermitted("Only makers may submit actions for approval".into()));
        }
        let ptt_id = self.check_target(maker, action_type, target_id).await.map_err(ApprovalApiError::InvalidAction)?;
        let action =
            NewPendingAction { action_type, target_id, ptt_id, org_id: maker.org_id, maker_id: maker.user_id, memo };
        let action = self.db.insert_pending_action(action).await?;
        info!("✅️ Action #{} ({action_type} on #{target_id}) awaits a checker", action.id);
        Ok(action)
    }

    /// Checks that the maker's organization is the party that would execute the action and that the token can still
    /// make the move. Returns the token id.
    async fn check_target(&self, maker: &Actor, action_type: ActionType, target_id: i64) -> Result<i64, PttFlowError> {
        let (ptt, party, next) = match action_type {
            ActionType::IssuePtt | ActionType::SettlePtt => {
                let ptt = self.db.fetch_ptt(target_id).await?.ok_or(PttFlowError::PttNotFound(target_id))?;
                let next = if action_type == ActionType::IssuePtt { PttStatus::Issued } else { PttStatus::Settled };
                let party = ptt.issuer_bank;
                (ptt, party, next)
            },
            ActionType::AcceptOffer => {
                let offer = self.db.fetch_offer(target_id).await?.ok_or(PttFlowError::OfferNotFound(target_id))?;
                let ptt = self.db.fetch_ptt(offer.ptt_id).await?.ok_or(PttFlowError::PttNotFound(offer.ptt_id))?;
                let party = ptt.current_owner;
                (ptt, party, PttStatus::Discounted)
            },
        };
        if party != maker.org_id {
            return Err(PttFlowError::Forbidden(format!("Organization {} is not a party to this action", maker.org_id)));
        }
        check_transition(ptt.status, next)?;
        Ok(ptt.id)
    }

    /// Approves and executes a pending action.
    pub async fn approve(
        &self,
        checker: &Actor,
        action_id: i64,
    ) -> Result<(PendingAction, ActionOutcome), ApprovalApiError> {
        let action = self.fetch(action_id).await?;
        ensure_can_decide(checker, &action)?;
        let approved = self.db.mark_approved(action_id, checker.user_id).await?;
        debug!("✅️ Action #{action_id} approved by user #{}. Executing it.", checker.user_id);
        match self.execute(&approved).await {
            Ok(outcome) => {
                info!("✅️ Action #{action_id} ({}) approved and executed", approved.action_type);
                self.producers.publish_action_decided(ActionDecidedEvent::new(approved.clone())).await;
                Ok((approved, outcome))
            },
            Err(e) => {
                warn!("✅️ Approved action #{action_id} failed to execute and returns to the queue. {e}");
                self.db.revert_approval(action_id, &e.to_string()).await?;
                Err(ApprovalApiError::ExecutionFailed(e))
            },
        }
    }

    async fn execute(&self, action: &PendingAction) -> Result<ActionOutcome, PttFlowError> {
        let maker = Actor::new(action.maker_id, action.org_id, vec![Role::Maker]);
        match action.action_type {
            ActionType::IssuePtt => {
                let ptt = self.flow.issue_ptt(&maker, action.target_id).await?;
                Ok(ActionOutcome::Issued { ptt })
            },
            ActionType::AcceptOffer => {
                let result = self.flow.accept_offer(&maker, action.target_id).await?;
                Ok(ActionOutcome::OfferAccepted(result))
            },
            ActionType::SettlePtt => {
                let result = self.flow.settle_payment(&maker, action.target_id).await?;
                Ok(ActionOutcome::Settled(result))
            },
        }
    }

    /// Rejects a pending action. The reason is mandatory and nothing else changes.
    pub async fn reject(&self, checker: &Actor, action_id: i64, reason: &str) -> Result<PendingAction, ApprovalApiError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApprovalApiError::MissingReason);
        }
        let action = self.fetch(action_id).await?;
        ensure_can_decide(checker, &action)?;
        let rejected = self.db.mark_rejected(action_id, checker.user_id, reason).await?;
        info!("✅️ Action #{action_id} rejected by user #{}: {reason}", checker.user_id);
        self.producers.publish_action_decided(ActionDecidedEvent::new(rejected.clone())).await;
        Ok(rejected)
    }

    pub async fn fetch(&self, action_id: i64) -> Result<PendingAction, ApprovalApiError> {
        self.db.fetch_pending_action(action_id).await?.ok_or(ApprovalApiError::ActionNotFound(action_id))
    }

    /// The queue for one organization, or every organization when `org_id` is `None`. Newest first.
    pub async fn list(
        &self,
        org_id: Option<i64>,
        status: Option<ActionStatus>,
    ) -> Result<Vec<PendingAction>, ApprovalApiError> {
        self.db.fetch_pending_actions(org_id, status).await
    }
}
