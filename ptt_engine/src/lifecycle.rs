//! The PTT lifecycle state machine and the balance movements that accompany each transition.
//!
//! A token moves strictly forward through
//!
//! ```text
//! requested -> issued -> locked -> transferred -> redeemable -> discounted -> settled
//! ```
//!
//! | From \ To   | issued | locked | transferred | redeemable | discounted | settled | cancelled |
//! |-------------|--------|--------|-------------|------------|------------|---------|-----------|
//! | requested   | ✅️     |        |             |            |            |         | ✅️        |
//! | issued      |        | ✅️     |             |            |            |         | ✅️        |
//! | locked      |        |        | ✅️          |            |            |         | ✅️        |
//! | transferred |        |        |             | ✅️         |            |         |           |
//! | redeemable  |        |        |             |            | ✅️         | ✅️      |           |
//! | discounted  |        |        |             |            |            | ✅️      |           |
//!
//! Discounting is optional, so a redeemable token may be settled directly. `settled` and `cancelled` are terminal.
//!
//! Everything in this module is pure. The functions named `*_plan` work out, from the current rows, which balance
//! movements and audit entries a transition needs. The database backend applies a plan inside a single transaction
//! along with the status change, so either all of it happens or none of it does.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{
    BackingType,
    DiscountOffer,
    LedgerKind,
    Money,
    NewLedgerEntry,
    Organization,
    PttStatus,
    PttToken,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("A token cannot move from {from} to {to}")]
    IllegalTransition { from: PttStatus, to: PttStatus },
    #[error("Organization {org_id} has {available} of credit available, but {requested} is required")]
    CreditLimitExceeded { org_id: i64, requested: Money, available: Money },
    #[error("Organization {org_id} has {available} in treasury, but {required} is required")]
    InsufficientTreasury { org_id: i64, required: Money, available: Money },
    #[error("The ledger plan does not balance. Treasury debits and credits differ by {0}")]
    Unbalanced(Money),
    #[error("Organization {org_id} was supplied as the {role}, but the token names organization {expected}")]
    WrongCounterparty { org_id: i64, role: &'static str, expected: i64 },
}

impl PttStatus {
    /// The forward sequence of non-terminal-failure states.
    pub const SEQUENCE: [PttStatus; 7] = [
        PttStatus::Requested,
        PttStatus::Issued,
        PttStatus::Locked,
        PttStatus::Transferred,
        PttStatus::Redeemable,
        PttStatus::Discounted,
        PttStatus::Settled,
    ];

    pub const ALL: [PttStatus; 8] = [
        PttStatus::Requested,
        PttStatus::Issued,
        PttStatus::Locked,
        PttStatus::Transferred,
        PttStatus::Redeemable,
        PttStatus::Discounted,
        PttStatus::Settled,
        PttStatus::Cancelled,
    ];

    /// Position of this status in [`Self::SEQUENCE`]. `Cancelled` is off the main line and has no stage.
    pub fn stage(&self) -> Option<usize> {
        Self::SEQUENCE.iter().position(|s| s == self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PttStatus::Settled | PttStatus::Cancelled)
    }

    /// True if the importer's credit is committed to the token while it is in this state.
    pub fn holds_credit(&self) -> bool {
        matches!(
            self,
            PttStatus::Issued | PttStatus::Locked | PttStatus::Transferred | PttStatus::Redeemable | PttStatus::Discounted
        )
    }

    pub fn can_transition_to(&self, next: PttStatus) -> bool {
        use PttStatus::*;
        matches!(
            (self, next),
            (Requested, Issued) |
                (Issued, Locked) |
                (Locked, Transferred) |
                (Transferred, Redeemable) |
                (Redeemable, Discounted) |
                (Redeemable, Settled) |
                (Discounted, Settled) |
                (Requested | Issued | Locked, Cancelled)
        )
    }

    pub fn next_states(&self) -> Vec<PttStatus> {
        Self::ALL.iter().copied().filter(|s| self.can_transition_to(*s)).collect()
    }
}

pub fn check_transition(from: PttStatus, to: PttStatus) -> Result<(), LifecycleError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(LifecycleError::IllegalTransition { from, to })
    }
}

/// A change to one organization's balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceMovement {
    pub org_id: i64,
    pub treasury_delta: Money,
    pub credit_used_delta: Money,
}

impl BalanceMovement {
    pub fn treasury(org_id: i64, delta: Money) -> Self {
        Self { org_id, treasury_delta: delta, credit_used_delta: Money::default() }
    }

    pub fn credit(org_id: i64, delta: Money) -> Self {
        Self { org_id, treasury_delta: Money::default(), credit_used_delta: delta }
    }
}

/// Everything a single status transition changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPlan {
    pub ptt_id: i64,
    pub from_status: PttStatus,
    pub to_status: PttStatus,
    pub new_owner: Option<i64>,
    pub movements: Vec<BalanceMovement>,
    pub entries: Vec<NewLedgerEntry>,
}

impl LedgerPlan {
    fn new(token: &PttToken, to_status: PttStatus) -> Result<Self, LifecycleError> {
        check_transition(token.status, to_status)?;
        Ok(Self {
            ptt_id: token.id,
            from_status: token.status,
            to_status,
            new_owner: None,
            movements: Vec::new(),
            entries: Vec::new(),
        })
    }

    fn entry(mut self, kind: LedgerKind, from: i64, to: i64, amount: Money, memo: &str) -> Self {
        self.entries.push(NewLedgerEntry {
            ptt_id: Some(self.ptt_id),
            kind,
            from_org: Some(from),
            to_org: Some(to),
            amount,
            memo: Some(memo.to_string()),
        });
        self
    }

    fn movement(mut self, movement: BalanceMovement) -> Self {
        self.movements.push(movement);
        self
    }

    pub fn treasury_debits(&self) -> Money {
        self.movements.iter().map(|m| m.treasury_delta).filter(Money::is_negative).map(|m| -m).sum()
    }

    pub fn treasury_credits(&self) -> Money {
        self.movements.iter().map(|m| m.treasury_delta).filter(Money::is_positive).sum()
    }

    pub fn credit_used_delta(&self) -> Money {
        self.movements.iter().map(|m| m.credit_used_delta).sum()
    }

    /// Money is neither created nor destroyed by a lifecycle transition.
    pub fn is_balanced(&self) -> bool {
        self.treasury_debits() == self.treasury_credits()
    }

    pub fn verify(self) -> Result<Self, LifecycleError> {
        if self.is_balanced() {
            Ok(self)
        } else {
            Err(LifecycleError::Unbalanced(self.treasury_credits() - self.treasury_debits()))
        }
    }
}

fn expect_org(org: &Organization, expected: i64, role: &'static str) -> Result<(), LifecycleError> {
    if org.id == expected {
        Ok(())
    } else {
        Err(LifecycleError::WrongCounterparty { org_id: org.id, role, expected })
    }
}

/// A status change with no ownership or balance effect (locking, promotion to redeemable).
pub fn status_plan(token: &PttToken, to_status: PttStatus) -> Result<LedgerPlan, LifecycleError> {
    LedgerPlan::new(token, to_status)
}

/// Issuing commits the importer's credit line. Treasury-backed tokens additionally need the issuing bank to hold at
/// least the face value in its treasury.
pub fn issuance_plan(
    token: &PttToken,
    importer: &Organization,
    bank: &Organization,
) -> Result<LedgerPlan, LifecycleError> {
    let plan = LedgerPlan::new(token, PttStatus::Issued)?;
    expect_org(importer, token.original_importer, "importer")?;
    expect_org(bank, token.issuer_bank, "issuing bank")?;
    let available = importer.available_credit();
    if available < token.amount {
        return Err(LifecycleError::CreditLimitExceeded { org_id: importer.id, requested: token.amount, available });
    }
    if token.backing_type == BackingType::Treasury && bank.treasury_balance < token.amount {
        return Err(LifecycleError::InsufficientTreasury {
            org_id: bank.id,
            required: token.amount,
            available: bank.treasury_balance,
        });
    }
    plan.movement(BalanceMovement::credit(importer.id, token.amount))
        .entry(LedgerKind::Issue, bank.id, importer.id, token.amount, "PTT issued")
        .verify()
}

pub fn transfer_plan(token: &PttToken, exporter_id: i64) -> Result<LedgerPlan, LifecycleError> {
    let mut plan = LedgerPlan::new(token, PttStatus::Transferred)?;
    plan.new_owner = Some(exporter_id);
    plan.entry(LedgerKind::Transfer, token.current_owner, exporter_id, token.amount, "PTT transferred to exporter")
        .verify()
}

/// The funder pays the offer amount to the current holder and takes ownership of the token.
pub fn discount_plan(
    token: &PttToken,
    offer: &DiscountOffer,
    funder: &Organization,
) -> Result<LedgerPlan, LifecycleError> {
    let mut plan = LedgerPlan::new(token, PttStatus::Discounted)?;
    expect_org(funder, offer.funder_org, "funder")?;
    if funder.treasury_balance < offer.offer_amount {
        return Err(LifecycleError::InsufficientTreasury {
            org_id: funder.id,
            required: offer.offer_amount,
            available: funder.treasury_balance,
        });
    }
    let seller = token.current_owner;
    plan.new_owner = Some(funder.id);
    plan.movement(BalanceMovement::treasury(funder.id, -offer.offer_amount))
        .movement(BalanceMovement::treasury(seller, offer.offer_amount))
        .entry(LedgerKind::Discount, funder.id, seller, offer.offer_amount, "PTT discounted")
        .verify()
}

/// Settlement debits the issuing bank, credits whoever holds the token, and releases the importer's credit.
pub fn settlement_plan(token: &PttToken, bank: &Organization) -> Result<LedgerPlan, LifecycleError> {
    let plan = LedgerPlan::new(token, PttStatus::Settled)?;
    expect_org(bank, token.issuer_bank, "issuing bank")?;
    if bank.treasury_balance < token.amount {
        return Err(LifecycleError::InsufficientTreasury {
            org_id: bank.id,
            required: token.amount,
            available: bank.treasury_balance,
        });
    }
    let beneficiary = token.beneficiary();
    plan.movement(BalanceMovement::treasury(bank.id, -token.amount))
        .movement(BalanceMovement::treasury(beneficiary, token.amount))
        .movement(BalanceMovement::credit(token.original_importer, -token.amount))
        .entry(LedgerKind::Settlement, bank.id, beneficiary, token.amount, "PTT settled")
        .verify()
}

/// Cancelling an issued token hands the committed credit back to the importer. A cancellation row carrying the
/// reason is always written, with a zero amount when no credit was committed yet.
pub fn cancellation_plan(token: &PttToken, reason: &str) -> Result<LedgerPlan, LifecycleError> {
    let plan = LedgerPlan::new(token, PttStatus::Cancelled)?;
    let memo = format!("PTT cancelled: {reason}");
    let plan = if token.status.holds_credit() {
        plan.movement(BalanceMovement::credit(token.original_importer, -token.amount))
    } else {
        plan
    };
    let released = -plan.credit_used_delta();
    plan.entry(LedgerKind::Cancellation, token.issuer_bank, token.original_importer, released, &memo).verify()
}
