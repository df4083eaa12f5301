use serde::{Deserialize, Serialize};

use crate::db_types::{LedgerEntry, PendingAction, PttStatus, PttToken};

/// Emitted after every committed status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PttStatusChangedEvent {
    pub ptt: PttToken,
    pub old_status: PttStatus,
}

impl PttStatusChangedEvent {
    pub fn new(ptt: PttToken, old_status: PttStatus) -> Self {
        Self { ptt, old_status }
    }

    pub fn new_status(&self) -> PttStatus {
        self.ptt.status
    }
}

/// Emitted once a settlement has committed, with the audit rows it wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PttSettledEvent {
    pub ptt: PttToken,
    pub ledger: Vec<LedgerEntry>,
}

impl PttSettledEvent {
    pub fn new(ptt: PttToken, ledger: Vec<LedgerEntry>) -> Self {
        Self { ptt, ledger }
    }
}

/// Emitted when a checker approves or rejects a pending action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDecidedEvent {
    pub action: PendingAction,
}

impl ActionDecidedEvent {
    pub fn new(action: PendingAction) -> Self {
        Self { action }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    PttStatusChanged(PttStatusChangedEvent),
    PttSettled(PttSettledEvent),
    ActionDecided(ActionDecidedEvent),
}
