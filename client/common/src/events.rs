//! Action Events
//!
//! Every step the action executor takes is recorded as an event. The log
//! gives the front-end a progress feed and lets tests assert the exact
//! order of approvals, submissions and confirmations.

use serde::{Deserialize, Serialize};

use crate::types::{ActionKind, ActionSlot, ActionStatus, ApprovalAmount, TxHash};

/// Event types for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    StatusChanged,
    AllowanceChecked,
    ApprovalSubmitted,
    ApprovalConfirmed,
    TransactionSubmitted,
    TransactionConfirmed,
    RefreshRequested,
    ActionFailed,
}

/// A single executor step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ActionEvent {
    /// Pending action moved between statuses
    StatusChanged {
        slot: ActionSlot,
        from: ActionStatus,
        to: ActionStatus,
    },

    /// Allowance read before a deposit
    AllowanceChecked {
        allowance: u128,
        required: u128,
    },

    /// `approve` sent to the token
    ApprovalSubmitted {
        tx_hash: TxHash,
        amount: ApprovalAmount,
    },

    /// `approve` included on-chain
    ApprovalConfirmed {
        tx_hash: TxHash,
        block_number: u64,
    },

    /// Main action transaction sent
    TransactionSubmitted {
        kind: ActionKind,
        tx_hash: TxHash,
    },

    /// Main action transaction included on-chain
    TransactionConfirmed {
        kind: ActionKind,
        tx_hash: TxHash,
        block_number: u64,
    },

    /// Post-action snapshot refresh requested from the store
    RefreshRequested {
        kind: ActionKind,
    },

    /// Action ended in `failed`
    ActionFailed {
        kind: ActionKind,
        code: &'static str,
        message: String,
    },
}

impl ActionEvent {
    /// Get the event type
    pub fn event_type(&self) -> EventType {
        match self {
            Self::StatusChanged { .. } => EventType::StatusChanged,
            Self::AllowanceChecked { .. } => EventType::AllowanceChecked,
            Self::ApprovalSubmitted { .. } => EventType::ApprovalSubmitted,
            Self::ApprovalConfirmed { .. } => EventType::ApprovalConfirmed,
            Self::TransactionSubmitted { .. } => EventType::TransactionSubmitted,
            Self::TransactionConfirmed { .. } => EventType::TransactionConfirmed,
            Self::RefreshRequested { .. } => EventType::RefreshRequested,
            Self::ActionFailed { .. } => EventType::ActionFailed,
        }
    }
}

/// Log of executor steps, keeping at most `limit` of the newest
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Vec<ActionEvent>,
    limit: usize,
}

impl EventLog {
    /// Default number of retained events
    pub const DEFAULT_LIMIT: usize = 256;

    /// Create a new empty event log
    pub fn new() -> Self {
        Self::bounded(Self::DEFAULT_LIMIT)
    }

    /// Empty log retaining at most `limit` events (at least one)
    pub fn bounded(limit: usize) -> Self {
        Self {
            events: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Emit an event, evicting the oldest once the limit is reached
    pub fn emit(&mut self, event: ActionEvent) {
        if self.events.len() >= self.limit {
            let excess = self.events.len() + 1 - self.limit;
            self.events.drain(..excess);
        }
        self.events.push(event);
    }

    /// Retained events, oldest first
    pub fn events(&self) -> &[ActionEvent] {
        &self.events
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_keeps_newest() {
        let mut log = EventLog::bounded(2);
        log.emit(ActionEvent::AllowanceChecked { allowance: 0, required: 100 });
        log.emit(ActionEvent::ApprovalSubmitted {
            tx_hash: TxHash([1u8; 32]),
            amount: ApprovalAmount::Unlimited,
        });
        log.emit(ActionEvent::RefreshRequested { kind: ActionKind::Deposit });

        let types: Vec<_> = log.events().iter().map(ActionEvent::event_type).collect();
        assert_eq!(types, vec![EventType::ApprovalSubmitted, EventType::RefreshRequested]);
    }

    #[test]
    fn test_zero_limit_still_keeps_latest() {
        let mut log = EventLog::bounded(0);
        log.emit(ActionEvent::RefreshRequested { kind: ActionKind::Mint });
        log.emit(ActionEvent::RefreshRequested { kind: ActionKind::Withdraw });
        assert_eq!(
            log.events(),
            [ActionEvent::RefreshRequested { kind: ActionKind::Withdraw }]
        );
    }
}
