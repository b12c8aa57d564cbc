//! Pending actions and their results

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use siaduan_common::{
    ActionKind, ActionStatus, ProtocolSnapshot, SiaduanError, SiaduanResult, TxHash, TxReceipt,
};

// ============ Pending Action ============

/// State of one action slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingAction {
    /// Kind of the current or last action
    pub kind: Option<ActionKind>,
    /// Current status
    pub status: ActionStatus,
    /// Main transaction hash, once submitted
    pub tx_hash: Option<TxHash>,
    /// Failure message of a failed action
    pub error: Option<String>,
    /// Claimed by a running action (covers the allowance read before approving)
    running: bool,
}

impl PendingAction {
    /// Returns true while an action owns the slot
    pub fn is_busy(&self) -> bool {
        self.running
    }

    /// Claim the slot for `kind`, replacing any finished action
    pub fn begin(&mut self, kind: ActionKind) -> SiaduanResult<()> {
        if self.running {
            return Err(SiaduanError::SlotBusy {
                slot: kind.slot(),
                status: self.status,
            });
        }
        *self = Self {
            kind: Some(kind),
            running: true,
            ..Self::default()
        };
        Ok(())
    }

    /// Move to `to`, rejecting moves the state machine does not allow
    pub fn transition(&mut self, to: ActionStatus) -> SiaduanResult<ActionStatus> {
        let from = self.status;
        if !Self::is_valid_transition(from, to, self.kind) {
            return Err(SiaduanError::InvalidStateTransition { from, to });
        }
        self.status = to;
        self.running = !to.is_terminal();
        Ok(from)
    }

    /// End the action in `failed` from whatever status it reached
    pub fn fail(&mut self, message: String) -> ActionStatus {
        let from = self.status;
        self.status = ActionStatus::Failed;
        self.running = false;
        self.error = Some(message);
        from
    }

    /// Back to idle from a finished action
    pub fn acknowledge(&mut self) -> SiaduanResult<()> {
        match self.status {
            ActionStatus::Idle if !self.running => Ok(()),
            status if status.is_terminal() => {
                *self = Self::default();
                Ok(())
            }
            from => Err(SiaduanError::InvalidStateTransition {
                from,
                to: ActionStatus::Idle,
            }),
        }
    }

    fn is_valid_transition(from: ActionStatus, to: ActionStatus, kind: Option<ActionKind>) -> bool {
        use ActionStatus::*;
        match (from, to) {
            (Idle, Approving) => kind == Some(ActionKind::Deposit),
            (Idle, Submitting) | (Approving, Submitting) => true,
            (Submitting, Confirming) => true,
            (Confirming, Done) => true,
            (Idle | Approving | Submitting | Confirming, Failed) => true,
            _ => false,
        }
    }
}

// ============ Results ============

/// A completed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    /// Receipt of the main transaction
    pub receipt: TxReceipt,
    /// Receipt of the approval sent ahead of a deposit, if one was needed
    pub approval: Option<TxReceipt>,
    /// Snapshot after the post-action refresh; `None` if that refresh failed
    pub snapshot: Option<Arc<ProtocolSnapshot>>,
}

impl ActionOutcome {
    pub fn tx_hash(&self) -> TxHash {
        self.receipt.tx_hash
    }
}

/// A failed action, rendered as "<Kind> failed: <reason>"
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failed: {error}")]
pub struct ActionFailure {
    pub kind: ActionKind,
    pub error: SiaduanError,
}

impl ActionFailure {
    pub fn new(kind: ActionKind, error: SiaduanError) -> Self {
        Self { kind, error }
    }

    /// Error code of the underlying failure
    pub fn code(&self) -> &'static str {
        self.error.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siaduan_common::ActionSlot;

    #[test]
    fn test_mint_lifecycle() {
        let mut action = PendingAction::default();
        action.begin(ActionKind::Mint).unwrap();
        assert!(action.is_busy());

        for status in [ActionStatus::Submitting, ActionStatus::Confirming, ActionStatus::Done] {
            action.transition(status).unwrap();
        }
        assert!(!action.is_busy());
        action.acknowledge().unwrap();
        assert_eq!(action, PendingAction::default());
    }

    #[test]
    fn test_only_deposit_approves() {
        let mut action = PendingAction::default();
        action.begin(ActionKind::Withdraw).unwrap();
        let err = action.transition(ActionStatus::Approving).unwrap_err();
        assert_eq!(err.code(), "E041_INVALID_TRANSITION");

        let mut action = PendingAction::default();
        action.begin(ActionKind::Deposit).unwrap();
        action.transition(ActionStatus::Approving).unwrap();
        action.transition(ActionStatus::Submitting).unwrap();
    }

    #[test]
    fn test_cannot_skip_confirmation() {
        let mut action = PendingAction::default();
        action.begin(ActionKind::Mint).unwrap();
        action.transition(ActionStatus::Submitting).unwrap();
        assert!(action.transition(ActionStatus::Done).is_err());
    }

    #[test]
    fn test_busy_slot_refuses_second_action() {
        let mut action = PendingAction::default();
        action.begin(ActionKind::Deposit).unwrap();
        action.transition(ActionStatus::Approving).unwrap();

        let err = action.begin(ActionKind::Withdraw).unwrap_err();
        assert_eq!(
            err,
            SiaduanError::SlotBusy {
                slot: ActionSlot::Vault,
                status: ActionStatus::Approving
            }
        );
    }

    #[test]
    fn test_new_action_replaces_finished_one() {
        let mut action = PendingAction::default();
        action.begin(ActionKind::Mint).unwrap();
        action.transition(ActionStatus::Failed).unwrap();
        action.error = Some("boom".into());

        action.begin(ActionKind::Mint).unwrap();
        assert_eq!(action.status, ActionStatus::Idle);
        assert_eq!(action.error, None);
    }

    #[test]
    fn test_acknowledge_in_flight_is_rejected() {
        let mut action = PendingAction::default();
        action.begin(ActionKind::Mint).unwrap();
        action.transition(ActionStatus::Submitting).unwrap();
        assert!(action.acknowledge().is_err());
    }

    #[test]
    fn test_failure_display() {
        let failure = ActionFailure::new(
            ActionKind::Deposit,
            SiaduanError::chain("execution reverted: ERC20: insufficient allowance"),
        );
        assert_eq!(
            failure.to_string(),
            "Deposit failed: execution reverted: ERC20: insufficient allowance"
        );
    }
}
