//! Action workflows

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use siaduan_chain_client::ProtocolChain;
use siaduan_common::{
    ActionEvent, ActionKind, ActionRequest, ActionSlot, ActionStatus, ApprovalPolicy, EventLog,
    SiaduanError, SiaduanResult, TxHash, TxReceipt,
};
use siaduan_protocol_store::ProtocolStore;

use crate::action::{ActionFailure, ActionOutcome, PendingAction};

/// What `run` hands back on success
struct Completed {
    receipt: TxReceipt,
    approval: Option<TxReceipt>,
}

/// Runs user actions against the session held by a [`ProtocolStore`]
pub struct ActionExecutor<C> {
    store: ProtocolStore<C>,
    approval: ApprovalPolicy,
    slots: Mutex<HashMap<ActionSlot, PendingAction>>,
    events: Mutex<EventLog>,
}

impl<C: ProtocolChain> ActionExecutor<C> {
    pub fn new(store: ProtocolStore<C>) -> Self {
        Self {
            store,
            approval: ApprovalPolicy::default(),
            slots: Mutex::new(HashMap::new()),
            events: Mutex::new(EventLog::new()),
        }
    }

    /// How much to approve when a deposit finds the allowance short
    pub fn with_approval_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.approval = policy;
        self
    }

    pub fn approval_policy(&self) -> ApprovalPolicy {
        self.approval
    }

    pub fn store(&self) -> &ProtocolStore<C> {
        &self.store
    }

    // ============ Queries ============

    pub fn status(&self, slot: ActionSlot) -> ActionStatus {
        self.pending(slot).status
    }

    /// Full state of `slot`
    pub fn pending(&self, slot: ActionSlot) -> PendingAction {
        self.slots.lock().get(&slot).cloned().unwrap_or_default()
    }

    /// Reset a finished slot to idle
    pub fn acknowledge(&self, slot: ActionSlot) -> SiaduanResult<()> {
        self.slots.lock().entry(slot).or_default().acknowledge()
    }

    /// Most recent executor steps, oldest first
    pub fn events(&self) -> Vec<ActionEvent> {
        self.events.lock().events().to_vec()
    }

    /// "Max" helper: wallet balance for deposits, share balance for
    /// withdrawals, from the current snapshot
    pub fn max_amount(&self, kind: ActionKind) -> SiaduanResult<u128> {
        let snapshot = self.store.snapshot();
        match kind {
            ActionKind::Deposit => Ok(snapshot.token_balance),
            ActionKind::Withdraw => Ok(snapshot.user_shares),
            ActionKind::Mint | ActionKind::ReportRates => Err(SiaduanError::InvalidInput {
                param: "kind",
                reason: "only deposit and withdraw have a maximum",
            }),
        }
    }

    // ============ Execution ============

    /// Run `request` to completion
    ///
    /// Input and connection problems are reported without touching the
    /// slot. Once the slot is claimed, any failing step ends the action in
    /// `failed`; transactions already confirmed are not undone.
    pub async fn execute(&self, request: ActionRequest) -> Result<ActionOutcome, ActionFailure> {
        let kind = request.kind();
        let slot = kind.slot();
        let reject = |error| ActionFailure::new(kind, error);

        validate(&request).map_err(reject)?;
        let client = self
            .store
            .client()
            .ok_or(SiaduanError::Connection {
                reason: "wallet not connected",
            })
            .map_err(reject)?;
        self.claim(slot, kind).map_err(reject)?;
        let _guard = SlotGuard { executor: self, slot, kind };

        let completed = match self.run(client.as_ref(), request).await {
            Ok(completed) => completed,
            Err(error) => return Err(self.fail(slot, kind, error)),
        };
        if let Err(error) = self.transition(slot, ActionStatus::Done) {
            return Err(self.fail(slot, kind, error));
        }
        info!(%kind, tx_hash = %completed.receipt.tx_hash, block = completed.receipt.block_number, "action confirmed");

        self.emit(ActionEvent::RefreshRequested { kind });
        let snapshot = self.store.refresh().await.then(|| self.store.snapshot());

        Ok(ActionOutcome {
            kind,
            receipt: completed.receipt,
            approval: completed.approval,
            snapshot,
        })
    }

    async fn run(&self, client: &C, request: ActionRequest) -> SiaduanResult<Completed> {
        let kind = request.kind();
        let slot = kind.slot();
        let mut approval = None;

        let tx_hash = match request {
            ActionRequest::Mint { amount } => {
                self.transition(slot, ActionStatus::Submitting)?;
                client.submit_mint(amount).await?
            }
            ActionRequest::Deposit { amount } => {
                approval = self.ensure_allowance(client, slot, amount).await?;
                self.transition(slot, ActionStatus::Submitting)?;
                client.submit_deposit(amount).await?
            }
            ActionRequest::Withdraw { shares } => {
                self.transition(slot, ActionStatus::Submitting)?;
                client.submit_withdraw(shares).await?
            }
            ActionRequest::ReportRates { rate_a, rate_b } => {
                self.transition(slot, ActionStatus::Submitting)?;
                client.submit_report_rates(rate_a, rate_b).await?
            }
        };
        self.record_tx(slot, tx_hash);
        self.emit(ActionEvent::TransactionSubmitted { kind, tx_hash });
        debug!(%kind, %tx_hash, "transaction submitted");

        self.transition(slot, ActionStatus::Confirming)?;
        let receipt = client.wait_for_confirmation(tx_hash).await?;
        self.emit(ActionEvent::TransactionConfirmed {
            kind,
            tx_hash,
            block_number: receipt.block_number,
        });

        Ok(Completed { receipt, approval })
    }

    /// Approve the vault if the allowance does not cover `amount`; the
    /// allowance is not re-read afterwards
    async fn ensure_allowance(
        &self,
        client: &C,
        slot: ActionSlot,
        amount: u128,
    ) -> SiaduanResult<Option<TxReceipt>> {
        let owner = client.signer().ok_or_else(|| SiaduanError::Signing {
            reason: "no signing identity bound".into(),
        })?;
        let spender = client.vault();
        let allowance = client.read_allowance(owner, spender).await?;
        self.emit(ActionEvent::AllowanceChecked {
            allowance,
            required: amount,
        });
        if allowance >= amount {
            return Ok(None);
        }

        self.transition(slot, ActionStatus::Approving)?;
        let approve = self.approval.allowance_for(amount);
        let tx_hash = client.submit_approve(spender, approve).await?;
        self.emit(ActionEvent::ApprovalSubmitted {
            tx_hash,
            amount: approve,
        });
        debug!(%tx_hash, ?approve, "approval submitted");

        let receipt = client.wait_for_confirmation(tx_hash).await?;
        self.emit(ActionEvent::ApprovalConfirmed {
            tx_hash,
            block_number: receipt.block_number,
        });
        Ok(Some(receipt))
    }

    // ============ Slot bookkeeping ============

    fn claim(&self, slot: ActionSlot, kind: ActionKind) -> SiaduanResult<()> {
        self.slots.lock().entry(slot).or_default().begin(kind)
    }

    fn transition(&self, slot: ActionSlot, to: ActionStatus) -> SiaduanResult<()> {
        let from = self.slots.lock().entry(slot).or_default().transition(to)?;
        self.emit(ActionEvent::StatusChanged { slot, from, to });
        Ok(())
    }

    fn record_tx(&self, slot: ActionSlot, tx_hash: TxHash) {
        self.slots.lock().entry(slot).or_default().tx_hash = Some(tx_hash);
    }

    fn fail(&self, slot: ActionSlot, kind: ActionKind, error: SiaduanError) -> ActionFailure {
        let from = self
            .slots
            .lock()
            .entry(slot)
            .or_default()
            .fail(error.to_string());
        if from != ActionStatus::Failed {
            self.emit(ActionEvent::StatusChanged {
                slot,
                from,
                to: ActionStatus::Failed,
            });
        }
        self.emit(ActionEvent::ActionFailed {
            kind,
            code: error.code(),
            message: error.to_string(),
        });
        warn!(%kind, code = error.code(), error = %error, "action failed");
        ActionFailure::new(kind, error)
    }

    fn emit(&self, event: ActionEvent) {
        self.events.lock().emit(event);
    }
}

/// Ends a claimed slot in `failed` when `execute` is dropped mid-flight
///
/// Transactions already sent are not tracked further.
struct SlotGuard<'a, C: ProtocolChain> {
    executor: &'a ActionExecutor<C>,
    slot: ActionSlot,
    kind: ActionKind,
}

impl<C: ProtocolChain> Drop for SlotGuard<'_, C> {
    fn drop(&mut self) {
        let busy = self
            .executor
            .slots
            .lock()
            .get(&self.slot)
            .is_some_and(PendingAction::is_busy);
        if busy {
            self.executor.fail(self.slot, self.kind, SiaduanError::Cancelled);
        }
    }
}

/// Amounts must be positive; rates pass through untouched
fn validate(request: &ActionRequest) -> SiaduanResult<()> {
    let amount = match *request {
        ActionRequest::Mint { amount } | ActionRequest::Deposit { amount } => amount,
        ActionRequest::Withdraw { shares } => shares,
        ActionRequest::ReportRates { .. } => return Ok(()),
    };
    if amount == 0 {
        return Err(SiaduanError::InvalidAmount {
            reason: "amount must be greater than zero",
        });
    }
    Ok(())
}
