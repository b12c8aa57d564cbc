//! Integration Tests
//!
//! Store, executor and the in-memory chain wired together, walking the
//! dashboard flows end to end.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use siaduan_chain_client::mock::{MockCall, MockChain, MockConnector, MockRead};
    use siaduan_common::*;
    use siaduan_protocol_store::{ProtocolStore, StoreConfig};

    use crate::*;

    const USER: Address = Address([0x42; 20]);
    const EXPECTED: u64 = 11_155_111;
    const ONE: u128 = 1_000_000;

    struct Harness {
        chain: MockChain,
        store: ProtocolStore<MockChain>,
        executor: Arc<ActionExecutor<MockChain>>,
    }

    async fn connected(chain_id: u64, policy: ApprovalPolicy) -> Harness {
        let chain = MockChain::new();
        chain.set_balance(USER, 1_000 * ONE);
        chain.set_rates(300, 800);
        let store = ProtocolStore::new(StoreConfig {
            expected_chain_id: EXPECTED,
            refresh_interval: Duration::from_secs(10),
        });
        store
            .connect(&MockConnector::new(chain.clone(), USER, chain_id, EXPECTED))
            .await;
        let executor = Arc::new(ActionExecutor::new(store.clone()).with_approval_policy(policy));
        Harness { chain, store, executor }
    }

    // ============================================================================
    // Deposit
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_first_deposit_approves_then_deposits() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;
        assert_eq!(h.chain.balance_reads(), 1);
        let before = h.chain.calls().len();

        let outcome = h
            .executor
            .execute(ActionRequest::Deposit { amount: 100 * ONE })
            .await
            .unwrap();

        // approval confirmed before the deposit is sent, one refresh after
        let approval = outcome.approval.as_ref().unwrap().tx_hash;
        assert_eq!(
            h.chain.calls()[before..],
            [
                MockCall::ReadAllowance { owner: USER, spender: MockChain::VAULT },
                MockCall::Approve {
                    spender: MockChain::VAULT,
                    amount: ApprovalAmount::Unlimited
                },
                MockCall::Wait(approval),
                MockCall::Deposit(100 * ONE),
                MockCall::Wait(outcome.tx_hash()),
                MockCall::ReadBalance(USER),
                MockCall::ReadShares(USER),
                MockCall::ReadSharePrice,
                MockCall::ReadAllocations,
                MockCall::ReadRates,
            ]
        );
        assert_eq!(h.chain.balance_reads(), 2);

        let types: Vec<_> = h.executor.events().iter().map(ActionEvent::event_type).collect();
        let position = |t: EventType| types.iter().position(|x| *x == t).unwrap();
        assert!(position(EventType::ApprovalConfirmed) < position(EventType::TransactionSubmitted));

        let snapshot = outcome.snapshot.unwrap();
        assert_eq!(format_units(snapshot.token_balance, 6), "900.000000");
        assert_eq!(snapshot.user_shares, 100 * ONE);
        assert_eq!(h.executor.status(ActionSlot::Vault), ActionStatus::Done);

        let statuses: Vec<_> = h
            .executor
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ActionEvent::StatusChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                ActionStatus::Approving,
                ActionStatus::Submitting,
                ActionStatus::Confirming,
                ActionStatus::Done
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deposit_with_sufficient_allowance_skips_approval() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;
        h.chain.set_allowance(USER, MockChain::VAULT, 500 * ONE);

        let outcome = h
            .executor
            .execute(ActionRequest::Deposit { amount: 100 * ONE })
            .await
            .unwrap();

        assert_eq!(h.chain.submissions(), vec![MockCall::Deposit(100 * ONE)]);
        assert_eq!(outcome.approval, None);
        assert!(!h.executor.events().iter().any(|e| e.event_type() == EventType::ApprovalSubmitted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_policy_approves_deposit_amount() {
        let h = connected(EXPECTED, ApprovalPolicy::Exact).await;

        h.executor
            .execute(ActionRequest::Deposit { amount: 25 * ONE })
            .await
            .unwrap();

        assert_eq!(
            h.chain.submissions()[0],
            MockCall::Approve {
                spender: MockChain::VAULT,
                amount: ApprovalAmount::Exact(25 * ONE)
            }
        );
        assert_eq!(h.chain.allowance_of(USER, MockChain::VAULT), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_deposit_keeps_confirmed_approval() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;
        h.chain.set_balance(USER, 50 * ONE);

        let failure = h
            .executor
            .execute(ActionRequest::Deposit { amount: 100 * ONE })
            .await
            .unwrap_err();

        assert_eq!(
            failure.to_string(),
            "Deposit failed: execution reverted: ERC20: transfer amount exceeds balance"
        );
        assert_eq!(h.chain.allowance_of(USER, MockChain::VAULT), u128::MAX);
        assert_eq!(h.executor.status(ActionSlot::Vault), ActionStatus::Failed);
        assert_eq!(h.chain.balance_reads(), 1);
    }

    // ============================================================================
    // Mint, withdraw, rates
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_mint_then_withdraw() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;

        h.executor
            .execute(ActionRequest::Mint { amount: faucet::DEFAULT_MINT_AMOUNT })
            .await
            .unwrap();
        assert_eq!(h.store.snapshot().token_balance, 2_000 * ONE);

        h.executor.acknowledge(ActionSlot::Faucet).unwrap();
        h.executor
            .execute(ActionRequest::Deposit { amount: 400 * ONE })
            .await
            .unwrap();
        assert_eq!(h.executor.max_amount(ActionKind::Withdraw).unwrap(), 400 * ONE);

        let outcome = h
            .executor
            .execute(ActionRequest::Withdraw { shares: 150 * ONE })
            .await
            .unwrap();
        let snapshot = outcome.snapshot.unwrap();
        assert_eq!(snapshot.user_shares, 250 * ONE);
        assert_eq!(snapshot.token_balance, 1_750 * ONE);
        assert_eq!(h.executor.status(ActionSlot::Faucet), ActionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_rates_passes_integers_through() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;

        let outcome = h
            .executor
            .execute(ActionRequest::ReportRates { rate_a: 300, rate_b: 1800 })
            .await
            .unwrap();

        assert_eq!(
            h.chain.submissions(),
            vec![MockCall::ReportRates { rate_a: 300, rate_b: 1800 }]
        );
        assert_eq!(outcome.snapshot.unwrap().rates, PoolRates { rate_a: 300, rate_b: 1800 });
    }

    // ============================================================================
    // Failures
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_rejected_mint_fails_without_refresh() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;
        h.chain.reject_submissions(true);

        let failure = h
            .executor
            .execute(ActionRequest::Mint { amount: ONE })
            .await
            .unwrap_err();

        assert_eq!(failure.kind, ActionKind::Mint);
        assert_eq!(failure.code(), "E011_USER_REJECTED");
        assert_eq!(h.chain.balance_reads(), 1);
        let pending = h.executor.pending(ActionSlot::Faucet);
        assert_eq!(pending.status, ActionStatus::Failed);
        assert!(pending.error.is_some());
        assert!(h.executor.events().iter().any(|e| e.event_type() == EventType::ActionFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_amount_leaves_slot_idle() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;

        for request in [
            ActionRequest::Mint { amount: 0 },
            ActionRequest::Deposit { amount: 0 },
            ActionRequest::Withdraw { shares: 0 },
        ] {
            let failure = h.executor.execute(request).await.unwrap_err();
            assert_eq!(failure.code(), "E030_INVALID_AMOUNT");
            assert_eq!(h.executor.status(request.slot()), ActionStatus::Idle);
        }
        assert!(h.chain.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_action_on_busy_slot_is_refused() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;
        h.chain.set_allowance(USER, MockChain::VAULT, u128::MAX);
        h.chain.set_confirmation_delay(Some(Duration::from_secs(5)));

        let first = tokio::spawn({
            let executor = h.executor.clone();
            async move { executor.execute(ActionRequest::Deposit { amount: ONE }).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.executor.status(ActionSlot::Vault), ActionStatus::Confirming);

        let failure = h
            .executor
            .execute(ActionRequest::Withdraw { shares: ONE })
            .await
            .unwrap_err();
        assert_eq!(
            failure.error,
            SiaduanError::SlotBusy {
                slot: ActionSlot::Vault,
                status: ActionStatus::Confirming
            }
        );

        // other slots stay available
        h.executor
            .execute(ActionRequest::ReportRates { rate_a: 100, rate_b: 200 })
            .await
            .unwrap();

        first.await.unwrap().unwrap();
        assert_eq!(h.executor.status(ActionSlot::Vault), ActionStatus::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_action_frees_its_slot() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;
        h.chain.set_confirmation_delay(Some(Duration::from_secs(5)));

        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            h.executor.execute(ActionRequest::Mint { amount: ONE }),
        )
        .await;
        assert!(abandoned.is_err());

        let pending = h.executor.pending(ActionSlot::Faucet);
        assert_eq!(pending.status, ActionStatus::Failed);
        assert!(!pending.is_busy());
        assert_eq!(pending.error.as_deref(), Some("cancelled before completion"));
        assert!(pending.tx_hash.is_some());
        assert_eq!(h.chain.balance_reads(), 1);

        h.executor.acknowledge(ActionSlot::Faucet).unwrap();
        h.executor
            .execute(ActionRequest::Mint { amount: ONE })
            .await
            .unwrap();
        assert_eq!(h.executor.status(ActionSlot::Faucet), ActionStatus::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_network_cannot_submit() {
        let h = connected(1, ApprovalPolicy::Unlimited).await;

        let failure = h
            .executor
            .execute(ActionRequest::Mint { amount: ONE })
            .await
            .unwrap_err();

        assert_eq!(failure.code(), "E010_SIGNING_UNAVAILABLE");
        assert_eq!(h.executor.status(ActionSlot::Faucet), ActionStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_executor_reports_connection_error() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;
        h.store.disconnect();

        let failure = h
            .executor
            .execute(ActionRequest::Mint { amount: ONE })
            .await
            .unwrap_err();

        assert_eq!(failure.code(), "E001_NOT_CONNECTED");
        assert_eq!(h.executor.status(ActionSlot::Faucet), ActionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_post_action_refresh_still_done() {
        let h = connected(EXPECTED, ApprovalPolicy::Unlimited).await;
        let before = h.store.snapshot();
        h.chain.fail_read(MockRead::Rates);

        let outcome = h
            .executor
            .execute(ActionRequest::Mint { amount: ONE })
            .await
            .unwrap();

        assert_eq!(outcome.snapshot, None);
        assert_eq!(h.executor.status(ActionSlot::Faucet), ActionStatus::Done);
        assert_eq!(h.store.snapshot(), before);
    }
}
