//! Integration Tests for the Transfer Engine
//!
//! Full engine runs against [`MemoryAccountStore`], no database needed.
//! The PostgreSQL variants live in `pg_store.rs` and are `#[ignore]`d.

#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use crate::account::{TransferRequest, ValidationError};
    use crate::core_types::{AccountId, Currency};
    use crate::exchange::ExchangeTable;
    use crate::money::{Money, MoneyError};
    use crate::transfer::engine::TransferEngine;
    use crate::transfer::error::TransferError;
    use crate::transfer::mock::MemoryAccountStore;

    /// Store with the three sample accounts (ids 1, 2, 3)
    struct TestHarness {
        engine: Arc<TransferEngine>,
        store: MemoryAccountStore,
    }

    impl TestHarness {
        fn new() -> Self {
            Self::with_store(MemoryAccountStore::new())
        }

        fn with_store(store: MemoryAccountStore) -> Self {
            let engine = TransferEngine::new(Arc::new(store.clone()), ExchangeTable::standard())
                .expect("standard table is valid");
            Self {
                engine: Arc::new(engine),
                store,
            }
        }

        fn sample() -> (Self, AccountId, AccountId, AccountId) {
            let harness = Self::new();
            let usd = harness.store.add_account(Currency::Usd, true, "10.05");
            let eur = harness.store.add_account(Currency::Eur, false, "10000.05");
            let rub = harness.store.add_account(Currency::Rub, false, "100000.05");
            (harness, usd, eur, rub)
        }

        async fn balance(&self, id: AccountId) -> String {
            self.store.balance_of(id).await.to_string()
        }
    }

    // ========================================================================
    // Scenarios
    // ========================================================================

    #[tokio::test]
    async fn test_eur_to_usd_transfer_converts_and_commits() {
        let (h, usd, eur, _) = TestHarness::sample();

        let receipt = h
            .engine
            .transfer(&eur.to_string(), &usd.to_string(), "10.05")
            .await
            .unwrap();

        assert_eq!(h.balance(eur).await, "9990.00");
        // 10.05 + round(10.05 * 1.24) = 10.05 + 12.46
        assert_eq!(h.balance(usd).await, "22.51");
        assert_eq!(receipt.credited.to_string(), "12.46");

        let invoices = h.store.invoices();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0], receipt.invoice);
        assert_eq!(invoices[0].account_id_from, eur);
        assert_eq!(invoices[0].account_id_to, usd);
        assert_eq!(invoices[0].amount.to_string(), "10.05");
        assert!(invoices[0].transfer_status);
    }

    #[tokio::test]
    async fn test_zero_amount_is_invalid_argument() {
        let (h, usd, eur, _) = TestHarness::sample();

        let result = h.engine.transfer(&eur.to_string(), &usd.to_string(), "0").await;
        assert_eq!(
            result.unwrap_err(),
            TransferError::InvalidArgument(ValidationError::ZeroAmount)
        );
        assert!(h.store.lock_log().is_empty(), "validation must not touch the store");
    }

    #[tokio::test]
    async fn test_missing_account_is_rejected() {
        let (h, _, eur, _) = TestHarness::sample();

        let result = h.engine.transfer("999999", &eur.to_string(), "1.00").await;
        assert_eq!(result.unwrap_err(), TransferError::AccountsNotFound);
        assert_eq!(h.balance(eur).await, "10000.05");
        assert!(h.store.invoices().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balances_unchanged() {
        let h = TestHarness::new();
        let poor = h.store.add_account(Currency::Eur, false, "5.00");
        let other = h.store.add_account(Currency::Usd, false, "0");

        let result = h
            .engine
            .transfer(&poor.to_string(), &other.to_string(), "100.00")
            .await;
        assert_eq!(result.unwrap_err(), TransferError::InsufficientFunds);
        assert_eq!(h.balance(poor).await, "5.00");
        assert_eq!(h.balance(other).await, "0.00");
        assert!(h.store.invoices().is_empty());
    }

    #[tokio::test]
    async fn test_same_account_is_invalid_argument() {
        let (h, usd, _, _) = TestHarness::sample();

        let result = h.engine.transfer(&usd.to_string(), &usd.to_string(), "1").await;
        assert_eq!(
            result.unwrap_err(),
            TransferError::InvalidArgument(ValidationError::SameAccount)
        );
        assert!(h.store.lock_log().is_empty());
    }

    // ========================================================================
    // Overdraft policy
    // ========================================================================

    #[tokio::test]
    async fn test_overdraft_account_may_go_negative() {
        let (h, usd, eur, _) = TestHarness::sample();

        h.engine
            .transfer(&usd.to_string(), &eur.to_string(), "20.00")
            .await
            .unwrap();

        assert_eq!(h.balance(usd).await, "-9.95");
        // 20.00 / 1.24 = 16.129... -> 16.13
        assert_eq!(h.balance(eur).await, "10016.18");
    }

    #[tokio::test]
    async fn test_exact_balance_can_be_drained() {
        let h = TestHarness::new();
        let from = h.store.add_account(Currency::Rub, false, "5.00");
        let to = h.store.add_account(Currency::Rub, false, "0");

        h.engine
            .transfer(&from.to_string(), &to.to_string(), "5.00")
            .await
            .unwrap();
        assert_eq!(h.balance(from).await, "0.00");
        assert_eq!(h.balance(to).await, "5.00");
    }

    #[tokio::test]
    async fn test_destination_overdraft_flag_is_irrelevant() {
        let h = TestHarness::new();
        let from = h.store.add_account(Currency::Eur, false, "1.00");
        let to = h.store.add_account(Currency::Eur, true, "-50.00");

        let result = h.engine.transfer(&from.to_string(), &to.to_string(), "2.00").await;
        assert_eq!(result.unwrap_err(), TransferError::InsufficientFunds);

        h.engine
            .transfer(&from.to_string(), &to.to_string(), "1.00")
            .await
            .unwrap();
        assert_eq!(h.balance(to).await, "-49.00");
    }

    // ========================================================================
    // Validation before locking
    // ========================================================================

    #[tokio::test]
    async fn test_malformed_input_never_reaches_store() {
        let (h, usd, eur, _) = TestHarness::sample();
        let from = eur.to_string();
        let to = usd.to_string();

        let cases = [
            ("abc", to.as_str(), "1"),
            (from.as_str(), "", "1"),
            (from.as_str(), to.as_str(), "1.005"),
            (from.as_str(), to.as_str(), "-1"),
            (from.as_str(), to.as_str(), "1.2.3"),
        ];
        for (f, t, amount) in cases {
            let err = h.engine.transfer(f, t, amount).await.unwrap_err();
            assert_eq!(err.http_status(), 400, "{} {} {}", f, t, amount);
        }
        assert!(h.store.lock_log().is_empty());
    }

    #[tokio::test]
    async fn test_amount_beyond_column_precision_is_invalid_argument() {
        let (h, usd, eur, _) = TestHarness::sample();
        // Overdraft source, so only validation can stop it
        let result = h
            .engine
            .transfer(&usd.to_string(), &eur.to_string(), "1000000000000000000")
            .await;
        assert_eq!(
            result.unwrap_err(),
            TransferError::InvalidArgument(ValidationError::InvalidAmount(MoneyError::Overflow))
        );
        assert!(h.store.lock_log().is_empty());
        assert_eq!(h.balance(usd).await, "10.05");
    }

    #[tokio::test]
    async fn test_non_positive_request_cannot_reach_execute() {
        let (h, usd, eur, _) = TestHarness::sample();
        let negative = Money::from_decimal_exact(Decimal::from(-100)).unwrap();
        assert_eq!(
            TransferRequest::new(eur, usd, negative),
            Err(ValidationError::ZeroAmount)
        );

        let request = TransferRequest::new(eur, usd, Money::parse(".5").unwrap()).unwrap();
        let receipt = h.engine.execute(request).await.unwrap();
        assert_eq!(receipt.invoice.amount.to_string(), "0.50");
        assert_eq!(h.balance(eur).await, "9999.55");
    }

    #[tokio::test]
    async fn test_extra_precision_is_not_truncated() {
        let (h, usd, eur, _) = TestHarness::sample();
        let result = h.engine.transfer(&eur.to_string(), &usd.to_string(), "1.999").await;
        assert_eq!(
            result.unwrap_err(),
            TransferError::InvalidArgument(ValidationError::InvalidAmount(
                MoneyError::PrecisionOverflow { provided: 3, max: 2 }
            ))
        );
    }

    // ========================================================================
    // Locking discipline
    // ========================================================================

    #[tokio::test]
    async fn test_locks_taken_in_ascending_id_order() {
        let (h, usd, eur, _) = TestHarness::sample();
        assert!(usd < eur);

        h.engine
            .transfer(&eur.to_string(), &usd.to_string(), "1.00")
            .await
            .unwrap();
        h.engine
            .transfer(&usd.to_string(), &eur.to_string(), "1.00")
            .await
            .unwrap();

        assert_eq!(h.store.lock_log(), vec![usd, eur, usd, eur]);
    }

    #[tokio::test]
    async fn test_rows_are_mapped_by_id_when_store_reorders() {
        let (h, usd, eur, _) = TestHarness::sample();
        h.store.set_reverse_fetch_order(true);

        h.engine
            .transfer(&usd.to_string(), &eur.to_string(), "1.24")
            .await
            .unwrap();

        assert_eq!(h.balance(usd).await, "8.81");
        assert_eq!(h.balance(eur).await, "10001.05");
    }

    #[tokio::test]
    async fn test_lock_timeout_is_retryable_conflict() {
        let h = TestHarness::with_store(MemoryAccountStore::with_lock_timeout(
            Duration::from_millis(50),
        ));
        let a = h.store.add_account(Currency::Usd, false, "100.00");
        let b = h.store.add_account(Currency::Usd, false, "100.00");

        let guard = h.store.hold_lock(b).await;
        let err = h
            .engine
            .transfer(&a.to_string(), &b.to_string(), "1")
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Conflict(_)));
        assert!(err.is_retryable());
        drop(guard);

        // The partial lock on `a` was released with the session
        assert_eq!(h.balance(a).await, "100.00");
        h.engine
            .transfer(&a.to_string(), &b.to_string(), "1")
            .await
            .unwrap();
        assert_eq!(h.balance(b).await, "101.00");
    }

    // ========================================================================
    // Atomicity
    // ========================================================================

    #[tokio::test]
    async fn test_commit_failure_writes_nothing() {
        let (h, usd, eur, _) = TestHarness::sample();
        h.store.set_fail_commit(true);

        let err = h
            .engine
            .transfer(&eur.to_string(), &usd.to_string(), "10.05")
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Internal(_)));
        assert_eq!(err.public_reason(), "internal server error");

        assert_eq!(h.balance(eur).await, "10000.05");
        assert_eq!(h.balance(usd).await, "10.05");
        assert!(h.store.invoices().is_empty());

        // Locks are free again
        h.store.set_fail_commit(false);
        h.engine
            .transfer(&eur.to_string(), &usd.to_string(), "10.05")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_transfer_releases_locks() {
        let h = TestHarness::with_store(MemoryAccountStore::with_lock_timeout(
            Duration::from_secs(5),
        ));
        let a = h.store.add_account(Currency::Eur, false, "10.00");
        let b = h.store.add_account(Currency::Eur, false, "10.00");

        // Block on `b` so the transfer is parked holding `a`, then drop it
        let guard = h.store.hold_lock(b).await;
        let engine = h.engine.clone();
        let (from, to) = (a.to_string(), b.to_string());
        let pending = tokio::spawn(async move { engine.transfer(&from, &to, "1").await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        pending.abort();
        let _ = pending.await;
        drop(guard);

        let _a_lock = tokio::time::timeout(Duration::from_millis(100), h.store.hold_lock(a))
            .await
            .expect("lock on a must be released");
        assert_eq!(h.store.invoices().len(), 0);
    }

    // ========================================================================
    // Concurrency
    // ========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_direction_transfers_do_not_deadlock() {
        let h = TestHarness::with_store(MemoryAccountStore::with_lock_timeout(
            Duration::from_secs(5),
        ));
        let a = h.store.add_account(Currency::Rub, false, "1000.00");
        let b = h.store.add_account(Currency::Rub, false, "1000.00");

        let mut handles = Vec::new();
        for i in 0..50 {
            let engine = h.engine.clone();
            let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
            handles.push(tokio::spawn(async move {
                engine
                    .transfer(&from.to_string(), &to.to_string(), "1.00")
                    .await
            }));
        }

        let all = futures_join(handles);
        let results = tokio::time::timeout(Duration::from_secs(10), all)
            .await
            .expect("transfers must not deadlock");
        assert!(results.iter().all(|r| r.is_ok()));

        assert_eq!(h.balance(a).await, "1000.00");
        assert_eq!(h.balance(b).await, "1000.00");
        assert_eq!(h.store.invoices().len(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_never_overdraw() {
        let h = TestHarness::with_store(MemoryAccountStore::with_lock_timeout(
            Duration::from_secs(5),
        ));
        let source = h.store.add_account(Currency::Usd, false, "10.00");
        let sinks: Vec<AccountId> = (0..4)
            .map(|_| h.store.add_account(Currency::Usd, false, "0"))
            .collect();

        let mut handles = Vec::new();
        for i in 0..20 {
            let engine = h.engine.clone();
            let to = sinks[i % sinks.len()];
            handles.push(tokio::spawn(async move {
                engine
                    .transfer(&source.to_string(), &to.to_string(), "1.00")
                    .await
            }));
        }
        let results = futures_join(handles).await;

        let committed = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(TransferError::InsufficientFunds)))
            .count();
        assert_eq!(committed, 10);
        assert_eq!(rejected, 10);
        assert_eq!(h.balance(source).await, "0.00");
        assert_eq!(h.store.invoices().len(), 10);
    }

    async fn futures_join<T: Send + 'static>(
        handles: Vec<tokio::task::JoinHandle<T>>,
    ) -> Vec<T> {
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.await.expect("task panicked"));
        }
        out
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Sum of all balances expressed in EUR
    async fn total_in_eur(store: &MemoryAccountStore, table: &ExchangeTable) -> Decimal {
        store
            .accounts()
            .await
            .iter()
            .map(|a| a.balance.inner() * table.rate(a.currency, Currency::Eur))
            .sum()
    }

    fn currency_strategy() -> impl Strategy<Value = Currency> {
        prop_oneof![Just(Currency::Usd), Just(Currency::Eur), Just(Currency::Rub)]
    }

    fn run<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
            .block_on(future)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_value_is_conserved_up_to_rounding(
            currencies in prop::collection::vec((currency_strategy(), any::<bool>()), 2..5),
            transfers in prop::collection::vec((0usize..5, 0usize..5, 1u32..500_000), 1..40),
        ) {
            run(async {
                let h = TestHarness::new();
                let ids: Vec<AccountId> = currencies
                    .iter()
                    .map(|(c, overdraft)| h.store.add_account(*c, *overdraft, "1000.00"))
                    .collect();
                let table = ExchangeTable::standard();
                let before = total_in_eur(&h.store, &table).await;

                let mut committed = 0u32;
                for (from, to, cents) in &transfers {
                    let from = ids[from % ids.len()];
                    let to = ids[to % ids.len()];
                    let amount = Money::from_decimal_rounded(Decimal::new(*cents as i64, 2));
                    if h.engine.transfer(&from.to_string(), &to.to_string(), &amount.to_string()).await.is_ok() {
                        committed += 1;
                    }
                }

                let after = total_in_eur(&h.store, &table).await;
                let bound = Decimal::new(committed as i64, 2);
                prop_assert!(
                    (after - before).abs() <= bound,
                    "drift {} exceeds {} after {} transfers", after - before, bound, committed
                );
                prop_assert_eq!(h.store.invoices().len(), committed as usize);
                Ok(())
            })?;
        }

        #[test]
        fn prop_non_overdraft_balance_never_negative(
            transfers in prop::collection::vec((0usize..3, 0usize..3, 1u32..2_000_000), 1..40),
        ) {
            run(async {
                let (h, usd, eur, rub) = TestHarness::sample();
                let ids = [usd, eur, rub];
                for (from, to, cents) in &transfers {
                    let amount = Money::from_decimal_rounded(Decimal::new(*cents as i64, 2));
                    let _ = h
                        .engine
                        .transfer(&ids[*from].to_string(), &ids[*to].to_string(), &amount.to_string())
                        .await;
                }
                for account in h.store.accounts().await {
                    if !account.overdraft {
                        prop_assert!(!account.balance.is_negative(), "{:?}", account);
                    }
                }
                Ok(())
            })?;
        }
    }
}
