//! Transfer Engine
//!
//! Drives one transfer request through the FSM in [`super::state`]:
//!
//! 1. validate the raw parameters (no store access on failure)
//! 2. open a session and lock both rows in ascending id order
//! 3. map the locked rows to `from` / `to` by id
//! 4. apply the source account's overdraft policy
//! 5. convert the amount into the destination currency (half-up, 2 digits)
//! 6. build the invoice (source-currency amount)
//! 7. commit both balances and the invoice atomically
//!
//! Every exit before step 7 releases the locks without writing anything.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::error::TransferError;
use super::state::TransferState;
use super::store::{AccountPair, AccountStore, TransferCommit, TransferSession};
use crate::account::{Account, Invoice, NewInvoice, TransferRequest, ValidationError};
use crate::core_types::AccountId;
use crate::exchange::{ExchangeError, ExchangeTable};
use crate::money::Money;

/// Result of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Persisted invoice (amount in the source currency)
    pub invoice: Invoice,
    /// Amount credited to the destination, in its currency
    pub credited: Money,
}

/// Balances computed while both locks are held
#[derive(Debug)]
struct TransferPlan {
    commit: TransferCommit,
    credited: Money,
}

/// Tracks and logs the state of one in-flight transfer
struct TransferFsm {
    state: TransferState,
    from: AccountId,
    to: AccountId,
}

impl TransferFsm {
    fn new(request: &TransferRequest) -> Self {
        Self {
            state: TransferState::Validated,
            from: request.from(),
            to: request.to(),
        }
    }

    fn advance(&mut self, next: TransferState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(
            from = self.from,
            to = self.to,
            "Transfer state {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}

/// Orchestrates validation, locking, overdraft policy, conversion and commit
pub struct TransferEngine {
    store: Arc<dyn AccountStore>,
    exchange: ExchangeTable,
}

impl TransferEngine {
    /// Create an engine; the exchange table is validated here so a bad
    /// table fails at startup instead of on the first request.
    pub fn new(store: Arc<dyn AccountStore>, exchange: ExchangeTable) -> Result<Self, ExchangeError> {
        exchange.validate()?;
        Ok(Self { store, exchange })
    }

    pub fn exchange(&self) -> &ExchangeTable {
        &self.exchange
    }

    /// Transfer using raw textual parameters
    pub async fn transfer(
        &self,
        account_id_from: &str,
        account_id_to: &str,
        amount: &str,
    ) -> Result<TransferReceipt, TransferError> {
        let request = TransferRequest::parse(account_id_from, account_id_to, amount)?;
        self.execute(request).await
    }

    /// Transfer using an already validated request
    pub async fn execute(&self, request: TransferRequest) -> Result<TransferReceipt, TransferError> {
        let pair = AccountPair::new(request.from(), request.to())
            .ok_or(TransferError::InvalidArgument(ValidationError::SameAccount))?;
        let mut fsm = TransferFsm::new(&request);

        let mut session = match self.store.begin().await {
            Ok(session) => session,
            Err(e) => {
                fsm.advance(TransferState::Aborted);
                let err = TransferError::from(e);
                log_abort(&request, &err);
                return Err(err);
            }
        };

        let rows = match session.lock_and_fetch(pair).await {
            Ok(rows) => rows,
            Err(e) => return Err(abort(session, &mut fsm, &request, e.into()).await),
        };
        fsm.advance(TransferState::Locked);

        let Some((account_from, account_to)) = match_rows(&rows, &request) else {
            debug!(found = rows.len(), "Locked fewer than two accounts");
            return Err(reject(session, &mut fsm, &request, TransferError::AccountsNotFound).await);
        };

        let plan = match self.compute(account_from, account_to, request.amount()) {
            Ok(plan) => plan,
            Err(e) if e.is_rejection() => return Err(reject(session, &mut fsm, &request, e).await),
            Err(e) => return Err(abort(session, &mut fsm, &request, e).await),
        };
        fsm.advance(TransferState::Computed);

        match session.commit_transfer(plan.commit).await {
            Ok(invoice) => {
                fsm.advance(TransferState::Committed);
                info!(
                    invoice_id = invoice.id,
                    from = request.from(),
                    to = request.to(),
                    amount = %request.amount(),
                    credited = %plan.credited,
                    "Transfer committed"
                );
                Ok(TransferReceipt {
                    invoice,
                    credited: plan.credited,
                })
            }
            Err(e) => {
                // The session is consumed; the store has already rolled back
                fsm.advance(TransferState::Aborted);
                let err = TransferError::from(e);
                log_abort(&request, &err);
                Err(err)
            }
        }
    }

    /// Steps 4-6: overdraft check, conversion, invoice
    fn compute(
        &self,
        from: &Account,
        to: &Account,
        amount: Money,
    ) -> Result<TransferPlan, TransferError> {
        let new_balance_from = from
            .balance
            .checked_sub(amount)
            .ok_or_else(|| TransferError::Internal("source balance overflow".into()))?;
        if !from.allows_balance(new_balance_from) {
            return Err(TransferError::InsufficientFunds);
        }

        // Direction comes from the stored rows only
        let credited = self
            .exchange
            .convert(amount, from.currency, to.currency)
            .ok_or_else(|| TransferError::Internal("conversion overflow".into()))?;
        let new_balance_to = to
            .balance
            .checked_add(credited)
            .ok_or_else(|| TransferError::Internal("destination balance overflow".into()))?;

        Ok(TransferPlan {
            commit: TransferCommit {
                account_from: from.id,
                new_balance_from,
                account_to: to.id,
                new_balance_to,
                invoice: NewInvoice {
                    account_id_from: from.id,
                    account_id_to: to.id,
                    amount,
                    transfer_status: true,
                },
            },
            credited,
        })
    }
}

/// Pick `from` and `to` out of the locked rows by id, ignoring row order
fn match_rows<'a>(rows: &'a [Account], request: &TransferRequest) -> Option<(&'a Account, &'a Account)> {
    let from = rows.iter().find(|a| a.id == request.from())?;
    let to = rows.iter().find(|a| a.id == request.to())?;
    Some((from, to))
}

/// Business rejection: release locks, write nothing
async fn reject(
    session: Box<dyn TransferSession>,
    fsm: &mut TransferFsm,
    request: &TransferRequest,
    err: TransferError,
) -> TransferError {
    if let Err(e) = session.rollback().await {
        warn!(error = %e, "Rollback after rejection failed");
    }
    fsm.advance(TransferState::Rejected);
    info!(
        from = request.from(),
        to = request.to(),
        amount = %request.amount(),
        reason = %err,
        "Transfer rejected"
    );
    err
}

/// Infrastructure failure: release locks, surface the error
async fn abort(
    session: Box<dyn TransferSession>,
    fsm: &mut TransferFsm,
    request: &TransferRequest,
    err: TransferError,
) -> TransferError {
    if let Err(e) = session.rollback().await {
        warn!(error = %e, "Rollback after abort failed");
    }
    fsm.advance(TransferState::Aborted);
    log_abort(request, &err);
    err
}

fn log_abort(request: &TransferRequest, err: &TransferError) {
    if err.is_retryable() {
        warn!(
            from = request.from(),
            to = request.to(),
            error = %err,
            "Transfer aborted, retryable"
        );
    } else {
        error!(
            from = request.from(),
            to = request.to(),
            code = err.code(),
            error = %err,
            "Transfer aborted"
        );
    }
}
