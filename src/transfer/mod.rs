//! Fund Transfer Engine
//!
//! Moves money between two accounts in one atomic unit: lock both rows,
//! check the source overdraft policy, convert into the destination
//! currency, write both balances and the invoice, release the locks.
//!
//! # State Machine
//!
//! ```text
//! VALIDATED → LOCKED → COMPUTED → COMMITTED
//!     ↓          ↓         ↓
//!  REJECTED   REJECTED  ABORTED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Validate before lock**: malformed input never reaches the store
//! 2. **Ascending lock order**: every transfer locks the lower account id first
//! 3. **Map by id**: locked rows are matched to `from` / `to` by id, never by position
//! 4. **All or nothing**: both balances and the invoice commit together, or nothing does
//! 5. **Drop = rollback**: a cancelled request releases its locks

pub mod engine;
pub mod error;
pub mod pg_store;
pub mod state;
pub mod store;

#[cfg(test)]
pub mod mock;

mod integration_tests;

// Re-exports for convenience
pub use engine::{TransferEngine, TransferReceipt};
pub use error::TransferError;
pub use pg_store::PgAccountStore;
pub use state::TransferState;
pub use store::{AccountPair, AccountStore, StoreError, TransferCommit, TransferSession};
