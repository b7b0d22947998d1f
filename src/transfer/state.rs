//! Transfer FSM State Definitions
//!
//! ```text
//! VALIDATED → LOCKED → COMPUTED → COMMITTED
//!     ↓          ↓         ↓
//!  REJECTED   REJECTED  ABORTED
//!             ABORTED
//! ```
//!
//! `Rejected` means nothing was written. `Aborted` means locks were taken
//! and then released by rollback after an infrastructure failure.

use std::fmt;

/// Transfer FSM States
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    /// Request parameters parsed and checked
    Validated,

    /// Both rows locked (ascending id order) and fetched
    Locked,

    /// New balances and converted amount computed
    Computed,

    /// Terminal: balances and invoice committed atomically
    Committed,

    /// Terminal: business rejection, no mutation
    Rejected,

    /// Terminal: infrastructure failure after locking, rolled back
    Aborted,
}

impl TransferState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Committed | TransferState::Rejected | TransferState::Aborted
        )
    }

    /// Whether row locks may be held in this state
    #[inline]
    pub fn holds_locks(&self) -> bool {
        matches!(self, TransferState::Locked | TransferState::Computed)
    }

    /// Allowed edges of the state machine
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Validated, Locked)
                | (Validated, Rejected)
                | (Validated, Aborted)
                | (Locked, Computed)
                | (Locked, Rejected)
                | (Locked, Aborted)
                | (Computed, Committed)
                | (Computed, Aborted)
        )
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Validated => "VALIDATED",
            TransferState::Locked => "LOCKED",
            TransferState::Computed => "COMPUTED",
            TransferState::Committed => "COMMITTED",
            TransferState::Rejected => "REJECTED",
            TransferState::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
