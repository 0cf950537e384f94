use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ExpenseStatus, SettlementStatus};
use crate::money::Currency;

/// Coarse classification of a [`LedgerError`], for callers that route on
/// outcome rather than on individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidArgument,
    AmountMismatch,
    Conflict,
    InvalidState,
    Internal,
}

#[derive(Error, Debug, Serialize)]
pub enum LedgerError {
    /// User with given ID not found
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    /// Group with given ID not found
    #[error("Group {0} not found")]
    GroupNotFound(Uuid),

    /// Expense with given ID not found
    #[error("Expense {0} not found")]
    ExpenseNotFound(Uuid),

    /// Settlement with given ID not found
    #[error("Settlement {0} not found")]
    SettlementNotFound(Uuid),

    /// Expense has no split for the given debtor
    #[error("Expense {expense} has no split for user {user}")]
    SplitNotFound { expense: Uuid, user: Uuid },

    /// User is not a member of the group
    #[error("User {user} is not a member of group {group}")]
    NotGroupMember { user: Uuid, group: Uuid },

    /// User lacks the relationship required for the action
    #[error("User {user} is not allowed to {action}")]
    NotAuthorized { user: Uuid, action: &'static str },

    /// Strategy input named no participants
    #[error("Split strategy has no participants")]
    EmptyParticipants,

    /// Same participant listed twice in an equal split
    #[error("Participant {0} listed more than once")]
    DuplicateParticipant(Uuid),

    /// Amount must be strictly positive
    #[error("Amount {0} is not positive")]
    NonPositiveAmount(Decimal),

    /// Monetary values in different currencies cannot be combined
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        expected: Currency,
        actual: Currency,
    },

    /// Currency code is not a three-letter ISO code
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// Percentage entry outside [0, 100]
    #[error("Percentage {percentage} for user {user} is outside 0..=100")]
    PercentageOutOfRange { user: Uuid, percentage: Decimal },

    /// Percentages must sum to 100 within tolerance
    #[error("Percentages sum to {sum}, expected 100")]
    PercentageSumMismatch { sum: Decimal },

    /// Share weights must sum to a positive value
    #[error("Share weights sum to zero")]
    ZeroTotalShares,

    /// A computed allocation rounded to zero or below
    #[error("Allocation for user {user} rounds to a non-positive amount")]
    AllocationRoundsToZero { user: Uuid },

    /// Exact split amounts deviate from the expense total beyond tolerance
    #[error("Split amounts sum to {actual}, expected {expected}")]
    SplitSumMismatch { expected: Decimal, actual: Decimal },

    /// Settlement payer and payee are the same user
    #[error("User {0} cannot settle with themselves")]
    SelfSettlement(Uuid),

    /// Fully settled expenses are immutable
    #[error("Expense {0} is fully settled and cannot be modified")]
    ExpenseSettled(Uuid),

    /// Only confirmed expenses can be modified
    #[error("Expense {expense} has status {status} and cannot be modified")]
    ExpenseNotEditable {
        expense: Uuid,
        status: ExpenseStatus,
    },

    /// Split has already been marked settled
    #[error("Split for user {user} on expense {expense} is already settled")]
    SplitAlreadySettled { expense: Uuid, user: Uuid },

    /// Split is not currently settled
    #[error("Split for user {user} on expense {expense} is not settled")]
    SplitNotSettled { expense: Uuid, user: Uuid },

    /// Illegal settlement state-machine transition
    #[error("Cannot {action} settlement {settlement} in status {status}")]
    InvalidTransition {
        settlement: Uuid,
        status: SettlementStatus,
        action: &'static str,
    },

    /// Optimistic version check failed on a concurrent write
    #[error("{entity} {id} was modified concurrently")]
    StaleVersion { entity: &'static str, id: Uuid },

    /// Storage collaborator failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Activity sink failed; never rolls back the triggering operation
    #[error("Activity sink error: {0}")]
    Activity(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::UserNotFound(_)
            | LedgerError::GroupNotFound(_)
            | LedgerError::ExpenseNotFound(_)
            | LedgerError::SettlementNotFound(_)
            | LedgerError::SplitNotFound { .. } => ErrorKind::NotFound,

            LedgerError::NotGroupMember { .. } | LedgerError::NotAuthorized { .. } => {
                ErrorKind::Forbidden
            }

            LedgerError::EmptyParticipants
            | LedgerError::DuplicateParticipant(_)
            | LedgerError::NonPositiveAmount(_)
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::InvalidCurrency(_)
            | LedgerError::PercentageOutOfRange { .. }
            | LedgerError::PercentageSumMismatch { .. }
            | LedgerError::ZeroTotalShares
            | LedgerError::AllocationRoundsToZero { .. }
            | LedgerError::SelfSettlement(_) => ErrorKind::InvalidArgument,

            LedgerError::SplitSumMismatch { .. } => ErrorKind::AmountMismatch,

            LedgerError::ExpenseSettled(_)
            | LedgerError::ExpenseNotEditable { .. }
            | LedgerError::SplitAlreadySettled { .. }
            | LedgerError::SplitNotSettled { .. }
            | LedgerError::StaleVersion { .. } => ErrorKind::Conflict,

            LedgerError::InvalidTransition { .. } => ErrorKind::InvalidState,

            LedgerError::Storage(_) | LedgerError::Activity(_) => ErrorKind::Internal,
        }
    }
}
