//! Ledger error types.
//!
//! Every failure of a ledger operation is a `LedgerError`. Each variant
//! belongs to one [`ErrorClass`], which decides its HTTP status and whether
//! the caller may retry.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Broad category of a ledger error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input or unusable party/branch.
    Validation,
    /// Caller is not allowed to perform the operation.
    Authorization,
    /// Referenced record does not exist.
    NotFound,
    /// Unique key collision.
    Conflict,
    /// The atomic unit aborted cleanly; the whole request may be retried.
    Consistency,
    /// A non-atomic unit failed after writing; needs reconciliation.
    PartialFailure,
    /// Any other storage failure.
    Storage,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount is not positive or has more than two decimal places.
    #[error("Invalid amount {0}: must be greater than zero with at most two decimal places")]
    InvalidAmount(Decimal),

    /// UTR reference does not match the 10-22 alphanumeric format.
    #[error("Invalid UTR reference '{0}': expected 10-22 alphanumeric characters")]
    InvalidReference(String),

    /// Transaction kind is not `credit` or `debit`.
    #[error("Invalid transaction kind '{0}'")]
    InvalidKind(String),

    /// Rate is outside `[0, 100]` or has more than two decimal places.
    #[error("Invalid rate {0}: must be between 0 and 100 with at most two decimal places")]
    InvalidRate(Decimal),

    /// Applying the amount would push the balance past the storable range.
    #[error("Balance {0} cannot absorb this amount without leaving the storable range")]
    BalanceOutOfRange(Decimal),

    /// Stored transaction cannot be reversed.
    #[error("Transaction kind '{0}' cannot be reversed")]
    InvalidTransactionKind(String),

    /// Party is missing, inactive, or has the wrong role.
    #[error("Invalid {role} party: {id}")]
    InvalidParty {
        /// The expected role.
        role: &'static str,
        /// The party ID.
        id: Uuid,
    },

    /// Branch is missing or inactive.
    #[error("Branch {0} is inactive or does not exist")]
    InactiveBranch(Uuid),

    // ========== Authorization Errors ==========
    /// Staff is not assigned to the branch.
    #[error("Staff {staff_id} is not authorized for branch {branch_id}")]
    UnauthorizedBranchAccess {
        /// The staff party.
        staff_id: Uuid,
        /// The branch.
        branch_id: Uuid,
    },

    /// Caller may not perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Staff reversal attempted outside the window.
    #[error("Reversal window expired: transaction is {age_hours} hours old (limit {limit_hours} hours)")]
    ReversalWindowExpired {
        /// Age of the transaction in whole hours.
        age_hours: i64,
        /// Configured window in hours.
        limit_hours: i64,
    },

    // ========== Lookup Errors ==========
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    NotFound(Uuid),

    // ========== Conflict Errors ==========
    /// UTR reference already used.
    #[error("UTR reference '{0}' already exists")]
    DuplicateReference(String),

    // ========== Infrastructure Errors ==========
    /// The atomic unit aborted and left state unchanged.
    #[error("Consistency failure, please retry: {0}")]
    Consistency(String),

    /// The atomic unit exceeded its time limit and was rolled back.
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    /// A best-effort unit failed after at least one write.
    #[error("Partial failure, manual reconciliation required: {0}")]
    PartialFailure(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the error class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidAmount(_)
            | Self::InvalidReference(_)
            | Self::InvalidKind(_)
            | Self::InvalidRate(_)
            | Self::BalanceOutOfRange(_)
            | Self::InvalidTransactionKind(_)
            | Self::InvalidParty { .. }
            | Self::InactiveBranch(_) => ErrorClass::Validation,
            Self::UnauthorizedBranchAccess { .. }
            | Self::Forbidden(_)
            | Self::ReversalWindowExpired { .. } => ErrorClass::Authorization,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::DuplicateReference(_) => ErrorClass::Conflict,
            Self::Consistency(_) | Self::Timeout(_) => ErrorClass::Consistency,
            Self::PartialFailure(_) => ErrorClass::PartialFailure,
            Self::Storage(_) => ErrorClass::Storage,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidReference(_) => "INVALID_REFERENCE",
            Self::InvalidKind(_) => "INVALID_KIND",
            Self::InvalidRate(_) => "INVALID_RATE",
            Self::BalanceOutOfRange(_) => "BALANCE_OUT_OF_RANGE",
            Self::InvalidTransactionKind(_) => "INVALID_TRANSACTION_KIND",
            Self::InvalidParty { .. } => "INVALID_PARTY",
            Self::InactiveBranch(_) => "INACTIVE_BRANCH",
            Self::UnauthorizedBranchAccess { .. } => "UNAUTHORIZED_BRANCH_ACCESS",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ReversalWindowExpired { .. } => "REVERSAL_WINDOW_EXPIRED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::Consistency(_) => "CONSISTENCY_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::PartialFailure(_) => "PARTIAL_FAILURE",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 504 Gateway Timeout - unit exceeded its deadline
            Self::Timeout(_) => 504,
            _ => match self.class() {
                ErrorClass::Validation => 400,
                ErrorClass::Authorization => 403,
                ErrorClass::NotFound => 404,
                ErrorClass::Conflict => 409,
                ErrorClass::Consistency => 503,
                ErrorClass::PartialFailure | ErrorClass::Storage => 500,
            },
        }
    }

    /// Returns true if the whole request is safe to retry unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Consistency)
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { value, .. } => Self::DuplicateReference(value),
            StoreError::PartialWrite(msg) => Self::PartialFailure(msg),
            StoreError::Aborted(msg) => Self::Consistency(msg),
            StoreError::UnknownKind(kind) => Self::InvalidTransactionKind(kind),
            StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}
