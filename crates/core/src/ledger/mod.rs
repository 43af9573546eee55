//! Transaction ledger.
//!
//! This module implements the ledger functionality:
//! - Domain types for parties, branches, and transactions
//! - Commission policy and balance math
//! - Input and party validation
//! - Reversal authorization
//! - The ledger and policy services

pub mod commission;
pub mod error;
pub mod policy;
pub mod reversal;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use commission::{CommissionBreakdown, PolicyUpdate, RatePolicy};
pub use error::{ErrorClass, LedgerError};
pub use policy::PolicyService;
pub use service::{LedgerService, LedgerSettings};
pub use types::{
    Branch, CreateTransactionInput, ParseEnumError, Party, PartyRole, RequestMeta, Requester,
    ReversalResult, Transaction, TransactionFilter, TransactionKind, TransactionStatus,
    TransactionTotals,
};
