//! Ledger domain types for transaction creation, reversal, and lookup.
//!
//! Parties and branches are owned by external directories; the ledger only
//! reads them and applies balance deltas to the acting staff party.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cashdesk_shared::types::{BranchId, PartyId, TransactionId};

use super::error::LedgerError;

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    /// Which enum failed to parse.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Role of a party. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    /// Account holder who deposits and withdraws cash.
    Client,
    /// Cash-handling agent; the only balance-bearing role.
    Staff,
    /// Operator with unrestricted ledger access.
    Admin,
}

impl PartyRole {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartyRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseEnumError {
                kind: "party role",
                value: s.to_string(),
            }),
        }
    }
}

/// Direction of a transaction from the staff party's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Client deposits cash with staff; staff holdings grow.
    Credit,
    /// Staff pays cash out to the client; staff holdings shrink.
    Debit,
}

impl TransactionKind {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// Applies the kind's sign to an amount: `+amount` for credit, `-amount` for debit.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            _ => Err(LedgerError::InvalidKind(s.to_string())),
        }
    }
}

/// Transaction status. The engine only ever produces `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Accepted but not yet settled.
    Pending,
    /// Settled; counted by dashboards and aggregation.
    Completed,
    /// Rejected downstream.
    Failed,
}

impl TransactionStatus {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseEnumError {
                kind: "transaction status",
                value: s.to_string(),
            }),
        }
    }
}

/// A party as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Party ID.
    pub id: PartyId,
    /// Display name.
    pub name: String,
    /// Role, immutable after creation.
    pub role: PartyRole,
    /// Running balance. Only staff balances are ledger-bearing.
    pub balance: Decimal,
    /// Inactive parties cannot take part in new transactions.
    pub is_active: bool,
    /// Branches a staff party may transact in.
    pub branches: Vec<BranchId>,
}

impl Party {
    /// Returns true if the party is active and has the given role.
    #[must_use]
    pub fn is_active_with_role(&self, role: PartyRole) -> bool {
        self.is_active && self.role == role
    }

    /// Returns true if the party is authorized for the branch.
    #[must_use]
    pub fn can_access_branch(&self, branch_id: BranchId) -> bool {
        self.branches.contains(&branch_id)
    }
}

/// A branch as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch ID.
    pub id: BranchId,
    /// Display name.
    pub name: String,
    /// Unique, upper-case branch code.
    pub code: String,
    /// Owning client.
    pub client_id: PartyId,
    /// Inactive branches reject new transactions.
    pub is_active: bool,
    /// Staff assigned to the branch.
    pub staff_members: Vec<PartyId>,
}

/// An immutable ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Client on whose behalf the cash moved.
    pub client_id: PartyId,
    /// Staff party whose balance was mutated.
    pub staff_id: PartyId,
    /// Branch the transaction happened in.
    pub branch_id: BranchId,
    /// Credit or debit.
    pub kind: TransactionKind,
    /// Requested amount.
    pub amount: Decimal,
    /// Commission withheld at the rate in effect at creation.
    pub commission: Decimal,
    /// `amount - commission`; the delta applied to the staff balance.
    pub final_amount: Decimal,
    /// Free text.
    pub remark: String,
    /// External reference, unique across the ledger.
    pub utr_id: String,
    /// Staff balance before the transaction.
    pub balance_before: Decimal,
    /// Staff balance after the transaction.
    pub balance_after: Decimal,
    /// Status.
    pub status: TransactionStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed balance delta this transaction applied.
    #[must_use]
    pub fn balance_delta(&self) -> Decimal {
        self.kind.signed(self.final_amount)
    }
}

/// Input for creating a new transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    /// Client on whose behalf the cash moves.
    pub client_id: PartyId,
    /// Acting staff party.
    pub staff_id: PartyId,
    /// Branch the transaction happens in.
    pub branch_id: BranchId,
    /// Credit or debit.
    pub kind: TransactionKind,
    /// Requested amount.
    pub amount: Decimal,
    /// Optional free text.
    pub remark: Option<String>,
    /// External reference.
    pub utr_id: String,
}

/// The party on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    /// Requesting party.
    pub id: PartyId,
    /// Its role.
    pub role: PartyRole,
}

impl Requester {
    /// Creates a requester.
    #[must_use]
    pub const fn new(id: PartyId, role: PartyRole) -> Self {
        Self { id, role }
    }
}

/// Request metadata carried into audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Caller user agent.
    pub user_agent: Option<String>,
}

/// Outcome of a reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalResult {
    /// The deleted transaction.
    pub transaction_id: TransactionId,
    /// Its kind.
    pub kind: TransactionKind,
    /// Staff party whose balance was compensated.
    pub staff_id: PartyId,
    /// The `final_amount` that was reversed.
    pub reversed_amount: Decimal,
    /// Live staff balance before the reversal.
    pub old_balance: Decimal,
    /// Staff balance after the reversal.
    pub new_balance: Decimal,
}

/// Read-side filter over transactions. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Filter by client.
    pub client_id: Option<PartyId>,
    /// Filter by staff.
    pub staff_id: Option<PartyId>,
    /// Filter by branch.
    pub branch_id: Option<BranchId>,
    /// Filter by kind.
    pub kind: Option<TransactionKind>,
    /// Filter by status.
    pub status: Option<TransactionStatus>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    /// Returns true if the transaction satisfies every set field.
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.client_id.is_none_or(|id| tx.client_id == id)
            && self.staff_id.is_none_or(|id| tx.staff_id == id)
            && self.branch_id.is_none_or(|id| tx.branch_id == id)
            && self.kind.is_none_or(|kind| tx.kind == kind)
            && self.status.is_none_or(|status| tx.status == status)
            && self.from.is_none_or(|from| tx.created_at >= from)
            && self.to.is_none_or(|to| tx.created_at < to)
    }

    /// Restricts the filter to what the requester may see.
    ///
    /// Staff see only their own transactions and clients only theirs.
    #[must_use]
    pub fn scoped_to(mut self, requester: &Requester) -> Self {
        match requester.role {
            PartyRole::Admin => {}
            PartyRole::Staff => self.staff_id = Some(requester.id),
            PartyRole::Client => self.client_id = Some(requester.id),
        }
        self
    }
}

/// Credit, debit, and commission totals over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTotals {
    /// Sum of credit `final_amount`.
    pub total_credit: Decimal,
    /// Sum of debit `final_amount`.
    pub total_debit: Decimal,
    /// Sum of `commission`.
    pub total_commission: Decimal,
    /// Number of transactions.
    pub transaction_count: i64,
}

impl TransactionTotals {
    /// Folds one transaction into the totals.
    pub fn add(&mut self, tx: &Transaction) {
        match tx.kind {
            TransactionKind::Credit => self.total_credit += tx.final_amount,
            TransactionKind::Debit => self.total_debit += tx.final_amount,
        }
        self.total_commission += tx.commission;
        self.transaction_count += 1;
    }
}

impl<'a> FromIterator<&'a Transaction> for TransactionTotals {
    fn from_iter<I: IntoIterator<Item = &'a Transaction>>(iter: I) -> Self {
        let mut totals = Self::default();
        for tx in iter {
            totals.add(tx);
        }
        totals
    }
}
