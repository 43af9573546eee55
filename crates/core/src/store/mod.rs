//! Persistence seams consumed by the ledger.
//!
//! Directories and read stores are plain async traits. Mutations go through
//! an [`AtomicUnit`] opened by [`AtomicStore::begin`]; whether that unit is a
//! real store transaction or a best-effort sequence of writes is decided once
//! per store and reported by [`AtomicStore::atomicity`].

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use cashdesk_shared::types::{BranchId, PageRequest, PageResponse, PartyId, TransactionId};

use crate::aggregation::{DailySummary, SummaryGroup};
use crate::audit::AuditEntry;
use crate::ledger::commission::{PolicyUpdate, RatePolicy};
use crate::ledger::types::{Branch, Party, Transaction, TransactionFilter, TransactionTotals};

pub use memory::MemoryStore;

/// Errors reported by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key already holds the value.
    #[error("unique violation on {key}: {value}")]
    UniqueViolation {
        /// Name of the violated key.
        key: &'static str,
        /// The colliding value.
        value: String,
    },

    /// A best-effort unit failed after it had already written.
    #[error("partial write: {0}")]
    PartialWrite(String),

    /// The store aborted the unit and nothing was written.
    #[error("aborted: {0}")]
    Aborted(String),

    /// A stored transaction carries a kind the ledger does not know.
    #[error("unknown transaction kind '{0}'")]
    UnknownKind(String),

    /// Any other backend failure.
    #[error("backend: {0}")]
    Backend(String),
}

/// How a store executes an atomic unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atomicity {
    /// One store transaction with an exclusive lock on the staff party.
    Session,
    /// Sequential writes without shared rollback or locking.
    BestEffort,
}

impl Atomicity {
    /// Lowercase name for logs and health output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::BestEffort => "best_effort",
        }
    }
}

/// Resolves parties.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    /// Looks up a party by ID.
    async fn find_party(&self, id: PartyId) -> Result<Option<Party>, StoreError>;
}

/// Resolves branches.
#[async_trait]
pub trait BranchDirectory: Send + Sync {
    /// Looks up a branch by ID.
    async fn find_branch(&self, id: BranchId) -> Result<Option<Branch>, StoreError>;
}

/// Committed transaction reads.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Looks up a transaction by ID.
    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Lists matching transactions, newest first.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Transaction>, StoreError>;

    /// Totals over all matching transactions.
    async fn transaction_totals(&self, filter: &TransactionFilter) -> Result<TransactionTotals, StoreError>;

    /// Completed transactions in `[from, to)` grouped by client and branch.
    async fn summarize_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SummaryGroup>, StoreError>;
}

/// Daily summary persistence.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Inserts rows whose `(date, party_id, branch_id)` key is absent.
    ///
    /// Returns the number of rows actually inserted. Existing rows are left untouched.
    async fn insert_daily_summaries(&self, rows: &[DailySummary]) -> Result<u64, StoreError>;

    /// Rows stored for a date.
    async fn list_daily_summaries(&self, date: NaiveDate) -> Result<Vec<DailySummary>, StoreError>;
}

/// The singleton commission policy.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Current policy, creating the default on first read.
    async fn current_policy(&self) -> Result<RatePolicy, StoreError>;

    /// Writes the supplied fields of `update` in one step and returns the
    /// stored result. Fields left `None` keep whatever value is stored when
    /// the write lands, so concurrent partial updates never undo each other.
    async fn update_policy(
        &self,
        update: &PolicyUpdate,
        by: PartyId,
        now: DateTime<Utc>,
    ) -> Result<RatePolicy, StoreError>;
}

/// Append-only audit sink.
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    /// Persists one entry.
    async fn record(&self, entry: &AuditEntry) -> Result<(), StoreError>;
}

/// Opens atomic units.
#[async_trait]
pub trait AtomicStore: Send + Sync {
    /// Execution mode of units from this store.
    fn atomicity(&self) -> Atomicity;

    /// Opens a unit.
    async fn begin(&self) -> Result<Box<dyn AtomicUnit>, StoreError>;
}

/// One balance mutation together with its record write.
///
/// Dropping a unit without `commit` discards staged work in session mode.
#[async_trait]
pub trait AtomicUnit: Send {
    /// Reads a party without locking it.
    async fn find_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError>;

    /// Reads a branch.
    async fn find_branch(&mut self, id: BranchId) -> Result<Option<Branch>, StoreError>;

    /// Reads a party and holds an exclusive lock on it until the unit ends.
    ///
    /// Best-effort units read without locking.
    async fn lock_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError>;

    /// Inserts a record. Fails with `UniqueViolation` on a taken `utr_id`.
    async fn insert_transaction(&mut self, tx: &Transaction) -> Result<(), StoreError>;

    /// Reads a record as visible to this unit.
    async fn find_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Hard-deletes a record. Returns false if it was already gone.
    async fn delete_transaction(&mut self, id: TransactionId) -> Result<bool, StoreError>;

    /// Writes a party's balance.
    async fn save_balance(&mut self, id: PartyId, balance: Decimal) -> Result<(), StoreError>;

    /// Makes the unit's writes durable.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards the unit.
    ///
    /// Best-effort units that already wrote return `PartialWrite`.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Everything the ledger services need from one backend.
pub trait LedgerStore:
    PartyDirectory + BranchDirectory + TransactionStore + SummaryStore + PolicyStore + AuditRecorder + AtomicStore
{
}

impl<T> LedgerStore for T where
    T: PartyDirectory
        + BranchDirectory
        + TransactionStore
        + SummaryStore
        + PolicyStore
        + AuditRecorder
        + AtomicStore
{
}
