//! Postgres implementation of the ledger store traits.
//!
//! Whether atomic units run inside a database transaction is decided once,
//! when the store is built, by [`probe_atomicity`].

mod unit;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};

use cashdesk_core::aggregation::{DailySummary, SummaryGroup};
use cashdesk_core::audit::AuditEntry;
use cashdesk_core::ledger::{
    Branch, Party, PolicyUpdate, RatePolicy, Transaction, TransactionFilter, TransactionTotals,
};
use cashdesk_core::store::{
    AtomicStore, AtomicUnit, Atomicity, AuditRecorder, BranchDirectory, PartyDirectory, PolicyStore,
    StoreError, SummaryStore, TransactionStore,
};
use cashdesk_shared::types::{BranchId, PageRequest, PageResponse, PartyId, TransactionId};

use crate::repositories::{self, backend};

use unit::{BestEffortUnit, SessionUnit};

/// Ledger store backed by a SeaORM connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
    atomicity: Atomicity,
}

impl PgStore {
    /// Creates a store with a fixed atomicity.
    #[must_use]
    pub const fn new(db: DatabaseConnection, atomicity: Atomicity) -> Self {
        Self { db, atomicity }
    }

    /// Probes the connection and builds the store in the mode it supports.
    pub async fn detect(db: DatabaseConnection, use_transactions: bool) -> Self {
        let atomicity = probe_atomicity(&db, use_transactions).await;
        Self::new(db, atomicity)
    }

    /// The underlying pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Decides the unit mode: session only if enabled and a transaction can be
/// opened and rolled back.
pub async fn probe_atomicity(db: &DatabaseConnection, use_transactions: bool) -> Atomicity {
    if !use_transactions {
        tracing::warn!("Database transactions disabled by configuration, ledger writes are best-effort");
        return Atomicity::BestEffort;
    }

    let probe = match db.begin().await {
        Ok(txn) => txn.rollback().await,
        Err(e) => Err(e),
    };
    match probe {
        Ok(()) => {
            tracing::info!(mode = Atomicity::Session.as_str(), "Ledger store atomicity detected");
            Atomicity::Session
        }
        Err(e) => {
            tracing::warn!(error = %e, "Transaction probe failed, ledger writes are best-effort");
            Atomicity::BestEffort
        }
    }
}

#[async_trait]
impl PartyDirectory for PgStore {
    async fn find_party(&self, id: PartyId) -> Result<Option<Party>, StoreError> {
        repositories::party::find(&self.db, id).await
    }
}

#[async_trait]
impl BranchDirectory for PgStore {
    async fn find_branch(&self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        repositories::branch::find(&self.db, id).await
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        repositories::transaction::find(&self.db, id).await
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Transaction>, StoreError> {
        repositories::transaction::list(&self.db, filter, page).await
    }

    async fn transaction_totals(&self, filter: &TransactionFilter) -> Result<TransactionTotals, StoreError> {
        repositories::transaction::totals(&self.db, filter).await
    }

    async fn summarize_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SummaryGroup>, StoreError> {
        repositories::transaction::summarize_range(&self.db, from, to).await
    }
}

#[async_trait]
impl SummaryStore for PgStore {
    async fn insert_daily_summaries(&self, rows: &[DailySummary]) -> Result<u64, StoreError> {
        repositories::summary::insert_if_absent(&self.db, rows).await
    }

    async fn list_daily_summaries(&self, date: NaiveDate) -> Result<Vec<DailySummary>, StoreError> {
        repositories::summary::list_for_date(&self.db, date).await
    }
}

#[async_trait]
impl PolicyStore for PgStore {
    async fn current_policy(&self) -> Result<RatePolicy, StoreError> {
        repositories::policy::current(&self.db).await
    }

    async fn update_policy(
        &self,
        update: &PolicyUpdate,
        by: PartyId,
        now: DateTime<Utc>,
    ) -> Result<RatePolicy, StoreError> {
        repositories::policy::update(&self.db, update, by, now).await
    }
}

#[async_trait]
impl AuditRecorder for PgStore {
    async fn record(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        repositories::audit::insert(&self.db, entry).await
    }
}

#[async_trait]
impl AtomicStore for PgStore {
    fn atomicity(&self) -> Atomicity {
        self.atomicity
    }

    async fn begin(&self) -> Result<Box<dyn AtomicUnit>, StoreError> {
        match self.atomicity {
            Atomicity::Session => {
                let txn = self.db.begin().await.map_err(backend)?;
                Ok(Box::new(SessionUnit::new(txn)))
            }
            Atomicity::BestEffort => Ok(Box::new(BestEffortUnit::new(self.db.clone()))),
        }
    }
}
