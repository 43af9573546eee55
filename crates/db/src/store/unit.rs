//! Atomic units over Postgres.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DatabaseTransaction};

use cashdesk_core::ledger::{Branch, Party, Transaction};
use cashdesk_core::store::{AtomicUnit, StoreError};
use cashdesk_shared::types::{BranchId, PartyId, TransactionId};

use crate::repositories::{self, backend};

// ========== Session unit ==========

/// One database transaction. `lock_party` takes `FOR UPDATE` on the party row.
///
/// Dropping the unit without `commit` rolls the transaction back.
pub(super) struct SessionUnit {
    txn: DatabaseTransaction,
}

impl SessionUnit {
    pub(super) const fn new(txn: DatabaseTransaction) -> Self {
        Self { txn }
    }
}

/// A failed write inside a transaction leaves nothing behind.
fn aborted(err: StoreError) -> StoreError {
    match err {
        StoreError::Backend(msg) => StoreError::Aborted(msg),
        other => other,
    }
}

#[async_trait]
impl AtomicUnit for SessionUnit {
    async fn find_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError> {
        repositories::party::find(&self.txn, id).await
    }

    async fn find_branch(&mut self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        repositories::branch::find(&self.txn, id).await
    }

    async fn lock_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError> {
        repositories::party::find_for_update(&self.txn, id)
            .await
            .map_err(aborted)
    }

    async fn insert_transaction(&mut self, tx: &Transaction) -> Result<(), StoreError> {
        repositories::transaction::insert(&self.txn, tx)
            .await
            .map_err(aborted)
    }

    async fn find_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        repositories::transaction::find(&self.txn, id).await
    }

    async fn delete_transaction(&mut self, id: TransactionId) -> Result<bool, StoreError> {
        repositories::transaction::delete(&self.txn, id)
            .await
            .map_err(aborted)
    }

    async fn save_balance(&mut self, id: PartyId, balance: Decimal) -> Result<(), StoreError> {
        repositories::party::save_balance(&self.txn, id, balance)
            .await
            .map_err(aborted)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(|e| StoreError::Aborted(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.rollback().await.map_err(backend)
    }
}

// ========== Best-effort unit ==========

/// Sequential writes on the pool. No row lock, no shared rollback.
pub(super) struct BestEffortUnit {
    db: DatabaseConnection,
    wrote: bool,
}

impl BestEffortUnit {
    pub(super) const fn new(db: DatabaseConnection) -> Self {
        Self { db, wrote: false }
    }

    /// Escalates a failure to `PartialWrite` once anything has been applied.
    fn fail(&self, err: StoreError) -> StoreError {
        if self.wrote {
            StoreError::PartialWrite(err.to_string())
        } else {
            err
        }
    }
}

#[async_trait]
impl AtomicUnit for BestEffortUnit {
    async fn find_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError> {
        repositories::party::find(&self.db, id).await
    }

    async fn find_branch(&mut self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        repositories::branch::find(&self.db, id).await
    }

    async fn lock_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError> {
        repositories::party::find(&self.db, id).await
    }

    async fn insert_transaction(&mut self, tx: &Transaction) -> Result<(), StoreError> {
        repositories::transaction::insert(&self.db, tx)
            .await
            .map_err(|e| self.fail(e))?;
        self.wrote = true;
        Ok(())
    }

    async fn find_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        repositories::transaction::find(&self.db, id).await
    }

    async fn delete_transaction(&mut self, id: TransactionId) -> Result<bool, StoreError> {
        let removed = repositories::transaction::delete(&self.db, id)
            .await
            .map_err(|e| self.fail(e))?;
        self.wrote |= removed;
        Ok(removed)
    }

    async fn save_balance(&mut self, id: PartyId, balance: Decimal) -> Result<(), StoreError> {
        repositories::party::save_balance(&self.db, id, balance)
            .await
            .map_err(|e| self.fail(e))?;
        self.wrote = true;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        if self.wrote {
            return Err(StoreError::PartialWrite(
                "best-effort unit cannot undo applied writes".to_string(),
            ));
        }
        Ok(())
    }
}
