//! Ledger service: transaction creation, reversal, and reads.
//!
//! Every mutation runs inside one [`AtomicUnit`] under a deadline. Audit
//! entries are emitted after commit and never influence the outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::time::Instant;

use cashdesk_shared::config::LedgerConfig;
use cashdesk_shared::types::{PageRequest, PageResponse, TransactionId};

use super::commission::{CommissionBreakdown, RatePolicy};
use super::error::{ErrorClass, LedgerError};
use super::reversal::{authorize_reversal, ensure_reversal_role, plan_reversal};
use super::types::{
    CreateTransactionInput, PartyRole, RequestMeta, Requester, ReversalResult, Transaction,
    TransactionFilter, TransactionStatus,
};
use super::validation::{normalize_remark, validate_branch, validate_client, validate_staff};
use crate::audit::{AuditAction, AuditEntry, AuditQueue};
use crate::clock::Clock;
use crate::store::{Atomicity, AtomicUnit, LedgerStore, StoreError};

/// Tunables of the ledger service.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// Deadline for one atomic unit.
    pub unit_timeout: Duration,
    /// How long staff may reverse their own transactions.
    pub reversal_window: chrono::Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for LedgerSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            unit_timeout: config.unit_timeout(),
            reversal_window: config.reversal_window(),
        }
    }
}

/// Creates, reverses, and reads ledger transactions.
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    audit: AuditQueue,
    clock: Arc<dyn Clock>,
    settings: LedgerSettings,
}

impl LedgerService {
    /// Creates a service.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        audit: AuditQueue,
        clock: Arc<dyn Clock>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            store,
            audit,
            clock,
            settings,
        }
    }

    /// Execution mode of the underlying store.
    pub fn atomicity(&self) -> Atomicity {
        self.store.atomicity()
    }

    /// Creates a transaction and applies it to the staff balance.
    ///
    /// Checks run in order: amount, reference format, client, branch, staff
    /// and branch access. `policy` is the rate policy read by the caller.
    pub async fn create_transaction(
        &self,
        input: CreateTransactionInput,
        policy: &RatePolicy,
        meta: RequestMeta,
    ) -> Result<Transaction, LedgerError> {
        input.validate_format()?;

        let now = self.clock.now();
        let deadline = Instant::now() + self.settings.unit_timeout;
        let mut unit = self.begin("create_transaction", deadline).await?;
        let applied = tokio::time::timeout_at(deadline, apply_create(unit.as_mut(), &input, policy, now)).await;
        let tx = self.finish("create_transaction", unit, applied).await?;

        tracing::info!(
            transaction_id = %tx.id,
            staff_id = %tx.staff_id,
            kind = %tx.kind,
            amount = %tx.amount,
            final_amount = %tx.final_amount,
            balance_after = %tx.balance_after,
            "Transaction created"
        );
        self.audit.emit(AuditEntry::new(
            tx.staff_id,
            AuditAction::for_kind(tx.kind),
            Some(tx.id.into_inner()),
            json!({
                "amount": tx.amount,
                "finalAmount": tx.final_amount,
                "commission": tx.commission,
                "staffBalanceAfter": tx.balance_after,
            }),
            &meta,
            now,
        ));
        Ok(tx)
    }

    /// Deletes a transaction and applies the inverse delta to the live staff balance.
    pub async fn reverse_transaction(
        &self,
        id: TransactionId,
        requester: Requester,
        meta: RequestMeta,
    ) -> Result<ReversalResult, LedgerError> {
        ensure_reversal_role(&requester)?;

        let now = self.clock.now();
        let deadline = Instant::now() + self.settings.unit_timeout;
        let mut unit = self.begin("reverse_transaction", deadline).await?;
        let applied = tokio::time::timeout_at(
            deadline,
            apply_reversal(unit.as_mut(), id, &requester, now, self.settings.reversal_window),
        )
        .await;
        let (tx, result) = self.finish("reverse_transaction", unit, applied).await?;

        tracing::info!(
            transaction_id = %result.transaction_id,
            staff_id = %result.staff_id,
            deleted_by = %requester.id,
            old_balance = %result.old_balance,
            new_balance = %result.new_balance,
            "Transaction reversed"
        );
        self.audit.emit(AuditEntry::new(
            requester.id,
            AuditAction::DeleteTransaction,
            Some(result.transaction_id.into_inner()),
            json!({
                "deletedBy": requester.id,
                "transactionType": tx.kind,
                "amount": tx.amount,
                "finalAmount": tx.final_amount,
                "oldStaffBalance": result.old_balance,
                "newStaffBalance": result.new_balance,
                "reversalAmount": result.reversed_amount,
            }),
            &meta,
            now,
        ));
        Ok(result)
    }

    /// Reads one transaction the requester is allowed to see.
    pub async fn get_transaction(
        &self,
        id: TransactionId,
        requester: Requester,
    ) -> Result<Transaction, LedgerError> {
        let tx = self
            .store
            .find_transaction(id)
            .await?
            .ok_or(LedgerError::NotFound(id.into_inner()))?;
        let visible = match requester.role {
            PartyRole::Admin => true,
            PartyRole::Staff => tx.staff_id == requester.id,
            PartyRole::Client => tx.client_id == requester.id,
        };
        if !visible {
            return Err(LedgerError::Forbidden(format!(
                "transaction {id} belongs to another party"
            )));
        }
        Ok(tx)
    }

    /// Lists transactions newest first, restricted to what the requester may see.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        page: PageRequest,
        requester: Requester,
    ) -> Result<PageResponse<Transaction>, LedgerError> {
        let filter = filter.scoped_to(&requester);
        Ok(self.store.list_transactions(&filter, page.normalized()).await?)
    }

    /// Opens a unit. Waiting for a connection counts against the unit deadline.
    async fn begin(&self, operation: &'static str, deadline: Instant) -> Result<Box<dyn AtomicUnit>, LedgerError> {
        match tokio::time::timeout_at(deadline, self.store.begin()).await {
            Ok(unit) => Ok(unit?),
            Err(_) => {
                let err = self.timeout();
                tracing::error!(operation, error = %err, code = err.error_code(), "Atomic unit did not start");
                Err(err)
            }
        }
    }

    fn timeout(&self) -> LedgerError {
        LedgerError::Timeout(u64::try_from(self.settings.unit_timeout.as_millis()).unwrap_or(u64::MAX))
    }

    async fn finish<T>(
        &self,
        operation: &'static str,
        unit: Box<dyn AtomicUnit>,
        applied: Result<Result<T, LedgerError>, tokio::time::error::Elapsed>,
    ) -> Result<T, LedgerError> {
        let outcome = match applied {
            Ok(Ok(value)) => unit.commit().await.map(|()| value).map_err(LedgerError::from),
            Ok(Err(err)) => Err(abort(unit, err).await),
            Err(_) => Err(abort(unit, self.timeout()).await),
        };
        if let Err(err) = &outcome {
            match err.class() {
                ErrorClass::Consistency | ErrorClass::PartialFailure | ErrorClass::Storage => {
                    tracing::error!(operation, error = %err, code = err.error_code(), "Atomic unit failed");
                }
                _ => tracing::debug!(operation, error = %err, "Operation rejected"),
            }
        }
        outcome
    }
}

/// Rolls back `unit` and picks the error to report.
///
/// A best-effort unit that had already written turns any failure into
/// `PartialFailure`.
async fn abort(unit: Box<dyn AtomicUnit>, err: LedgerError) -> LedgerError {
    match unit.rollback().await {
        Ok(()) => err,
        Err(StoreError::PartialWrite(detail)) => match err {
            LedgerError::PartialFailure(_) => err,
            other => LedgerError::PartialFailure(format!("{other}; {detail}")),
        },
        Err(e) => {
            tracing::error!(error = %e, "Rollback failed");
            err
        }
    }
}

async fn apply_create(
    unit: &mut dyn AtomicUnit,
    input: &CreateTransactionInput,
    policy: &RatePolicy,
    now: DateTime<Utc>,
) -> Result<Transaction, LedgerError> {
    let client = unit.find_party(input.client_id).await?;
    validate_client(input.client_id, client.as_ref())?;

    let branch = unit.find_branch(input.branch_id).await?;
    validate_branch(input.branch_id, branch.as_ref())?;

    let staff = unit.lock_party(input.staff_id).await?;
    let staff = validate_staff(input.staff_id, staff.as_ref(), input.branch_id)?;

    let breakdown = CommissionBreakdown::for_kind(input.amount, input.kind, policy)?;
    let balance_before = staff.balance;
    let balance_after = breakdown.apply_to(balance_before, input.kind)?;

    let tx = Transaction {
        id: TransactionId::new(),
        client_id: input.client_id,
        staff_id: input.staff_id,
        branch_id: input.branch_id,
        kind: input.kind,
        amount: breakdown.amount,
        commission: breakdown.commission,
        final_amount: breakdown.final_amount,
        remark: normalize_remark(input.remark.as_deref()),
        utr_id: input.utr_id.clone(),
        balance_before,
        balance_after,
        status: TransactionStatus::Completed,
        created_at: now,
    };

    unit.insert_transaction(&tx).await?;
    unit.save_balance(tx.staff_id, balance_after).await?;
    Ok(tx)
}

async fn apply_reversal(
    unit: &mut dyn AtomicUnit,
    id: TransactionId,
    requester: &Requester,
    now: DateTime<Utc>,
    window: chrono::Duration,
) -> Result<(Transaction, ReversalResult), LedgerError> {
    let not_found = || LedgerError::NotFound(id.into_inner());

    let tx = unit.find_transaction(id).await?.ok_or_else(not_found)?;
    authorize_reversal(&tx, requester, now, window)?;

    let staff = unit
        .lock_party(tx.staff_id)
        .await?
        .ok_or(LedgerError::InvalidParty {
            role: PartyRole::Staff.as_str(),
            id: tx.staff_id.into_inner(),
        })?;

    // A concurrent reversal may have won while we waited for the lock.
    let tx = unit.find_transaction(id).await?.ok_or_else(not_found)?;
    let result = plan_reversal(&tx, staff.balance)?;

    if !unit.delete_transaction(id).await? {
        return Err(not_found());
    }
    unit.save_balance(tx.staff_id, result.new_balance).await?;
    Ok((tx, result))
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
