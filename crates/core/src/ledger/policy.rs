//! Admin access to the commission policy.

use std::sync::Arc;

use serde_json::json;

use super::commission::{PolicyUpdate, RatePolicy};
use super::error::LedgerError;
use super::types::{PartyRole, RequestMeta, Requester};
use crate::audit::{AuditAction, AuditEntry, AuditQueue};
use crate::clock::Clock;
use crate::store::PolicyStore;

/// Reads and updates the singleton rate policy.
pub struct PolicyService {
    store: Arc<dyn PolicyStore>,
    audit: AuditQueue,
    clock: Arc<dyn Clock>,
}

impl PolicyService {
    /// Creates a service.
    pub fn new(store: Arc<dyn PolicyStore>, audit: AuditQueue, clock: Arc<dyn Clock>) -> Self {
        Self { store, audit, clock }
    }

    /// Policy in effect now, for pricing a transaction.
    pub async fn current(&self) -> Result<RatePolicy, LedgerError> {
        Ok(self.store.current_policy().await?)
    }

    /// Policy as shown to an admin.
    pub async fn get_policy(&self, requester: Requester) -> Result<RatePolicy, LedgerError> {
        ensure_admin(&requester)?;
        self.current().await
    }

    /// Applies a partial update. Each supplied rate must lie in `[0, 100]`
    /// with at most two decimal places.
    ///
    /// The store merges the update into the row it holds, so two admins
    /// changing different fields at once both keep their change. `previous`
    /// in the audit entry is the policy read just before the write.
    pub async fn update_policy(
        &self,
        update: PolicyUpdate,
        requester: Requester,
        meta: RequestMeta,
    ) -> Result<RatePolicy, LedgerError> {
        ensure_admin(&requester)?;
        update.validate()?;
        let now = self.clock.now();
        let previous = self.store.current_policy().await?;
        let next = self.store.update_policy(&update, requester.id, now).await?;

        tracing::info!(
            updated_by = %requester.id,
            commission_rate = %next.commission_rate,
            deposit_deduction_rate = %next.deposit_deduction_rate,
            "Rate policy updated"
        );
        self.audit.emit(AuditEntry::new(
            requester.id,
            AuditAction::UpdateSettings,
            None,
            json!({
                "previous": {
                    "commissionRate": previous.commission_rate,
                    "depositDeductionRate": previous.deposit_deduction_rate,
                },
                "commissionRate": next.commission_rate,
                "depositDeductionRate": next.deposit_deduction_rate,
            }),
            &meta,
            now,
        ));
        Ok(next)
    }
}

fn ensure_admin(requester: &Requester) -> Result<(), LedgerError> {
    if requester.role == PartyRole::Admin {
        Ok(())
    } else {
        Err(LedgerError::Forbidden("admin role required".to_string()))
    }
}
