//! Audit trail for mutating ledger operations.
//!
//! Entries go onto a bounded queue and a detached worker hands them to an
//! [`AuditRecorder`]. Neither a full queue nor a failing recorder affects the
//! operation that produced the entry.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use cashdesk_shared::types::{AuditLogId, PartyId};

use crate::ledger::types::{RequestMeta, TransactionKind};
use crate::store::AuditRecorder;

/// Audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A credit was created.
    TransactionCredit,
    /// A debit was created.
    TransactionDebit,
    /// A transaction was reversed.
    DeleteTransaction,
    /// The commission policy changed.
    UpdateSettings,
}

impl AuditAction {
    /// Action for creating a transaction of `kind`.
    #[must_use]
    pub const fn for_kind(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Credit => Self::TransactionCredit,
            TransactionKind::Debit => Self::TransactionDebit,
        }
    }

    /// Stored name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransactionCredit => "transaction_credit",
            Self::TransactionDebit => "transaction_debit",
            Self::DeleteTransaction => "delete_transaction",
            Self::UpdateSettings => "update_settings",
        }
    }

    /// Resource type the action applies to.
    #[must_use]
    pub const fn resource_type(self) -> &'static str {
        match self {
            Self::UpdateSettings => "settings",
            _ => "transaction",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID.
    pub id: AuditLogId,
    /// Party that performed the action.
    pub actor_id: PartyId,
    /// The action.
    pub action: AuditAction,
    /// `transaction` or `settings`.
    pub resource_type: String,
    /// Affected resource, if any.
    pub resource_id: Option<Uuid>,
    /// Action-specific details.
    pub details: serde_json::Value,
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Caller user agent.
    pub user_agent: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Builds an entry stamped with a fresh ID.
    #[must_use]
    pub fn new(
        actor_id: PartyId,
        action: AuditAction,
        resource_id: Option<Uuid>,
        details: serde_json::Value,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            actor_id,
            action,
            resource_type: action.resource_type().to_string(),
            resource_id,
            details,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            created_at: now,
        }
    }
}

/// Sending half of the audit queue.
#[derive(Debug, Clone)]
pub struct AuditQueue {
    sender: mpsc::Sender<AuditEntry>,
}

impl AuditQueue {
    /// Creates a queue of `capacity` entries drained by a detached worker.
    ///
    /// The worker ends once every `AuditQueue` clone is dropped and the
    /// queue is empty.
    pub fn spawn(recorder: Arc<dyn AuditRecorder>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<AuditEntry>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                if let Err(e) = recorder.record(&entry).await {
                    tracing::error!(
                        audit_id = %entry.id,
                        action = %entry.action,
                        error = %e,
                        "Failed to record audit entry"
                    );
                }
            }
            tracing::debug!("Audit worker stopped");
        });
        (Self { sender }, handle)
    }

    /// Enqueues an entry without waiting. Drops it if the queue is full.
    pub fn emit(&self, entry: AuditEntry) {
        match self.sender.try_send(entry) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(entry)) => {
                tracing::warn!(
                    audit_id = %entry.id,
                    action = %entry.action,
                    "Audit queue full, dropping entry"
                );
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                tracing::warn!(
                    audit_id = %entry.id,
                    action = %entry.action,
                    "Audit worker gone, dropping entry"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting {
        entries: Mutex<Vec<AuditEntry>>,
        fail: bool,
    }

    #[async_trait]
    impl AuditRecorder for Collecting {
        async fn record(&self, entry: &AuditEntry) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Backend("audit table missing".into()));
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn entry(action: AuditAction) -> AuditEntry {
        AuditEntry::new(
            PartyId::new(),
            action,
            None,
            serde_json::json!({}),
            &RequestMeta::default(),
            Utc::now(),
        )
    }

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::for_kind(TransactionKind::Credit).as_str(), "transaction_credit");
        assert_eq!(AuditAction::for_kind(TransactionKind::Debit).as_str(), "transaction_debit");
        assert_eq!(AuditAction::DeleteTransaction.resource_type(), "transaction");
        assert_eq!(AuditAction::UpdateSettings.resource_type(), "settings");
        assert_eq!(
            serde_json::to_value(AuditAction::DeleteTransaction).unwrap(),
            serde_json::json!("delete_transaction")
        );
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let recorder = Arc::new(Collecting::default());
        let (queue, handle) = AuditQueue::spawn(recorder.clone(), 8);
        queue.emit(entry(AuditAction::TransactionCredit));
        queue.emit(entry(AuditAction::DeleteTransaction));
        drop(queue);
        handle.await.unwrap();

        let entries = recorder.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].action, AuditAction::DeleteTransaction);
    }

    #[tokio::test]
    async fn test_full_queue_drops_entries() {
        let (sender, mut receiver) = mpsc::channel(1);
        let queue = AuditQueue { sender };
        queue.emit(entry(AuditAction::TransactionCredit));
        queue.emit(entry(AuditAction::TransactionDebit));
        drop(queue);

        let mut received = Vec::new();
        while let Some(e) = receiver.recv().await {
            received.push(e);
        }
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].action, AuditAction::TransactionCredit);
    }

    #[tokio::test]
    async fn test_recorder_failure_is_swallowed() {
        let recorder = Arc::new(Collecting {
            fail: true,
            ..Default::default()
        });
        let (queue, handle) = AuditQueue::spawn(recorder, 4);
        queue.emit(entry(AuditAction::UpdateSettings));
        drop(queue);
        assert!(handle.await.is_ok());
    }
}
