//! Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use cashdesk_core::ledger::{PartyRole as LedgerPartyRole, TransactionStatus as LedgerStatus};

/// `party_role` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "party_role")]
pub enum PartyRole {
    /// Client.
    #[sea_orm(string_value = "client")]
    Client,
    /// Staff.
    #[sea_orm(string_value = "staff")]
    Staff,
    /// Admin.
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// `transaction_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
pub enum TransactionStatus {
    /// Pending.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Completed.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Failed.
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl From<PartyRole> for LedgerPartyRole {
    fn from(role: PartyRole) -> Self {
        match role {
            PartyRole::Client => Self::Client,
            PartyRole::Staff => Self::Staff,
            PartyRole::Admin => Self::Admin,
        }
    }
}

impl From<LedgerPartyRole> for PartyRole {
    fn from(role: LedgerPartyRole) -> Self {
        match role {
            LedgerPartyRole::Client => Self::Client,
            LedgerPartyRole::Staff => Self::Staff,
            LedgerPartyRole::Admin => Self::Admin,
        }
    }
}

impl From<TransactionStatus> for LedgerStatus {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Completed => Self::Completed,
            TransactionStatus::Failed => Self::Failed,
        }
    }
}

impl From<LedgerStatus> for TransactionStatus {
    fn from(status: LedgerStatus) -> Self {
        match status {
            LedgerStatus::Pending => Self::Pending,
            LedgerStatus::Completed => Self::Completed,
            LedgerStatus::Failed => Self::Failed,
        }
    }
}
