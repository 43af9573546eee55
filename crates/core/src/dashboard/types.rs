//! Dashboard data types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cashdesk_shared::types::{BranchId, PartyId};

use crate::ledger::types::TransactionTotals;

/// Optional narrowing for the admin rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFilter {
    /// Only this branch.
    pub branch_id: Option<BranchId>,
    /// Only this client.
    pub client_id: Option<PartyId>,
    /// Only this staff party.
    pub staff_id: Option<PartyId>,
}

/// Window the totals cover: local midnight to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayWindow {
    /// Local midnight.
    pub from: DateTime<Utc>,
    /// Time of the read.
    pub to: DateTime<Utc>,
}

/// Role-specific "today" rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    /// All transactions, optionally filtered.
    Admin {
        /// Covered window.
        window: TodayWindow,
        /// Applied filter.
        filter: DashboardFilter,
        /// Totals.
        totals: TransactionTotals,
    },
    /// The client's own transactions.
    Client {
        /// Covered window.
        window: TodayWindow,
        /// Totals.
        totals: TransactionTotals,
    },
    /// The staff party's own transactions and live balance.
    Staff {
        /// Covered window.
        window: TodayWindow,
        /// Branch the totals were narrowed to.
        #[serde(rename = "branchId")]
        branch_id: Option<BranchId>,
        /// Totals.
        totals: TransactionTotals,
        /// Current balance.
        balance: Decimal,
    },
}

impl Dashboard {
    /// Totals regardless of role.
    #[must_use]
    pub const fn totals(&self) -> &TransactionTotals {
        match self {
            Self::Admin { totals, .. } | Self::Client { totals, .. } | Self::Staff { totals, .. } => totals,
        }
    }
}
