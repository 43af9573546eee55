//! Daily summary rows.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cashdesk_shared::types::{BranchId, DailySummaryId, PartyId};

use crate::ledger::types::{PartyRole, Transaction, TransactionStatus, TransactionTotals};

/// Completed-transaction totals for one client at one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryGroup {
    /// The client.
    pub client_id: PartyId,
    /// The branch.
    pub branch_id: BranchId,
    /// Totals over the group.
    pub totals: TransactionTotals,
}

/// Groups completed transactions by `(client_id, branch_id)`.
///
/// Output is ordered by client, then branch.
#[must_use]
pub fn group_transactions<'a, I>(transactions: I) -> Vec<SummaryGroup>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut groups = std::collections::BTreeMap::<(PartyId, BranchId), TransactionTotals>::new();
    for tx in transactions {
        if tx.status == TransactionStatus::Completed {
            groups.entry((tx.client_id, tx.branch_id)).or_default().add(tx);
        }
    }
    groups
        .into_iter()
        .map(|((client_id, branch_id), totals)| SummaryGroup {
            client_id,
            branch_id,
            totals,
        })
        .collect()
}

/// A persisted per-day, per-(client, branch) rollup. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    /// Row ID.
    pub id: DailySummaryId,
    /// Local calendar day.
    pub date: NaiveDate,
    /// The client.
    pub party_id: PartyId,
    /// Always `client` for aggregator rows.
    pub role: PartyRole,
    /// The branch.
    pub branch_id: BranchId,
    /// Sum of credit `final_amount`.
    pub total_credit: Decimal,
    /// Sum of debit `final_amount`.
    pub total_debit: Decimal,
    /// Sum of commission.
    pub total_commission: Decimal,
    /// Number of transactions.
    pub transaction_count: i64,
    /// Insert time.
    pub created_at: DateTime<Utc>,
}

impl DailySummary {
    /// Builds the row for a group.
    #[must_use]
    pub fn from_group(date: NaiveDate, group: &SummaryGroup, now: DateTime<Utc>) -> Self {
        Self {
            id: DailySummaryId::new(),
            date,
            party_id: group.client_id,
            role: PartyRole::Client,
            branch_id: group.branch_id,
            total_credit: group.totals.total_credit,
            total_debit: group.totals.total_debit,
            total_commission: group.totals.total_commission,
            transaction_count: group.totals.transaction_count,
            created_at: now,
        }
    }

    /// The unique key.
    #[must_use]
    pub const fn key(&self) -> (NaiveDate, PartyId, BranchId) {
        (self.date, self.party_id, self.branch_id)
    }
}

/// Outcome of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Aggregated day.
    pub date: NaiveDate,
    /// Groups found.
    pub groups: usize,
    /// Rows newly written.
    pub inserted: u64,
    /// Rows that already existed.
    pub skipped_existing: u64,
}
