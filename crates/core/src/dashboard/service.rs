//! Read-only "today" rollups.

use std::sync::Arc;

use chrono_tz::Tz;

use cashdesk_shared::types::{BranchId, PartyId};

use super::types::{Dashboard, DashboardFilter, TodayWindow};
use crate::aggregation::start_of_day;
use crate::clock::Clock;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{PartyRole, Requester, TransactionFilter, TransactionStatus};
use crate::store::LedgerStore;

/// Computes dashboards over completed transactions since local midnight.
pub struct DashboardService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl DashboardService {
    /// Creates a service. `tz` defines local midnight.
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self { store, clock, tz }
    }

    fn today(&self) -> (TodayWindow, TransactionFilter) {
        let now = self.clock.now();
        let from = start_of_day(now, self.tz);
        let filter = TransactionFilter {
            status: Some(TransactionStatus::Completed),
            from: Some(from),
            ..Default::default()
        };
        (TodayWindow { from, to: now }, filter)
    }

    /// All of today's transactions, optionally narrowed.
    pub async fn admin_today(&self, narrow: DashboardFilter) -> Result<Dashboard, LedgerError> {
        let (window, mut filter) = self.today();
        filter.branch_id = narrow.branch_id;
        filter.client_id = narrow.client_id;
        filter.staff_id = narrow.staff_id;
        let totals = self.store.transaction_totals(&filter).await?;
        Ok(Dashboard::Admin {
            window,
            filter: narrow,
            totals,
        })
    }

    /// Today's transactions of one client.
    pub async fn client_today(&self, client_id: PartyId) -> Result<Dashboard, LedgerError> {
        let (window, mut filter) = self.today();
        filter.client_id = Some(client_id);
        let totals = self.store.transaction_totals(&filter).await?;
        Ok(Dashboard::Client { window, totals })
    }

    /// Today's transactions of one staff party and its live balance.
    pub async fn staff_today(
        &self,
        staff_id: PartyId,
        branch_id: Option<BranchId>,
    ) -> Result<Dashboard, LedgerError> {
        let staff = self
            .store
            .find_party(staff_id)
            .await?
            .filter(|p| p.role == PartyRole::Staff)
            .ok_or(LedgerError::InvalidParty {
                role: PartyRole::Staff.as_str(),
                id: staff_id.into_inner(),
            })?;
        let (window, mut filter) = self.today();
        filter.staff_id = Some(staff_id);
        filter.branch_id = branch_id;
        let totals = self.store.transaction_totals(&filter).await?;
        Ok(Dashboard::Staff {
            window,
            branch_id,
            totals,
            balance: staff.balance,
        })
    }

    /// Dashboard for the requester's role.
    ///
    /// Admins get `narrow` applied. Staff only honor its branch.
    pub async fn for_requester(
        &self,
        requester: Requester,
        narrow: DashboardFilter,
    ) -> Result<Dashboard, LedgerError> {
        match requester.role {
            PartyRole::Admin => self.admin_today(narrow).await,
            PartyRole::Client => self.client_today(requester.id).await,
            PartyRole::Staff => self.staff_today(requester.id, narrow.branch_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ledger::types::{Party, Transaction, TransactionKind};
    use crate::store::MemoryStore;
    use cashdesk_shared::types::TransactionId;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
    }

    fn record(
        client: PartyId,
        staff: PartyId,
        branch: BranchId,
        kind: TransactionKind,
        final_amount: Decimal,
        at: DateTime<Utc>,
        utr: &str,
    ) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            client_id: client,
            staff_id: staff,
            branch_id: branch,
            kind,
            amount: final_amount + dec!(3),
            commission: dec!(3),
            final_amount,
            remark: String::new(),
            utr_id: utr.into(),
            balance_before: Decimal::ZERO,
            balance_after: Decimal::ZERO,
            status: TransactionStatus::Completed,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_rollups_by_role() {
        let store = MemoryStore::session();
        let (client, other_client, staff) = (PartyId::new(), PartyId::new(), PartyId::new());
        let (b1, b2) = (BranchId::new(), BranchId::new());
        store.insert_party(Party {
            id: staff,
            name: "Staff".into(),
            role: PartyRole::Staff,
            balance: dec!(1234.50),
            is_active: true,
            branches: vec![b1, b2],
        });

        let today = now() - Duration::hours(2);
        let yesterday = now() - Duration::days(1);
        for tx in [
            record(client, staff, b1, TransactionKind::Credit, dec!(970), today, "UTR0000000001"),
            record(client, staff, b2, TransactionKind::Debit, dec!(485), today, "UTR0000000002"),
            record(other_client, staff, b1, TransactionKind::Credit, dec!(97), today, "UTR0000000003"),
            record(client, staff, b1, TransactionKind::Credit, dec!(5000), yesterday, "UTR0000000004"),
        ] {
            store.insert_committed(tx).unwrap();
        }

        let svc = DashboardService::new(
            Arc::new(store.clone()),
            Arc::new(ManualClock::new(now())),
            chrono_tz::UTC,
        );

        let admin = svc.admin_today(DashboardFilter::default()).await.unwrap();
        assert_eq!(admin.totals().total_credit, dec!(1067));
        assert_eq!(admin.totals().total_debit, dec!(485));
        assert_eq!(admin.totals().total_commission, dec!(9));
        assert_eq!(admin.totals().transaction_count, 3);

        let narrowed = svc
            .admin_today(DashboardFilter {
                branch_id: Some(b2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(narrowed.totals().transaction_count, 1);

        let client_view = svc.client_today(client).await.unwrap();
        assert_eq!(client_view.totals().transaction_count, 2);

        let staff_view = svc.staff_today(staff, Some(b1)).await.unwrap();
        assert_eq!(staff_view.totals().total_credit, dec!(1067));
        match staff_view {
            Dashboard::Staff { balance, .. } => assert_eq!(balance, dec!(1234.50)),
            other => panic!("unexpected dashboard {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_staff_dashboard_requires_staff() {
        let store = MemoryStore::session();
        let svc = DashboardService::new(Arc::new(store), Arc::new(ManualClock::new(now())), chrono_tz::UTC);
        assert!(matches!(
            svc.staff_today(PartyId::new(), None).await,
            Err(LedgerError::InvalidParty { role: "staff", .. })
        ));
    }
}
