//! Daily aggregation runs against the in-memory store.

#![allow(clippy::too_many_arguments)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::watch;
use tokio::time::Instant;

use cashdesk_core::aggregation::{DailyAggregator, DailySummary, RunOutcome, SummaryGroup};
use cashdesk_core::clock::{Clock, ManualClock};
use cashdesk_core::ledger::{
    PartyRole, Transaction, TransactionFilter, TransactionKind, TransactionStatus, TransactionTotals,
};
use cashdesk_core::store::{MemoryStore, StoreError, SummaryStore, TransactionStore};
use cashdesk_shared::types::{BranchId, PageRequest, PageResponse, PartyId, TransactionId};

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

fn record(
    client: PartyId,
    branch: BranchId,
    kind: TransactionKind,
    final_amount: Decimal,
    commission: Decimal,
    created_at: DateTime<Utc>,
    status: TransactionStatus,
    n: u32,
) -> Transaction {
    Transaction {
        id: TransactionId::new(),
        client_id: client,
        staff_id: PartyId::new(),
        branch_id: branch,
        kind,
        amount: final_amount + commission,
        commission,
        final_amount,
        remark: String::new(),
        utr_id: format!("AGGUTR{n:07}"),
        balance_before: Decimal::ZERO,
        balance_after: Decimal::ZERO,
        status,
        created_at,
    }
}

fn march_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

fn seeded_store(client: PartyId, b1: BranchId, b2: BranchId) -> MemoryStore {
    let store = MemoryStore::session();
    let completed = TransactionStatus::Completed;
    let rows = [
        record(client, b1, TransactionKind::Credit, dec!(970), dec!(30), at(1, 0, 0), completed, 1),
        record(client, b1, TransactionKind::Debit, dec!(485), dec!(15), at(1, 23, 59), completed, 2),
        record(client, b2, TransactionKind::Credit, dec!(97), dec!(3), at(1, 12, 0), completed, 3),
        // outside the day
        record(client, b1, TransactionKind::Credit, dec!(1), dec!(0), at(2, 0, 0), completed, 4),
        // not completed
        record(client, b2, TransactionKind::Credit, dec!(50), dec!(0), at(1, 13, 0), TransactionStatus::Failed, 5),
    ];
    for tx in rows {
        store.insert_committed(tx).unwrap();
    }
    store
}

#[tokio::test]
async fn test_run_for_groups_one_day() {
    let (client, b1, b2) = (PartyId::new(), BranchId::new(), BranchId::new());
    let store = Arc::new(seeded_store(client, b1, b2));
    let clock = Arc::new(ManualClock::new(at(2, 0, 5)));
    let aggregator = DailyAggregator::new(store.clone(), clock, chrono_tz::UTC, NaiveTime::MIN);

    let RunOutcome::Completed(report) = aggregator.run_for(march_first()).await.unwrap() else {
        panic!("run was skipped");
    };
    assert_eq!(report.groups, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped_existing, 0);

    let rows = store.list_daily_summaries(march_first()).await.unwrap();
    let main = rows.iter().find(|r| r.branch_id == b1).unwrap();
    assert_eq!(main.role, PartyRole::Client);
    assert_eq!(main.party_id, client);
    assert_eq!(main.total_credit, dec!(970));
    assert_eq!(main.total_debit, dec!(485));
    assert_eq!(main.total_commission, dec!(45));
    assert_eq!(main.transaction_count, 2);

    let side = rows.iter().find(|r| r.branch_id == b2).unwrap();
    assert_eq!(side.transaction_count, 1);
    assert_eq!(side.total_credit, dec!(97));
}

#[tokio::test]
async fn test_rerun_inserts_nothing() {
    let (client, b1, b2) = (PartyId::new(), BranchId::new(), BranchId::new());
    let store = Arc::new(seeded_store(client, b1, b2));
    let clock = Arc::new(ManualClock::new(at(2, 0, 5)));
    let aggregator = DailyAggregator::new(store.clone(), clock, chrono_tz::UTC, NaiveTime::MIN);

    aggregator.run_for(march_first()).await.unwrap();
    let first = store.list_daily_summaries(march_first()).await.unwrap();

    let RunOutcome::Completed(report) = aggregator.run_previous_day().await.unwrap() else {
        panic!("run was skipped");
    };
    assert_eq!(report.date, march_first());
    assert_eq!(report.inserted, 0);
    assert_eq!(report.skipped_existing, 2);
    assert_eq!(store.list_daily_summaries(march_first()).await.unwrap(), first);
}

#[tokio::test]
async fn test_local_day_in_other_zone() {
    // Kolkata midnight on Mar 1 is 18:30 UTC on Feb 28, so the 23:59 UTC debit
    // belongs to Mar 2 local time.
    let (client, b1, b2) = (PartyId::new(), BranchId::new(), BranchId::new());
    let store = Arc::new(seeded_store(client, b1, b2));
    let clock = Arc::new(ManualClock::new(at(2, 0, 5)));
    let aggregator = DailyAggregator::new(store.clone(), clock, chrono_tz::Asia::Kolkata, NaiveTime::MIN);

    aggregator.run_for(march_first()).await.unwrap();
    let rows = store.list_daily_summaries(march_first()).await.unwrap();
    let total: i64 = rows.iter().map(|r| r.transaction_count).sum();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn test_empty_day_writes_nothing() {
    let store = Arc::new(MemoryStore::session());
    let clock = Arc::new(ManualClock::new(at(2, 0, 5)));
    let aggregator = DailyAggregator::new(store.clone(), clock, chrono_tz::UTC, NaiveTime::MIN);
    let RunOutcome::Completed(report) = aggregator.run_for(march_first()).await.unwrap() else {
        panic!("run was skipped");
    };
    assert_eq!(report.groups, 0);
    assert_eq!(report.inserted, 0);
}

#[tokio::test]
async fn test_scheduled_loop_stops_on_shutdown() {
    let store = Arc::new(MemoryStore::session());
    let clock = Arc::new(ManualClock::new(at(2, 10, 0)));
    let aggregator = Arc::new(DailyAggregator::new(store, clock, chrono_tz::UTC, NaiveTime::MIN));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = {
        let aggregator = Arc::clone(&aggregator);
        tokio::spawn(async move { aggregator.run_scheduled(shutdown_rx).await })
    };
    tokio::time::sleep(Duration::milliseconds(20).to_std().unwrap()).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(1), task)
        .await
        .expect("loop did not stop")
        .unwrap();
}

/// Wall time that advances with the tokio clock, so a paused runtime drives both.
struct TokioClock {
    base: DateTime<Utc>,
    start: Instant,
}

impl TokioClock {
    fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            start: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + Duration::from_std(self.start.elapsed()).unwrap()
    }
}

/// Memory store whose first `failures` range reads fail.
struct FlakyStore {
    inner: MemoryStore,
    failures: AtomicUsize,
    attempts: AtomicUsize,
}

#[async_trait]
impl TransactionStore for FlakyStore {
    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        self.inner.find_transaction(id).await
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Transaction>, StoreError> {
        self.inner.list_transactions(filter, page).await
    }

    async fn transaction_totals(&self, filter: &TransactionFilter) -> Result<TransactionTotals, StoreError> {
        self.inner.transaction_totals(filter).await
    }

    async fn summarize_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<SummaryGroup>, StoreError> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        let failing = self
            .failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Backend("connection reset".into()));
        }
        self.inner.summarize_range(from, to).await
    }
}

#[async_trait]
impl SummaryStore for FlakyStore {
    async fn insert_daily_summaries(&self, rows: &[DailySummary]) -> Result<u64, StoreError> {
        self.inner.insert_daily_summaries(rows).await
    }

    async fn list_daily_summaries(&self, date: NaiveDate) -> Result<Vec<DailySummary>, StoreError> {
        self.inner.list_daily_summaries(date).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_loop_survives_failed_run() {
    let (client, branch) = (PartyId::new(), BranchId::new());
    let inner = MemoryStore::session();
    let completed = TransactionStatus::Completed;
    for (n, day) in [(10, 2), (11, 3)] {
        let tx = record(client, branch, TransactionKind::Credit, dec!(970), dec!(30), at(day, 12, 0), completed, n);
        inner.insert_committed(tx).unwrap();
    }
    let store = Arc::new(FlakyStore {
        inner: inner.clone(),
        failures: AtomicUsize::new(1),
        attempts: AtomicUsize::new(0),
    });
    let clock = Arc::new(TokioClock::new(at(2, 18, 0)));
    let aggregator = Arc::new(DailyAggregator::new(store.clone(), clock, chrono_tz::UTC, NaiveTime::MIN));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = {
        let aggregator = Arc::clone(&aggregator);
        tokio::spawn(async move { aggregator.run_scheduled(shutdown_rx).await })
    };

    // Ticks at Mar 3 00:00 (Mar 2, fails) and Mar 4 00:00 (Mar 3).
    tokio::time::sleep(std::time::Duration::from_secs(36 * 3600)).await;
    assert_eq!(store.attempts.load(Ordering::Acquire), 2);

    let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
    assert!(inner.list_daily_summaries(day(2)).await.unwrap().is_empty());
    let rows = inner.list_daily_summaries(day(3)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].party_id, client);
    assert_eq!(rows[0].total_credit, dec!(970));

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
