//! In-memory store.
//!
//! Backs tests and local runs. Session units take a per-party async mutex in
//! `lock_party`, stage their writes, and apply them at commit. Best-effort
//! units write straight through and take no locks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use tokio::sync::OwnedMutexGuard;

use cashdesk_shared::types::{BranchId, PageRequest, PageResponse, PartyId, TransactionId};

use crate::aggregation::{DailySummary, SummaryGroup, group_transactions};
use crate::audit::AuditEntry;
use crate::ledger::commission::{PolicyUpdate, RatePolicy};
use crate::ledger::types::{Branch, Party, Transaction, TransactionFilter, TransactionTotals};

use super::{
    AtomicStore, AtomicUnit, Atomicity, AuditRecorder, BranchDirectory, PartyDirectory, PolicyStore,
    StoreError, SummaryStore, TransactionStore,
};

type SummaryKey = (NaiveDate, PartyId, BranchId);

#[derive(Default)]
struct Faults {
    failing_balance_saves: AtomicUsize,
    lock_delay_ms: AtomicU64,
    begin_delay_ms: AtomicU64,
}

struct Inner {
    atomicity: Atomicity,
    parties: DashMap<PartyId, Party>,
    branches: DashMap<BranchId, Branch>,
    transactions: DashMap<TransactionId, Transaction>,
    utr_index: DashMap<String, TransactionId>,
    summaries: DashMap<SummaryKey, DailySummary>,
    policy: Mutex<Option<RatePolicy>>,
    audit: Mutex<Vec<AuditEntry>>,
    party_locks: DashMap<PartyId, Arc<tokio::sync::Mutex<()>>>,
    faults: Faults,
}

impl Inner {
    fn reserve_utr(&self, tx: &Transaction) -> Result<(), StoreError> {
        match self.utr_index.entry(tx.utr_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::UniqueViolation {
                key: "utr_id",
                value: tx.utr_id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(tx.id);
                Ok(())
            }
        }
    }

    fn remove_transaction(&self, id: TransactionId) -> bool {
        match self.transactions.remove(&id) {
            Some((_, tx)) => {
                self.utr_index.remove(&tx.utr_id);
                true
            }
            None => false,
        }
    }

    fn take_balance_fault(&self) -> bool {
        self.faults
            .failing_balance_saves
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn lock_delay(&self) {
        delay(&self.faults.lock_delay_ms).await;
    }

    fn sorted_matches(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        rows
    }
}

async fn delay(ms: &AtomicU64) {
    let ms = ms.load(Ordering::Acquire);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

fn store_ms(slot: &AtomicU64, delay: Duration) {
    slot.store(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), Ordering::Release);
}

/// Thread-safe in-memory implementation of every store trait.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Creates an empty store whose units run in `atomicity` mode.
    #[must_use]
    pub fn new(atomicity: Atomicity) -> Self {
        Self {
            inner: Arc::new(Inner {
                atomicity,
                parties: DashMap::new(),
                branches: DashMap::new(),
                transactions: DashMap::new(),
                utr_index: DashMap::new(),
                summaries: DashMap::new(),
                policy: Mutex::new(None),
                audit: Mutex::new(Vec::new()),
                party_locks: DashMap::new(),
                faults: Faults::default(),
            }),
        }
    }

    /// Store with session units.
    #[must_use]
    pub fn session() -> Self {
        Self::new(Atomicity::Session)
    }

    /// Store with best-effort units.
    #[must_use]
    pub fn best_effort() -> Self {
        Self::new(Atomicity::BestEffort)
    }

    /// Adds or replaces a party.
    pub fn insert_party(&self, party: Party) {
        self.inner.parties.insert(party.id, party);
    }

    /// Adds or replaces a branch.
    pub fn insert_branch(&self, branch: Branch) {
        self.inner.branches.insert(branch.id, branch);
    }

    /// Adds a committed transaction directly, bypassing the ledger.
    pub fn insert_committed(&self, tx: Transaction) -> Result<(), StoreError> {
        self.inner.reserve_utr(&tx)?;
        self.inner.transactions.insert(tx.id, tx);
        Ok(())
    }

    /// Current balance of a party.
    #[must_use]
    pub fn party_balance(&self, id: PartyId) -> Option<Decimal> {
        self.inner.parties.get(&id).map(|p| p.balance)
    }

    /// Number of stored transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.inner.transactions.len()
    }

    /// Snapshot of recorded audit entries.
    #[must_use]
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner
            .audit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Makes the next `count` balance saves fail.
    pub fn fail_balance_saves(&self, count: usize) {
        self.inner
            .faults
            .failing_balance_saves
            .store(count, Ordering::Release);
    }

    /// Delays every `lock_party` call.
    pub fn set_lock_delay(&self, delay: Duration) {
        store_ms(&self.inner.faults.lock_delay_ms, delay);
    }

    /// Delays every `begin` call, like a pool with no free connection.
    pub fn set_begin_delay(&self, delay: Duration) {
        store_ms(&self.inner.faults.begin_delay_ms, delay);
    }

    /// Stored policy, without bootstrapping one.
    #[must_use]
    pub fn stored_policy(&self) -> Option<RatePolicy> {
        self.inner
            .policy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PartyDirectory for MemoryStore {
    async fn find_party(&self, id: PartyId) -> Result<Option<Party>, StoreError> {
        Ok(self.inner.parties.get(&id).map(|p| p.clone()))
    }
}

#[async_trait]
impl BranchDirectory for MemoryStore {
    async fn find_branch(&self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        Ok(self.inner.branches.get(&id).map(|b| b.clone()))
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.inner.transactions.get(&id).map(|t| t.clone()))
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Transaction>, StoreError> {
        let page = page.normalized();
        let rows = self.inner.sorted_matches(filter);
        let total = rows.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let data = rows.into_iter().skip(offset).take(limit).collect();
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    async fn transaction_totals(&self, filter: &TransactionFilter) -> Result<TransactionTotals, StoreError> {
        Ok(self.inner.sorted_matches(filter).iter().collect())
    }

    async fn summarize_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SummaryGroup>, StoreError> {
        let filter = TransactionFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        };
        let rows = self.inner.sorted_matches(&filter);
        Ok(group_transactions(&rows))
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn insert_daily_summaries(&self, rows: &[DailySummary]) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for row in rows {
            if let Entry::Vacant(slot) = self.inner.summaries.entry(row.key()) {
                slot.insert(row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn list_daily_summaries(&self, date: NaiveDate) -> Result<Vec<DailySummary>, StoreError> {
        let mut rows: Vec<DailySummary> = self
            .inner
            .summaries
            .iter()
            .filter(|entry| entry.key().0 == date)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|r| (r.party_id, r.branch_id));
        Ok(rows)
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn current_policy(&self) -> Result<RatePolicy, StoreError> {
        let mut policy = self.inner.policy.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(policy.get_or_insert_with(|| RatePolicy::bootstrap(Utc::now())).clone())
    }

    async fn update_policy(
        &self,
        update: &PolicyUpdate,
        by: PartyId,
        now: DateTime<Utc>,
    ) -> Result<RatePolicy, StoreError> {
        let mut policy = self.inner.policy.lock().unwrap_or_else(PoisonError::into_inner);
        let next = policy
            .get_or_insert_with(|| RatePolicy::bootstrap(now))
            .merged(update, by, now);
        *policy = Some(next.clone());
        Ok(next)
    }
}

#[async_trait]
impl AuditRecorder for MemoryStore {
    async fn record(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.inner
            .audit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl AtomicStore for MemoryStore {
    fn atomicity(&self) -> Atomicity {
        self.inner.atomicity
    }

    async fn begin(&self) -> Result<Box<dyn AtomicUnit>, StoreError> {
        delay(&self.inner.faults.begin_delay_ms).await;
        let inner = Arc::clone(&self.inner);
        Ok(match self.inner.atomicity {
            Atomicity::Session => Box::new(SessionUnit::new(inner)),
            Atomicity::BestEffort => Box::new(BestEffortUnit { inner, wrote: false }),
        })
    }
}

// ========== Session unit ==========

struct SessionUnit {
    inner: Arc<Inner>,
    guards: Vec<(PartyId, OwnedMutexGuard<()>)>,
    inserted: Vec<Transaction>,
    deleted: Vec<TransactionId>,
    balances: HashMap<PartyId, Decimal>,
}

impl SessionUnit {
    fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            guards: Vec::new(),
            inserted: Vec::new(),
            deleted: Vec::new(),
            balances: HashMap::new(),
        }
    }

    fn staged_party(&self, id: PartyId) -> Option<Party> {
        let mut party = self.inner.parties.get(&id).map(|p| p.clone())?;
        if let Some(balance) = self.balances.get(&id) {
            party.balance = *balance;
        }
        Some(party)
    }
}

#[async_trait]
impl AtomicUnit for SessionUnit {
    async fn find_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError> {
        Ok(self.staged_party(id))
    }

    async fn find_branch(&mut self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        Ok(self.inner.branches.get(&id).map(|b| b.clone()))
    }

    async fn lock_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError> {
        if !self.guards.iter().any(|(held, _)| *held == id) {
            self.inner.lock_delay().await;
            let lock = Arc::clone(self.inner.party_locks.entry(id).or_default().value());
            let guard = lock.lock_owned().await;
            self.guards.push((id, guard));
        }
        Ok(self.staged_party(id))
    }

    async fn insert_transaction(&mut self, tx: &Transaction) -> Result<(), StoreError> {
        let taken = self.inner.utr_index.contains_key(&tx.utr_id)
            || self.inserted.iter().any(|t| t.utr_id == tx.utr_id);
        if taken {
            return Err(StoreError::UniqueViolation {
                key: "utr_id",
                value: tx.utr_id.clone(),
            });
        }
        self.inserted.push(tx.clone());
        Ok(())
    }

    async fn find_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        if self.deleted.contains(&id) {
            return Ok(None);
        }
        if let Some(tx) = self.inserted.iter().find(|t| t.id == id) {
            return Ok(Some(tx.clone()));
        }
        Ok(self.inner.transactions.get(&id).map(|t| t.clone()))
    }

    async fn delete_transaction(&mut self, id: TransactionId) -> Result<bool, StoreError> {
        if self.deleted.contains(&id) {
            return Ok(false);
        }
        if let Some(pos) = self.inserted.iter().position(|t| t.id == id) {
            self.inserted.remove(pos);
            return Ok(true);
        }
        if self.inner.transactions.contains_key(&id) {
            self.deleted.push(id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn save_balance(&mut self, id: PartyId, balance: Decimal) -> Result<(), StoreError> {
        if self.inner.take_balance_fault() {
            return Err(StoreError::Aborted(format!("balance save failed for party {id}")));
        }
        self.balances.insert(id, balance);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let inner = &self.inner;

        // Reserve every reference before touching anything else.
        let mut reserved: Vec<&Transaction> = Vec::with_capacity(self.inserted.len());
        for tx in &self.inserted {
            if let Err(e) = inner.reserve_utr(tx) {
                for done in reserved {
                    inner.utr_index.remove(&done.utr_id);
                }
                return Err(e);
            }
            reserved.push(tx);
        }

        for id in &self.deleted {
            if !inner.remove_transaction(*id) {
                tracing::warn!(transaction_id = %id, "Staged delete found no row at commit");
            }
        }
        for tx in &self.inserted {
            inner.transactions.insert(tx.id, tx.clone());
        }
        for (id, balance) in &self.balances {
            if let Some(mut party) = inner.parties.get_mut(id) {
                party.balance = *balance;
            }
        }
        // Guards drop with `self`, after every write is visible.
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

// ========== Best-effort unit ==========

struct BestEffortUnit {
    inner: Arc<Inner>,
    wrote: bool,
}

impl BestEffortUnit {
    fn fail(&self, msg: String) -> StoreError {
        if self.wrote {
            StoreError::PartialWrite(msg)
        } else {
            StoreError::Backend(msg)
        }
    }
}

#[async_trait]
impl AtomicUnit for BestEffortUnit {
    async fn find_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError> {
        Ok(self.inner.parties.get(&id).map(|p| p.clone()))
    }

    async fn find_branch(&mut self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        Ok(self.inner.branches.get(&id).map(|b| b.clone()))
    }

    async fn lock_party(&mut self, id: PartyId) -> Result<Option<Party>, StoreError> {
        self.inner.lock_delay().await;
        Ok(self.inner.parties.get(&id).map(|p| p.clone()))
    }

    async fn insert_transaction(&mut self, tx: &Transaction) -> Result<(), StoreError> {
        self.inner.reserve_utr(tx)?;
        self.inner.transactions.insert(tx.id, tx.clone());
        self.wrote = true;
        Ok(())
    }

    async fn find_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.inner.transactions.get(&id).map(|t| t.clone()))
    }

    async fn delete_transaction(&mut self, id: TransactionId) -> Result<bool, StoreError> {
        let removed = self.inner.remove_transaction(id);
        self.wrote |= removed;
        Ok(removed)
    }

    async fn save_balance(&mut self, id: PartyId, balance: Decimal) -> Result<(), StoreError> {
        if self.inner.take_balance_fault() {
            return Err(self.fail(format!("balance save failed for party {id}")));
        }
        match self.inner.parties.get_mut(&id) {
            Some(mut party) => party.balance = balance,
            None => return Err(self.fail(format!("party {id} vanished before balance save"))),
        }
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
