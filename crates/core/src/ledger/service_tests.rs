use super::*;
use std::time::Duration as StdDuration;

use cashdesk_shared::types::{BranchId, PartyId};
use chrono::TimeZone;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::clock::ManualClock;
use crate::ledger::commission::MONEY_LIMIT;
use crate::ledger::types::{Branch, Party, TransactionKind};
use crate::store::MemoryStore;

struct Harness {
    service: LedgerService,
    store: MemoryStore,
    clock: Arc<ManualClock>,
    policy: RatePolicy,
    client: PartyId,
    staff: PartyId,
    branch: BranchId,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

fn harness_with(store: MemoryStore, settings: LedgerSettings) -> Harness {
    let client = PartyId::new();
    let staff = PartyId::new();
    let branch = BranchId::new();
    store.insert_party(Party {
        id: client,
        name: "Client".into(),
        role: PartyRole::Client,
        balance: Decimal::ZERO,
        is_active: true,
        branches: vec![],
    });
    store.insert_party(Party {
        id: staff,
        name: "Staff".into(),
        role: PartyRole::Staff,
        balance: Decimal::ZERO,
        is_active: true,
        branches: vec![branch],
    });
    store.insert_branch(Branch {
        id: branch,
        name: "Main".into(),
        code: "MAIN".into(),
        client_id: client,
        is_active: true,
        staff_members: vec![staff],
    });

    let clock = Arc::new(ManualClock::new(start()));
    let (audit, _worker) = AuditQueue::spawn(Arc::new(store.clone()), 64);
    let service = LedgerService::new(Arc::new(store.clone()), audit, clock.clone(), settings);
    Harness {
        service,
        store,
        clock,
        policy: RatePolicy::bootstrap(start()),
        client,
        staff,
        branch,
    }
}

fn harness() -> Harness {
    harness_with(MemoryStore::session(), LedgerSettings::default())
}

impl Harness {
    fn input(&self, kind: TransactionKind, amount: Decimal, utr: &str) -> CreateTransactionInput {
        CreateTransactionInput {
            client_id: self.client,
            staff_id: self.staff,
            branch_id: self.branch,
            kind,
            amount,
            remark: Some("  counter 3 ".into()),
            utr_id: utr.into(),
        }
    }

    async fn create(&self, kind: TransactionKind, amount: Decimal, utr: &str) -> Result<Transaction, LedgerError> {
        self.service
            .create_transaction(self.input(kind, amount, utr), &self.policy, RequestMeta::default())
            .await
    }

    fn as_staff(&self) -> Requester {
        Requester::new(self.staff, PartyRole::Staff)
    }

    fn balance(&self) -> Decimal {
        self.store.party_balance(self.staff).unwrap()
    }

    async fn wait_for_audit(&self, count: usize) -> Vec<AuditEntry> {
        for _ in 0..100 {
            let entries = self.store.audit_entries();
            if entries.len() >= count {
                return entries;
            }
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
        self.store.audit_entries()
    }
}

#[tokio::test]
async fn test_full_cycle_restores_zero_balance() {
    let h = harness();

    let credit = h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap();
    assert_eq!(credit.commission, dec!(30.00));
    assert_eq!(credit.final_amount, dec!(970.00));
    assert_eq!(credit.balance_after, dec!(970.00));
    assert_eq!(credit.remark, "counter 3");
    assert_eq!(h.balance(), dec!(970.00));

    let debit = h.create(TransactionKind::Debit, dec!(500), "UTR0000000002").await.unwrap();
    assert_eq!(debit.commission, dec!(15.00));
    assert_eq!(debit.final_amount, dec!(485.00));
    assert_eq!(debit.balance_before, dec!(970.00));
    assert_eq!(debit.balance_after, dec!(485.00));

    let reversed = h
        .service
        .reverse_transaction(debit.id, h.as_staff(), RequestMeta::default())
        .await
        .unwrap();
    assert_eq!(reversed.old_balance, dec!(485.00));
    assert_eq!(reversed.new_balance, dec!(970.00));
    assert_eq!(h.balance(), dec!(970.00));

    h.service
        .reverse_transaction(credit.id, h.as_staff(), RequestMeta::default())
        .await
        .unwrap();
    assert_eq!(h.balance(), dec!(0.00));
    assert_eq!(h.store.transaction_count(), 0);
}

#[tokio::test]
async fn test_debit_may_go_negative() {
    let h = harness();
    let debit = h.create(TransactionKind::Debit, dec!(100), "UTR0000000001").await.unwrap();
    assert_eq!(debit.balance_after, dec!(-97.00));
    assert_eq!(h.balance(), dec!(-97.00));
}

#[tokio::test]
async fn test_amount_checked_before_reference() {
    let h = harness();
    let err = h.create(TransactionKind::Credit, dec!(0), "bad").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let err = h.create(TransactionKind::Credit, dec!(10), "bad-ref").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidReference(_)));
}

#[tokio::test]
async fn test_party_and_branch_checks() {
    let h = harness();

    let mut input = h.input(TransactionKind::Credit, dec!(10), "UTR0000000001");
    input.client_id = h.staff;
    let err = h
        .service
        .create_transaction(input, &h.policy, RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidParty { role: "client", .. }));

    let mut input = h.input(TransactionKind::Credit, dec!(10), "UTR0000000001");
    input.branch_id = BranchId::new();
    let err = h
        .service
        .create_transaction(input, &h.policy, RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InactiveBranch(_)));

    let other_branch = BranchId::new();
    h.store.insert_branch(Branch {
        id: other_branch,
        name: "Side".into(),
        code: "SIDE".into(),
        client_id: h.client,
        is_active: true,
        staff_members: vec![],
    });
    let mut input = h.input(TransactionKind::Credit, dec!(10), "UTR0000000001");
    input.branch_id = other_branch;
    let err = h
        .service
        .create_transaction(input, &h.policy, RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnauthorizedBranchAccess { .. }));

    assert_eq!(h.store.transaction_count(), 0);
    assert_eq!(h.balance(), Decimal::ZERO);
}

#[tokio::test]
async fn test_duplicate_reference_leaves_balance() {
    let h = harness();
    h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap();
    let err = h.create(TransactionKind::Credit, dec!(50), "UTR0000000001").await.unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateReference(_)));
    assert_eq!(err.http_status_code(), 409);
    assert_eq!(h.balance(), dec!(970.00));
    assert_eq!(h.store.transaction_count(), 1);
}

#[tokio::test]
async fn test_staff_reversal_window() {
    let h = harness();
    let tx = h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap();

    h.clock.advance(chrono::Duration::hours(24) + chrono::Duration::seconds(1));
    let err = h
        .service
        .reverse_transaction(tx.id, h.as_staff(), RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ReversalWindowExpired { age_hours: 24, .. }));
    assert_eq!(h.balance(), dec!(970.00));

    let admin = Requester::new(PartyId::new(), PartyRole::Admin);
    h.service
        .reverse_transaction(tx.id, admin, RequestMeta::default())
        .await
        .unwrap();
    assert_eq!(h.balance(), Decimal::ZERO);
}

#[tokio::test]
async fn test_reversal_authorization() {
    let h = harness();
    let tx = h.create(TransactionKind::Credit, dec!(100), "UTR0000000001").await.unwrap();

    let client = Requester::new(h.client, PartyRole::Client);
    let err = h
        .service
        .reverse_transaction(tx.id, client, RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));

    let other_staff = Requester::new(PartyId::new(), PartyRole::Staff);
    let err = h
        .service
        .reverse_transaction(tx.id, other_staff, RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
}

#[tokio::test]
async fn test_second_reversal_is_not_found() {
    let h = harness();
    let tx = h.create(TransactionKind::Debit, dec!(100), "UTR0000000001").await.unwrap();
    h.service
        .reverse_transaction(tx.id, h.as_staff(), RequestMeta::default())
        .await
        .unwrap();
    let err = h
        .service
        .reverse_transaction(tx.id, h.as_staff(), RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    assert_eq!(h.balance(), Decimal::ZERO);
}

#[tokio::test]
async fn test_get_transaction_visibility() {
    let h = harness();
    let tx = h.create(TransactionKind::Credit, dec!(100), "UTR0000000001").await.unwrap();

    assert!(h.service.get_transaction(tx.id, h.as_staff()).await.is_ok());
    let client = Requester::new(h.client, PartyRole::Client);
    assert!(h.service.get_transaction(tx.id, client).await.is_ok());

    let stranger = Requester::new(PartyId::new(), PartyRole::Client);
    assert!(matches!(
        h.service.get_transaction(tx.id, stranger).await,
        Err(LedgerError::Forbidden(_))
    ));
    assert!(matches!(
        h.service.get_transaction(TransactionId::new(), h.as_staff()).await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_is_scoped_and_newest_first() {
    let h = harness();
    let first = h.create(TransactionKind::Credit, dec!(100), "UTR0000000001").await.unwrap();
    h.clock.advance(chrono::Duration::minutes(1));
    let second = h.create(TransactionKind::Debit, dec!(10), "UTR0000000002").await.unwrap();

    let page = h
        .service
        .list_transactions(TransactionFilter::default(), PageRequest::default(), h.as_staff())
        .await
        .unwrap();
    assert_eq!(page.meta.total, 2);
    assert_eq!(page.data[0].id, second.id);
    assert_eq!(page.data[1].id, first.id);

    let stranger = Requester::new(PartyId::new(), PartyRole::Staff);
    let page = h
        .service
        .list_transactions(TransactionFilter::default(), PageRequest::default(), stranger)
        .await
        .unwrap();
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn test_audit_entries_emitted() {
    let h = harness();
    let meta = RequestMeta {
        ip_address: Some("10.0.0.7".into()),
        user_agent: Some("till/1.0".into()),
    };
    let tx = h
        .service
        .create_transaction(h.input(TransactionKind::Credit, dec!(1000), "UTR0000000001"), &h.policy, meta.clone())
        .await
        .unwrap();
    h.service
        .reverse_transaction(tx.id, h.as_staff(), meta)
        .await
        .unwrap();

    let entries = h.wait_for_audit(2).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, AuditAction::TransactionCredit);
    assert_eq!(entries[0].details["finalAmount"], json!("970.00"));
    assert_eq!(entries[0].ip_address.as_deref(), Some("10.0.0.7"));
    assert_eq!(entries[1].action, AuditAction::DeleteTransaction);
    assert_eq!(entries[1].details["newStaffBalance"], json!("0.00"));
    assert_eq!(entries[1].resource_type, "transaction");
}

#[tokio::test]
async fn test_best_effort_balance_failure_is_partial() {
    let h = harness_with(MemoryStore::best_effort(), LedgerSettings::default());
    h.store.fail_balance_saves(1);

    let err = h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap_err();
    assert!(matches!(err, LedgerError::PartialFailure(_)));
    assert!(!err.is_retryable());
    // record stays behind without its balance change
    assert_eq!(h.store.transaction_count(), 1);
    assert_eq!(h.balance(), Decimal::ZERO);
}

#[tokio::test]
async fn test_best_effort_duplicate_fails_cleanly() {
    let h = harness_with(MemoryStore::best_effort(), LedgerSettings::default());
    h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap();
    let err = h.create(TransactionKind::Credit, dec!(10), "UTR0000000001").await.unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateReference(_)));
    assert_eq!(h.balance(), dec!(970.00));
}

#[tokio::test]
async fn test_session_balance_failure_rolls_back() {
    let h = harness();
    h.store.fail_balance_saves(1);

    let err = h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap_err();
    assert!(matches!(err, LedgerError::Consistency(_)));
    assert!(err.is_retryable());
    assert_eq!(h.store.transaction_count(), 0);
    assert_eq!(h.balance(), Decimal::ZERO);

    h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap();
    assert_eq!(h.balance(), dec!(970.00));
}

#[tokio::test]
async fn test_unit_timeout_rolls_back() {
    let settings = LedgerSettings {
        unit_timeout: StdDuration::from_millis(20),
        ..LedgerSettings::default()
    };
    let h = harness_with(MemoryStore::session(), settings);
    h.store.set_lock_delay(StdDuration::from_millis(500));

    let err = h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap_err();
    assert!(matches!(err, LedgerError::Timeout(20)));
    assert_eq!(err.http_status_code(), 504);
    assert_eq!(h.store.transaction_count(), 0);

    h.store.set_lock_delay(StdDuration::ZERO);
    h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap();
}

#[tokio::test]
async fn test_begin_wait_counts_against_deadline() {
    let settings = LedgerSettings {
        unit_timeout: StdDuration::from_millis(20),
        ..LedgerSettings::default()
    };
    let h = harness_with(MemoryStore::session(), settings);
    let credit = h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap();

    h.store.set_begin_delay(StdDuration::from_millis(500));
    let err = h.create(TransactionKind::Credit, dec!(1000), "UTR0000000002").await.unwrap_err();
    assert!(matches!(err, LedgerError::Timeout(20)));

    let err = h
        .service
        .reverse_transaction(credit.id, h.as_staff(), RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Timeout(20)));
    assert_eq!(h.store.transaction_count(), 1);
    assert_eq!(h.balance(), dec!(970.00));
}

#[tokio::test]
async fn test_oversized_amount_rejected() {
    let h = harness();
    for amount in [Decimal::MAX, dec!(1000000000000000000)] {
        let err = h.create(TransactionKind::Credit, amount, "UTR0000000001").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(a) if a == amount));
    }
    assert_eq!(h.store.transaction_count(), 0);
}

#[tokio::test]
async fn test_balance_limit_rejects_and_leaves_state() {
    let h = harness();
    let near_limit = MONEY_LIMIT - dec!(1);
    h.store.insert_party(Party {
        id: h.staff,
        name: "Staff".into(),
        role: PartyRole::Staff,
        balance: near_limit,
        is_active: true,
        branches: vec![h.branch],
    });

    let err = h.create(TransactionKind::Credit, dec!(1000), "UTR0000000001").await.unwrap_err();
    assert!(matches!(err, LedgerError::BalanceOutOfRange(b) if b == near_limit));
    assert_eq!(err.http_status_code(), 400);
    assert_eq!(h.balance(), near_limit);
    assert_eq!(h.store.transaction_count(), 0);
}
