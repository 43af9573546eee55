//! Property-based tests for commission and reversal math.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::commission::{CommissionBreakdown, reverse_balance};
use super::types::TransactionKind;

/// Amounts from 0.01 to 10,000,000.00.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Rates from 0.00 to 100.00 percent.
fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000i64).prop_map(|bps| Decimal::new(bps, 2))
}

/// Balances from -1,000,000.00 to 1,000,000.00.
fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (-100_000_000i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![Just(TransactionKind::Credit), Just(TransactionKind::Debit)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Commission and final amount always add back to the requested amount.
    #[test]
    fn prop_split_is_exact(amount in amount_strategy(), rate in rate_strategy()) {
        let b = CommissionBreakdown::compute(amount, rate).unwrap();
        prop_assert_eq!(b.commission + b.final_amount, amount);
        prop_assert!(b.commission.scale() <= 2);
        prop_assert!(b.commission >= Decimal::ZERO);
        prop_assert!(b.final_amount >= Decimal::ZERO);
    }

    /// Commission never exceeds half a cent of the exact percentage.
    #[test]
    fn prop_rounding_error_bounded(amount in amount_strategy(), rate in rate_strategy()) {
        let exact = amount * rate / Decimal::ONE_HUNDRED;
        let b = CommissionBreakdown::compute(amount, rate).unwrap();
        prop_assert!((b.commission - exact).abs() <= Decimal::new(5, 3));
    }

    /// The balance delta matches the kind's sign.
    #[test]
    fn prop_delta_sign(
        amount in amount_strategy(),
        rate in rate_strategy(),
        balance in balance_strategy(),
        kind in kind_strategy(),
    ) {
        let b = CommissionBreakdown::compute(amount, rate).unwrap();
        let after = b.apply_to(balance, kind).unwrap();
        match kind {
            TransactionKind::Credit => prop_assert_eq!(after - balance, b.final_amount),
            TransactionKind::Debit => prop_assert_eq!(balance - after, b.final_amount),
        }
    }

    /// Reversing immediately after applying restores the balance exactly.
    #[test]
    fn prop_reversal_restores_balance(
        amount in amount_strategy(),
        rate in rate_strategy(),
        balance in balance_strategy(),
        kind in kind_strategy(),
    ) {
        let b = CommissionBreakdown::compute(amount, rate).unwrap();
        let after = b.apply_to(balance, kind).unwrap();
        prop_assert_eq!(reverse_balance(after, kind, b.final_amount).unwrap(), balance);
    }
}
