//! Property-based tests for amount and reference validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::validation::{validate_amount, validate_utr};

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any positive amount with two decimals is accepted.
    #[test]
    fn prop_positive_cents_accepted(amount in positive_amount()) {
        prop_assert!(validate_amount(amount).is_ok());
    }

    /// Non-positive amounts are rejected.
    #[test]
    fn prop_non_positive_rejected(cents in 0i64..100_000_000i64) {
        let amount = Decimal::new(-cents, 2);
        prop_assert!(matches!(validate_amount(amount), Err(LedgerError::InvalidAmount(_))));
    }

    /// A third significant decimal place is rejected.
    #[test]
    fn prop_three_decimals_rejected(mills in 1i64..100_000_000i64) {
        prop_assume!(mills % 10 != 0);
        let amount = Decimal::new(mills, 3);
        prop_assert!(validate_amount(amount).is_err());
    }

    /// Alphanumeric references of valid length are accepted.
    #[test]
    fn prop_utr_pattern_accepted(utr in "[A-Za-z0-9]{10,22}") {
        prop_assert!(validate_utr(&utr).is_ok());
    }

    /// References outside the length bounds are rejected.
    #[test]
    fn prop_utr_length_rejected(utr in "[A-Za-z0-9]{0,9}|[A-Za-z0-9]{23,40}") {
        prop_assert!(matches!(validate_utr(&utr), Err(LedgerError::InvalidReference(_))));
    }

    /// A single non-alphanumeric character invalidates a reference.
    #[test]
    fn prop_utr_symbol_rejected(prefix in "[A-Za-z0-9]{5,10}", symbol in "[-_ ./#]", suffix in "[A-Za-z0-9]{5,10}") {
        let utr = format!("{prefix}{symbol}{suffix}");
        prop_assert!(validate_utr(&utr).is_err());
    }
}
