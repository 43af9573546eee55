//! Commission policy and balance math.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use cashdesk_shared::types::PartyId;

use super::error::LedgerError;
use super::types::TransactionKind;

/// Scale of every money value.
pub const MONEY_SCALE: u32 = 2;

/// Rate applied on first read when no policy exists yet.
pub const DEFAULT_RATE: Decimal = dec!(3);

/// Exclusive bound on the magnitude of amounts and balances: 18 integer
/// digits, as in a `NUMERIC(20, 2)` column.
pub const MONEY_LIMIT: Decimal = dec!(1000000000000000000);

const MAX_RATE: Decimal = dec!(100);

/// The singleton commission policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePolicy {
    /// Percentage withheld from debits.
    pub commission_rate: Decimal,
    /// Percentage withheld from credits.
    pub deposit_deduction_rate: Decimal,
    /// Admin who last changed the policy.
    pub updated_by: Option<PartyId>,
    /// Time of the last change.
    pub updated_at: DateTime<Utc>,
}

impl RatePolicy {
    /// The bootstrap policy: 3% both ways.
    #[must_use]
    pub fn bootstrap(now: DateTime<Utc>) -> Self {
        Self {
            commission_rate: DEFAULT_RATE,
            deposit_deduction_rate: DEFAULT_RATE,
            updated_by: None,
            updated_at: now,
        }
    }

    /// Rate that applies to a transaction kind.
    #[must_use]
    pub const fn rate_for(&self, kind: TransactionKind) -> Decimal {
        match kind {
            TransactionKind::Credit => self.deposit_deduction_rate,
            TransactionKind::Debit => self.commission_rate,
        }
    }

    /// Returns a new policy with the update applied.
    ///
    /// Absent fields keep their current value.
    #[must_use]
    pub fn merged(&self, update: &PolicyUpdate, by: PartyId, now: DateTime<Utc>) -> Self {
        Self {
            commission_rate: update.commission_rate.unwrap_or(self.commission_rate),
            deposit_deduction_rate: update
                .deposit_deduction_rate
                .unwrap_or(self.deposit_deduction_rate),
            updated_by: Some(by),
            updated_at: now,
        }
    }
}

/// Partial policy change requested by an admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpdate {
    /// New debit rate.
    pub commission_rate: Option<Decimal>,
    /// New credit rate.
    pub deposit_deduction_rate: Option<Decimal>,
}

impl PolicyUpdate {
    /// Validates every supplied rate.
    pub fn validate(&self) -> Result<(), LedgerError> {
        for rate in [self.commission_rate, self.deposit_deduction_rate].into_iter().flatten() {
            validate_rate(rate)?;
        }
        Ok(())
    }
}

/// Validates a percentage rate: within `[0, 100]`, at most two decimal places.
pub fn validate_rate(rate: Decimal) -> Result<(), LedgerError> {
    if rate < Decimal::ZERO || rate > MAX_RATE || rate.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidRate(rate));
    }
    Ok(())
}

/// Commission split of a requested amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionBreakdown {
    /// Requested amount.
    pub amount: Decimal,
    /// Withheld commission, rounded half-to-even to two places.
    pub commission: Decimal,
    /// `amount - commission`, exact.
    pub final_amount: Decimal,
}

impl CommissionBreakdown {
    /// Splits `amount` at `rate` percent.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount` if the product overflows.
    pub fn compute(amount: Decimal, rate: Decimal) -> Result<Self, LedgerError> {
        let overflow = || LedgerError::InvalidAmount(amount);
        let mut scaled = amount;
        scaled.rescale(MONEY_SCALE);
        let mut commission = scaled
            .checked_mul(rate)
            .and_then(|product| product.checked_div(MAX_RATE))
            .ok_or_else(overflow)?
            .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
        commission.rescale(MONEY_SCALE);
        let final_amount = scaled.checked_sub(commission).ok_or_else(overflow)?;
        Ok(Self {
            amount: scaled,
            commission,
            final_amount,
        })
    }

    /// Splits `amount` with the policy rate for `kind`.
    ///
    /// # Errors
    ///
    /// See [`CommissionBreakdown::compute`].
    pub fn for_kind(amount: Decimal, kind: TransactionKind, policy: &RatePolicy) -> Result<Self, LedgerError> {
        Self::compute(amount, policy.rate_for(kind))
    }

    /// Staff balance after applying this breakdown.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::BalanceOutOfRange` if the result reaches [`MONEY_LIMIT`].
    pub fn apply_to(&self, balance: Decimal, kind: TransactionKind) -> Result<Decimal, LedgerError> {
        bounded_balance(balance, balance.checked_add(kind.signed(self.final_amount)))
    }
}

/// Staff balance after reversing a transaction of `kind` with `final_amount`.
///
/// # Errors
///
/// Returns `LedgerError::BalanceOutOfRange` if the result reaches [`MONEY_LIMIT`].
pub fn reverse_balance(balance: Decimal, kind: TransactionKind, final_amount: Decimal) -> Result<Decimal, LedgerError> {
    bounded_balance(balance, balance.checked_sub(kind.signed(final_amount)))
}

fn bounded_balance(balance: Decimal, next: Option<Decimal>) -> Result<Decimal, LedgerError> {
    next.filter(|b| b.abs() < MONEY_LIMIT)
        .ok_or(LedgerError::BalanceOutOfRange(balance))
}
