//! Reversal authorization and compensating balance math.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::commission::reverse_balance;
use super::error::LedgerError;
use super::types::{PartyRole, Requester, ReversalResult, Transaction};

/// Checks that `requester` may reverse `tx` at `now`.
///
/// Admins may reverse anything. Staff may reverse their own transactions
/// while they are no older than `window`. Everyone else is refused.
pub fn authorize_reversal(
    tx: &Transaction,
    requester: &Requester,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<(), LedgerError> {
    match requester.role {
        PartyRole::Admin => Ok(()),
        PartyRole::Staff => {
            if tx.staff_id != requester.id {
                return Err(LedgerError::Forbidden(
                    "staff may only reverse their own transactions".to_string(),
                ));
            }
            let age = now - tx.created_at;
            if age > window {
                return Err(LedgerError::ReversalWindowExpired {
                    age_hours: age.num_hours(),
                    limit_hours: window.num_hours(),
                });
            }
            Ok(())
        }
        PartyRole::Client => ensure_reversal_role(requester),
    }
}

/// Refuses roles that can never reverse, before anything is read.
pub fn ensure_reversal_role(requester: &Requester) -> Result<(), LedgerError> {
    match requester.role {
        PartyRole::Admin | PartyRole::Staff => Ok(()),
        PartyRole::Client => Err(LedgerError::Forbidden(format!(
            "role '{}' may not reverse transactions",
            requester.role
        ))),
    }
}

/// Applies the inverse of `tx` to the staff's live balance.
pub fn plan_reversal(tx: &Transaction, live_balance: Decimal) -> Result<ReversalResult, LedgerError> {
    Ok(ReversalResult {
        transaction_id: tx.id,
        kind: tx.kind,
        staff_id: tx.staff_id,
        reversed_amount: tx.final_amount,
        old_balance: live_balance,
        new_balance: reverse_balance(live_balance, tx.kind, tx.final_amount)?,
    })
}
