//! Business rule validation for ledger operations.
//!
//! Checks run in a fixed order and the first failure wins, so callers see
//! the same error for the same bad input regardless of store state.

use rust_decimal::Decimal;

use cashdesk_shared::types::{BranchId, PartyId};

use super::commission::{MONEY_LIMIT, MONEY_SCALE};
use super::error::LedgerError;
use super::types::{Branch, CreateTransactionInput, Party, PartyRole};

const UTR_MIN_LEN: usize = 10;
const UTR_MAX_LEN: usize = 22;

/// Validates a requested amount: strictly positive, below [`MONEY_LIMIT`],
/// at most two decimal places.
///
/// Trailing zeros do not count, so `10.500` is accepted.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO || amount >= MONEY_LIMIT || amount.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

/// Validates the UTR format: 10 to 22 ASCII alphanumerics.
pub fn validate_utr(utr_id: &str) -> Result<(), LedgerError> {
    let len_ok = (UTR_MIN_LEN..=UTR_MAX_LEN).contains(&utr_id.len());
    if !len_ok || !utr_id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(LedgerError::InvalidReference(utr_id.to_string()));
    }
    Ok(())
}

impl CreateTransactionInput {
    /// Checks that need no store access: amount, then reference format.
    pub fn validate_format(&self) -> Result<(), LedgerError> {
        validate_amount(self.amount)?;
        validate_utr(&self.utr_id)
    }
}

/// Requires an active client.
pub fn validate_client(id: PartyId, party: Option<&Party>) -> Result<(), LedgerError> {
    match party {
        Some(p) if p.is_active_with_role(PartyRole::Client) => Ok(()),
        _ => Err(LedgerError::InvalidParty {
            role: PartyRole::Client.as_str(),
            id: id.into_inner(),
        }),
    }
}

/// Requires an active branch. A missing branch is reported the same way.
pub fn validate_branch(id: BranchId, branch: Option<&Branch>) -> Result<(), LedgerError> {
    match branch {
        Some(b) if b.is_active => Ok(()),
        _ => Err(LedgerError::InactiveBranch(id.into_inner())),
    }
}

/// Requires an active staff party authorized for `branch_id`.
pub fn validate_staff<'a>(
    id: PartyId,
    party: Option<&'a Party>,
    branch_id: BranchId,
) -> Result<&'a Party, LedgerError> {
    let staff = party
        .filter(|p| p.is_active_with_role(PartyRole::Staff))
        .ok_or(LedgerError::InvalidParty {
            role: PartyRole::Staff.as_str(),
            id: id.into_inner(),
        })?;
    if !staff.can_access_branch(branch_id) {
        return Err(LedgerError::UnauthorizedBranchAccess {
            staff_id: id.into_inner(),
            branch_id: branch_id.into_inner(),
        });
    }
    Ok(staff)
}

/// Normalizes a remark: trimmed, empty when absent.
#[must_use]
pub fn normalize_remark(remark: Option<&str>) -> String {
    remark.map(str::trim).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn party(role: PartyRole, active: bool, branches: Vec<BranchId>) -> Party {
        Party {
            id: PartyId::new(),
            name: "p".into(),
            role,
            balance: Decimal::ZERO,
            is_active: active,
            branches,
        }
    }

    #[rstest]
    #[case(dec!(0.01), true)]
    #[case(dec!(1000), true)]
    #[case(dec!(10.500), true)]
    #[case(dec!(0), false)]
    #[case(dec!(-5), false)]
    #[case(dec!(1.005), false)]
    #[case(dec!(999999999999999999.99), true)]
    #[case(dec!(1000000000000000000), false)]
    #[case(Decimal::MAX, false)]
    fn test_validate_amount(#[case] amount: Decimal, #[case] ok: bool) {
        assert_eq!(validate_amount(amount).is_ok(), ok);
    }

    #[rstest]
    #[case("UTR1234567", true)]
    #[case("abcDEF1234567890123456", true)]
    #[case("UTR123456", false)]
    #[case("abcDEF12345678901234567", false)]
    #[case("UTR-1234567", false)]
    #[case("UTR 1234567", false)]
    #[case("ÜTR12345678", false)]
    fn test_validate_utr(#[case] utr: &str, #[case] ok: bool) {
        assert_eq!(validate_utr(utr).is_ok(), ok);
    }

    #[test]
    fn test_validate_client() {
        let client = party(PartyRole::Client, true, vec![]);
        assert!(validate_client(client.id, Some(&client)).is_ok());

        let inactive = party(PartyRole::Client, false, vec![]);
        assert!(validate_client(inactive.id, Some(&inactive)).is_err());

        let staff = party(PartyRole::Staff, true, vec![]);
        assert!(matches!(
            validate_client(staff.id, Some(&staff)),
            Err(LedgerError::InvalidParty { role: "client", .. })
        ));
        assert!(validate_client(PartyId::new(), None).is_err());
    }

    #[test]
    fn test_validate_staff_branch_access() {
        let branch = BranchId::new();
        let staff = party(PartyRole::Staff, true, vec![branch]);
        assert!(validate_staff(staff.id, Some(&staff), branch).is_ok());
        assert!(matches!(
            validate_staff(staff.id, Some(&staff), BranchId::new()),
            Err(LedgerError::UnauthorizedBranchAccess { .. })
        ));

        let inactive = party(PartyRole::Staff, false, vec![branch]);
        assert!(matches!(
            validate_staff(inactive.id, Some(&inactive), branch),
            Err(LedgerError::InvalidParty { role: "staff", .. })
        ));
    }

    #[test]
    fn test_validate_branch() {
        let id = BranchId::new();
        assert!(matches!(validate_branch(id, None), Err(LedgerError::InactiveBranch(_))));
    }

    #[test]
    fn test_normalize_remark() {
        assert_eq!(normalize_remark(Some("  cash drop  ")), "cash drop");
        assert_eq!(normalize_remark(None), "");
    }
}
