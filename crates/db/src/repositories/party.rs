//! Party directory queries.

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use cashdesk_core::ledger::Party;
use cashdesk_core::store::StoreError;
use cashdesk_shared::types::{BranchId, PartyId};

use crate::entities::{parties, sea_orm_active_enums::PartyRole, staff_branches};

use super::backend;

/// Reads a party with its authorized branches.
pub async fn find<C>(conn: &C, id: PartyId) -> Result<Option<Party>, StoreError>
where
    C: ConnectionTrait,
{
    let model = parties::Entity::find_by_id(id.into_inner())
        .one(conn)
        .await
        .map_err(backend)?;
    match model {
        Some(model) => Ok(Some(with_branches(conn, model).await?)),
        None => Ok(None),
    }
}

/// Reads a party with `FOR UPDATE`, holding the row lock until the
/// surrounding transaction ends.
pub async fn find_for_update<C>(conn: &C, id: PartyId) -> Result<Option<Party>, StoreError>
where
    C: ConnectionTrait,
{
    let model = parties::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(backend)?;
    match model {
        Some(model) => Ok(Some(with_branches(conn, model).await?)),
        None => Ok(None),
    }
}

/// Overwrites a party's balance.
pub async fn save_balance<C>(conn: &C, id: PartyId, balance: Decimal) -> Result<(), StoreError>
where
    C: ConnectionTrait,
{
    let result = parties::Entity::update_many()
        .col_expr(parties::Column::Balance, Expr::value(balance))
        .filter(parties::Column::Id.eq(id.into_inner()))
        .exec(conn)
        .await
        .map_err(backend)?;

    if result.rows_affected == 0 {
        return Err(StoreError::Backend(format!("party {id} not found for balance save")));
    }
    Ok(())
}

async fn with_branches<C>(conn: &C, model: parties::Model) -> Result<Party, StoreError>
where
    C: ConnectionTrait,
{
    // Only staff carry branch authorizations.
    let branches = if model.role == PartyRole::Staff {
        staff_branches::Entity::find()
            .filter(staff_branches::Column::StaffId.eq(model.id))
            .all(conn)
            .await
            .map_err(backend)?
            .into_iter()
            .map(|row| BranchId::from_uuid(row.branch_id))
            .collect()
    } else {
        Vec::new()
    };

    Ok(Party {
        id: PartyId::from_uuid(model.id),
        name: model.name,
        role: model.role.into(),
        balance: model.balance,
        is_active: model.is_active,
        branches,
    })
}
