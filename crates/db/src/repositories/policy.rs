//! Commission policy singleton.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use cashdesk_core::ledger::{PolicyUpdate, RatePolicy};
use cashdesk_core::store::StoreError;
use cashdesk_shared::types::PartyId;

use crate::entities::rate_policies;

use super::backend;

const SINGLETON_ID: i32 = 1;

/// Current policy. Inserts the bootstrap row on first read.
pub async fn current<C>(conn: &C) -> Result<RatePolicy, StoreError>
where
    C: ConnectionTrait,
{
    if let Some(policy) = find(conn).await? {
        return Ok(policy);
    }

    // A concurrent first read may win the insert; either way the row exists after this.
    rate_policies::Entity::insert(active_model(&RatePolicy::bootstrap(Utc::now())))
        .on_conflict(
            OnConflict::column(rate_policies::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .map_err(backend)?;

    tracing::info!("Bootstrapped default rate policy");
    find(conn)
        .await?
        .ok_or_else(|| StoreError::Backend("rate policy missing after bootstrap".to_string()))
}

/// Sets the supplied fields in one `UPDATE` and returns the stored row.
///
/// Absent fields are left out of the statement, so they keep the stored value.
pub async fn update<C>(
    conn: &C,
    update: &PolicyUpdate,
    by: PartyId,
    now: DateTime<Utc>,
) -> Result<RatePolicy, StoreError>
where
    C: ConnectionTrait,
{
    current(conn).await?;

    let updated_at: DateTimeWithTimeZone = now.into();
    let mut query = rate_policies::Entity::update_many()
        .col_expr(rate_policies::Column::UpdatedBy, Expr::value(by.into_inner()))
        .col_expr(rate_policies::Column::UpdatedAt, Expr::value(updated_at))
        .filter(rate_policies::Column::Id.eq(SINGLETON_ID));
    if let Some(rate) = update.commission_rate {
        query = query.col_expr(rate_policies::Column::CommissionRate, Expr::value(rate));
    }
    if let Some(rate) = update.deposit_deduction_rate {
        query = query.col_expr(rate_policies::Column::DepositDeductionRate, Expr::value(rate));
    }

    query
        .exec_with_returning(conn)
        .await
        .map_err(backend)?
        .into_iter()
        .next()
        .map(to_policy)
        .ok_or_else(|| StoreError::Backend("rate policy missing after update".to_string()))
}

async fn find<C>(conn: &C) -> Result<Option<RatePolicy>, StoreError>
where
    C: ConnectionTrait,
{
    let model = rate_policies::Entity::find_by_id(SINGLETON_ID)
        .one(conn)
        .await
        .map_err(backend)?;

    Ok(model.map(to_policy))
}

fn to_policy(row: rate_policies::Model) -> RatePolicy {
    RatePolicy {
        commission_rate: row.commission_rate,
        deposit_deduction_rate: row.deposit_deduction_rate,
        updated_by: row.updated_by.map(PartyId::from_uuid),
        updated_at: row.updated_at.with_timezone(&Utc),
    }
}

fn active_model(policy: &RatePolicy) -> rate_policies::ActiveModel {
    rate_policies::ActiveModel {
        id: Set(SINGLETON_ID),
        commission_rate: Set(policy.commission_rate),
        deposit_deduction_rate: Set(policy.deposit_deduction_rate),
        updated_by: Set(policy.updated_by.map(PartyId::into_inner)),
        updated_at: Set(policy.updated_at.into()),
    }
}
