//! Daily summary queries.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use cashdesk_core::aggregation::DailySummary;
use cashdesk_core::store::StoreError;
use cashdesk_shared::types::{BranchId, DailySummaryId, PartyId};

use crate::entities::daily_summaries;

use super::backend;

/// Inserts rows whose `(date, party_id, branch_id)` key is absent.
///
/// Returns the number of rows the database accepted.
pub async fn insert_if_absent<C>(conn: &C, rows: &[DailySummary]) -> Result<u64, StoreError>
where
    C: ConnectionTrait,
{
    if rows.is_empty() {
        return Ok(0);
    }

    daily_summaries::Entity::insert_many(rows.iter().map(active_model))
        .on_conflict(
            OnConflict::columns([
                daily_summaries::Column::Date,
                daily_summaries::Column::PartyId,
                daily_summaries::Column::BranchId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .map_err(backend)
}

/// Rows stored for a date, ordered by party then branch.
pub async fn list_for_date<C>(conn: &C, date: NaiveDate) -> Result<Vec<DailySummary>, StoreError>
where
    C: ConnectionTrait,
{
    let rows = daily_summaries::Entity::find()
        .filter(daily_summaries::Column::Date.eq(date))
        .order_by_asc(daily_summaries::Column::PartyId)
        .order_by_asc(daily_summaries::Column::BranchId)
        .all(conn)
        .await
        .map_err(backend)?;

    Ok(rows
        .into_iter()
        .map(|row| DailySummary {
            id: DailySummaryId::from_uuid(row.id),
            date: row.date,
            party_id: PartyId::from_uuid(row.party_id),
            role: row.role.into(),
            branch_id: BranchId::from_uuid(row.branch_id),
            total_credit: row.total_credit,
            total_debit: row.total_debit,
            total_commission: row.total_commission,
            transaction_count: row.transaction_count,
            created_at: row.created_at.with_timezone(&Utc),
        })
        .collect())
}

fn active_model(row: &DailySummary) -> daily_summaries::ActiveModel {
    daily_summaries::ActiveModel {
        id: Set(row.id.into_inner()),
        date: Set(row.date),
        party_id: Set(row.party_id.into_inner()),
        role: Set(row.role.into()),
        branch_id: Set(row.branch_id.into_inner()),
        total_credit: Set(row.total_credit),
        total_debit: Set(row.total_debit),
        total_commission: Set(row.total_commission),
        transaction_count: Set(row.transaction_count),
        created_at: Set(row.created_at.into()),
    }
}
