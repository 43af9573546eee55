//! Transaction ledger queries.
//!
//! `kind` is a text column. Rows whose kind the ledger does not recognise
//! surface as [`StoreError::UnknownKind`] instead of being skipped.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
};
use uuid::Uuid;

use cashdesk_core::aggregation::SummaryGroup;
use cashdesk_core::ledger::{Transaction, TransactionFilter, TransactionKind, TransactionStatus, TransactionTotals};
use cashdesk_core::store::StoreError;
use cashdesk_shared::types::{BranchId, PageRequest, PageResponse, PartyId, TransactionId};

use crate::entities::{sea_orm_active_enums, transactions};

use super::backend;

const CREDIT_SUM: &str = "COALESCE(SUM(final_amount) FILTER (WHERE kind = 'credit'), 0)";
const DEBIT_SUM: &str = "COALESCE(SUM(final_amount) FILTER (WHERE kind = 'debit'), 0)";
const COMMISSION_SUM: &str = "COALESCE(SUM(commission), 0)";
const ROW_COUNT: &str = "COUNT(*)";

#[derive(Debug, FromQueryResult)]
struct TotalsRow {
    total_credit: Decimal,
    total_debit: Decimal,
    total_commission: Decimal,
    transaction_count: i64,
}

impl From<TotalsRow> for TransactionTotals {
    fn from(row: TotalsRow) -> Self {
        Self {
            total_credit: row.total_credit,
            total_debit: row.total_debit,
            total_commission: row.total_commission,
            transaction_count: row.transaction_count,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct GroupRow {
    client_id: Uuid,
    branch_id: Uuid,
    total_credit: Decimal,
    total_debit: Decimal,
    total_commission: Decimal,
    transaction_count: i64,
}

/// Inserts a record. A taken `utr_id` maps to `UniqueViolation`.
pub async fn insert<C>(conn: &C, tx: &Transaction) -> Result<(), StoreError>
where
    C: ConnectionTrait,
{
    transactions::Entity::insert(active_model(tx))
        .exec_without_returning(conn)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::UniqueViolation {
                key: "utr_id",
                value: tx.utr_id.clone(),
            },
            _ => backend(err),
        })?;
    Ok(())
}

/// Reads one record.
pub async fn find<C>(conn: &C, id: TransactionId) -> Result<Option<Transaction>, StoreError>
where
    C: ConnectionTrait,
{
    transactions::Entity::find_by_id(id.into_inner())
        .one(conn)
        .await
        .map_err(backend)?
        .map(to_domain)
        .transpose()
}

/// Hard-deletes a record. Returns false if no row was removed.
pub async fn delete<C>(conn: &C, id: TransactionId) -> Result<bool, StoreError>
where
    C: ConnectionTrait,
{
    let result = transactions::Entity::delete_by_id(id.into_inner())
        .exec(conn)
        .await
        .map_err(backend)?;
    Ok(result.rows_affected > 0)
}

/// Lists matching records, newest first.
pub async fn list<C>(
    conn: &C,
    filter: &TransactionFilter,
    page: PageRequest,
) -> Result<PageResponse<Transaction>, StoreError>
where
    C: ConnectionTrait,
{
    let query = transactions::Entity::find().filter(condition(filter));
    let total = query.clone().count(conn).await.map_err(backend)?;

    let data = query
        .order_by_desc(transactions::Column::CreatedAt)
        .order_by_desc(transactions::Column::Id)
        .offset(page.offset())
        .limit(page.limit())
        .all(conn)
        .await
        .map_err(backend)?
        .into_iter()
        .map(to_domain)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PageResponse::new(data, page.page, page.per_page, total))
}

/// Totals over every matching record.
pub async fn totals<C>(conn: &C, filter: &TransactionFilter) -> Result<TransactionTotals, StoreError>
where
    C: ConnectionTrait,
{
    let row = with_totals(transactions::Entity::find().select_only())
        .filter(condition(filter))
        .into_model::<TotalsRow>()
        .one(conn)
        .await
        .map_err(backend)?;
    Ok(row.map(TransactionTotals::from).unwrap_or_default())
}

/// Completed records in `[from, to)` grouped by client and branch.
pub async fn summarize_range<C>(
    conn: &C,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<SummaryGroup>, StoreError>
where
    C: ConnectionTrait,
{
    let filter = TransactionFilter {
        status: Some(TransactionStatus::Completed),
        from: Some(from),
        to: Some(to),
        ..TransactionFilter::default()
    };

    let rows = with_totals(
        transactions::Entity::find()
            .select_only()
            .column(transactions::Column::ClientId)
            .column(transactions::Column::BranchId),
    )
    .filter(condition(&filter))
    .group_by(transactions::Column::ClientId)
    .group_by(transactions::Column::BranchId)
    .order_by_asc(transactions::Column::ClientId)
    .order_by_asc(transactions::Column::BranchId)
    .into_model::<GroupRow>()
    .all(conn)
    .await
    .map_err(backend)?;

    Ok(rows
        .into_iter()
        .map(|row| SummaryGroup {
            client_id: PartyId::from_uuid(row.client_id),
            branch_id: BranchId::from_uuid(row.branch_id),
            totals: TransactionTotals {
                total_credit: row.total_credit,
                total_debit: row.total_debit,
                total_commission: row.total_commission,
                transaction_count: row.transaction_count,
            },
        })
        .collect())
}

fn with_totals(query: Select<transactions::Entity>) -> Select<transactions::Entity> {
    query
        .column_as(Expr::cust(CREDIT_SUM), "total_credit")
        .column_as(Expr::cust(DEBIT_SUM), "total_debit")
        .column_as(Expr::cust(COMMISSION_SUM), "total_commission")
        .column_as(Expr::cust(ROW_COUNT), "transaction_count")
}

fn condition(filter: &TransactionFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(client_id) = filter.client_id {
        cond = cond.add(transactions::Column::ClientId.eq(client_id.into_inner()));
    }
    if let Some(staff_id) = filter.staff_id {
        cond = cond.add(transactions::Column::StaffId.eq(staff_id.into_inner()));
    }
    if let Some(branch_id) = filter.branch_id {
        cond = cond.add(transactions::Column::BranchId.eq(branch_id.into_inner()));
    }
    if let Some(kind) = filter.kind {
        cond = cond.add(transactions::Column::Kind.eq(kind.as_str()));
    }
    if let Some(status) = filter.status {
        cond = cond.add(transactions::Column::Status.eq(sea_orm_active_enums::TransactionStatus::from(status)));
    }
    if let Some(from) = filter.from {
        cond = cond.add(transactions::Column::CreatedAt.gte(from));
    }
    if let Some(to) = filter.to {
        cond = cond.add(transactions::Column::CreatedAt.lt(to));
    }
    cond
}

fn active_model(tx: &Transaction) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: Set(tx.id.into_inner()),
        client_id: Set(tx.client_id.into_inner()),
        staff_id: Set(tx.staff_id.into_inner()),
        branch_id: Set(tx.branch_id.into_inner()),
        kind: Set(tx.kind.as_str().to_string()),
        amount: Set(tx.amount),
        commission: Set(tx.commission),
        final_amount: Set(tx.final_amount),
        remark: Set(tx.remark.clone()),
        utr_id: Set(tx.utr_id.clone()),
        balance_before: Set(tx.balance_before),
        balance_after: Set(tx.balance_after),
        status: Set(tx.status.into()),
        created_at: Set(tx.created_at.into()),
    }
}

pub(crate) fn to_domain(model: transactions::Model) -> Result<Transaction, StoreError> {
    let kind = model
        .kind
        .parse::<TransactionKind>()
        .map_err(|_| StoreError::UnknownKind(model.kind.clone()))?;

    Ok(Transaction {
        id: TransactionId::from_uuid(model.id),
        client_id: PartyId::from_uuid(model.client_id),
        staff_id: PartyId::from_uuid(model.staff_id),
        branch_id: BranchId::from_uuid(model.branch_id),
        kind,
        amount: model.amount,
        commission: model.commission,
        final_amount: model.final_amount,
        remark: model.remark,
        utr_id: model.utr_id,
        balance_before: model.balance_before,
        balance_after: model.balance_after,
        status: model.status.into(),
        created_at: model.created_at.with_timezone(&Utc),
    })
}
