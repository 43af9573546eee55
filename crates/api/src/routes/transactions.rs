//! Transaction routes: create, list, get, reverse.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use cashdesk_core::ledger::{
    CreateTransactionInput, LedgerError, PartyRole, ReversalResult, Transaction, TransactionFilter,
    TransactionKind, TransactionStatus,
};
use cashdesk_shared::types::{BranchId, PageRequest, PageResponse, PartyId, TransactionId};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, Caller, ClientMeta};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/{id}", get(get_transaction).delete(reverse_transaction))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for creating a transaction. The caller is the staff party.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    /// Client the money belongs to.
    pub client_id: Uuid,
    /// Branch the cash moved through.
    pub branch_id: Uuid,
    /// `credit` or `debit`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Requested amount, before commission.
    pub amount: Decimal,
    /// Free text.
    pub remark: Option<String>,
    /// External reference.
    pub utr_id: String,
}

/// Query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    /// Filter by client.
    pub client_id: Option<Uuid>,
    /// Filter by staff.
    pub staff_id: Option<Uuid>,
    /// Filter by branch.
    pub branch_id: Option<Uuid>,
    /// Filter by kind.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Filter by status.
    pub status: Option<String>,
    /// Inclusive lower bound (RFC 3339).
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound (RFC 3339).
    pub to: Option<DateTime<Utc>>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (max 100).
    pub per_page: Option<u32>,
}

impl ListTransactionsQuery {
    fn into_parts(self) -> ApiResult<(TransactionFilter, PageRequest)> {
        let kind = self.kind.as_deref().map(str::parse::<TransactionKind>).transpose()?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<TransactionStatus>)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let defaults = PageRequest::default();
        let page = PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        };

        let filter = TransactionFilter {
            client_id: self.client_id.map(PartyId::from_uuid),
            staff_id: self.staff_id.map(PartyId::from_uuid),
            branch_id: self.branch_id.map(BranchId::from_uuid),
            kind,
            status,
            from: self.from,
            to: self.to,
        };
        Ok((filter, page))
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/transactions` - Record a credit or debit for the calling staff party.
async fn create_transaction(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ClientMeta(meta): ClientMeta,
    ApiJson(body): ApiJson<CreateTransactionRequest>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    if requester.role != PartyRole::Staff {
        return Err(LedgerError::Forbidden("only staff can record transactions".to_string()).into());
    }

    let input = CreateTransactionInput {
        client_id: PartyId::from_uuid(body.client_id),
        staff_id: requester.id,
        branch_id: BranchId::from_uuid(body.branch_id),
        kind: body.kind.parse()?,
        amount: body.amount,
        remark: body.remark,
        utr_id: body.utr_id,
    };
    // Malformed input must not bootstrap the policy row.
    input.validate_format()?;

    // Read once; the transaction is priced with this snapshot.
    let policy = state.policy.current().await?;
    let tx = state.ledger.create_transaction(input, &policy, meta).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

/// GET `/transactions` - List visible transactions, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ApiQuery(query): ApiQuery<ListTransactionsQuery>,
) -> ApiResult<Json<PageResponse<Transaction>>> {
    let (filter, page) = query.into_parts()?;
    let page = state.ledger.list_transactions(filter, page, requester).await?;
    Ok(Json(page))
}

/// GET `/transactions/{id}` - Fetch one transaction.
async fn get_transaction(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Transaction>> {
    let tx = state
        .ledger
        .get_transaction(TransactionId::from_uuid(id), requester)
        .await?;
    Ok(Json(tx))
}

/// DELETE `/transactions/{id}` - Reverse and delete a transaction.
async fn reverse_transaction(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ClientMeta(meta): ClientMeta,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ReversalResult>> {
    let result = state
        .ledger
        .reverse_transaction(TransactionId::from_uuid(id), requester, meta)
        .await?;
    Ok(Json(result))
}
