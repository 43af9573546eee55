//! Request extractors for caller identity, audit metadata, and typed input.

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{HeaderMap, header::USER_AGENT, request::Parts},
};

use cashdesk_core::ledger::{PartyRole, RequestMeta, Requester};
use cashdesk_shared::types::PartyId;

use crate::error::ApiError;

/// Header carrying the caller's party ID.
pub const PARTY_ID_HEADER: &str = "x-party-id";
/// Header carrying the caller's role.
pub const PARTY_ROLE_HEADER: &str = "x-party-role";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// The authenticated caller, as forwarded by the gateway.
///
/// ```ignore
/// async fn handler(Caller(requester): Caller) -> impl IntoResponse {
///     // requester.id, requester.role
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Requester);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        requester_from_headers(&parts.headers).map(Caller)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn requester_from_headers(headers: &HeaderMap) -> Result<Requester, ApiError> {
    let id = header(headers, PARTY_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("{PARTY_ID_HEADER} header is required")))?
        .parse::<PartyId>()
        .map_err(|_| ApiError::Unauthorized(format!("{PARTY_ID_HEADER} is not a valid UUID")))?;
    let role = header(headers, PARTY_ROLE_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("{PARTY_ROLE_HEADER} header is required")))?
        .parse::<PartyRole>()
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
    Ok(Requester::new(id, role))
}

/// Caller IP and user agent for audit entries. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta(pub RequestMeta);

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(meta_from_headers(&parts.headers)))
    }
}

/// [`axum::Json`] whose rejection renders as an [`ApiError`] body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// [`axum::extract::Query`] whose rejection renders as an [`ApiError`] body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// [`axum::extract::Path`] whose rejection renders as an [`ApiError`] body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

fn meta_from_headers(headers: &HeaderMap) -> RequestMeta {
    RequestMeta {
        // first hop is the original client
        ip_address: header(headers, FORWARDED_FOR_HEADER)
            .and_then(|value| value.split(',').next())
            .map(|ip| ip.trim().to_string()),
        user_agent: header(headers, USER_AGENT.as_str()).map(ToString::to_string),
    }
}
