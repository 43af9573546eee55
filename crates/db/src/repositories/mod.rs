//! Table-level queries.
//!
//! Every function is generic over `ConnectionTrait`, so the same query runs on
//! the pool or inside a `DatabaseTransaction` held by an atomic unit.

pub mod audit;
pub mod branch;
pub mod party;
pub mod policy;
pub mod summary;
pub mod transaction;

use cashdesk_core::store::StoreError;
use sea_orm::DbErr;

pub(crate) fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}
