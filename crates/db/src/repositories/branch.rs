//! Branch directory queries.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use cashdesk_core::ledger::Branch;
use cashdesk_core::store::StoreError;
use cashdesk_shared::types::{BranchId, PartyId};

use crate::entities::{branches, staff_branches};

use super::backend;

/// Reads a branch with its staff members.
pub async fn find<C>(conn: &C, id: BranchId) -> Result<Option<Branch>, StoreError>
where
    C: ConnectionTrait,
{
    let Some(model) = branches::Entity::find_by_id(id.into_inner())
        .one(conn)
        .await
        .map_err(backend)?
    else {
        return Ok(None);
    };

    let staff_members = staff_branches::Entity::find()
        .filter(staff_branches::Column::BranchId.eq(model.id))
        .all(conn)
        .await
        .map_err(backend)?
        .into_iter()
        .map(|row| PartyId::from_uuid(row.staff_id))
        .collect();

    Ok(Some(Branch {
        id,
        name: model.name,
        code: model.code,
        client_id: PartyId::from_uuid(model.client_id),
        is_active: model.is_active,
        staff_members,
    }))
}
