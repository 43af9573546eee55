//! Audit log writes.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use cashdesk_core::audit::AuditEntry;
use cashdesk_core::store::StoreError;

use crate::entities::audit_logs;

use super::backend;

/// Appends one entry.
pub async fn insert<C>(conn: &C, entry: &AuditEntry) -> Result<(), StoreError>
where
    C: ConnectionTrait,
{
    audit_logs::Entity::insert(audit_logs::ActiveModel {
        id: Set(entry.id.into_inner()),
        actor_id: Set(entry.actor_id.into_inner()),
        action: Set(entry.action.as_str().to_string()),
        resource_type: Set(entry.resource_type.clone()),
        resource_id: Set(entry.resource_id),
        details: Set(entry.details.clone()),
        ip_address: Set(entry.ip_address.clone()),
        user_agent: Set(entry.user_agent.clone()),
        created_at: Set(entry.created_at.into()),
    })
    .exec_without_returning(conn)
    .await
    .map_err(backend)?;
    Ok(())
}

/// Entries recorded against one resource, oldest first.
pub async fn list_for_resource<C>(conn: &C, resource_id: Uuid) -> Result<Vec<audit_logs::Model>, StoreError>
where
    C: ConnectionTrait,
{
    audit_logs::Entity::find()
        .filter(audit_logs::Column::ResourceId.eq(resource_id))
        .order_by_asc(audit_logs::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(backend)
}
