//! `SeaORM` Entity for branches table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "branches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub code: String,
    pub client_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parties::Entity",
        from = "Column::ClientId",
        to = "super::parties::Column::Id"
    )]
    Client,
    #[sea_orm(has_many = "super::staff_branches::Entity")]
    StaffBranches,
}

impl Related<super::staff_branches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StaffBranches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
