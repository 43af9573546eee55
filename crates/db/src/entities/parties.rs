//! `SeaORM` Entity for parties table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PartyRole;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "parties")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub role: PartyRole,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub balance: Decimal,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::staff_branches::Entity")]
    StaffBranches,
}

impl Related<super::staff_branches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StaffBranches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
