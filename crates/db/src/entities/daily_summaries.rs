//! `SeaORM` Entity for daily_summaries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PartyRole;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_summaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub date: Date,
    pub party_id: Uuid,
    pub role: PartyRole,
    pub branch_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub total_credit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub total_debit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub total_commission: Decimal,
    pub transaction_count: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::branches::Entity",
        from = "Column::BranchId",
        to = "super::branches::Column::Id"
    )]
    Branches,
}

impl Related<super::branches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
