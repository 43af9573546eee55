//! `SeaORM` Entity for transactions table.
//!
//! `kind` is stored as text and decoded by the store layer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::TransactionStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Uuid,
    pub staff_id: Uuid,
    pub branch_id: Uuid,
    pub kind: String,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub commission: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub final_amount: Decimal,
    pub remark: String,
    #[sea_orm(unique)]
    pub utr_id: String,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub balance_before: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub balance_after: Decimal,
    pub status: TransactionStatus,
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
