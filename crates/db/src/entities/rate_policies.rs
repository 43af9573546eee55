//! `SeaORM` Entity for rate_policies table. Holds a single row with `id = 1`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "rate_policies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub commission_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub deposit_deduction_rate: Decimal,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
