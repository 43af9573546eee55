//! `SeaORM` entity definitions.

pub mod audit_logs;
pub mod branches;
pub mod daily_summaries;
pub mod parties;
pub mod rate_policies;
pub mod sea_orm_active_enums;
pub mod staff_branches;
pub mod transactions;
