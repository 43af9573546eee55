//! Dashboard rollups.
//!
//! Role-specific totals of today's completed transactions. Read-only.

pub mod service;
pub mod types;

pub use service::DashboardService;
pub use types::*;
