//! Shared types, errors, and configuration for Cashdesk.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Startup and configuration errors
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AggregationConfig, AppConfig, DatabaseConfig, LedgerConfig, ServerConfig};
pub use error::AppError;

