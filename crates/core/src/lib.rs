//! Core business logic for Cashdesk.
//!
//! This crate contains the ledger engine with ZERO web or database
//! dependencies. Storage is reached through the traits in [`store`].
//!
//! # Modules
//!
//! - `ledger` - Transaction creation, reversal, commission policy
//! - `store` - Persistence seams and the in-memory store
//! - `audit` - Bounded, fire-and-forget audit queue
//! - `aggregation` - Daily per-client summaries
//! - `dashboard` - Per-role "today" rollups
//! - `clock` - Injectable time source

pub mod aggregation;
pub mod audit;
pub mod clock;
pub mod dashboard;
pub mod ledger;
pub mod store;
