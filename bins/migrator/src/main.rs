//! Schema migration runner for the Cashdesk ledger database.
//!
//! Reads `DATABASE_URL` (from the environment or `.env`).
//!
//! Usage:
//!   migrator up      - Apply pending migrations
//!   migrator down    - Revert the last migration
//!   migrator status  - List applied and pending migrations
//!   migrator fresh   - Drop everything and re-apply

use cashdesk_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    cli::run_cli(Migrator).await;
}
