//! Daily aggregation of completed transactions.
//!
//! Once per local day the previous day's completed transactions are folded
//! into one [`DailySummary`] per (client, branch). Rows are insert-if-absent,
//! so re-running a day never duplicates or alters what is stored.

pub mod schedule;
pub mod service;
pub mod summary;

pub use schedule::{day_bounds, next_run_after, previous_local_day, start_of_day};
pub use service::{DailyAggregator, RunOutcome};
pub use summary::{DailySummary, RunReport, SummaryGroup, group_transactions};
