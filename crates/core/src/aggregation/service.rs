//! Daily aggregation runs and the scheduling loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::ledger::error::LedgerError;
use crate::store::{SummaryStore, TransactionStore};

use super::schedule::{day_bounds, next_run_after, previous_local_day};
use super::summary::{DailySummary, RunReport};

/// Result of asking the aggregator to run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run completed.
    Completed(RunReport),
    /// Another run was in progress; nothing was done.
    Skipped,
}

/// Folds a day's completed transactions into summary rows.
pub struct DailyAggregator<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    run_at: NaiveTime,
    running: AtomicBool,
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S> DailyAggregator<S>
where
    S: TransactionStore + SummaryStore + ?Sized,
{
    /// Creates an aggregator.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, tz: Tz, run_at: NaiveTime) -> Self {
        Self {
            store,
            clock,
            tz,
            run_at,
            running: AtomicBool::new(false),
        }
    }

    /// Aggregates `date`. Skips if a run is already in progress.
    pub async fn run_for(&self, date: NaiveDate) -> Result<RunOutcome, LedgerError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(%date, "Aggregation already running, skipping");
            return Ok(RunOutcome::Skipped);
        }
        let _guard = RunGuard(&self.running);

        let (from, to) = day_bounds(date, self.tz);
        let groups = self.store.summarize_range(from, to).await?;
        let now = self.clock.now();
        let rows: Vec<DailySummary> = groups
            .iter()
            .map(|group| DailySummary::from_group(date, group, now))
            .collect();

        let inserted = if rows.is_empty() {
            0
        } else {
            self.store.insert_daily_summaries(&rows).await?
        };
        let report = RunReport {
            date,
            groups: rows.len(),
            inserted,
            skipped_existing: (rows.len() as u64).saturating_sub(inserted),
        };
        tracing::info!(
            %date,
            groups = report.groups,
            inserted = report.inserted,
            skipped_existing = report.skipped_existing,
            "Daily aggregation completed"
        );
        Ok(RunOutcome::Completed(report))
    }

    /// Aggregates the local day before the clock's today.
    pub async fn run_previous_day(&self) -> Result<RunOutcome, LedgerError> {
        self.run_for(previous_local_day(self.clock.now(), self.tz)).await
    }

    /// Runs once per day at `run_at` until `shutdown` flips to true.
    ///
    /// Failed runs are logged and the loop waits for the next day.
    pub async fn run_scheduled(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let now = self.clock.now();
            let next = next_run_after(now, self.run_at, self.tz);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(next_run = %next, "Next daily aggregation scheduled");

            tokio::select! {
                () = tokio::time::sleep(wait) => {
                    if let Err(e) = self.run_previous_day().await {
                        tracing::error!(error = %e, "Daily aggregation failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Daily aggregation loop stopped");
                        return;
                    }
                }
            }
        }
    }
}
