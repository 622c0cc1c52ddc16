//! Cron scheduler driving the periodic sweep.
//!
//! Every tick runs one [`Sweeper::tick`]: refresh all tracked tokens, then
//! broadcast the resulting view.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use super::sweeper::{Sweeper, TickReport};

/// Cron scheduler that owns the recurring sweep timer.
pub struct CronScheduler {
    sweeper: Arc<Sweeper>,
    interval: Duration,
}

impl CronScheduler {
    pub fn new(sweeper: Arc<Sweeper>, interval: Duration) -> Self {
        Self { sweeper, interval }
    }

    /// Starts the cron scheduler and runs until cancellation.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        self.register_sweep_job(&scheduler).await?;

        scheduler.start().await?;
        info!("Cron scheduler started");

        // Wait for cancellation
        cancellation_token.cancelled().await;
        info!("Cron scheduler shutting down...");

        scheduler.shutdown().await?;
        Ok(())
    }

    async fn register_sweep_job(&self, scheduler: &JobScheduler) -> Result<()> {
        let sweeper = self.sweeper.clone();

        let job = Job::new_repeated_async(self.interval, move |_uuid, _lock| {
            let sweeper = sweeper.clone();
            Box::pin(async move {
                let TickReport { sweep, push } = sweeper.tick().await;
                info!(
                    "Sweep finished: {} refreshed, {} failed, pushed to {} observers",
                    sweep.refreshed, sweep.failed, push.delivered
                );
            })
        })?;

        scheduler.add(job).await?;
        info!("Registered sweep job (every {}s)", self.interval.as_secs());
        Ok(())
    }
}
