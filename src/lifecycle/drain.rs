use crate::logging::{Logger, debug, info};
use crate::scheduler::WorkSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Pulls locally scheduled work until none is left or the time budget runs out.
///
/// Items are only accounted for, not evaluated: the queue is rebuilt from the rule store by
/// whichever ruler owns the rules next.
pub struct DrainLoop<W> {
    source: Arc<W>,
    logger: Logger,
}

impl<W: WorkSource + Send + Sync> DrainLoop<W> {
    pub fn new(source: Arc<W>, logger: Logger) -> Self {
        Self { source, logger }
    }

    pub async fn run(&self, cancel: &CancellationToken, check_period: Duration) {
        let deadline = Instant::now() + check_period;
        let mut flushed = 0usize;

        loop {
            // Checked before probing, so an expired budget wins over remaining work.
            if Instant::now() >= deadline {
                self.timed_out(flushed);
                return;
            }

            let probe = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(self.logger, "ruler flush cancelled after {flushed} items");
                    return;
                }
                probe = time::timeout_at(deadline, self.source.next_work_item()) => probe,
            };

            match probe {
                Ok(Some(item)) => {
                    flushed += 1;
                    debug!(self.logger, "flushing item {item}");
                }
                Ok(None) => {
                    info!(self.logger, "flushing complete ({flushed} items)");
                    return;
                }
                Err(_) => {
                    self.timed_out(flushed);
                    return;
                }
            }
        }
    }

    fn timed_out(&self, flushed: usize) {
        info!(self.logger, "ruler flush timed out after {flushed} items");
    }
}
