//! Shutdown hooks of a ruler.
//!
//! Before a ruler leaves the ring it looks for a PENDING ruler that will take over its share of
//! the rule groups ([`handover`]), then drains whatever is still queued locally ([`drain`]). Both
//! steps are bounded in time so a rolling restart never hangs on a single ruler.

pub mod drain;
pub mod handover;
pub mod shutdown;

use crate::config::RulerConfig;
use crate::lifecycle::{
    drain::DrainLoop,
    handover::{HandoverCoordinator, HandoverError},
};
use crate::ring::{ClusterMember, MembershipStore};
use crate::scheduler::WorkSource;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
#[error("cannot find replacement ruler: {0}")]
pub struct TransferError(#[from] pub HandoverError);

/// Hooks the shutdown sequence drives, in order:
/// `stop_incoming_requests`, `transfer_out`, `flush`, `flushed`.
pub trait FlushTransferer {
    fn stop_incoming_requests(&self);

    fn transfer_out(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<ClusterMember, TransferError>> + Send;

    fn flush(&self, cancel: &CancellationToken) -> impl Future<Output = ()> + Send;

    fn flushed(&self);
}

pub struct Ruler<S, W> {
    config: RulerConfig,
    coordinator: HandoverCoordinator<S>,
    drain: DrainLoop<W>,
}

impl<S, W> Ruler<S, W> {
    pub fn new(
        config: RulerConfig,
        coordinator: HandoverCoordinator<S>,
        drain: DrainLoop<W>,
    ) -> Self {
        Self {
            config,
            coordinator,
            drain,
        }
    }
}

impl<S, W> FlushTransferer for Ruler<S, W>
where
    S: MembershipStore + Send + Sync,
    W: WorkSource + Send + Sync,
{
    /// Intentionally does nothing.
    ///
    /// The API is decoupled from the scheduler and nothing consults a "stopping" flag, so there
    /// is no intake to close. Currently unwired.
    fn stop_incoming_requests(&self) {}

    /// Makes sure a replacement ruler is joining before this one leaves.
    async fn transfer_out(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ClusterMember, TransferError> {
        let member = self
            .coordinator
            .search(cancel, self.config.search_pending_for)
            .await?;

        Ok(member)
    }

    async fn flush(&self, cancel: &CancellationToken) {
        self.drain.run(cancel, self.config.flush_check_period).await;
    }

    /// Intentionally does nothing.
    ///
    /// Every ruler re-reads its rules from the rule store, so there is no flushed state to
    /// acknowledge to anyone. Currently unwired.
    fn flushed(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Logger, testing::CapturingLogger};
    use crate::ring::{MemberState, RingDesc};
    use crate::scheduler::{Scheduler, WorkItem};
    use anyhow::Result;
    use chrono::Utc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct DummyRing {
        members: Vec<ClusterMember>,
        fetches: AtomicUsize,
    }

    impl DummyRing {
        fn new(members: Vec<ClusterMember>) -> Self {
            Self {
                members,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl MembershipStore for DummyRing {
        type Snapshot = RingDesc;

        async fn get(&self, _key: &str) -> Result<RingDesc> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(RingDesc::new(self.members.clone()))
        }
    }

    async fn ruler(
        ring: Arc<DummyRing>,
        scheduled: usize,
    ) -> (Ruler<DummyRing, Scheduler>, Arc<Scheduler>, Arc<CapturingLogger>) {
        let sink = CapturingLogger::new();
        let logger = Logger::with_sink(sink.clone(), "ruler::lifecycle");

        let scheduler = Arc::new(Scheduler::new());
        for i in 0..scheduled {
            scheduler
                .schedule(WorkItem::new("tenant", format!("group-{i}"), Utc::now()))
                .await;
        }

        let config =
            RulerConfig::new(Duration::from_millis(100), Duration::from_millis(100), true)
                .unwrap();
        let ruler = Ruler::new(
            config,
            HandoverCoordinator::new(ring, "ring", logger.clone()),
            DrainLoop::new(scheduler.clone(), logger),
        );

        (ruler, scheduler, sink)
    }

    #[tokio::test]
    async fn test_no_op_hooks_touch_nothing() {
        let ring = Arc::new(DummyRing::new(vec![]));
        let (ruler, scheduler, sink) = ruler(ring.clone(), 2).await;

        ruler.stop_incoming_requests();
        ruler.flushed();

        assert_eq!(scheduler.len().await, 2);
        assert_eq!(ring.fetches.load(Ordering::SeqCst), 0);
        assert!(sink.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_out_returns_pending_ruler() -> Result<()> {
        let ring = Arc::new(DummyRing::new(vec![
            ClusterMember::example("ruler-old", MemberState::Leaving),
            ClusterMember::example("ruler-new", MemberState::Pending),
        ]));
        let (ruler, _, _) = ruler(ring, 0).await;

        let member = ruler.transfer_out(&CancellationToken::new()).await?;
        assert_eq!(member.id, "ruler-new");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_out_failure_is_wrapped() {
        let ring = Arc::new(DummyRing::new(vec![ClusterMember::example(
            "ruler-old",
            MemberState::Leaving,
        )]));
        let (ruler, _, _) = ruler(ring, 0).await;

        let err = ruler
            .transfer_out(&CancellationToken::new())
            .await
            .expect_err("no pending ruler in the ring");

        assert!(matches!(err.0, HandoverError::NoReplacementFound { .. }));
        assert!(
            err.to_string()
                .starts_with("cannot find replacement ruler: no pending ruler found")
        );
    }

    #[tokio::test]
    async fn test_flush_drains_the_scheduler() {
        let (ruler, scheduler, sink) = ruler(Arc::new(DummyRing::new(vec![])), 4).await;

        ruler.flush(&CancellationToken::new()).await;

        assert_eq!(scheduler.len().await, 0);
        assert!(sink.contains("flushing complete (4 items)"));
    }
}
