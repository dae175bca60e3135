//! Local queue of scheduled rule-group evaluations.
//!
//! The scheduler only holds work that was derived from the rule store, so nothing in it needs to
//! survive a restart: a replacement ruler rebuilds the same queue from the same store.
//!
//! Evaluations are enqueued by the rule-evaluation layer, which lives outside this crate. Here the
//! queue is only drained, through [`WorkSource`], during shutdown.

use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt::Display;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One deferred evaluation of a user's rule group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub item_id: Uuid,
    pub user_id: String,
    pub group_name: String,
    pub scheduled: DateTime<Utc>,
}

impl WorkItem {
    #[cfg(test)]
    pub fn new(
        user_id: impl Into<String>,
        group_name: impl Into<String>,
        scheduled: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id: Uuid::new_v4(),
            user_id: user_id.into(),
            group_name: group_name.into(),
            scheduled,
        }
    }
}

impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.scheduled
            .cmp(&other.scheduled)
            .then_with(|| self.item_id.cmp(&other.item_id))
    }
}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} @ {}",
            self.user_id,
            self.group_name,
            self.scheduled.to_rfc3339()
        )
    }
}

/// Pull-style access to pending local work.
///
/// `next_work_item` must not wait for work to appear: it returns `None` as soon as nothing is
/// pending, and is safe to call again afterwards.
pub trait WorkSource {
    fn next_work_item(&self) -> impl Future<Output = Option<WorkItem>> + Send;
}

#[derive(Default)]
pub struct Scheduler {
    queue: Mutex<BinaryHeap<Reverse<WorkItem>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn schedule(&self, item: WorkItem) {
        self.queue.lock().await.push(Reverse(item));
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}

impl WorkSource for Scheduler {
    /// Pops the earliest scheduled item.
    async fn next_work_item(&self) -> Option<WorkItem> {
        self.queue.lock().await.pop().map(|Reverse(item)| item)
    }
}
