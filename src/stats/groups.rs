//! Member counts for worked-group cards, fetched one group at a time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{placeholder_ids, update_stat, StatsApi};
use crate::dom::{lock, Document, SharedDocument};

pub const MEMBER_COUNT_PREFIX: &str = "memberCount-";

/// Tally of one pass over the page's group placeholders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupsPass {
    pub attempted: usize,
    pub updated: usize,
    pub failed: usize,
}

pub struct GroupsPoller {
    api: Arc<dyn StatsApi>,
    interval: Duration,
}

#[derive(Debug, Clone)]
pub struct GroupsHandle {
    poll_now: Arc<Notify>,
}

impl GroupsHandle {
    /// Run one extra pass now; the recurring timer is left alone.
    pub fn poll_now(&self) {
        self.poll_now.notify_one();
    }
}

impl GroupsPoller {
    pub fn new(api: Arc<dyn StatsApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Requests are awaited one after another so the endpoint (or proxy)
    /// never sees a burst. A failing group is logged and skipped.
    pub async fn poll_once<D: Document + ?Sized>(&self, doc: &Mutex<D>) -> GroupsPass {
        let ids = {
            let doc = lock(doc);
            placeholder_ids(&*doc, MEMBER_COUNT_PREFIX)
        };
        let mut pass = GroupsPass::default();
        for id in ids {
            pass.attempted += 1;
            match self.api.group_stats(&id).await {
                Ok(stats) => {
                    if let Some(count) = stats.member_count {
                        let mut doc = lock(doc);
                        if update_stat(&mut *doc, &format!("{MEMBER_COUNT_PREFIX}{id}"), count) {
                            pass.updated += 1;
                        }
                    }
                }
                Err(err) => {
                    pass.failed += 1;
                    if err.is_transient() {
                        tracing::warn!(group = %id, error = %err, "group stats fetch failed");
                    } else {
                        tracing::error!(group = %id, error = %err, "group stats request cannot succeed");
                    }
                }
            }
        }
        if pass.attempted > 0 {
            tracing::debug!(attempted = pass.attempted, updated = pass.updated, failed = pass.failed, "group stats pass done");
        }
        pass
    }

    /// Poll every interval, plus whenever [`GroupsHandle::poll_now`] is called.
    pub fn spawn<D: Document + Send + 'static>(self, doc: SharedDocument<D>) -> (GroupsHandle, JoinHandle<()>) {
        let poll_now = Arc::new(Notify::new());
        let handle = GroupsHandle { poll_now: poll_now.clone() };
        (handle, tokio::spawn(self.run(doc, poll_now)))
    }

    async fn run<D: Document + Send + 'static>(self, doc: SharedDocument<D>, poll_now: Arc<Notify>) {
        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = timer.tick() => {}
                _ = poll_now.notified() => {}
            }
            self.poll_once(&*doc).await;
        }
    }
}
