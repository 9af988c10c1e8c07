//! Batched play/visit counts for game cards, with exponential backoff.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};

use super::{placeholder_ids, update_stat, StatsApi};
use crate::dom::{lock, Document, SharedDocument};

/// Most universe ids the games endpoint accepts per request.
pub const MAX_BATCH: usize = 50;
pub const PLAYING_PREFIX: &str = "playing-";
pub const VISITS_PREFIX: &str = "visits-";

const BACKOFF_STEP: Duration = Duration::from_secs(2);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Failure bookkeeping for one poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration) -> Self {
        Self { base, failures: 0 }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// `min(30s, 2s * 2^failures)`.
    pub fn delay_for(failures: u32) -> Duration {
        2u32.checked_pow(failures)
            .and_then(|factor| BACKOFF_STEP.checked_mul(factor))
            .map_or(BACKOFF_CAP, |delay| delay.min(BACKOFF_CAP))
    }

    /// Period the recurring timer should run at: the base interval while
    /// healthy, never shorter than it while backing off.
    pub fn interval(&self) -> Duration {
        if self.failures == 0 {
            self.base
        } else {
            self.base.max(Self::delay_for(self.failures))
        }
    }

    /// Count a failure and return the new period.
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.interval()
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No game placeholders on the page; nothing was requested.
    Idle,
    /// The batch succeeded; this many games were written to the page.
    Updated(usize),
    Failed,
}

pub struct GamesPoller {
    api: Arc<dyn StatsApi>,
    backoff: Backoff,
}

/// Restarts a spawned [`GamesPoller`] after its cards were re-rendered.
#[derive(Debug, Clone)]
pub struct GamesHandle {
    restart: Arc<Notify>,
}

impl GamesHandle {
    /// Drop the current timer, poll right away and reschedule from that poll's outcome.
    pub fn restart(&self) {
        self.restart.notify_one();
    }
}

impl GamesPoller {
    pub fn new(api: Arc<dyn StatsApi>, base_interval: Duration) -> Self {
        Self { api, backoff: Backoff::new(base_interval) }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub async fn poll_once<D: Document + ?Sized>(&mut self, doc: &Mutex<D>) -> PollOutcome {
        let ids = {
            let doc = lock(doc);
            unique_batch(placeholder_ids(&*doc, PLAYING_PREFIX))
        };
        if ids.is_empty() {
            // Nothing on the page can fail, so nothing keeps the timer degraded.
            self.backoff.reset();
            return PollOutcome::Idle;
        }

        match self.api.game_stats(&ids).await {
            Ok(games) => {
                let updated = {
                    let mut doc = lock(doc);
                    let mut updated = 0;
                    for game in &games {
                        let Some(id) = game.universe_id.as_deref() else { continue };
                        let playing = update_stat(&mut *doc, &format!("{PLAYING_PREFIX}{id}"), game.playing.unwrap_or(0));
                        let visits = update_stat(&mut *doc, &format!("{VISITS_PREFIX}{id}"), game.visits.unwrap_or(0));
                        if playing || visits {
                            updated += 1;
                        }
                    }
                    updated
                };
                self.backoff.reset();
                tracing::debug!(requested = ids.len(), updated, "game stats refreshed");
                PollOutcome::Updated(updated)
            }
            Err(err) => {
                let next = self.backoff.record_failure();
                let (failures, next_ms) = (self.backoff.failures(), next.as_millis() as u64);
                if err.is_transient() {
                    tracing::warn!(error = %err, failures, next_ms, "game stats fetch failed; backing off");
                } else {
                    tracing::error!(error = %err, failures, next_ms, "game stats request cannot succeed; backing off");
                }
                PollOutcome::Failed
            }
        }
    }

    /// Run on a recurring timer until the task is aborted. The first poll
    /// happens immediately.
    pub fn spawn<D: Document + Send + 'static>(self, doc: SharedDocument<D>) -> (GamesHandle, JoinHandle<()>) {
        let restart = Arc::new(Notify::new());
        let handle = GamesHandle { restart: restart.clone() };
        (handle, tokio::spawn(self.run(doc, restart)))
    }

    async fn run<D: Document + Send + 'static>(mut self, doc: SharedDocument<D>, restart: Arc<Notify>) {
        let mut period = self.backoff.interval();
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let restarted = tokio::select! {
                _ = timer.tick() => false,
                _ = restart.notified() => true,
            };
            self.poll_once(&*doc).await;

            let next = self.backoff.interval();
            if restarted || next != period {
                // Replacing the interval drops the previous one, so only one timer ever drives this poller.
                if next != period {
                    tracing::info!(from_ms = period.as_millis() as u64, to_ms = next.as_millis() as u64, "game stats polling rescheduled");
                }
                period = next;
                timer = delayed_interval(period);
            }
        }
    }
}

fn delayed_interval(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// First [`MAX_BATCH`] distinct ids, in page order.
fn unique_batch(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).take(MAX_BATCH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;
    use crate::error::{Error, Result};
    use crate::render::stat;
    use crate::stats::{GameStats, GroupStats};
    use crate::view::Element;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedApi {
        replies: Mutex<VecDeque<Result<Vec<GameStats>>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedApi {
        fn push(&self, reply: Result<Vec<GameStats>>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatsApi for ScriptedApi {
        async fn game_stats(&self, universe_ids: &[String]) -> Result<Vec<GameStats>> {
            self.calls.lock().unwrap().push(universe_ids.to_vec());
            self.replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn group_stats(&self, _group_id: &str) -> Result<GroupStats> {
            unreachable!("games poller never asks for groups")
        }
    }

    fn unavailable() -> Error {
        Error::Status { url: "https://games.test".into(), status: 503 }
    }

    fn game_page(ids: &[&str]) -> Mutex<MemoryDocument> {
        let mut body = Element::new("body");
        for id in ids {
            body = body.child(stat("Playing", &format!("playing-{id}"))).child(stat("Visits", &format!("visits-{id}")));
        }
        Mutex::new(MemoryDocument::new(body))
    }

    fn text(doc: &Mutex<MemoryDocument>, id: &str) -> (String, bool) {
        let doc = doc.lock().unwrap();
        let el = doc.element_by_id(id).unwrap();
        (doc.text(el), doc.has_class(el, "loaded"))
    }

    #[test]
    fn backoff_delay_doubles_up_to_the_cap() {
        let ms: Vec<u128> = (0..7).map(|n| Backoff::delay_for(n).as_millis()).collect();
        assert_eq!(ms, [2_000, 4_000, 8_000, 16_000, 30_000, 30_000, 30_000]);
        assert_eq!(Backoff::delay_for(u32::MAX), BACKOFF_CAP);
    }

    #[test]
    fn backoff_interval_never_drops_below_base() {
        let mut backoff = Backoff::new(Duration::from_secs(9));
        assert_eq!(backoff.record_failure(), Duration::from_secs(9));
        assert_eq!(backoff.record_failure(), Duration::from_secs(9));
        assert_eq!(backoff.record_failure(), Duration::from_secs(16));
        assert_eq!(backoff.record_failure(), Duration::from_secs(30));
        backoff.reset();
        assert_eq!(backoff.interval(), Duration::from_secs(9));
    }

    #[tokio::test]
    async fn updates_matching_placeholders() {
        let doc = game_page(&["1"]);
        let api = Arc::new(ScriptedApi::default());
        api.push(Ok(vec![GameStats { universe_id: Some("1".into()), playing: Some(5), visits: Some(100) }]));
        let mut poller = GamesPoller::new(api.clone(), Duration::from_secs(9));

        assert_eq!(poller.poll_once(&doc).await, PollOutcome::Updated(1));
        assert_eq!(text(&doc, "playing-1"), ("5".into(), true));
        assert_eq!(text(&doc, "visits-1"), ("100".into(), true));
        assert_eq!(api.calls(), [vec!["1".to_string()]]);
    }

    #[tokio::test]
    async fn missing_counts_default_to_zero() {
        let doc = game_page(&["7"]);
        let api = Arc::new(ScriptedApi::default());
        api.push(Ok(vec![GameStats { universe_id: Some("7".into()), playing: None, visits: Some(1_500) }]));
        let mut poller = GamesPoller::new(api, Duration::from_secs(9));
        poller.poll_once(&doc).await;
        assert_eq!(text(&doc, "playing-7"), ("0".into(), true));
        assert_eq!(text(&doc, "visits-7"), ("1,500".into(), true));
    }

    #[tokio::test]
    async fn no_placeholders_means_no_request() {
        let doc = Mutex::new(MemoryDocument::new(Element::new("body")));
        let api = Arc::new(ScriptedApi::default());
        let mut poller = GamesPoller::new(api.clone(), Duration::from_secs(9));
        assert_eq!(poller.poll_once(&doc).await, PollOutcome::Idle);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn batches_unique_ids_up_to_fifty() {
        let ids: Vec<String> = (0..60).map(|i| i.to_string()).collect();
        let mut with_dupes: Vec<&str> = ids.iter().map(String::as_str).collect();
        with_dupes.insert(1, "0");
        let doc = game_page(&with_dupes);
        let api = Arc::new(ScriptedApi::default());
        let mut poller = GamesPoller::new(api.clone(), Duration::from_secs(9));
        poller.poll_once(&doc).await;

        let sent = &api.calls()[0];
        assert_eq!(sent.len(), MAX_BATCH);
        assert_eq!(sent[..3], ["0", "1", "2"]);
    }

    #[tokio::test]
    async fn failures_back_off_and_success_resets() {
        let doc = game_page(&["1"]);
        let api = Arc::new(ScriptedApi::default());
        for _ in 0..3 {
            api.push(Err(unavailable()));
        }
        api.push(Ok(Vec::new()));
        let mut poller = GamesPoller::new(api, Duration::from_secs(9));

        for expected in [1, 2, 3] {
            assert_eq!(poller.poll_once(&doc).await, PollOutcome::Failed);
            assert_eq!(poller.backoff().failures(), expected);
        }
        assert_eq!(poller.backoff().interval(), Duration::from_secs(16));

        assert_eq!(poller.poll_once(&doc).await, PollOutcome::Updated(0));
        assert_eq!(poller.backoff().failures(), 0);
        assert_eq!(poller.backoff().interval(), Duration::from_secs(9));
        assert_eq!(text(&doc, "playing-1"), ("0".into(), false));
    }

    /// Fails the first `failures` calls and records when each call arrived.
    struct TimedApi {
        start: Instant,
        failures: Mutex<u32>,
        at_ms: Mutex<Vec<u64>>,
    }

    impl TimedApi {
        fn failing(failures: u32) -> Self {
            Self { start: Instant::now(), failures: Mutex::new(failures), at_ms: Mutex::new(Vec::new()) }
        }

        fn at_ms(&self) -> Vec<u64> {
            self.at_ms.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatsApi for TimedApi {
        async fn game_stats(&self, _ids: &[String]) -> Result<Vec<GameStats>> {
            self.at_ms.lock().unwrap().push(self.start.elapsed().as_millis() as u64);
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(unavailable());
            }
            Ok(Vec::new())
        }

        async fn group_stats(&self, _group_id: &str) -> Result<GroupStats> {
            unreachable!("games poller never asks for groups")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_backs_off_then_returns_to_base() {
        let api = Arc::new(TimedApi::failing(5));
        let doc = Arc::new(game_page(&["1"]));
        let (_handle, task) = GamesPoller::new(api.clone(), Duration::from_secs(9)).spawn(doc);

        tokio::time::sleep(Duration::from_secs(105)).await;
        task.abort();
        assert_eq!(api.at_ms(), [0, 9_000, 18_000, 34_000, 64_000, 94_000, 103_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_polls_now_and_resets_the_timer() {
        let api = Arc::new(TimedApi::failing(0));
        let doc = Arc::new(game_page(&["1"]));
        let (handle, task) = GamesPoller::new(api.clone(), Duration::from_secs(9)).spawn(doc);

        tokio::time::sleep(Duration::from_secs(4)).await;
        handle.restart();
        tokio::time::sleep(Duration::from_secs(16)).await;
        task.abort();
        assert_eq!(api.at_ms(), [0, 4_000, 13_000]);
    }
}
