//! Startup wiring: ties the data source, renderer, loaders, navigation and
//! pollers to one shared document.

use std::sync::{Arc, Mutex};

use chrono::Datelike;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::dom::{lock, Document, NodeId, SharedDocument};
use crate::error::{Error, Result};
use crate::lazy::{handle_image_error, LazyImageLoader, ObservedSet, ProximityObserver};
use crate::nav::{MemoryHistory, NavEvent, Navigator};
use crate::page::{LOADER_ID, YEAR_ID};
use crate::render::mount;
use crate::rotation::ImageRotator;
use crate::source::{DataSource, SnapshotSink};
use crate::stats::{GamesHandle, GamesPoller, GroupsHandle, GroupsPoller, HttpStatsApi, StatsApi};
use crate::types::{Catalog, Category, Collection};
use crate::view::{Element, Node};

/// Viewport observer shared between render passes and the embedder that
/// reports intersections.
pub type SharedObserver = Arc<Mutex<ObservedSet>>;

/// Renders every snapshot into the document and nudges the pollers that
/// depend on the freshly created placeholders.
pub struct PageSink<D> {
    doc: SharedDocument<D>,
    lazy: LazyImageLoader,
    observer: Option<SharedObserver>,
    games: Option<GamesHandle>,
    groups: Option<GroupsHandle>,
}

impl<D: Document + Send + 'static> PageSink<D> {
    pub fn new(doc: SharedDocument<D>, lazy: LazyImageLoader) -> Self {
        Self { doc, lazy, observer: None, games: None, groups: None }
    }

    /// Defer images until `observer` reports them; without one they load at once.
    pub fn observed_by(mut self, observer: Option<SharedObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_pollers(mut self, games: GamesHandle, groups: GroupsHandle) -> Self {
        self.games = Some(games);
        self.groups = Some(groups);
        self
    }
}

impl<D: Document + Send + 'static> SnapshotSink for PageSink<D> {
    fn on_snapshot(&self, catalog: Catalog) {
        let category = catalog.category();
        {
            let mut doc = lock(&*self.doc);
            if !mount(&mut *doc, &catalog) {
                return;
            }
            match &self.observer {
                Some(observer) => {
                    let mut observed = lock(&**observer);
                    observed.prune(&*doc);
                    let observer: &mut dyn ProximityObserver = &mut *observed;
                    self.lazy.activate(&mut *doc, Some(observer));
                }
                None => {
                    self.lazy.activate(&mut *doc, None);
                }
            }
        }
        match category {
            Category::Games | Category::Projects => {
                if let Some(games) = &self.games {
                    games.restart();
                }
            }
            Category::Groups => {
                if let Some(groups) = &self.groups {
                    groups.poll_now();
                }
            }
            Category::Animations => {}
        }
    }

    fn on_error(&self, collection: Collection, error: Error) {
        if error.is_transient() {
            tracing::warn!(%collection, %error, "subscription error; keeping last render");
        } else {
            tracing::error!(%collection, %error, "subscription failed; keeping last render");
        }
    }
}

/// Background tasks started by [`Portfolio::spawn`].
pub struct Running {
    pub games: GamesHandle,
    pub groups: GroupsHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl Running {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn abort(self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

pub struct Portfolio<D> {
    config: Config,
    doc: SharedDocument<D>,
    history: MemoryHistory,
    navigator: Option<Navigator>,
    lazy: LazyImageLoader,
    observer: Option<SharedObserver>,
    api: Option<Arc<dyn StatsApi>>,
    source: Option<DataSource>,
}

impl<D: Document + Send + 'static> Portfolio<D> {
    pub fn new(config: Config, doc: SharedDocument<D>) -> Self {
        let lazy = LazyImageLoader::new(config.polling.lazy_margin_px);
        Self {
            config,
            doc,
            history: MemoryHistory::default(),
            navigator: None,
            lazy,
            observer: None,
            api: None,
            source: None,
        }
    }

    /// Register card images with `observer` instead of loading them at once.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Use `api` instead of the HTTP client built from config.
    pub fn with_stats_api(mut self, api: Arc<dyn StatsApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Use `source` instead of selecting one from config.
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn document(&self) -> &SharedDocument<D> {
        &self.doc
    }

    pub fn navigator(&self) -> Option<&Navigator> {
        self.navigator.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.source.as_ref().is_some_and(DataSource::is_live)
    }

    /// Wire the page. Static data is rendered before this returns. On failure
    /// the loader is replaced with an error panel and the error is returned.
    pub fn initialize(&mut self, fragment: Option<&str>) -> Result<()> {
        let result = self.wire(fragment);
        if let Err(err) = &result {
            tracing::error!(error = %err, "portfolio failed to start");
            show_error_panel(&mut *lock(&*self.doc));
        }
        result
    }

    fn wire(&mut self, fragment: Option<&str>) -> Result<()> {
        self.config.validate()?;
        if self.api.is_none() {
            self.api = Some(Arc::new(HttpStatsApi::from_config(&self.config)?));
        }
        if self.source.is_none() {
            self.source = Some(DataSource::select(&self.config)?);
        }

        self.history = MemoryHistory::new(fragment);
        {
            let mut doc = lock(&*self.doc);
            if let Some(year) = doc.element_by_id(YEAR_ID) {
                doc.set_text(year, &chrono::Local::now().year().to_string());
            }
            self.navigator = Some(Navigator::init(&mut *doc, &self.history, self.config.controls()));
        }

        if let Some(source @ DataSource::Static(_)) = &self.source {
            source.deliver(Arc::new(self.sink()));
        }

        let mut doc = lock(&*self.doc);
        if let Some(loader) = doc.element_by_id(LOADER_ID) {
            doc.set_attr(loader, "style", "display:none");
        }
        if let Some(container) = doc.elements_by_class("container").into_iter().next() {
            doc.set_attr(container, "style", "display:flex");
        }
        tracing::info!(live = self.is_live(), "portfolio ready");
        Ok(())
    }

    /// Route a user interaction through the navigation state machine.
    pub fn navigate(&mut self, event: NavEvent) -> bool {
        let Some(navigator) = self.navigator.as_mut() else { return false };
        let mut doc = lock(&*self.doc);
        navigator.handle(&mut *doc, &mut self.history, event)
    }

    /// Step back through history and let navigation follow it.
    pub fn back(&mut self) -> bool {
        self.history.back() && self.navigate(NavEvent::PopState)
    }

    /// A card image failed to load.
    pub fn image_failed(&self, element_id: &str) -> bool {
        let mut doc = lock(&*self.doc);
        match doc.element_by_id(element_id) {
            Some(img) => handle_image_error(&mut *doc, img),
            None => false,
        }
    }

    /// An observed image came within the loading margin.
    pub fn image_near_viewport(&self, img: NodeId) -> bool {
        let Some(observer) = &self.observer else { return false };
        let mut doc = lock(&*self.doc);
        let mut observed = lock(&**observer);
        self.lazy.on_intersect(&mut *doc, &mut *observed, img)
    }

    fn sink(&self) -> PageSink<D> {
        PageSink::new(self.doc.clone(), self.lazy).observed_by(self.observer.clone())
    }

    /// Fetch live data once and render it; static data was already rendered
    /// by [`Portfolio::initialize`].
    pub async fn render_once(&self) {
        if let Some(DataSource::Live(live)) = &self.source {
            live.fetch_once(&self.sink()).await;
        }
    }

    /// Start the pollers, the image rotation and, in live mode, the
    /// subscriptions. Requires a successful [`Portfolio::initialize`].
    pub fn spawn(self) -> Result<Running> {
        let (Some(api), Some(source)) = (self.api, self.source) else {
            return Err(Error::config("portfolio must be initialized before it is spawned"));
        };
        let polling = &self.config.polling;

        let (games, games_task) = GamesPoller::new(api.clone(), polling.games_interval()).spawn(self.doc.clone());
        let (groups, groups_task) = GroupsPoller::new(api, polling.groups_interval()).spawn(self.doc.clone());
        let mut tasks = vec![games_task, groups_task];
        tasks.push(spawn_rotation(
            self.doc.clone(),
            ImageRotator::new(self.config.assets.rotation.clone()),
            polling.rotation_interval(),
        ));

        match &source {
            DataSource::Live(_) => {
                let sink = PageSink::new(self.doc.clone(), self.lazy)
                    .observed_by(self.observer.clone())
                    .with_pollers(games.clone(), groups.clone());
                tasks.extend(source.deliver(Arc::new(sink)));
            }
            // Group cards were rendered during startup.
            DataSource::Static(_) => groups.poll_now(),
        }
        tracing::debug!(tasks = tasks.len(), "background tasks started");
        Ok(Running { games, groups, tasks })
    }
}

fn spawn_rotation<D: Document + Send + 'static>(
    doc: SharedDocument<D>,
    mut rotator: ImageRotator,
    period: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            let mut page = lock(&*doc);
            if rotator.advance(&mut *page).is_none() {
                tracing::debug!("no hero image to rotate; stopping");
                return;
            }
        }
    })
}

pub fn error_panel() -> Node {
    Element::new("div")
        .class("error-message")
        .child(Element::new("i").class("fas fa-exclamation-triangle"))
        .child(Element::new("h2").text("Failed to load portfolio"))
        .child(Element::new("p").text("Please refresh the page or try again later."))
        .child(Element::new("a").class("btn").attr("href", "").text("Reload"))
        .into()
}

/// Replace the loader's content with [`error_panel`] and make sure it shows.
pub fn show_error_panel<D: Document + ?Sized>(doc: &mut D) -> bool {
    let Some(loader) = doc.element_by_id(LOADER_ID) else { return false };
    doc.replace_children(loader, &[error_panel()]);
    doc.set_attr(loader, "style", "display:flex");
    true
}

/// Convenience for callers that own a plain document.
pub fn shared<D>(doc: D) -> SharedDocument<D> {
    Arc::new(Mutex::new(doc))
}
