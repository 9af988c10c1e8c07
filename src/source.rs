//! Where card data comes from: live store subscriptions or static fixtures.
//!
//! The variant is chosen once at startup; both hand [`Catalog`] snapshots to
//! the same [`SnapshotSink`], so nothing downstream branches on the mode.

pub mod firestore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fixtures;
use crate::types::{Catalog, Collection};

pub use firestore::FirestoreStore;

/// Read-only access to the remote document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents of `collection` with `show == true`, newest `createdAt` first.
    async fn visible(&self, collection: Collection) -> Result<Vec<Value>>;
}

/// Receives every snapshot and subscription error.
pub trait SnapshotSink: Send + Sync {
    fn on_snapshot(&self, catalog: Catalog);
    fn on_error(&self, collection: Collection, error: Error);
}

/// Live view of one collection: the first result, then each result that
/// differs from the previous one. Failed queries surface as `Err` items and the
/// stream keeps refreshing afterwards.
pub fn subscribe(
    store: Arc<dyn DocumentStore>,
    collection: Collection,
    refresh: Duration,
) -> impl Stream<Item = Result<Vec<Value>>> + Send {
    stream::unfold((store, None::<Vec<Value>>, true), move |(store, mut last, mut first)| async move {
        loop {
            if !first {
                tokio::time::sleep(refresh).await;
            }
            first = false;
            match store.visible(collection).await {
                Ok(docs) if last.as_ref() == Some(&docs) => continue,
                Ok(docs) => {
                    last = Some(docs.clone());
                    return Some((Ok(docs), (store, last, first)));
                }
                Err(err) => return Some((Err(err), (store, last, first))),
            }
        }
    })
}

#[derive(Clone)]
pub struct LiveSource {
    store: Arc<dyn DocumentStore>,
    refresh: Duration,
}

impl LiveSource {
    pub fn new(store: Arc<dyn DocumentStore>, refresh: Duration) -> Self {
        Self { store, refresh }
    }

    /// One query per collection, delivered in order. Used for one-shot renders.
    pub async fn fetch_once(&self, sink: &dyn SnapshotSink) {
        for collection in Collection::ALL {
            match self.store.visible(collection).await {
                Ok(docs) => sink.on_snapshot(Catalog::decode(collection, docs)),
                Err(err) => sink.on_error(collection, err),
            }
        }
    }
}

pub enum DataSource {
    Live(LiveSource),
    /// Catalogs rendered once, in order.
    Static(Vec<Catalog>),
}

impl DataSource {
    /// Live when the config carries a usable store descriptor, fixtures otherwise.
    pub fn select(config: &Config) -> Result<Self> {
        match config.live_store() {
            Some(store) => {
                tracing::info!(project = %store.project_id, "using live document store");
                let firestore = FirestoreStore::new(store)?;
                Ok(DataSource::Live(LiveSource::new(Arc::new(firestore), store.refresh())))
            }
            None => {
                if config.store.is_some() {
                    tracing::warn!("document store configured without a project id; using fallback data");
                } else {
                    tracing::info!("no document store configured; using fallback data");
                }
                Ok(DataSource::fallback())
            }
        }
    }

    pub fn fallback() -> Self {
        DataSource::Static(fixtures::catalogs())
    }

    pub fn is_live(&self) -> bool {
        matches!(self, DataSource::Live(_))
    }

    /// Static catalogs are handed over before this returns. Live sources spawn
    /// one subscription task per collection; the handles are returned so the
    /// caller can stop them.
    pub fn deliver(&self, sink: Arc<dyn SnapshotSink>) -> Vec<JoinHandle<()>> {
        match self {
            DataSource::Static(catalogs) => {
                for catalog in catalogs {
                    sink.on_snapshot(catalog.clone());
                }
                Vec::new()
            }
            DataSource::Live(live) => Collection::ALL
                .into_iter()
                .map(|collection| {
                    let updates = subscribe(live.store.clone(), collection, live.refresh);
                    let sink = sink.clone();
                    tokio::spawn(async move {
                        let mut updates = Box::pin(updates);
                        while let Some(update) = updates.next().await {
                            match update {
                                Ok(docs) => sink.on_snapshot(Catalog::decode(collection, docs)),
                                Err(err) => sink.on_error(collection, err),
                            }
                        }
                    })
                })
                .collect(),
        }
    }
}
