pub mod app;
pub mod config;
pub mod dom;
pub mod error;
pub mod fixtures;
pub mod lazy;
pub mod nav;
pub mod page;
pub mod render;
pub mod rotation;
pub mod source;
pub mod stats;
pub mod types;
pub mod view;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::app::{shared, PageSink, Portfolio, Running};
    pub use crate::config::Config;
    pub use crate::dom::{Document, MemoryDocument, SharedDocument};
    pub use crate::error::{Error, Result};
    pub use crate::nav::NavEvent;
    pub use crate::source::{DataSource, DocumentStore, SnapshotSink};
    pub use crate::stats::StatsApi;
    pub use crate::types::{Animation, Catalog, Category, Collection, GenericProject, Project, WorkedGroup};
}

pub use error::{Error, Result};
