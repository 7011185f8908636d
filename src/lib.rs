pub mod config;
pub mod crawler;
pub mod engine;
pub mod error;
pub mod extent;
pub mod hierarchy;
pub mod layer;
pub mod metadata;
pub mod model;
pub mod publish;

pub use config::{CatalogConfig, Contact, CrawlConfig, MergeStrategy};
pub use crawler::{CrawlState, CrawlSummary, Crawler};
pub use engine::{GisEngine, MapLayer, Reprojector};
pub use error::{CrawlError, Result};
pub use model::{DatasetDescriptor, DatasetKind, Extent, Workspace};
pub use publish::{DryRunPublisher, HttpPublisher, PublishResponse, Publisher};
