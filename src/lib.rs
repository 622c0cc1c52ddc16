pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod cron;
pub mod merge;
pub mod models;
pub mod pubsub;
pub mod sources;
pub mod view;

pub use crate::app::AppState;
pub use crate::cache::SnapshotCache;
pub use crate::config::{Settings, TrackedToken};
pub use crate::cron::{CronScheduler, Sweeper, TickReport};
pub use crate::models::{CanonicalRecord, PartialRecord};
pub use crate::pubsub::Broadcaster;
pub use crate::sources::{HttpMarketFeed, MarketFeed};
pub use crate::view::ViewState;
