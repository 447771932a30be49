//! Seeding for a crawl frontier store.
//!
//! The [`Injector`] writes seeds, permanent-redirect placeholders and
//! pre-fetched documents into a [`FrontierStore`], never replacing a record
//! that is already there. Records are keyed by [`key::to_key`].

pub mod config;
pub mod data;
pub mod error;
pub mod injector;
pub mod key;
pub mod record;
pub mod seeds;
pub mod store;

pub use config::{InjectorConfig, OverrideKeys};
pub use data::SqliteStore;
pub use error::{Result, SeedError};
pub use injector::{Injector, SeedOutcome};
pub use record::{CrawlStatus, Document, FrontierRecord, Metadata, Override, OverrideReport};
pub use store::{Field, FrontierStore, MemoryStore};
