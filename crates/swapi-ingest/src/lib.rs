//! SWAPI Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads a fixed range of people from the Star Wars API into PostgreSQL.
//!
//! # Pipeline
//!
//! - **Waves**: the identifier range is split into small contiguous groups
//!   fetched concurrently, one group at a time
//! - **Persistence**: each fetched wave is validated and written by its own
//!   background task while the next wave is fetched
//! - **Drain**: the run ends only after every persistence task finished
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use swapi_ingest::{Config, HttpFetcher, PgPeopleStore, WaveScheduler};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!     let store = Arc::new(PgPeopleStore::connect(&config.database).await?);
//!     let fetcher = HttpFetcher::new(&config.api)?;
//!
//!     let summary = WaveScheduler::new(fetcher, store)
//!         .ingest(config.range()?, config.api.wave_size)
//!         .await?;
//!     tracing::info!(inserted = summary.inserted, "People stored");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod drain;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod persister;
pub mod scheduler;
pub mod store;
pub mod wave;

pub use config::Config;
pub use drain::{DrainReport, PersistenceTasks};
pub use error::{IngestError, Result};
pub use fetcher::{HttpFetcher, RecordFetcher};
pub use models::{PersonId, PersonRecord, RawFetchResult, Rejection, RunSummary, REQUIRED_FIELDS};
pub use scheduler::WaveScheduler;
pub use store::{MemoryStore, PeopleStore, PgPeopleStore};
pub use wave::{IdRange, Wave};
