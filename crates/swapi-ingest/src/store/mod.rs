//! Persistence for validated person records
//!
//! - `postgres`: the production store (sqlx / PostgreSQL)
//! - `memory`: an in-process store for dry runs and tests

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgPeopleStore;

use crate::error::Result;
use crate::models::PersonRecord;
use async_trait::async_trait;

/// Destination for validated records
///
/// Each persistence task calls `bulk_insert` once with its whole wave, so
/// an implementation must treat every call as an independent, atomic
/// batch. Inserts never deduplicate.
#[async_trait]
pub trait PeopleStore: Send + Sync + 'static {
    /// Create the schema if it does not exist yet
    async fn init_schema(&self) -> Result<()>;

    /// Insert all records in one session and commit, returning the row count
    async fn bulk_insert(&self, records: &[PersonRecord]) -> Result<u64>;
}
