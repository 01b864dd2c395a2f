//! In-memory store

use super::PeopleStore;
use crate::error::Result;
use crate::models::{PersonId, PersonRecord};
use async_trait::async_trait;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    schema_ready: bool,
    records: Vec<PersonRecord>,
    insert_calls: usize,
}

/// Store that keeps rows in process memory
///
/// Used by `--dry-run`; behaves like the database store in that every
/// insert appends, so repeated runs duplicate rows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored row, in insertion order
    pub async fn records(&self) -> Vec<PersonRecord> {
        self.inner.lock().await.records.clone()
    }

    /// Number of stored rows for one person
    pub async fn count_for(&self, person_id: PersonId) -> usize {
        self.inner
            .lock()
            .await
            .records
            .iter()
            .filter(|r| r.id == person_id)
            .count()
    }

    /// Number of `bulk_insert` calls received
    pub async fn insert_calls(&self) -> usize {
        self.inner.lock().await.insert_calls
    }

    pub async fn schema_ready(&self) -> bool {
        self.inner.lock().await.schema_ready
    }
}

#[async_trait]
impl PeopleStore for MemoryStore {
    async fn init_schema(&self) -> Result<()> {
        self.inner.lock().await.schema_ready = true;
        Ok(())
    }

    async fn bulk_insert(&self, records: &[PersonRecord]) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        inner.insert_calls += 1;
        inner.records.extend_from_slice(records);
        Ok(records.len() as u64)
    }
}
