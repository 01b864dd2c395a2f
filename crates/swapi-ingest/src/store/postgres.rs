//! PostgreSQL store

use super::PeopleStore;
use crate::config::DbConfig;
use crate::error::Result;
use crate::models::{PersonId, PersonRecord};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{debug, info};

/// Person rows keep the API identifier next to the raw JSON payload; the
/// surrogate `id` lets repeated runs append instead of conflicting.
const CREATE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS swapi_people (
        id BIGSERIAL PRIMARY KEY,
        person_id BIGINT NOT NULL,
        json JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_PERSON_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_swapi_people_person_id ON swapi_people (person_id)";

/// Store writing to the `swapi_people` table
#[derive(Clone)]
pub struct PgPeopleStore {
    pool: PgPool,
}

impl PgPeopleStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool from configuration
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool created"
        );

        Ok(Self::new(pool))
    }

    /// Number of stored rows for one person
    pub async fn count_for(&self, person_id: PersonId) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM swapi_people WHERE person_id = $1")
                .bind(person_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Close the pool once all persistence tasks are done
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl PeopleStore for PgPeopleStore {
    async fn init_schema(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(CREATE_SCHEMA).execute(&mut *tx).await?;
        sqlx::query(CREATE_PERSON_INDEX).execute(&mut *tx).await?;
        tx.commit().await?;

        info!("Database schema ready");
        Ok(())
    }

    async fn bulk_insert(&self, records: &[PersonRecord]) -> Result<u64> {
        if records.is_empty() {
            debug!("No records to insert");
            return Ok(0);
        }

        // Dropping an uncommitted transaction rolls it back
        let mut tx = self.pool.begin().await?;

        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO swapi_people (person_id, json) ");

        query_builder.push_values(records, |mut b, record| {
            b.push_bind(record.id).push_bind(&record.payload);
        });

        let inserted = query_builder
            .build()
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(inserted)
    }
}
