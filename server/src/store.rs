//! Storage seam for the grid cache.
//!
//! The sweep and the map endpoints only depend on this trait; the Postgres
//! implementation delegates to the plain-SQL repo functions, and an
//! in-memory backend serves tests and local development without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::db;
use crate::models::{GridAnalysis, ResourceType};
use crate::repos;

#[async_trait]
pub trait GridStore: Send + Sync {
    async fn find(
        &self,
        lat: f64,
        lon: f64,
        resource: ResourceType,
    ) -> anyhow::Result<Option<GridAnalysis>>;

    async fn upsert(&self, record: &GridAnalysis) -> anyhow::Result<()>;

    /// All records with a positive overall score, ordered by coordinate.
    async fn scored_points(&self, resource: ResourceType) -> anyhow::Result<Vec<GridAnalysis>>;
}

pub struct PgGridStore {
    pool: db::Pool,
}

impl PgGridStore {
    pub fn new(pool: db::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GridStore for PgGridStore {
    async fn find(
        &self,
        lat: f64,
        lon: f64,
        resource: ResourceType,
    ) -> anyhow::Result<Option<GridAnalysis>> {
        let client = self.pool.get().await?;
        repos::grid_analyses::find(&client, lat, lon, resource).await
    }

    async fn upsert(&self, record: &GridAnalysis) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        repos::grid_analyses::upsert(&client, record).await
    }

    async fn scored_points(&self, resource: ResourceType) -> anyhow::Result<Vec<GridAnalysis>> {
        let client = self.pool.get().await?;
        repos::grid_analyses::scored_points(&client, resource).await
    }
}

/// Grid coordinates arrive rounded to 2 decimals, so centi-degrees make an
/// exact hash key.
fn key(lat: f64, lon: f64, resource: ResourceType) -> (i64, i64, ResourceType) {
    (
        (lat * 100.0).round() as i64,
        (lon * 100.0).round() as i64,
        resource,
    )
}

/// In-memory cache backend.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(i64, i64, ResourceType), GridAnalysis>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GridStore for MemoryStore {
    async fn find(
        &self,
        lat: f64,
        lon: f64,
        resource: ResourceType,
    ) -> anyhow::Result<Option<GridAnalysis>> {
        let records = self.records.lock().await;
        Ok(records.get(&key(lat, lon, resource)).cloned())
    }

    async fn upsert(&self, record: &GridAnalysis) -> anyhow::Result<()> {
        let mut records = self.records.lock().await;
        records.insert(
            key(record.latitude, record.longitude, record.resource_type),
            record.clone(),
        );
        Ok(())
    }

    async fn scored_points(&self, resource: ResourceType) -> anyhow::Result<Vec<GridAnalysis>> {
        let records = self.records.lock().await;
        let mut out: Vec<GridAnalysis> = records
            .values()
            .filter(|r| r.resource_type == resource && r.overall_score > 0.0)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (a.latitude, a.longitude)
                .partial_cmp(&(b.latitude, b.longitude))
                .expect("coordinates are finite")
        });
        Ok(out)
    }
}
