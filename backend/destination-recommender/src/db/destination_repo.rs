/// Destination Repository
///
/// Catalog lookups: the candidate universe for CF scoring and the
/// geographic metadata used to enrich ranked results
use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::Result;
use crate::models::{DestinationId, DestinationLocation};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Every destination id in the catalog, ascending
    async fn all_ids(&self) -> Result<Vec<DestinationId>>;

    /// City, state and coordinates for the requested ids; unknown ids are skipped
    async fn locations(&self, ids: &[DestinationId]) -> Result<Vec<DestinationLocation>>;
}

#[derive(Clone)]
pub struct PgDestinationStore {
    pool: PgPool,
}

impl PgDestinationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DestinationStore for PgDestinationStore {
    async fn all_ids(&self) -> Result<Vec<DestinationId>> {
        let ids: Vec<DestinationId> =
            sqlx::query_scalar("SELECT destination_id FROM destinations ORDER BY destination_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }

    async fn locations(&self, ids: &[DestinationId]) -> Result<Vec<DestinationLocation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT destination_id, city, state, lat, lng
             FROM destinations
             WHERE destination_id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut locations = Vec::with_capacity(rows.len());
        for row in rows {
            locations.push(DestinationLocation {
                destination_id: row.try_get("destination_id")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                lat: row.try_get("lat")?,
                lng: row.try_get("lng")?,
            });
        }

        Ok(locations)
    }
}
