/// Rating Repository
///
/// Read-only access to the user × destination rating matrix
use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::Result;
use crate::models::{Rating, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Ratings the user has given, ordered by destination id
    async fn ratings_for_user(&self, user_id: UserId) -> Result<Vec<Rating>>;

    /// Mean score across every rating in the system, `None` when the table is empty
    async fn global_mean(&self) -> Result<Option<f64>>;
}

#[derive(Clone)]
pub struct PgRatingStore {
    pool: PgPool,
}

impl PgRatingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingStore for PgRatingStore {
    async fn ratings_for_user(&self, user_id: UserId) -> Result<Vec<Rating>> {
        let rows = sqlx::query(
            "SELECT user_id, destination_id, score
             FROM ratings
             WHERE user_id = $1
             ORDER BY destination_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut ratings = Vec::with_capacity(rows.len());
        for row in rows {
            ratings.push(Rating {
                user_id: row.try_get("user_id")?,
                destination_id: row.try_get("destination_id")?,
                score: row.try_get("score")?,
            });
        }

        Ok(ratings)
    }

    async fn global_mean(&self) -> Result<Option<f64>> {
        let mean: Option<f64> = sqlx::query_scalar("SELECT AVG(score) FROM ratings")
            .fetch_one(&self.pool)
            .await?;

        Ok(mean)
    }
}
