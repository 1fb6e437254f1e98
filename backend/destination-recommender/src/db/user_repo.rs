use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::Result;
use crate::models::{User, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, user_id: UserId) -> Result<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT user_id, name, preferences_text FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(User {
                user_id: row.try_get("user_id")?,
                name: row.try_get("name")?,
                preferences_text: row.try_get("preferences_text")?,
            })),
            None => Ok(None),
        }
    }
}
