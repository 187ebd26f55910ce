use chrono::{DateTime, Utc};

use practice_core::model::{NewUser, User, UserId};

use super::{SqliteRepository, mapping::map_user_row};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn ensure_user(
        &self,
        new_user: &NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, StorageError> {
        if let Some(existing) = self.get_user(&new_user.id).await? {
            return Ok(existing);
        }

        let email = new_user.email_or_default();
        sqlx::query(
            r"
            INSERT INTO users (id, email, name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(new_user.id.as_str())
        .bind(&email)
        .bind(new_user.name.as_deref())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.get_user(&new_user.id)
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query("SELECT id, email, name, created_at FROM users WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_user_row).transpose()
    }
}
