use practice_core::model::{TopicId, UnitId, UnitProgress, UserId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_progress_row, topic_id_to_i64},
};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = r"
    user_id, unit_id, topic_id, consecutive_correct, consecutive_wrong,
    total_attempts, correct_attempts, current_difficulty, mastery_level, updated_at
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        unit_id: UnitId,
        topic_id: Option<TopicId>,
    ) -> Result<Option<UnitProgress>, StorageError> {
        let sql = format!(
            r"
            SELECT {PROGRESS_COLUMNS}
            FROM progress
            WHERE user_id = ?1 AND unit_id = ?2 AND topic_id IS ?3
            "
        );
        let row = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(id_i64("unit_id", unit_id.value())?)
            .bind(topic_id_to_i64(topic_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn upsert_progress(&self, progress: &UnitProgress) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE progress
            SET consecutive_correct = ?1,
                consecutive_wrong = ?2,
                total_attempts = ?3,
                correct_attempts = ?4,
                current_difficulty = ?5,
                mastery_level = ?6,
                updated_at = ?7
            WHERE user_id = ?8 AND unit_id = ?9 AND topic_id IS ?10
            ",
        )
        .bind(i64::from(progress.consecutive_correct))
        .bind(i64::from(progress.consecutive_wrong))
        .bind(i64::from(progress.total_attempts))
        .bind(i64::from(progress.correct_attempts))
        .bind(progress.current_difficulty.as_str())
        .bind(i64::from(progress.mastery_level))
        .bind(progress.updated_at)
        .bind(progress.user_id.as_str())
        .bind(id_i64("unit_id", progress.unit_id.value())?)
        .bind(topic_id_to_i64(progress.topic_id)?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() > 0 {
            return Ok(());
        }

        sqlx::query(
            r"
            INSERT INTO progress (
                user_id, unit_id, topic_id, consecutive_correct, consecutive_wrong,
                total_attempts, correct_attempts, current_difficulty, mastery_level, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(progress.user_id.as_str())
        .bind(id_i64("unit_id", progress.unit_id.value())?)
        .bind(topic_id_to_i64(progress.topic_id)?)
        .bind(i64::from(progress.consecutive_correct))
        .bind(i64::from(progress.consecutive_wrong))
        .bind(i64::from(progress.total_attempts))
        .bind(i64::from(progress.correct_attempts))
        .bind(progress.current_difficulty.as_str())
        .bind(i64::from(progress.mastery_level))
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<UnitProgress>, StorageError> {
        let sql = format!(
            r"
            SELECT {PROGRESS_COLUMNS}
            FROM progress
            WHERE user_id = ?1
            ORDER BY unit_id ASC, topic_id ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }
}
