use practice_core::model::{QuestionId, QuestionResponse, ResponseStat, SessionId, UnitId, UserId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_response_stat_row, question_id_from_i64, ser},
};
use crate::repository::{ResponseRepository, StorageError};
use sqlx::Row;

#[async_trait::async_trait]
impl ResponseRepository for SqliteRepository {
    async fn insert_response(&self, response: &QuestionResponse) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO responses (
                id, user_id, question_id, session_id, user_answer,
                is_correct, time_spent_secs, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(response.id.to_string())
        .bind(response.user_id.as_str())
        .bind(id_i64("question_id", response.question_id.value())?)
        .bind(response.session_id.to_string())
        .bind(&response.user_answer)
        .bind(response.is_correct)
        .bind(response.time_spent_secs.map(i64::from))
        .bind(response.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn answered_question_ids(
        &self,
        user_id: &UserId,
        unit_id: UnitId,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT DISTINCT r.question_id
            FROM responses r
            JOIN questions q ON q.id = r.question_id
            WHERE r.user_id = ?1 AND q.unit_id = ?2
            ORDER BY r.question_id ASC
            ",
        )
        .bind(user_id.as_str())
        .bind(id_i64("unit_id", unit_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(question_id_from_i64(
                row.try_get::<i64, _>("question_id").map_err(ser)?,
            )?);
        }
        Ok(ids)
    }

    async fn session_stats(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseStat>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT r.is_correct, r.time_spent_secs, q.difficulty, t.name AS topic_name
            FROM responses r
            JOIN questions q ON q.id = r.question_id
            LEFT JOIN topics t ON t.id = q.topic_id
            WHERE r.session_id = ?1
            ORDER BY r.created_at ASC, r.rowid ASC
            ",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_response_stat_row).collect()
    }
}
