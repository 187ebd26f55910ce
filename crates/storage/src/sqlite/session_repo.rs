use practice_core::model::{PracticeSession, SessionId, SessionStats};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_session_row, topic_id_to_i64},
};
use crate::repository::{SessionRepository, StorageError};

const SESSION_COLUMNS: &str = r"
    id, user_id, unit_id, topic_id, total_questions, correct_answers, target_questions,
    started_at, ended_at, total_duration_secs, average_time_secs, accuracy_rate, goal_achieved
";

impl SqliteRepository {
    async fn fetch_session(&self, id: SessionId) -> Result<Option<PracticeSession>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_session_row).transpose()
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(&self, session: &PracticeSession) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO sessions (
                id, user_id, unit_id, topic_id, total_questions, correct_answers,
                target_questions, started_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(session.id.to_string())
        .bind(session.user_id.as_str())
        .bind(id_i64("unit_id", session.unit_id.value())?)
        .bind(topic_id_to_i64(session.topic_id)?)
        .bind(i64::from(session.total_questions))
        .bind(i64::from(session.correct_answers))
        .bind(i64::from(session.target_questions))
        .bind(session.started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<PracticeSession>, StorageError> {
        self.fetch_session(id).await
    }

    async fn record_answer(
        &self,
        id: SessionId,
        was_correct: bool,
    ) -> Result<PracticeSession, StorageError> {
        // Guarded increment: the answered count never passes the target.
        let res = sqlx::query(
            r"
            UPDATE sessions
            SET total_questions = total_questions + 1,
                correct_answers = correct_answers + ?1
            WHERE id = ?2
              AND ended_at IS NULL
              AND total_questions < target_questions
            ",
        )
        .bind(i64::from(was_correct))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return match self.fetch_session(id).await? {
                Some(_) => Err(StorageError::Conflict),
                None => Err(StorageError::NotFound),
            };
        }

        self.fetch_session(id).await?.ok_or(StorageError::NotFound)
    }

    async fn finalize_session(
        &self,
        id: SessionId,
        stats: &SessionStats,
    ) -> Result<PracticeSession, StorageError> {
        let res = sqlx::query(
            r"
            UPDATE sessions
            SET ended_at = ?1,
                total_duration_secs = ?2,
                average_time_secs = ?3,
                accuracy_rate = ?4,
                goal_achieved = ?5
            WHERE id = ?6
            ",
        )
        .bind(stats.ended_at)
        .bind(i64::from(stats.total_duration_secs))
        .bind(stats.average_time_secs)
        .bind(stats.accuracy_rate)
        .bind(stats.goal_achieved)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.fetch_session(id).await?.ok_or(StorageError::NotFound)
    }
}
