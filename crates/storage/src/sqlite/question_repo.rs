use practice_core::model::{Difficulty, Question, QuestionId, UnitId, ValidatedQuestion};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_question_row, options_to_json, topic_id_to_i64},
};
use crate::repository::{QuestionRepository, StorageError};

const QUESTION_COLUMNS: &str = r"
    id, unit_id, topic_id, question_text, code_snippet, options,
    correct_answer, explanation, question_type, difficulty, status, created_at
";

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<QuestionId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO questions (
                unit_id, topic_id, question_text, code_snippet, options,
                correct_answer, explanation, question_type, difficulty, status, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(id_i64("unit_id", question.unit_id.value())?)
        .bind(topic_id_to_i64(question.topic_id)?)
        .bind(&question.question_text)
        .bind(question.code_snippet.as_deref())
        .bind(options_to_json(&question.options)?)
        .bind(&question.correct_answer)
        .bind(&question.explanation)
        .bind(question.question_type.as_str())
        .bind(question.difficulty.as_str())
        .bind(question.status.as_str())
        .bind(question.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("question_id sign overflow".into()))?;
        Ok(QuestionId::new(id))
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("question_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn candidates(
        &self,
        unit_id: UnitId,
        difficulty: Difficulty,
        exclude: &[QuestionId],
    ) -> Result<Vec<Question>, StorageError> {
        let mut sql = format!(
            r"
            SELECT {QUESTION_COLUMNS}
            FROM questions
            WHERE unit_id = ?1 AND difficulty = ?2 AND status = ?3
            "
        );

        if !exclude.is_empty() {
            sql.push_str(" AND id NOT IN (");
            for i in 0..exclude.len() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push('?');
                sql.push_str(&(i + 4).to_string());
            }
            sql.push(')');
        }

        let mut q = sqlx::query(&sql)
            .bind(id_i64("unit_id", unit_id.value())?)
            .bind(difficulty.as_str())
            .bind(practice_core::model::QuestionStatus::Approved.as_str());

        for id in exclude {
            q = q.bind(id_i64("question_id", id.value())?);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_row).collect()
    }
}
