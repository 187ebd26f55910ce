use sqlx::Row;

use practice_core::model::{
    Difficulty, PracticeSession, Question, QuestionId, QuestionStatus, QuestionType, ResponseStat,
    SessionId, Topic, TopicId, Unit, UnitId, UnitProgress, User, UserId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn unit_id_from_i64(v: i64) -> Result<UnitId, StorageError> {
    Ok(UnitId::new(i64_to_u64("unit_id", v)?))
}

pub(crate) fn topic_id_from_i64(v: i64) -> Result<TopicId, StorageError> {
    Ok(TopicId::new(i64_to_u64("topic_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn topic_id_to_i64(tid: Option<TopicId>) -> Result<Option<i64>, StorageError> {
    tid.map(|t| id_i64("topic_id", t.value())).transpose()
}

pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

fn options_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, StorageError> {
    Ok(User {
        id: UserId::new(row.try_get::<String, _>("id").map_err(ser)?),
        email: row.try_get("email").map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_unit_row(row: &sqlx::sqlite::SqliteRow) -> Result<Unit, StorageError> {
    Ok(Unit {
        id: unit_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        unit_number: u32_from_i64(
            "unit_number",
            row.try_get::<i64, _>("unit_number").map_err(ser)?,
        )?,
        name: row.try_get("name").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        icon: row.try_get("icon").map_err(ser)?,
        color: row.try_get("color").map_err(ser)?,
        is_active: row.try_get("is_active").map_err(ser)?,
    })
}

pub(crate) fn map_topic_row(row: &sqlx::sqlite::SqliteRow) -> Result<Topic, StorageError> {
    Ok(Topic {
        id: topic_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        unit_id: unit_id_from_i64(row.try_get::<i64, _>("unit_id").map_err(ser)?)?,
        name: row.try_get("name").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        order_index: u32_from_i64(
            "order_index",
            row.try_get::<i64, _>("order_index").map_err(ser)?,
        )?,
    })
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let question_type: QuestionType = row
        .try_get::<String, _>("question_type")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let status: QuestionStatus = row
        .try_get::<String, _>("status")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Ok(Question {
        id: question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        unit_id: unit_id_from_i64(row.try_get::<i64, _>("unit_id").map_err(ser)?)?,
        topic_id: row
            .try_get::<Option<i64>, _>("topic_id")
            .map_err(ser)?
            .map(topic_id_from_i64)
            .transpose()?,
        question_text: row.try_get("question_text").map_err(ser)?,
        code_snippet: row.try_get("code_snippet").map_err(ser)?,
        options: options_from_json(&row.try_get::<String, _>("options").map_err(ser)?)?,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
        question_type,
        difficulty,
        status,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<PracticeSession, StorageError> {
    let id: SessionId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let total_duration_secs = row
        .try_get::<Option<i64>, _>("total_duration_secs")
        .map_err(ser)?
        .map(|v| u32_from_i64("total_duration_secs", v))
        .transpose()?;

    Ok(PracticeSession {
        id,
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        unit_id: unit_id_from_i64(row.try_get::<i64, _>("unit_id").map_err(ser)?)?,
        topic_id: row
            .try_get::<Option<i64>, _>("topic_id")
            .map_err(ser)?
            .map(topic_id_from_i64)
            .transpose()?,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        correct_answers: u32_from_i64(
            "correct_answers",
            row.try_get::<i64, _>("correct_answers").map_err(ser)?,
        )?,
        target_questions: u32_from_i64(
            "target_questions",
            row.try_get::<i64, _>("target_questions").map_err(ser)?,
        )?,
        started_at: row.try_get("started_at").map_err(ser)?,
        ended_at: row.try_get("ended_at").map_err(ser)?,
        total_duration_secs,
        average_time_secs: row.try_get("average_time_secs").map_err(ser)?,
        accuracy_rate: row.try_get("accuracy_rate").map_err(ser)?,
        goal_achieved: row.try_get("goal_achieved").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<UnitProgress, StorageError> {
    let current_difficulty: Difficulty = row
        .try_get::<String, _>("current_difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Ok(UnitProgress {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        unit_id: unit_id_from_i64(row.try_get::<i64, _>("unit_id").map_err(ser)?)?,
        topic_id: row
            .try_get::<Option<i64>, _>("topic_id")
            .map_err(ser)?
            .map(topic_id_from_i64)
            .transpose()?,
        consecutive_correct: u32_from_i64(
            "consecutive_correct",
            row.try_get::<i64, _>("consecutive_correct").map_err(ser)?,
        )?,
        consecutive_wrong: u32_from_i64(
            "consecutive_wrong",
            row.try_get::<i64, _>("consecutive_wrong").map_err(ser)?,
        )?,
        total_attempts: u32_from_i64(
            "total_attempts",
            row.try_get::<i64, _>("total_attempts").map_err(ser)?,
        )?,
        correct_attempts: u32_from_i64(
            "correct_attempts",
            row.try_get::<i64, _>("correct_attempts").map_err(ser)?,
        )?,
        current_difficulty,
        mastery_level: u32_from_i64(
            "mastery_level",
            row.try_get::<i64, _>("mastery_level").map_err(ser)?,
        )?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_response_stat_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ResponseStat, StorageError> {
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let time_spent_secs = row
        .try_get::<Option<i64>, _>("time_spent_secs")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_spent_secs", v))
        .transpose()?;

    Ok(ResponseStat {
        is_correct: row.try_get("is_correct").map_err(ser)?,
        time_spent_secs,
        difficulty,
        topic: row.try_get("topic_name").map_err(ser)?,
    })
}
