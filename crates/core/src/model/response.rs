use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{QuestionId, ResponseId, SessionId, UserId};

/// A learner's answer to one question, recorded once per submission.
///
/// The response keeps the owning session so the globally-answered set for a
/// user+unit can be rebuilt across all past sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: ResponseId,
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub session_id: SessionId,
    pub user_answer: String,
    pub is_correct: bool,
    pub time_spent_secs: Option<u32>,
    pub created_at: DateTime<Utc>,
}
