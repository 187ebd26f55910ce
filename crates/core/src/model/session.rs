use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{Difficulty, SessionId, TopicId, UnitId, UserId};

/// Fixed number of questions a practice session aims for.
pub const DEFAULT_TARGET_QUESTIONS: u32 = 40;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already ended")]
    AlreadyEnded,

    #[error("session target of {target} questions already reached")]
    TargetReached { target: u32 },
}

//
// ─── PRACTICE SESSION ──────────────────────────────────────────────────────────
//

/// One bounded practice run for a user+unit(+topic).
///
/// Counters move on every answer submission; the aggregate fields stay unset
/// until the session is explicitly ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub unit_id: UnitId,
    pub topic_id: Option<TopicId>,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub target_questions: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub total_duration_secs: Option<u32>,
    pub average_time_secs: Option<f64>,
    pub accuracy_rate: Option<f64>,
    pub goal_achieved: Option<bool>,
}

impl PracticeSession {
    /// Opens a fresh session with the default 40-question target.
    #[must_use]
    pub fn start(
        id: SessionId,
        user_id: UserId,
        unit_id: UnitId,
        topic_id: Option<TopicId>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            unit_id,
            topic_id,
            total_questions: 0,
            correct_answers: 0,
            target_questions: DEFAULT_TARGET_QUESTIONS,
            started_at,
            ended_at: None,
            total_duration_secs: None,
            average_time_secs: None,
            accuracy_rate: None,
            goal_achieved: None,
        }
    }

    /// Number of questions still to answer before the target is reached.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.target_questions.saturating_sub(self.total_questions)
    }

    /// True once the answered count has reached the target.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_questions >= self.target_questions
    }

    /// Record one answered question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyEnded` for a finalized session and
    /// `SessionError::TargetReached` when another answer would push the
    /// answered count past the target.
    pub fn record_answer(&mut self, was_correct: bool) -> Result<(), SessionError> {
        if self.ended_at.is_some() {
            return Err(SessionError::AlreadyEnded);
        }
        if self.total_questions >= self.target_questions {
            return Err(SessionError::TargetReached {
                target: self.target_questions,
            });
        }

        self.total_questions += 1;
        if was_correct {
            self.correct_answers += 1;
        }
        Ok(())
    }

    /// Apply end-of-session aggregates.
    pub fn finalize(&mut self, stats: &SessionStats) {
        self.ended_at = Some(stats.ended_at);
        self.total_duration_secs = Some(stats.total_duration_secs);
        self.average_time_secs = Some(stats.average_time_secs);
        self.accuracy_rate = Some(stats.accuracy_rate);
        self.goal_achieved = Some(stats.goal_achieved);
    }
}

/// End-of-session aggregates persisted onto the session row.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    pub ended_at: DateTime<Utc>,
    pub total_duration_secs: u32,
    pub average_time_secs: f64,
    pub accuracy_rate: f64,
    pub goal_achieved: bool,
}

//
// ─── SESSION SUMMARY ───────────────────────────────────────────────────────────
//

/// Per-response facts needed for summary aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStat {
    pub is_correct: bool,
    pub time_spent_secs: Option<u32>,
    pub difficulty: Difficulty,
    pub topic: Option<String>,
}

/// Correct/total tally for one breakdown bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerTally {
    pub correct: u32,
    pub total: u32,
}

impl AnswerTally {
    fn count(&mut self, was_correct: bool) {
        self.total += 1;
        if was_correct {
            self.correct += 1;
        }
    }
}

/// Aggregate summary for an ended practice session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    total_questions: u32,
    correct_answers: u32,
    accuracy_rate: u32,
    total_time_secs: u32,
    average_time_secs: u32,
    topic_breakdown: BTreeMap<String, AnswerTally>,
    difficulty_breakdown: BTreeMap<Difficulty, AnswerTally>,
    target_questions: u32,
    completion_percentage: u32,
}

impl SessionSummary {
    /// Build a summary from the session counters and its recorded responses.
    ///
    /// Responses without a topic are bucketed under "General". Percentages
    /// are rounded to whole numbers and zero when no question was answered.
    #[must_use]
    pub fn from_responses(session: &PracticeSession, responses: &[ResponseStat]) -> Self {
        let total_time_secs: u32 = responses
            .iter()
            .map(|r| r.time_spent_secs.unwrap_or(0))
            .sum();

        let mut topic_breakdown: BTreeMap<String, AnswerTally> = BTreeMap::new();
        let mut difficulty_breakdown: BTreeMap<Difficulty, AnswerTally> = BTreeMap::new();
        for response in responses {
            let topic = response.topic.clone().unwrap_or_else(|| "General".into());
            topic_breakdown
                .entry(topic)
                .or_default()
                .count(response.is_correct);
            difficulty_breakdown
                .entry(response.difficulty)
                .or_default()
                .count(response.is_correct);
        }

        let total = session.total_questions;
        let correct = session.correct_answers;

        Self {
            total_questions: total,
            correct_answers: correct,
            accuracy_rate: round_percent(correct, total),
            total_time_secs,
            average_time_secs: round_ratio(total_time_secs, total),
            topic_breakdown,
            difficulty_breakdown,
            target_questions: session.target_questions,
            completion_percentage: round_percent(total, session.target_questions),
        }
    }

    /// Unrounded accuracy percentage, used for goal checks and persistence.
    #[must_use]
    pub fn accuracy_exact(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.correct_answers) / f64::from(self.total_questions) * 100.0
    }

    /// Unrounded mean seconds per answered question.
    #[must_use]
    pub fn average_time_exact(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.total_time_secs) / f64::from(self.total_questions)
    }

    /// True when the session met the 80% accuracy goal.
    #[must_use]
    pub fn goal_achieved(&self) -> bool {
        self.accuracy_exact() >= 80.0
    }

    /// End-of-session aggregates for persistence.
    #[must_use]
    pub fn stats(&self, ended_at: DateTime<Utc>) -> SessionStats {
        SessionStats {
            ended_at,
            total_duration_secs: self.total_time_secs,
            average_time_secs: self.average_time_exact(),
            accuracy_rate: self.accuracy_exact(),
            goal_achieved: self.goal_achieved(),
        }
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn accuracy_rate(&self) -> u32 {
        self.accuracy_rate
    }

    #[must_use]
    pub fn total_time_secs(&self) -> u32 {
        self.total_time_secs
    }

    #[must_use]
    pub fn average_time_secs(&self) -> u32 {
        self.average_time_secs
    }

    #[must_use]
    pub fn topic_breakdown(&self) -> &BTreeMap<String, AnswerTally> {
        &self.topic_breakdown
    }

    #[must_use]
    pub fn difficulty_breakdown(&self) -> &BTreeMap<Difficulty, AnswerTally> {
        &self.difficulty_breakdown
    }

    #[must_use]
    pub fn completion_percentage(&self) -> u32 {
        self.completion_percentage
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) / f64::from(whole) * 100.0).round() as u32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_ratio(sum: u32, count: u32) -> u32 {
    if count == 0 {
        return 0;
    }
    (f64::from(sum) / f64::from(count)).round() as u32
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
