use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{Difficulty, QuestionId, TopicId, UnitId};

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    FreeResponse,
    CodeAnalysis,
    CodeCompletion,
    TrueFalse,
}

impl QuestionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "MULTIPLE_CHOICE",
            QuestionType::FreeResponse => "FREE_RESPONSE",
            QuestionType::CodeAnalysis => "CODE_ANALYSIS",
            QuestionType::CodeCompletion => "CODE_COMPLETION",
            QuestionType::TrueFalse => "TRUE_FALSE",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid question type: {0}")]
pub struct ParseQuestionTypeError(String);

impl FromStr for QuestionType {
    type Err = ParseQuestionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MULTIPLE_CHOICE" => Ok(QuestionType::MultipleChoice),
            "FREE_RESPONSE" => Ok(QuestionType::FreeResponse),
            "CODE_ANALYSIS" => Ok(QuestionType::CodeAnalysis),
            "CODE_COMPLETION" => Ok(QuestionType::CodeCompletion),
            "TRUE_FALSE" => Ok(QuestionType::TrueFalse),
            other => Err(ParseQuestionTypeError(other.to_string())),
        }
    }
}

/// Review state for a question. Only approved questions are served to
/// learners; generated questions land in review unless auto-approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStatus {
    Approved,
    PendingReview,
}

impl QuestionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::Approved => "APPROVED",
            QuestionStatus::PendingReview => "PENDING_REVIEW",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid question status: {0}")]
pub struct ParseQuestionStatusError(String);

impl FromStr for QuestionStatus {
    type Err = ParseQuestionStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(QuestionStatus::Approved),
            "PENDING_REVIEW" => Ok(QuestionStatus::PendingReview),
            other => Err(ParseQuestionStatusError(other.to_string())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A practice question. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub unit_id: UnitId,
    pub topic_id: Option<TopicId>,
    pub question_text: String,
    pub code_snippet: Option<String>,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub status: QuestionStatus,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Checks a submitted answer against the stored one.
    ///
    /// Comparison is trimmed and case-insensitive so option text copied with
    /// stray whitespace or different casing still counts.
    #[must_use]
    pub fn check_answer(&self, answer: &str) -> bool {
        self.correct_answer
            .trim()
            .eq_ignore_ascii_case(answer.trim())
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == QuestionStatus::Approved
    }
}

//
// ─── DRAFT / VALIDATION ────────────────────────────────────────────────────────
//

/// Unvalidated question fields, as authored or generated.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub unit_id: UnitId,
    pub topic_id: Option<TopicId>,
    pub question_text: String,
    pub code_snippet: Option<String>,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub status: QuestionStatus,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionValidationError {
    #[error("question text is empty")]
    EmptyText,

    #[error("correct answer is empty")]
    EmptyAnswer,

    #[error("multiple choice needs at least two options, got {0}")]
    TooFewOptions(usize),
}

impl QuestionDraft {
    /// Validate the draft into a persistable question (sans id).
    ///
    /// # Errors
    ///
    /// Returns `QuestionValidationError` when the prompt or answer is blank,
    /// or a multiple-choice draft carries fewer than two options.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuestion, QuestionValidationError> {
        if self.question_text.trim().is_empty() {
            return Err(QuestionValidationError::EmptyText);
        }
        if self.correct_answer.trim().is_empty() {
            return Err(QuestionValidationError::EmptyAnswer);
        }
        if self.question_type == QuestionType::MultipleChoice && self.options.len() < 2 {
            return Err(QuestionValidationError::TooFewOptions(self.options.len()));
        }

        Ok(ValidatedQuestion {
            unit_id: self.unit_id,
            topic_id: self.topic_id,
            question_text: self.question_text,
            code_snippet: self.code_snippet,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            question_type: self.question_type,
            difficulty: self.difficulty,
            status: self.status,
            created_at: now,
        })
    }
}

/// A validated question waiting for storage to assign its id.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuestion {
    pub unit_id: UnitId,
    pub topic_id: Option<TopicId>,
    pub question_text: String,
    pub code_snippet: Option<String>,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub status: QuestionStatus,
    pub created_at: DateTime<Utc>,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            unit_id: self.unit_id,
            topic_id: self.topic_id,
            question_text: self.question_text,
            code_snippet: self.code_snippet,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            question_type: self.question_type,
            difficulty: self.difficulty,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            unit_id: UnitId::new(1),
            topic_id: None,
            question_text: "What does `let` introduce?".into(),
            code_snippet: None,
            options: vec!["A binding".into(), "A loop".into()],
            correct_answer: "A binding".into(),
            explanation: "`let` introduces a new binding.".into(),
            question_type: QuestionType::MultipleChoice,
            difficulty: Difficulty::Easy,
            status: QuestionStatus::Approved,
        }
    }

    #[test]
    fn answer_check_ignores_case_and_whitespace() {
        let question = draft().validate(fixed_now()).unwrap().assign_id(QuestionId::new(7));
        assert!(question.check_answer("  a binding "));
        assert!(!question.check_answer("A loop"));
    }

    #[test]
    fn blank_text_fails_validation() {
        let mut d = draft();
        d.question_text = "   ".into();
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            QuestionValidationError::EmptyText
        );
    }

    #[test]
    fn multiple_choice_requires_options() {
        let mut d = draft();
        d.options = vec!["only one".into()];
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            QuestionValidationError::TooFewOptions(1)
        );
    }

    #[test]
    fn free_response_needs_no_options() {
        let mut d = draft();
        d.question_type = QuestionType::FreeResponse;
        d.options = Vec::new();
        assert!(d.validate(fixed_now()).is_ok());
    }
}
