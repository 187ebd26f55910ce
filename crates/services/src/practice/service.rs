use std::sync::Arc;

use tracing::{info, warn};

use practice_core::Clock;
use practice_core::model::{
    Difficulty, NewUser, PracticeSession, ProgressMetrics, Question, QuestionId, QuestionResponse,
    QuestionType, ResponseId, SessionError, SessionId, SessionSummary, TopicId, UnitId, UserId,
};
use storage::repository::{
    QuestionRepository, ResponseRepository, SessionRepository, StorageError, UnitRepository,
    UserRepository,
};

use crate::adaptive::AdaptiveService;
use crate::error::PracticeError;
use crate::generation::{GenerationRequest, QuestionGenerator};

use super::selection::QuestionSelector;

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct StartSession {
    pub user_id: UserId,
    pub unit_id: UnitId,
    pub topic_id: Option<TopicId>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NextQuestion {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub unit_id: UnitId,
    pub answered_question_ids: Vec<QuestionId>,
    pub topic_id: Option<TopicId>,
}

#[derive(Debug, Clone)]
pub struct SubmitAnswer {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub user_answer: String,
    pub time_spent_secs: Option<u32>,
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session: PracticeSession,
    pub question: Question,
    pub recommended_difficulty: Difficulty,
    pub questions_remaining: u32,
    pub total_questions: u32,
}

#[derive(Debug, Clone)]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub correct_answer: String,
    pub explanation: String,
    pub progress: ProgressMetrics,
    pub difficulty_changed: bool,
    pub questions_remaining: u32,
    pub is_session_complete: bool,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session: PracticeSession,
    pub summary: SessionSummary,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Orchestrates practice sessions: starting, stepping, answering, ending.
#[derive(Clone)]
pub struct PracticeService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    units: Arc<dyn UnitRepository>,
    questions: Arc<dyn QuestionRepository>,
    sessions: Arc<dyn SessionRepository>,
    responses: Arc<dyn ResponseRepository>,
    selector: QuestionSelector,
    adaptive: AdaptiveService,
    generator: Arc<QuestionGenerator>,
}

impl PracticeService {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        units: Arc<dyn UnitRepository>,
        questions: Arc<dyn QuestionRepository>,
        sessions: Arc<dyn SessionRepository>,
        responses: Arc<dyn ResponseRepository>,
        adaptive: AdaptiveService,
        generator: Arc<QuestionGenerator>,
    ) -> Self {
        let selector = QuestionSelector::new(Arc::clone(&questions));
        Self {
            clock,
            users,
            units,
            questions,
            sessions,
            responses,
            selector,
            adaptive,
            generator,
        }
    }

    /// Start a practice session and hand back its first question.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::UnitNotFound` for an unknown unit, and
    /// propagates storage and generation failures.
    pub async fn start_session(&self, request: StartSession) -> Result<SessionStart, PracticeError> {
        self.users
            .ensure_user(
                &NewUser {
                    id: request.user_id.clone(),
                    email: request.user_email.clone(),
                    name: request.user_name.clone(),
                },
                self.clock.now(),
            )
            .await?;

        let unit = self
            .units
            .get_unit(request.unit_id)
            .await?
            .ok_or(PracticeError::UnitNotFound)?;

        let answered = self
            .responses
            .answered_question_ids(&request.user_id, unit.id)
            .await?;
        let recommended = self
            .adaptive
            .recommended_difficulty(&request.user_id, unit.id, request.topic_id)
            .await?;

        let session = PracticeSession::start(
            SessionId::random(),
            request.user_id.clone(),
            unit.id,
            request.topic_id,
            self.clock.now(),
        );
        self.sessions.insert_session(&session).await?;

        let question = match self
            .selector
            .random_question(unit.id, recommended, &answered)
            .await?
        {
            Some(question) => question,
            None => {
                warn!(unit = %unit.id, %recommended, "no unseen questions, generating one");
                self.generate(unit.id, request.topic_id, recommended).await?
            }
        };

        info!(
            session = %session.id,
            user = %request.user_id,
            unit = %unit.id,
            %recommended,
            already_answered = answered.len(),
            "practice session started"
        );

        Ok(SessionStart {
            questions_remaining: session.target_questions - 1,
            total_questions: session.target_questions,
            session,
            question,
            recommended_difficulty: recommended,
        })
    }

    /// Next unseen question for an open session, or `None` once the target
    /// is reached.
    ///
    /// Selection prefers the recommended tier, then walks the other tiers in
    /// the fixed ascending order, then falls back to generation.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::SessionNotFound` for an unknown session, and
    /// propagates storage and generation failures.
    pub async fn next_question(
        &self,
        request: NextQuestion,
    ) -> Result<Option<Question>, PracticeError> {
        let session = self
            .sessions
            .get_session(request.session_id)
            .await?
            .ok_or(PracticeError::SessionNotFound)?;

        if session.is_complete() {
            info!(session = %session.id, "session complete, no further questions");
            return Ok(None);
        }

        let mut exclude = self
            .responses
            .answered_question_ids(&request.user_id, request.unit_id)
            .await?;
        for id in request.answered_question_ids {
            if !exclude.contains(&id) {
                exclude.push(id);
            }
        }

        let recommended = self
            .adaptive
            .recommended_difficulty(&request.user_id, request.unit_id, request.topic_id)
            .await?;

        match self
            .selector
            .select_with_fallback(request.unit_id, recommended, &exclude)
            .await?
        {
            Some(question) => Ok(Some(question)),
            None => {
                warn!(
                    unit = %request.unit_id,
                    excluded = exclude.len(),
                    "question bank exhausted, generating"
                );
                let question = self
                    .generate(request.unit_id, request.topic_id, recommended)
                    .await?;
                Ok(Some(question))
            }
        }
    }

    /// Check an answer, record the response, and adapt the learner's tier.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::QuestionNotFound` / `SessionNotFound` for
    /// missing rows, `PracticeError::Session` when the session target is
    /// already reached, and propagates storage failures.
    pub async fn submit_answer(
        &self,
        request: SubmitAnswer,
    ) -> Result<AnswerFeedback, PracticeError> {
        let question = self
            .questions
            .get_question(request.question_id)
            .await?
            .ok_or(PracticeError::QuestionNotFound)?;
        let session = self
            .sessions
            .get_session(request.session_id)
            .await?
            .ok_or(PracticeError::SessionNotFound)?;
        if session.is_complete() {
            return Err(SessionError::TargetReached {
                target: session.target_questions,
            }
            .into());
        }

        let is_correct = question.check_answer(&request.user_answer);

        self.responses
            .insert_response(&QuestionResponse {
                id: ResponseId::random(),
                user_id: request.user_id.clone(),
                question_id: question.id,
                session_id: request.session_id,
                user_answer: request.user_answer,
                is_correct,
                time_spent_secs: request.time_spent_secs,
                created_at: self.clock.now(),
            })
            .await?;

        let update = self
            .adaptive
            .update_progress(
                &request.user_id,
                question.unit_id,
                is_correct,
                request.time_spent_secs,
                question.topic_id,
            )
            .await?;

        let session = self
            .sessions
            .record_answer(request.session_id, is_correct)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => PracticeError::SessionNotFound,
                other => other.into(),
            })?;

        info!(
            session = %session.id,
            question = %question.id,
            is_correct,
            remaining = session.remaining(),
            "answer submitted"
        );

        Ok(AnswerFeedback {
            is_correct,
            correct_answer: question.correct_answer,
            explanation: question.explanation,
            difficulty_changed: update.metrics.current_difficulty != question.difficulty,
            progress: update.metrics,
            questions_remaining: session.remaining(),
            is_session_complete: session.is_complete(),
        })
    }

    /// Finalize a session and compute its summary.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::SessionNotFound` for an unknown session, and
    /// propagates storage failures.
    pub async fn end_session(&self, session_id: SessionId) -> Result<SessionReport, PracticeError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or(PracticeError::SessionNotFound)?;

        let stats = self.responses.session_stats(session_id).await?;
        let summary = SessionSummary::from_responses(&session, &stats);
        let finalized = self
            .sessions
            .finalize_session(session_id, &summary.stats(self.clock.now()))
            .await?;

        info!(
            session = %session_id,
            total = summary.total_questions(),
            accuracy = summary.accuracy_rate(),
            goal_achieved = finalized.goal_achieved,
            "practice session ended"
        );

        Ok(SessionReport {
            session: finalized,
            summary,
        })
    }

    async fn generate(
        &self,
        unit_id: UnitId,
        topic_id: Option<TopicId>,
        difficulty: Difficulty,
    ) -> Result<Question, PracticeError> {
        let question = self
            .generator
            .generate_and_store(&GenerationRequest {
                unit_id,
                topic_id,
                question_type: QuestionType::MultipleChoice,
                difficulty,
                auto_approve: true,
            })
            .await?;
        Ok(question)
    }
}
