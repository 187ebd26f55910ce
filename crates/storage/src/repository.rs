use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use practice_core::model::{
    Difficulty, NewUser, PracticeSession, Question, QuestionId, QuestionResponse, ResponseStat,
    SessionId, SessionStats, Topic, TopicId, Unit, UnitId, UnitProgress, User, UserId,
    ValidatedQuestion,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch the user, creating it from the supplied identity fields when
    /// this is the first contact.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup or insert fails.
    async fn ensure_user(
        &self,
        new_user: &NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, StorageError>;

    /// Fetch a user by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when missing.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError>;
}

#[async_trait]
pub trait UnitRepository: Send + Sync {
    /// Fetch a unit by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when missing.
    async fn get_unit(&self, id: UnitId) -> Result<Option<Unit>, StorageError>;

    /// List active units ordered by unit number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_units(&self) -> Result<Vec<Unit>, StorageError>;

    /// List a unit's topics ordered by `order_index`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_topics(&self, unit_id: UnitId) -> Result<Vec<Topic>, StorageError>;

    /// Persist or update a unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the unit cannot be stored.
    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError>;

    /// Persist or update a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topic cannot be stored.
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a validated question, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<QuestionId, StorageError>;

    /// Fetch a question by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when missing.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// Approved questions for a unit at a difficulty, minus the excluded ids.
    ///
    /// Order is unspecified; callers wanting randomness pick among the
    /// returned candidates themselves.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn candidates(
        &self,
        unit_id: UnitId,
        difficulty: Difficulty,
        exclude: &[QuestionId],
    ) -> Result<Vec<Question>, StorageError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a freshly started session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn insert_session(&self, session: &PracticeSession) -> Result<(), StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when missing.
    async fn get_session(&self, id: SessionId) -> Result<Option<PracticeSession>, StorageError>;

    /// Bump the session's answered (and conditionally correct) counters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for a missing session and
    /// `StorageError::Conflict` when the session has ended or its target is
    /// already reached (the answered count never exceeds the target).
    async fn record_answer(
        &self,
        id: SessionId,
        was_correct: bool,
    ) -> Result<PracticeSession, StorageError>;

    /// Write end-of-session aggregates.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for a missing session.
    async fn finalize_session(
        &self,
        id: SessionId,
        stats: &SessionStats,
    ) -> Result<PracticeSession, StorageError>;
}

#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Persist one answer response.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the response cannot be stored.
    async fn insert_response(&self, response: &QuestionResponse) -> Result<(), StorageError>;

    /// Every question id the user has ever answered for this unit, across
    /// all sessions (the globally-answered set).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn answered_question_ids(
        &self,
        user_id: &UserId,
        unit_id: UnitId,
    ) -> Result<Vec<QuestionId>, StorageError>;

    /// Per-response stats for a session, joined with question difficulty and
    /// topic name, in submission order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn session_stats(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseStat>, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the progress record for a user+unit(+topic).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; `Ok(None)` when the user
    /// has no history yet.
    async fn get_progress(
        &self,
        user_id: &UserId,
        unit_id: UnitId,
        topic_id: Option<TopicId>,
    ) -> Result<Option<UnitProgress>, StorageError>;

    /// Persist or update a progress record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, progress: &UnitProgress) -> Result<(), StorageError>;

    /// All progress records for a user, across units.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<UnitProgress>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    users: HashMap<UserId, User>,
    units: BTreeMap<u64, Unit>,
    topics: BTreeMap<u64, Topic>,
    questions: BTreeMap<u64, Question>,
    next_question_id: u64,
    sessions: HashMap<SessionId, PracticeSession>,
    responses: Vec<QuestionResponse>,
    progress: Vec<UnitProgress>,
}

/// Simple in-memory backend for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn ensure_user(
        &self,
        new_user: &NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, StorageError> {
        let mut guard = self.lock()?;
        let user = guard
            .users
            .entry(new_user.id.clone())
            .or_insert_with(|| User {
                id: new_user.id.clone(),
                email: new_user.email_or_default(),
                name: new_user.name.clone(),
                created_at: now,
            });
        Ok(user.clone())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(id).cloned())
    }
}

#[async_trait]
impl UnitRepository for InMemoryRepository {
    async fn get_unit(&self, id: UnitId) -> Result<Option<Unit>, StorageError> {
        Ok(self.lock()?.units.get(&id.value()).cloned())
    }

    async fn list_units(&self) -> Result<Vec<Unit>, StorageError> {
        let guard = self.lock()?;
        let mut units: Vec<Unit> = guard.units.values().filter(|u| u.is_active).cloned().collect();
        units.sort_by_key(|u| u.unit_number);
        Ok(units)
    }

    async fn list_topics(&self, unit_id: UnitId) -> Result<Vec<Topic>, StorageError> {
        let guard = self.lock()?;
        let mut topics: Vec<Topic> = guard
            .topics
            .values()
            .filter(|t| t.unit_id == unit_id)
            .cloned()
            .collect();
        topics.sort_by_key(|t| t.order_index);
        Ok(topics)
    }

    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        self.lock()?.units.insert(unit.id.value(), unit.clone());
        Ok(())
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        self.lock()?.topics.insert(topic.id.value(), topic.clone());
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<QuestionId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_question_id += 1;
        let id = QuestionId::new(guard.next_question_id);
        guard
            .questions
            .insert(id.value(), question.clone().assign_id(id));
        Ok(id)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        Ok(self.lock()?.questions.get(&id.value()).cloned())
    }

    async fn candidates(
        &self,
        unit_id: UnitId,
        difficulty: Difficulty,
        exclude: &[QuestionId],
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .values()
            .filter(|q| {
                q.unit_id == unit_id
                    && q.difficulty == difficulty
                    && q.is_approved()
                    && !exclude.contains(&q.id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: &PracticeSession) -> Result<(), StorageError> {
        self.lock()?.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<PracticeSession>, StorageError> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn record_answer(
        &self,
        id: SessionId,
        was_correct: bool,
    ) -> Result<PracticeSession, StorageError> {
        let mut guard = self.lock()?;
        let session = guard.sessions.get_mut(&id).ok_or(StorageError::NotFound)?;
        session
            .record_answer(was_correct)
            .map_err(|_| StorageError::Conflict)?;
        Ok(session.clone())
    }

    async fn finalize_session(
        &self,
        id: SessionId,
        stats: &SessionStats,
    ) -> Result<PracticeSession, StorageError> {
        let mut guard = self.lock()?;
        let session = guard.sessions.get_mut(&id).ok_or(StorageError::NotFound)?;
        session.finalize(stats);
        Ok(session.clone())
    }
}

#[async_trait]
impl ResponseRepository for InMemoryRepository {
    async fn insert_response(&self, response: &QuestionResponse) -> Result<(), StorageError> {
        self.lock()?.responses.push(response.clone());
        Ok(())
    }

    async fn answered_question_ids(
        &self,
        user_id: &UserId,
        unit_id: UnitId,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let guard = self.lock()?;
        let mut ids: Vec<QuestionId> = guard
            .responses
            .iter()
            .filter(|r| {
                r.user_id == *user_id
                    && guard
                        .questions
                        .get(&r.question_id.value())
                        .is_some_and(|q| q.unit_id == unit_id)
            })
            .map(|r| r.question_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn session_stats(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseStat>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<&QuestionResponse> = guard
            .responses
            .iter()
            .filter(|r| r.session_id == session_id)
            .collect();
        rows.sort_by_key(|r| r.created_at);

        let mut stats = Vec::with_capacity(rows.len());
        for response in rows {
            let question = guard
                .questions
                .get(&response.question_id.value())
                .ok_or(StorageError::NotFound)?;
            let topic = question
                .topic_id
                .and_then(|tid| guard.topics.get(&tid.value()))
                .map(|t| t.name.clone());
            stats.push(ResponseStat {
                is_correct: response.is_correct,
                time_spent_secs: response.time_spent_secs,
                difficulty: question.difficulty,
                topic,
            });
        }
        Ok(stats)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        unit_id: UnitId,
        topic_id: Option<TopicId>,
    ) -> Result<Option<UnitProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .progress
            .iter()
            .find(|p| p.user_id == *user_id && p.unit_id == unit_id && p.topic_id == topic_id)
            .cloned())
    }

    async fn upsert_progress(&self, progress: &UnitProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        match guard.progress.iter_mut().find(|p| {
            p.user_id == progress.user_id
                && p.unit_id == progress.unit_id
                && p.topic_id == progress.topic_id
        }) {
            Some(existing) => *existing = progress.clone(),
            None => guard.progress.push(progress.clone()),
        }
        Ok(())
    }

    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<UnitProgress>, StorageError> {
        let guard = self.lock()?;
        let mut records: Vec<UnitProgress> = guard
            .progress
            .iter()
            .filter(|p| p.user_id == *user_id)
            .cloned()
            .collect();
        records.sort_by_key(|p| (p.unit_id, p.topic_id));
        Ok(records)
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub units: Arc<dyn UnitRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub responses: Arc<dyn ResponseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            units: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            responses: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
