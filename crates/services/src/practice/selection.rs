use std::sync::Arc;

use rand::rng;
use rand::seq::IndexedRandom;

use practice_core::model::{Difficulty, Question, QuestionId, UnitId};
use storage::repository::{QuestionRepository, StorageError};

/// Picks unseen questions for a unit, preferring a target tier and walking
/// the remaining tiers in ascending order when it is exhausted.
#[derive(Clone)]
pub struct QuestionSelector {
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionSelector {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self { questions }
    }

    /// One approved question at the tier, not in the exclusion set.
    ///
    /// The pick among candidates is randomized so repeated calls do not lean
    /// on insertion order; `None` means the tier is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when candidates cannot be loaded.
    pub async fn random_question(
        &self,
        unit_id: UnitId,
        difficulty: Difficulty,
        exclude: &[QuestionId],
    ) -> Result<Option<Question>, StorageError> {
        let candidates = self.questions.candidates(unit_id, difficulty, exclude).await?;
        let mut rng = rng();
        Ok(candidates.choose(&mut rng).cloned())
    }

    /// Try the recommended tier first, then every other tier in the fixed
    /// `EASY → EXPERT` order. `None` means the whole unit is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when candidates cannot be loaded.
    pub async fn select_with_fallback(
        &self,
        unit_id: UnitId,
        recommended: Difficulty,
        exclude: &[QuestionId],
    ) -> Result<Option<Question>, StorageError> {
        if let Some(question) = self.random_question(unit_id, recommended, exclude).await? {
            return Ok(Some(question));
        }

        for difficulty in Difficulty::ALL {
            if difficulty == recommended {
                continue;
            }
            if let Some(question) = self.random_question(unit_id, difficulty, exclude).await? {
                return Ok(Some(question));
            }
        }

        Ok(None)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::model::{QuestionDraft, QuestionStatus, QuestionType};
    use practice_core::time::fixed_now;
    use storage::repository::Storage;

    async fn seed_question(
        storage: &Storage,
        difficulty: Difficulty,
    ) -> practice_core::model::QuestionId {
        storage
            .questions
            .insert_question(
                &QuestionDraft {
                    unit_id: UnitId::new(1),
                    topic_id: None,
                    question_text: format!("{difficulty} question"),
                    code_snippet: None,
                    options: vec!["a".into(), "b".into()],
                    correct_answer: "a".into(),
                    explanation: "why".into(),
                    question_type: QuestionType::MultipleChoice,
                    difficulty,
                    status: QuestionStatus::Approved,
                }
                .validate(fixed_now())
                .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn excluded_questions_are_never_picked() {
        let storage = Storage::in_memory();
        let only = seed_question(&storage, Difficulty::Easy).await;
        let selector = QuestionSelector::new(storage.questions.clone());

        let picked = selector
            .random_question(UnitId::new(1), Difficulty::Easy, &[])
            .await
            .unwrap();
        assert_eq!(picked.map(|q| q.id), Some(only));

        let none = selector
            .random_question(UnitId::new(1), Difficulty::Easy, &[only])
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn fallback_walks_tiers_in_ascending_order() {
        let storage = Storage::in_memory();
        let medium = seed_question(&storage, Difficulty::Medium).await;
        let expert = seed_question(&storage, Difficulty::Expert).await;
        let selector = QuestionSelector::new(storage.questions.clone());

        // recommended Easy is empty; Medium comes before Expert in the walk
        let first = selector
            .select_with_fallback(UnitId::new(1), Difficulty::Easy, &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.id, medium);

        let second = selector
            .select_with_fallback(UnitId::new(1), Difficulty::Easy, &[medium])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.id, expert);

        let exhausted = selector
            .select_with_fallback(UnitId::new(1), Difficulty::Easy, &[medium, expert])
            .await
            .unwrap();
        assert!(exhausted.is_none());
    }

    #[tokio::test]
    async fn recommended_tier_wins_over_lower_tiers() {
        let storage = Storage::in_memory();
        seed_question(&storage, Difficulty::Easy).await;
        let hard = seed_question(&storage, Difficulty::Hard).await;
        let selector = QuestionSelector::new(storage.questions.clone());

        let picked = selector
            .select_with_fallback(UnitId::new(1), Difficulty::Hard, &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, hard);
    }
}
