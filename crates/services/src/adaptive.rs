use std::sync::Arc;

use tracing::debug;

use practice_core::Clock;
use practice_core::model::{Difficulty, ProgressMetrics, TopicId, UnitId, UnitProgress, UserId};
use storage::repository::{ProgressRepository, StorageError};

/// Outcome of folding one answer into a progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub metrics: ProgressMetrics,
    pub tier_changed: bool,
}

/// Progress tracker: recommends difficulty tiers and maintains per-unit
/// mastery and streak counters.
#[derive(Clone)]
pub struct AdaptiveService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl AdaptiveService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// The tier the learner should practice at right now.
    ///
    /// Learners without history start at `Easy`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the progress record cannot be read.
    pub async fn recommended_difficulty(
        &self,
        user_id: &UserId,
        unit_id: UnitId,
        topic_id: Option<TopicId>,
    ) -> Result<Difficulty, StorageError> {
        let record = self.progress.get_progress(user_id, unit_id, topic_id).await?;
        Ok(record.map_or(Difficulty::Easy, |p| p.current_difficulty))
    }

    /// Fold one answer into the learner's progress record and persist it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the record cannot be read or written.
    pub async fn update_progress(
        &self,
        user_id: &UserId,
        unit_id: UnitId,
        was_correct: bool,
        time_spent_secs: Option<u32>,
        topic_id: Option<TopicId>,
    ) -> Result<ProgressUpdate, StorageError> {
        let now = self.clock.now();
        let mut record = self
            .progress
            .get_progress(user_id, unit_id, topic_id)
            .await?
            .unwrap_or_else(|| UnitProgress::new(user_id.clone(), unit_id, topic_id, now));

        let tier_changed = record.record_answer(was_correct, now);
        self.progress.upsert_progress(&record).await?;

        debug!(
            user = %user_id,
            unit = %unit_id,
            was_correct,
            time_spent_secs,
            difficulty = %record.current_difficulty,
            mastery = record.mastery_level,
            tier_changed,
            "progress updated"
        );

        Ok(ProgressUpdate {
            metrics: record.metrics(),
            tier_changed,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::time::fixed_clock;
    use storage::repository::Storage;

    fn service() -> AdaptiveService {
        AdaptiveService::new(fixed_clock(), Storage::in_memory().progress)
    }

    #[tokio::test]
    async fn fresh_learner_is_recommended_easy() {
        let adaptive = service();
        let tier = adaptive
            .recommended_difficulty(&UserId::new("user_1"), UnitId::new(1), None)
            .await
            .unwrap();
        assert_eq!(tier, Difficulty::Easy);
    }

    #[tokio::test]
    async fn third_straight_correct_raises_recommendation() {
        let adaptive = service();
        let user = UserId::new("user_1");
        let unit = UnitId::new(1);

        for round in 0..2 {
            let update = adaptive
                .update_progress(&user, unit, true, Some(10), None)
                .await
                .unwrap();
            assert!(!update.tier_changed, "round {round} must not promote");
        }
        let third = adaptive
            .update_progress(&user, unit, true, Some(10), None)
            .await
            .unwrap();
        assert!(third.tier_changed);
        assert_eq!(third.metrics.current_difficulty, Difficulty::Medium);

        let tier = adaptive
            .recommended_difficulty(&user, unit, None)
            .await
            .unwrap();
        assert_eq!(tier, Difficulty::Medium);
    }

    #[tokio::test]
    async fn updates_persist_between_calls() {
        let adaptive = service();
        let user = UserId::new("user_1");
        let unit = UnitId::new(1);

        adaptive
            .update_progress(&user, unit, false, None, None)
            .await
            .unwrap();
        let second = adaptive
            .update_progress(&user, unit, false, None, None)
            .await
            .unwrap();

        assert_eq!(second.metrics.total_attempts, 2);
        // two straight misses from Easy stay at the floor
        assert_eq!(second.metrics.current_difficulty, Difficulty::Easy);
        assert!(!second.tier_changed);
    }

    #[tokio::test]
    async fn topic_records_are_tracked_separately() {
        let adaptive = service();
        let user = UserId::new("user_1");
        let unit = UnitId::new(1);
        let topic = Some(TopicId::new(7));

        for _ in 0..3 {
            adaptive
                .update_progress(&user, unit, true, None, topic)
                .await
                .unwrap();
        }

        let scoped = adaptive
            .recommended_difficulty(&user, unit, topic)
            .await
            .unwrap();
        let unit_wide = adaptive
            .recommended_difficulty(&user, unit, None)
            .await
            .unwrap();
        assert_eq!(scoped, Difficulty::Medium);
        assert_eq!(unit_wide, Difficulty::Easy);
    }
}
