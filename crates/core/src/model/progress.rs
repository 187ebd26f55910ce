use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, TopicId, UnitId, UserId};

/// Consecutive correct answers needed before the tier moves up.
pub const PROMOTE_STREAK: u32 = 3;

/// Consecutive wrong answers tolerated before the tier moves down.
pub const DEMOTE_STREAK: u32 = 2;

/// Per user+unit(+topic) adaptive state.
///
/// The record is the whole of the adaptive state: services load it, apply
/// [`UnitProgress::record_answer`], and persist it back. There is no hidden
/// global beyond this row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProgress {
    pub user_id: UserId,
    pub unit_id: UnitId,
    pub topic_id: Option<TopicId>,
    pub consecutive_correct: u32,
    pub consecutive_wrong: u32,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub current_difficulty: Difficulty,
    pub mastery_level: u32,
    pub updated_at: DateTime<Utc>,
}

impl UnitProgress {
    /// Fresh record for a first interaction. New learners start at `Easy`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        unit_id: UnitId,
        topic_id: Option<TopicId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            unit_id,
            topic_id,
            consecutive_correct: 0,
            consecutive_wrong: 0,
            total_attempts: 0,
            correct_attempts: 0,
            current_difficulty: Difficulty::Easy,
            mastery_level: 0,
            updated_at: now,
        }
    }

    /// Fold one answer into the record and adapt the difficulty tier.
    ///
    /// Three correct in a row promote one tier (when below `Expert`); two
    /// wrong in a row demote one tier (when above `Easy`). A tier change
    /// clears both streaks. Returns whether the tier moved.
    pub fn record_answer(&mut self, was_correct: bool, now: DateTime<Utc>) -> bool {
        self.total_attempts += 1;
        if was_correct {
            self.correct_attempts += 1;
            self.consecutive_correct += 1;
            self.consecutive_wrong = 0;
        } else {
            self.consecutive_wrong += 1;
            self.consecutive_correct = 0;
        }

        let before = self.current_difficulty;
        if was_correct && self.consecutive_correct >= PROMOTE_STREAK {
            self.current_difficulty = before.promoted();
        } else if !was_correct && self.consecutive_wrong >= DEMOTE_STREAK {
            self.current_difficulty = before.demoted();
        }

        let changed = self.current_difficulty != before;
        if changed {
            self.consecutive_correct = 0;
            self.consecutive_wrong = 0;
        }

        self.mastery_level = mastery(self.correct_attempts, self.total_attempts);
        self.updated_at = now;
        changed
    }

    /// The metrics bundle reported back after each update.
    #[must_use]
    pub fn metrics(&self) -> ProgressMetrics {
        ProgressMetrics {
            current_difficulty: self.current_difficulty,
            consecutive_correct: self.consecutive_correct,
            consecutive_wrong: self.consecutive_wrong,
            total_attempts: self.total_attempts,
            correct_attempts: self.correct_attempts,
            mastery_level: self.mastery_level,
        }
    }
}

/// Snapshot of a progress record, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetrics {
    pub current_difficulty: Difficulty,
    pub consecutive_correct: u32,
    pub consecutive_wrong: u32,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub mastery_level: u32,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mastery(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(correct) / f64::from(total) * 100.0).round() as u32
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn fresh() -> UnitProgress {
        UnitProgress::new(UserId::new("user_1"), UnitId::new(1), None, fixed_now())
    }

    #[test]
    fn new_learners_start_easy() {
        let progress = fresh();
        assert_eq!(progress.current_difficulty, Difficulty::Easy);
        assert_eq!(progress.mastery_level, 0);
    }

    #[test]
    fn three_correct_in_a_row_promote() {
        let mut progress = fresh();
        assert!(!progress.record_answer(true, fixed_now()));
        assert!(!progress.record_answer(true, fixed_now()));
        assert!(progress.record_answer(true, fixed_now()));
        assert_eq!(progress.current_difficulty, Difficulty::Medium);
        // promotion clears the streaks
        assert_eq!(progress.consecutive_correct, 0);
    }

    #[test]
    fn interrupted_streak_does_not_promote() {
        let mut progress = fresh();
        progress.record_answer(true, fixed_now());
        progress.record_answer(true, fixed_now());
        progress.record_answer(false, fixed_now());
        assert!(!progress.record_answer(true, fixed_now()));
        assert_eq!(progress.current_difficulty, Difficulty::Easy);
    }

    #[test]
    fn streak_at_expert_never_changes_tier() {
        let mut progress = fresh();
        progress.current_difficulty = Difficulty::Expert;
        for _ in 0..6 {
            assert!(!progress.record_answer(true, fixed_now()));
        }
        assert_eq!(progress.current_difficulty, Difficulty::Expert);
    }

    #[test]
    fn two_wrong_in_a_row_demote() {
        let mut progress = fresh();
        progress.current_difficulty = Difficulty::Hard;
        assert!(!progress.record_answer(false, fixed_now()));
        assert!(progress.record_answer(false, fixed_now()));
        assert_eq!(progress.current_difficulty, Difficulty::Medium);
        assert_eq!(progress.consecutive_wrong, 0);
    }

    #[test]
    fn wrong_streak_at_easy_stays_easy() {
        let mut progress = fresh();
        for _ in 0..4 {
            assert!(!progress.record_answer(false, fixed_now()));
        }
        assert_eq!(progress.current_difficulty, Difficulty::Easy);
    }

    #[test]
    fn mastery_tracks_rounded_hit_rate() {
        let mut progress = fresh();
        progress.record_answer(true, fixed_now());
        progress.record_answer(true, fixed_now());
        progress.record_answer(false, fixed_now());
        // 2/3 = 66.67 -> 67
        assert_eq!(progress.mastery_level, 67);
        assert_eq!(progress.total_attempts, 3);
        assert_eq!(progress.correct_attempts, 2);
    }

    #[test]
    fn metrics_mirror_record_state() {
        let mut progress = fresh();
        progress.record_answer(true, fixed_now());
        let metrics = progress.metrics();
        assert_eq!(metrics.current_difficulty, Difficulty::Easy);
        assert_eq!(metrics.consecutive_correct, 1);
        assert_eq!(metrics.total_attempts, 1);
        assert_eq!(metrics.mastery_level, 100);
    }
}
