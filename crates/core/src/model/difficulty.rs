use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ordered difficulty tiers.
///
/// The ordering drives adaptive movement: promotion steps one tier up,
/// demotion one tier down, clamped at the ends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// All tiers in ascending order. Also the selector's fixed fallback order.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// The tier one step up, clamped at `Expert`.
    #[must_use]
    pub fn promoted(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard | Difficulty::Expert => Difficulty::Expert,
        }
    }

    /// The tier one step down, clamped at `Easy`.
    #[must_use]
    pub fn demoted(self) -> Self {
        match self {
            Difficulty::Easy | Difficulty::Medium => Difficulty::Easy,
            Difficulty::Hard => Difficulty::Medium,
            Difficulty::Expert => Difficulty::Hard,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
            Difficulty::Expert => "EXPERT",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid difficulty: {0}")]
pub struct ParseDifficultyError(String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EASY" => Ok(Difficulty::Easy),
            "MEDIUM" => Ok(Difficulty::Medium),
            "HARD" => Ok(Difficulty::Hard),
            "EXPERT" => Ok(Difficulty::Expert),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_form_a_total_order() {
        assert!(Difficulty::Easy < Difficulty::Medium);
        assert!(Difficulty::Medium < Difficulty::Hard);
        assert!(Difficulty::Hard < Difficulty::Expert);
    }

    #[test]
    fn promotion_clamps_at_expert() {
        assert_eq!(Difficulty::Easy.promoted(), Difficulty::Medium);
        assert_eq!(Difficulty::Expert.promoted(), Difficulty::Expert);
    }

    #[test]
    fn demotion_clamps_at_easy() {
        assert_eq!(Difficulty::Expert.demoted(), Difficulty::Hard);
        assert_eq!(Difficulty::Easy.demoted(), Difficulty::Easy);
    }

    #[test]
    fn string_roundtrip() {
        for tier in Difficulty::ALL {
            assert_eq!(tier.as_str().parse::<Difficulty>().unwrap(), tier);
        }
        assert!("BRUTAL".parse::<Difficulty>().is_err());
    }
}
