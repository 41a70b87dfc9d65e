use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Criterion name -> score, always the full rubric after normalization.
pub type ScoreMap = BTreeMap<String, u8>;

/// One judge's scores for one team. Unique per (team, judge) pair;
/// overwritten whole on resubmission, never partially merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub team: String,
    pub judge: String,
    pub scores: ScoreMap,
}

impl EvaluationRecord {
    pub fn new(team: impl Into<String>, judge: impl Into<String>, scores: ScoreMap) -> Self {
        Self {
            team: team.into(),
            judge: judge.into(),
            scores,
        }
    }
}

/// A judge or admin, as read from the credentials sheet.
///
/// Read-mostly from the core's perspective: submission flips
/// `has_submitted`, everything else is sourced externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub display_name: String,
    pub is_admin: bool,
    pub has_submitted: bool,
}

/// Derived leaderboard entry; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub team: String,
    pub average: f64,
    pub total_judge_count: usize,
    pub submitted_judge_count: usize,
}
