use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Game, POINTS_PER_CORRECT_PICK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickStatus {
    Pending,
    Scored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub user_id: String,
    pub game_id: String,
    pub league_id: String,
    pub week: u32,
    pub season: String,
    pub picked_team_id: String,
    /// Stored for clients that collect it; scoring ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u32>,
    pub status: PickStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub points_earned: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPick {
    pub game_id: String,
    pub picked_team_id: String,
    #[serde(default)]
    pub confidence: Option<u32>,
}

/// Outcome a scored pick should end up with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickOutcome {
    pub is_correct: bool,
    pub points_earned: u32,
}

impl PickOutcome {
    /// `None` unless the game is completed with a winner.
    pub fn for_game(game: &Game, picked_team_id: &str) -> Option<Self> {
        let winner = game.winner_team_id()?;
        let is_correct = winner == picked_team_id;
        Some(Self {
            is_correct,
            points_earned: if is_correct { POINTS_PER_CORRECT_PICK } else { 0 },
        })
    }
}

impl Pick {
    pub fn new(user_id: &str, game: &Game, new_pick: &NewPick, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            game_id: game.id.clone(),
            league_id: game.league_id.clone(),
            week: game.week,
            season: game.season.clone(),
            picked_team_id: new_pick.picked_team_id.clone(),
            confidence: new_pick.confidence,
            status: PickStatus::Pending,
            is_correct: None,
            points_earned: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.status == PickStatus::Scored
    }

    /// True when the pick already carries `outcome`; lets a scoring pass skip it.
    pub fn has_outcome(&self, outcome: &PickOutcome) -> bool {
        self.is_scored()
            && self.is_correct == Some(outcome.is_correct)
            && self.points_earned == outcome.points_earned
    }

    /// Sets the outcome absolutely, never incrementally, so applying it twice
    /// leaves the same pick.
    pub fn apply_outcome(&mut self, outcome: &PickOutcome, now: DateTime<Utc>) {
        self.status = PickStatus::Scored;
        self.is_correct = Some(outcome.is_correct);
        self.points_earned = outcome.points_earned;
        self.updated_at = now;
    }
}
