use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MAX_WEEK;

/// Lifecycle of a game. Variants are declared in transition order so that
/// `Ord` doubles as the "no going back" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Pending,
    InProgress,
    Completed,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Pending => "pending",
            GameStatus::InProgress => "in_progress",
            GameStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub league_id: String,
    pub week: u32,
    pub season: String,
    pub home_team_id: String,
    pub away_team_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kickoff: Option<DateTime<Utc>>,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_score: Option<u32>,
    // Only ever Some for completed games; see `sanitize`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGame {
    pub league_id: String,
    pub week: u32,
    pub home_team_id: String,
    pub away_team_id: String,
    #[serde(default)]
    pub kickoff: Option<DateTime<Utc>>,
}

/// An administrator's edit of a game's state and scores
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameUpdate {
    pub status: Option<GameStatus>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("cannot move a game from {} back to {}", .from.as_str(), .to.as_str())]
    ReverseTransition { from: GameStatus, to: GameStatus },
    #[error("{0} is required to complete a game")]
    MissingScore(&'static str),
    #[error("tied scores ({0}-{0}) are not supported")]
    Tie(u32),
    #[error("home and away team must differ")]
    SameTeams,
    #[error("week {0} is out of range")]
    InvalidWeek(u32),
}

impl GameError {
    /// Name of the request field the error is about
    pub fn field(&self) -> &'static str {
        match self {
            GameError::ReverseTransition { .. } => "status",
            GameError::MissingScore(field) => *field,
            GameError::Tie(_) => "away_score",
            GameError::SameTeams => "away_team_id",
            GameError::InvalidWeek(_) => "week",
        }
    }
}

/// What `Game::apply_update` did, so callers know whether picks need scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub previous: GameStatus,
    pub rescore: bool,
}

impl NewGame {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.week == 0 || self.week > MAX_WEEK {
            return Err(GameError::InvalidWeek(self.week));
        }
        if self.home_team_id == self.away_team_id {
            return Err(GameError::SameTeams);
        }
        Ok(())
    }
}

impl Game {
    pub fn is_completed(&self) -> bool {
        self.status == GameStatus::Completed
    }

    pub fn is_open_for_picks(&self) -> bool {
        self.status == GameStatus::Pending
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }

    /// Team id of the winner, only for completed games
    pub fn winner_team_id(&self) -> Option<&str> {
        if !self.is_completed() {
            return None;
        }
        match self.winner? {
            Side::Home => Some(&self.home_team_id),
            Side::Away => Some(&self.away_team_id),
        }
    }

    /// Drops a winner recorded on a game that is not completed.
    pub fn sanitize(mut self) -> Self {
        if !self.is_completed() {
            self.winner = None;
        }
        self
    }

    /// Applies a status/score edit. Status only moves forward; completing a
    /// game needs both scores and they must differ.
    pub fn apply_update(
        &mut self,
        update: &GameUpdate,
        now: DateTime<Utc>,
    ) -> Result<Applied, GameError> {
        let previous = self.status;
        let target = update.status.unwrap_or(previous);
        if target < previous {
            return Err(GameError::ReverseTransition {
                from: previous,
                to: target,
            });
        }

        let home_score = update.home_score.or(self.home_score);
        let away_score = update.away_score.or(self.away_score);

        let winner = if target == GameStatus::Completed {
            let home = home_score.ok_or(GameError::MissingScore("home_score"))?;
            let away = away_score.ok_or(GameError::MissingScore("away_score"))?;
            if home == away {
                return Err(GameError::Tie(home));
            }
            Some(if home > away { Side::Home } else { Side::Away })
        } else {
            None
        };

        let rescore = target == GameStatus::Completed
            && (previous != GameStatus::Completed || winner != self.winner);

        self.status = target;
        self.home_score = home_score;
        self.away_score = away_score;
        self.winner = winner;
        self.updated_at = now;

        Ok(Applied { previous, rescore })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> Game {
        let now = Utc::now();
        Game {
            id: "g1".to_string(),
            league_id: "l1".to_string(),
            week: 1,
            season: "2025".to_string(),
            home_team_id: "A".to_string(),
            away_team_id: "B".to_string(),
            kickoff: None,
            status: GameStatus::Pending,
            home_score: None,
            away_score: None,
            winner: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn completed(home: u32, away: u32) -> GameUpdate {
        GameUpdate {
            status: Some(GameStatus::Completed),
            home_score: Some(home),
            away_score: Some(away),
        }
    }

    #[test]
    fn test_completion_picks_winner() {
        let mut g = game();
        let applied = g.apply_update(&completed(21, 14), Utc::now()).unwrap();
        assert!(applied.rescore);
        assert_eq!(applied.previous, GameStatus::Pending);
        assert_eq!(g.winner, Some(Side::Home));
        assert_eq!(g.winner_team_id(), Some("A"));

        let mut g = game();
        g.apply_update(&completed(3, 10), Utc::now()).unwrap();
        assert_eq!(g.winner_team_id(), Some("B"));
    }

    #[test]
    fn test_tie_is_rejected() {
        let mut g = game();
        assert_eq!(
            g.apply_update(&completed(17, 17), Utc::now()),
            Err(GameError::Tie(17))
        );
        assert_eq!(g.status, GameStatus::Pending);
        assert!(g.winner.is_none());
    }

    #[test]
    fn test_completion_requires_both_scores() {
        let mut g = game();
        let update = GameUpdate {
            status: Some(GameStatus::Completed),
            home_score: Some(7),
            away_score: None,
        };
        let err = g.apply_update(&update, Utc::now()).unwrap_err();
        assert_eq!(err, GameError::MissingScore("away_score"));
        assert_eq!(err.field(), "away_score");
    }

    #[test]
    fn test_no_reverse_transition() {
        let mut g = game();
        g.apply_update(&completed(21, 14), Utc::now()).unwrap();
        let back = GameUpdate {
            status: Some(GameStatus::InProgress),
            ..Default::default()
        };
        assert!(matches!(
            g.apply_update(&back, Utc::now()),
            Err(GameError::ReverseTransition { .. })
        ));
    }

    #[test]
    fn test_in_progress_scores_have_no_winner() {
        let mut g = game();
        let update = GameUpdate {
            status: Some(GameStatus::InProgress),
            home_score: Some(7),
            away_score: Some(0),
        };
        let applied = g.apply_update(&update, Utc::now()).unwrap();
        assert!(!applied.rescore);
        assert!(g.winner.is_none());
        assert!(g.winner_team_id().is_none());
    }

    #[test]
    fn test_score_correction_rescores_only_when_winner_flips() {
        let mut g = game();
        g.apply_update(&completed(21, 14), Utc::now()).unwrap();
        let same_winner = g.apply_update(&completed(24, 14), Utc::now()).unwrap();
        assert!(!same_winner.rescore);
        let flipped = g.apply_update(&completed(14, 24), Utc::now()).unwrap();
        assert!(flipped.rescore);
        assert_eq!(g.winner, Some(Side::Away));
    }

    #[test]
    fn test_sanitize_hides_winner_of_open_game() {
        let mut g = game();
        g.winner = Some(Side::Home);
        let g = g.sanitize();
        assert!(g.winner.is_none());
        let json = serde_json::to_value(&g).unwrap();
        assert!(json.get("winner").is_none());
    }

    #[test]
    fn test_new_game_validation() {
        let new_game = NewGame {
            league_id: "l1".to_string(),
            week: 0,
            home_team_id: "A".to_string(),
            away_team_id: "B".to_string(),
            kickoff: None,
        };
        assert_eq!(new_game.validate(), Err(GameError::InvalidWeek(0)));
        let same = NewGame {
            week: 1,
            away_team_id: "A".to_string(),
            ..new_game
        };
        assert_eq!(same.validate(), Err(GameError::SameTeams));
    }
}
