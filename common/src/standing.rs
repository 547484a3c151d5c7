use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Pick;

/// One user's aggregated record over some set of picks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub total_points: u32,
    pub correct_picks: u32,
    pub total_picks: u32,
    pub win_pct: f64,
}

/// Cached weekly standing row. Always rebuildable from picks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub week: u32,
    #[serde(default)]
    pub league_id: String,
    #[serde(default)]
    pub season: String,
    pub total_points: u32,
    pub correct_picks: u32,
    pub total_picks: u32,
    pub win_pct: f64,
    pub updated_at: DateTime<Utc>,
}

/// Running totals while folding picks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total_points: u32,
    pub correct_picks: u32,
    pub total_picks: u32,
}

/// Fraction of correct picks; zero when nothing was picked.
pub fn win_pct(correct: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

impl Tally {
    /// Every pick counts toward `total_picks`, pending ones included, so an
    /// unplayed game lowers the win percentage until it is scored.
    pub fn add(&mut self, pick: &Pick) {
        self.total_picks += 1;
        self.total_points += pick.points_earned;
        if pick.is_correct == Some(true) {
            self.correct_picks += 1;
        }
    }

    pub fn into_standing(self, user_id: String, username: String) -> Standing {
        Standing {
            user_id,
            username,
            total_points: self.total_points,
            correct_picks: self.correct_picks,
            total_picks: self.total_picks,
            win_pct: win_pct(self.correct_picks, self.total_picks),
        }
    }
}

impl Standing {
    /// Order: points desc, then win percentage desc, then user id asc.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .total_points
            .cmp(&self.total_points)
            .then_with(|| {
                other
                    .win_pct
                    .partial_cmp(&self.win_pct)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| self.user_id.cmp(&other.user_id))
    }

    pub fn into_entry(
        self,
        league_id: &str,
        season: &str,
        week: u32,
        now: DateTime<Utc>,
    ) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: self.user_id,
            username: self.username,
            week,
            league_id: league_id.to_string(),
            season: season.to_string(),
            total_points: self.total_points,
            correct_picks: self.correct_picks,
            total_picks: self.total_picks,
            win_pct: self.win_pct,
            updated_at: now,
        }
    }
}

impl From<LeaderboardEntry> for Standing {
    fn from(entry: LeaderboardEntry) -> Self {
        Standing {
            user_id: entry.user_id,
            username: entry.username,
            total_points: entry.total_points,
            correct_picks: entry.correct_picks,
            total_picks: entry.total_picks,
            win_pct: entry.win_pct,
        }
    }
}
