use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use pickem_common::{Game, GameUpdate, Pick, PickOutcome};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::db::Database;
use crate::db::keys::Keys;
use crate::error::{Error, Result};
use crate::leaderboard;

/// Counts from one scoring pass over a game's picks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoringReport {
    /// Picks written with a new outcome
    pub scored: usize,
    /// Picks that already held the right outcome
    pub unchanged: usize,
    /// Picks whose write failed; a later pass picks them up
    pub failed: usize,
}

impl ScoringReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.scored + self.unchanged + self.failed
    }
}

/// Result of an administrator's game edit
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecorded {
    pub game: Game,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringReport>,
}

enum PickResult {
    Scored,
    Unchanged,
    Failed,
}

/// Scores every pick on a completed game.
///
/// Each pick is written on its own and picks already carrying the correct
/// outcome are skipped, so running the pass again is harmless and finishes
/// whatever an earlier, partly failed pass left behind. A failed pick write
/// is logged and counted, never aborting the pass.
pub async fn score_game(db: &Database, game: &Game, concurrency: usize) -> Result<ScoringReport> {
    let Some(winner) = game.winner_team_id() else {
        return Err(Error::validation(
            "status",
            format!("game {} is not completed", game.id),
        ));
    };

    let picks = db.list_picks_for_game(&game.id).await?;
    if picks.is_empty() {
        info!("No picks to score for game {}", game.id);
    } else {
        info!(
            "Scoring {} picks for game {} (winner {})",
            picks.len(),
            game.id,
            winner
        );
    }

    let results: Vec<PickResult> = stream::iter(picks)
        .map(|pick| score_pick(db, game, pick))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = ScoringReport::default();
    for result in results {
        match result {
            PickResult::Scored => report.scored += 1,
            PickResult::Unchanged => report.unchanged += 1,
            PickResult::Failed => report.failed += 1,
        }
    }

    if report.is_complete() {
        if let Err(e) = leaderboard::refresh_week(db, &game.league_id, game.week).await {
            // The cache is rebuildable; a failed refresh does not fail scoring
            error!(
                "Failed to refresh week {} leaderboard of league {}: {}",
                game.week, game.league_id, e
            );
        }
    } else {
        warn!(
            "Scoring of game {} incomplete: {} of {} picks failed",
            game.id,
            report.failed,
            report.total()
        );
    }

    info!(
        "Finished scoring game {}: {} scored, {} unchanged, {} failed",
        game.id, report.scored, report.unchanged, report.failed
    );
    Ok(report)
}

async fn score_pick(db: &Database, game: &Game, listed: Pick) -> PickResult {
    if PickOutcome::for_game(game, &listed.picked_team_id)
        .is_some_and(|outcome| listed.has_outcome(&outcome))
    {
        return PickResult::Unchanged;
    }

    let key = Keys::pick(&listed.user_id, &listed.game_id);
    let _guard = db.locks().lock(key.to_string()).await;

    // The listed copy may predate a change or delete that held the lock
    let mut pick: Pick = match db.get_entity(&key).await {
        Ok(Some(pick)) => pick,
        Ok(None) => {
            debug!(
                "Pick of user {} on game {} was withdrawn before scoring",
                listed.user_id, listed.game_id
            );
            return PickResult::Unchanged;
        }
        Err(e) => {
            error!("Failed to re-read pick {}: {}", key, e);
            return PickResult::Failed;
        }
    };
    let Some(outcome) = PickOutcome::for_game(game, &pick.picked_team_id) else {
        return PickResult::Failed;
    };
    if pick.has_outcome(&outcome) {
        return PickResult::Unchanged;
    }

    pick.apply_outcome(&outcome, Utc::now());
    match db.put_entity(&pick).await {
        Ok(()) => {
            debug!(
                "Scored pick of user {} on game {}: {} point(s)",
                pick.user_id, pick.game_id, pick.points_earned
            );
            PickResult::Scored
        }
        Err(e) => {
            error!(
                "Failed to score pick of user {} on game {}: {}",
                pick.user_id, pick.game_id, e
            );
            PickResult::Failed
        }
    }
}

/// Applies a status/score edit and scores the game's picks when the edit
/// completed the game or changed its winner.
pub async fn record_result(
    db: &Database,
    game_id: &str,
    update: &GameUpdate,
    concurrency: usize,
) -> Result<ResultRecorded> {
    let (game, applied) = db.apply_game_update(game_id, update).await?;
    let scoring = if applied.rescore {
        Some(score_game(db, &game, concurrency).await?)
    } else {
        None
    };
    Ok(ResultRecorded { game, scoring })
}

/// Re-runs the scoring pass of a completed game, e.g. to finish a pass
/// that reported failures.
pub async fn rescore_game(db: &Database, game_id: &str, concurrency: usize) -> Result<ScoringReport> {
    let game = db.get_game(game_id).await?;
    score_game(db, &game, concurrency).await
}
