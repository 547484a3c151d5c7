//! Standings computed from picks, plus the weekly cache of them.
//!
//! Picks are the only source of truth. The cached `LeaderboardEntry` rows
//! are rewritten after each complete scoring pass and can be rebuilt at any
//! time with `refresh_week`.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use pickem_common::{LeaderboardEntry, Pick, Standing, Tally};
use tracing::{debug, info, warn};

use crate::db::keys::Keys;
use crate::db::{Database, Index, Query};
use crate::error::Result;

/// Folds picks into per-user totals, keyed by user id.
pub fn tally(picks: &[Pick]) -> BTreeMap<String, Tally> {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for pick in picks {
        tallies.entry(pick.user_id.clone()).or_default().add(pick);
    }
    tallies
}

/// Sorts standings into leaderboard order.
pub fn rank(mut standings: Vec<Standing>) -> Vec<Standing> {
    standings.sort_by(|a, b| a.rank_cmp(b));
    standings
}

async fn username_of(db: &Database, user_id: &str) -> String {
    match db.find_user(user_id).await {
        Ok(Some(user)) => user.username,
        Ok(None) => String::new(),
        Err(e) => {
            warn!("Failed to resolve username of {}: {}", user_id, e);
            String::new()
        }
    }
}

async fn standings_from(db: &Database, picks: &[Pick]) -> Vec<Standing> {
    let mut standings = Vec::new();
    for (user_id, totals) in tally(picks) {
        let username = username_of(db, &user_id).await;
        standings.push(totals.into_standing(user_id, username));
    }
    rank(standings)
}

/// Standings over every pick ever made.
pub async fn all_time(db: &Database) -> Result<Vec<Standing>> {
    let picks = db.list_all_picks().await?;
    Ok(standings_from(db, &picks).await)
}

pub async fn season(db: &Database, season: &str) -> Result<Vec<Standing>> {
    let picks = db.list_picks_for_season(season).await?;
    Ok(standings_from(db, &picks).await)
}

pub async fn week(db: &Database, league_id: &str, week: u32) -> Result<Vec<Standing>> {
    let picks = db.list_picks_for_week(league_id, week).await?;
    Ok(standings_from(db, &picks).await)
}

/// One user's totals, optionally limited to a season. Users without picks
/// get an all-zero standing.
pub async fn user(db: &Database, user_id: &str, season: Option<&str>) -> Result<Standing> {
    let user = db.get_user(user_id).await?;
    let picks: Vec<Pick> = db
        .list_picks_for_user(user_id)
        .await?
        .into_iter()
        .filter(|pick| season.is_none_or(|s| pick.season == s))
        .collect();

    let mut totals = Tally::default();
    for pick in &picks {
        totals.add(pick);
    }
    Ok(totals.into_standing(user.id, user.username))
}

/// Rebuilds the cached rows of one league-week from its picks. Rows of
/// users who no longer have picks that week are removed.
pub async fn refresh_week(
    db: &Database,
    league_id: &str,
    week_number: u32,
) -> Result<Vec<LeaderboardEntry>> {
    let league = db.get_league(league_id).await?;
    let standings = week(db, league_id, week_number).await?;
    let now = Utc::now();

    let stale: Vec<LeaderboardEntry> = cached_entries(db, week_number)
        .await?
        .into_iter()
        .filter(|entry| entry.league_id == league_id)
        .collect();
    let current: HashSet<&str> = standings.iter().map(|s| s.user_id.as_str()).collect();
    for entry in stale.iter().filter(|e| !current.contains(e.user_id.as_str())) {
        db.delete_key(&Keys::leaderboard_entry(&entry.user_id, week_number))
            .await?;
        debug!("Dropped cached week {} row of {}", week_number, entry.user_id);
    }

    let mut entries = Vec::with_capacity(standings.len());
    for standing in standings {
        let entry = standing.into_entry(league_id, &league.season, week_number, now);
        db.put_entity(&entry).await?;
        entries.push(entry);
    }

    info!(
        "Refreshed week {} leaderboard of league {} ({} users)",
        week_number,
        league_id,
        entries.len()
    );
    Ok(entries)
}

async fn cached_entries(db: &Database, week_number: u32) -> Result<Vec<LeaderboardEntry>> {
    db.query_entities(&Query::index(Index::Gsi2, Keys::leaderboard_week(week_number)))
        .await
}

/// Cached standings of one week, optionally for one league. May lag the
/// picks; `week` is authoritative.
pub async fn cached_week(
    db: &Database,
    week_number: u32,
    league_id: Option<&str>,
) -> Result<Vec<Standing>> {
    let standings = cached_entries(db, week_number)
        .await?
        .into_iter()
        .filter(|entry| league_id.is_none_or(|id| entry.league_id == id))
        .map(Standing::from)
        .collect();
    Ok(rank(standings))
}
