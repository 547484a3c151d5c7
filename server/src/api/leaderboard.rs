use axum::{
    Json,
    extract::{Path, Query, State},
};
use pickem_common::Standing;
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiResult;
use crate::leaderboard;
use crate::season::current_season;

const DEFAULT_LIMIT: usize = 25;
const MAX_LIMIT: usize = 100;

/// Season value that selects every pick ever made
pub const ALL_SEASONS: &str = "all";

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// Season (optional, defaults to current season; "all" for all-time)
    pub season: Option<String>,
    /// Number of entries to return (default: 25, max: 100)
    pub limit: Option<usize>,
    /// Offset for pagination (default: 0)
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub league_id: Option<String>,
    /// Read the cached rows instead of recomputing from picks
    #[serde(default)]
    pub cached: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UserStandingQuery {
    pub season: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntryResponse {
    pub rank: usize,
    pub user_id: String,
    pub username: String,
    pub total_points: u32,
    pub correct_picks: u32,
    pub total_picks: u32,
    pub win_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    pub has_more: bool,
}

/// Slices ranked standings into one page; ranks stay 1-based positions in
/// the full ordering.
fn page(
    standings: Vec<Standing>,
    limit: Option<usize>,
    offset: Option<usize>,
) -> (Vec<LeaderboardEntryResponse>, bool) {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = offset.unwrap_or(0);
    let has_more = standings.len() > offset.saturating_add(limit);

    let entries = standings
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(idx, s)| LeaderboardEntryResponse {
            rank: idx + 1,
            user_id: s.user_id,
            username: s.username,
            total_points: s.total_points,
            correct_picks: s.correct_picks,
            total_picks: s.total_picks,
            win_pct: s.win_pct,
        })
        .collect();
    (entries, has_more)
}

/// Season standings (or all-time with `season=all`)
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let season = query.season.unwrap_or_else(current_season);
    let standings = if season == ALL_SEASONS {
        leaderboard::all_time(&state.db).await?
    } else {
        leaderboard::season(&state.db, &season).await?
    };

    let (entries, has_more) = page(standings, query.limit, query.offset);
    Ok(Json(LeaderboardResponse {
        entries,
        season: Some(season),
        week: None,
        has_more,
    }))
}

/// One week's standings. With a league the standings are computed from
/// picks unless `cached` is set; without one the cached rows of every
/// league are returned.
pub async fn get_week_leaderboard(
    State(state): State<AppState>,
    Path(week): Path<u32>,
    Query(query): Query<WeekQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let standings = match query.league_id.as_deref() {
        Some(league_id) if !query.cached => {
            state.db.get_league(league_id).await?;
            leaderboard::week(&state.db, league_id, week).await?
        }
        league_id => leaderboard::cached_week(&state.db, week, league_id).await?,
    };

    let (entries, has_more) = page(standings, query.limit, query.offset);
    Ok(Json(LeaderboardResponse {
        entries,
        season: None,
        week: Some(week),
        has_more,
    }))
}

pub async fn get_user_standing(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<UserStandingQuery>,
) -> ApiResult<Json<Standing>> {
    let season = query.season.filter(|s| s != ALL_SEASONS);
    let standing = leaderboard::user(&state.db, &user_id, season.as_deref()).await?;
    Ok(Json(standing))
}
