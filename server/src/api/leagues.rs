use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};
use pickem_common::{Game, League, NewLeague};
use serde::Deserialize;

use super::AppState;
use super::error::ApiResult;
use super::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct WeekFilter {
    pub week: Option<u32>,
}

pub async fn list_leagues(State(state): State<AppState>) -> ApiResult<Json<Vec<League>>> {
    Ok(Json(state.db.list_leagues().await?))
}

pub async fn create_league(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewLeague>,
) -> ApiResult<(StatusCode, Json<League>)> {
    auth.require_admin()?;
    let league = state.db.create_league(req).await?;
    Ok((StatusCode::CREATED, Json(league)))
}

pub async fn get_league(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<League>> {
    Ok(Json(state.db.get_league(&id).await?))
}

pub async fn update_league(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<NewLeague>,
) -> ApiResult<Json<League>> {
    auth.require_admin()?;
    Ok(Json(state.db.update_league(&id, req).await?))
}

pub async fn delete_league(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    state.db.delete_league(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Games of a league, all weeks or one
pub async fn list_league_games(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(filter): Query<WeekFilter>,
) -> ApiResult<Json<Vec<Game>>> {
    state.db.get_league(&id).await?;
    let games = match filter.week {
        Some(week) => state.db.list_games_by_week(&id, week).await?,
        None => state.db.list_games_by_league(&id).await?,
    };
    Ok(Json(games))
}
