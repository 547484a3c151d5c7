use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use pickem_common::{Game, GameUpdate, NewGame, Pick};

use super::AppState;
use super::error::ApiResult;
use super::middleware::AuthUser;
use crate::scoring::{self, ResultRecorded, ScoringReport};

pub async fn create_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewGame>,
) -> ApiResult<(StatusCode, Json<Game>)> {
    auth.require_admin()?;
    let game = state.db.create_game(req).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Game>> {
    Ok(Json(state.db.get_game(&id).await?))
}

/// Status/score edit; completing a game (or changing its winner) scores
/// its picks before responding.
pub async fn record_result(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(update): Json<GameUpdate>,
) -> ApiResult<Json<ResultRecorded>> {
    auth.require_admin()?;
    let recorded =
        scoring::record_result(&state.db, &id, &update, state.scoring_concurrency).await?;
    Ok(Json(recorded))
}

pub async fn score_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScoringReport>> {
    auth.require_admin()?;
    let report = scoring::rescore_game(&state.db, &id, state.scoring_concurrency).await?;
    Ok(Json(report))
}

pub async fn delete_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    state.db.delete_game(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_game_picks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Pick>>> {
    auth.require_admin()?;
    state.db.get_game(&id).await?;
    Ok(Json(state.db.list_picks_for_game(&id).await?))
}
