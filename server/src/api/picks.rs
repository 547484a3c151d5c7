use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};
use pickem_common::{NewPick, Pick};
use serde::Deserialize;

use super::AppState;
use super::error::ApiResult;
use super::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct ChangePick {
    pub picked_team_id: String,
    #[serde(default)]
    pub confidence: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct MyPicksFilter {
    pub season: Option<String>,
}

pub async fn submit_pick(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewPick>,
) -> ApiResult<(StatusCode, Json<Pick>)> {
    let pick = state.db.submit_pick(&auth.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(pick)))
}

pub async fn my_picks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(filter): Query<MyPicksFilter>,
) -> ApiResult<Json<Vec<Pick>>> {
    let mut picks = state.db.list_picks_for_user(&auth.user_id).await?;
    if let Some(season) = filter.season {
        picks.retain(|pick| pick.season == season);
    }
    Ok(Json(picks))
}

pub async fn change_pick(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(game_id): Path<String>,
    Json(req): Json<ChangePick>,
) -> ApiResult<Json<Pick>> {
    let pick = state
        .db
        .change_pick(&auth.user_id, &game_id, &req.picked_team_id, req.confidence)
        .await?;
    Ok(Json(pick))
}

pub async fn delete_pick(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(game_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_pick(&auth.user_id, &game_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
