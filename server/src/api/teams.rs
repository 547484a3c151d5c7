use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};
use pickem_common::{Conference, NewConference, NewTeam, Team};
use serde::Deserialize;

use super::AppState;
use super::error::ApiResult;
use super::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct TeamSearch {
    /// Case-insensitive substring of the team name
    pub q: Option<String>,
}

// === Conferences ===

pub async fn list_conferences(State(state): State<AppState>) -> ApiResult<Json<Vec<Conference>>> {
    Ok(Json(state.db.list_conferences().await?))
}

pub async fn create_conference(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewConference>,
) -> ApiResult<(StatusCode, Json<Conference>)> {
    auth.require_admin()?;
    let conference = state.db.create_conference(req).await?;
    Ok((StatusCode::CREATED, Json(conference)))
}

pub async fn get_conference(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conference>> {
    Ok(Json(state.db.get_conference(&id).await?))
}

pub async fn update_conference(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<NewConference>,
) -> ApiResult<Json<Conference>> {
    auth.require_admin()?;
    Ok(Json(state.db.update_conference(&id, req).await?))
}

pub async fn delete_conference(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    state.db.delete_conference(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_conference_teams(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Team>>> {
    state.db.get_conference(&id).await?;
    Ok(Json(state.db.list_teams_by_conference(&id).await?))
}

// === Teams ===

pub async fn list_teams(
    State(state): State<AppState>,
    Query(search): Query<TeamSearch>,
) -> ApiResult<Json<Vec<Team>>> {
    let teams = match search.q.as_deref() {
        Some(text) => state.db.search_teams(text).await?,
        None => state.db.list_teams().await?,
    };
    Ok(Json(teams))
}

pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewTeam>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    auth.require_admin()?;
    let team = state.db.create_team(req).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Team>> {
    Ok(Json(state.db.get_team(&id).await?))
}

pub async fn update_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<NewTeam>,
) -> ApiResult<Json<Team>> {
    auth.require_admin()?;
    Ok(Json(state.db.update_team(&id, req).await?))
}

pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    state.db.delete_team(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
