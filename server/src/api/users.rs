use std::collections::HashSet;

use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use pickem_common::{User, UserChanges};
use serde::Serialize;

use super::AppState;
use super::auth::UserInfo;
use super::error::ApiResult;
use super::middleware::AuthUser;
use crate::error::Error;

/// What other users may see of a profile
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            created_at: user.created_at,
        }
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<PublicUser>> {
    let user = state.db.get_user(&user_id).await?;
    Ok(Json(user.into()))
}

/// Names in the admin list grant admin rights at registration, so they stay
/// with their admin account: nobody else may take one and its holder may not
/// rename away from it.
fn check_reserved_username(
    admin_usernames: &HashSet<String>,
    user: &User,
    username: &str,
) -> Result<(), Error> {
    if username == user.username {
        return Ok(());
    }
    if admin_usernames.contains(&user.username) {
        return Err(Error::validation(
            "username",
            "administrator usernames cannot be changed",
        ));
    }
    if admin_usernames.contains(username) && !user.is_admin {
        return Err(Error::validation(
            "username",
            "username is reserved for an administrator",
        ));
    }
    Ok(())
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(changes): Json<UserChanges>,
) -> ApiResult<Json<UserInfo>> {
    if let Some(username) = &changes.username {
        let current = state.db.get_user(&auth.user_id).await?;
        check_reserved_username(&state.admin_usernames, &current, username)?;
    }
    let user = state.db.update_user(&auth.user_id, changes).await?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    state.db.delete_user(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
