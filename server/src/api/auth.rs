use anyhow::Context;
use axum::{
    extract::{Extension, Json, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Utc};
use pickem_common::{NewUser, User};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use super::error::{ApiResult, AppError};
use super::middleware::AuthUser;
use crate::error::Error;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

/// The caller's own profile; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// Marks a response as private and uncacheable
pub(crate) fn no_store(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate, private"),
    );
    response
        .headers_mut()
        .insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

async fn hash_password(password: String) -> ApiResult<String> {
    let hashed = tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .context("Password hashing task failed")?
        .context("Failed to hash password")?;
    Ok(hashed)
}

async fn verify_password(password: String, password_hash: String) -> ApiResult<bool> {
    let valid = tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .context("Password verification task failed")?
        .context("Failed to verify password")?;
    Ok(valid)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Response> {
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        )
        .into());
    }

    let password_hash = hash_password(req.password).await?;
    let is_admin = state.admin_usernames.contains(&req.username);
    let user = state
        .db
        .create_user(NewUser {
            display_name: req.display_name.unwrap_or_else(|| req.username.clone()),
            username: req.username,
            email: req.email,
            password_hash,
            is_admin,
        })
        .await?;

    let token = state.jwt_manager.issue(&user)?;
    info!("User registered successfully: {}", user.username);

    let response = (
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    )
        .into_response();
    Ok(no_store(response))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    const INVALID: &str = "Invalid username or password";

    let user = match state.db.get_user_by_username(&req.username).await {
        Ok(user) => user,
        Err(Error::NotFound(_)) => return Err(AppError::Unauthorized(INVALID)),
        Err(e) => return Err(e.into()),
    };

    if !verify_password(req.password, user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized(INVALID));
    }

    let token = state.jwt_manager.issue(&user)?;
    info!("User logged in successfully: {}", user.username);

    let response = Json(AuthResponse {
        token,
        user: user.into(),
    })
    .into_response();
    Ok(no_store(response))
}

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Response> {
    let user = state.db.get_user(&auth.user_id).await?;
    let mut response = no_store(Json(UserInfo::from(user)).into_response());
    response
        .headers_mut()
        .insert(header::EXPIRES, HeaderValue::from_static("0"));
    Ok(response)
}
