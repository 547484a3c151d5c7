use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::AppError;
use super::jwt::JwtManager;

/// Caller identity, inserted into request extensions by `auth_middleware`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub is_admin: bool,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

pub async fn auth_middleware(
    State(jwt_manager): State<Arc<JwtManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Missing or invalid authorization header")
                .into_response();
        }
    };

    match jwt_manager.verify(token) {
        Ok(claims) if !claims.sub.is_empty() => {
            request.extensions_mut().insert(AuthUser {
                user_id: claims.sub,
                username: claims.username,
                is_admin: claims.is_admin,
            });
            next.run(request).await
        }
        Ok(_) => AppError::Unauthorized("Invalid token claims").into_response(),
        Err(_) => AppError::Unauthorized("Invalid or expired token").into_response(),
    }
}
