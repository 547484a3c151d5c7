use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{USERNAME_MAX_LEN, USERNAME_MIN_LEN};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies when registering a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Profile changes; `None` leaves the field as it is
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Emails are compared case-insensitively everywhere, including lookup keys.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates username format
/// - Must be 3-20 characters long
/// - Can only contain alphanumeric characters, underscores, and hyphens
pub fn validate_username(username: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let len = username.chars().count();

    if len < USERNAME_MIN_LEN {
        errors.push(format!(
            "Username must be at least {} characters long",
            USERNAME_MIN_LEN
        ));
    }

    if len > USERNAME_MAX_LEN {
        errors.push(format!(
            "Username must be at most {} characters long",
            USERNAME_MAX_LEN
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        errors.push(
            "Username can only contain letters, numbers, underscores, and hyphens".to_string(),
        );
    }

    if username.starts_with('_') || username.starts_with('-') {
        errors.push("Username cannot start with underscore or hyphen".to_string());
    }

    if username.ends_with('_') || username.ends_with('-') {
        errors.push("Username cannot end with underscore or hyphen".to_string());
    }

    errors
}

/// Very small sanity check; deliverability is not our problem.
pub fn validate_email(email: &str) -> Option<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => None,
        _ => Some("Email must look like name@example.com".to_string()),
    }
}
