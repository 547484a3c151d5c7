use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::NAME_MAX_LEN;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conference {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewConference {
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub conference_id: Option<String>,
}

/// Team and conference names are unique ignoring case and surrounding spaces.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn validate_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Some("Name must not be empty".to_string())
    } else if trimmed.chars().count() > NAME_MAX_LEN {
        Some(format!("Name must be at most {} characters long", NAME_MAX_LEN))
    } else {
        None
    }
}
