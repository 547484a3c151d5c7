use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: String,
    pub name: String,
    /// Season label, e.g. "2025"
    pub season: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLeague {
    pub name: String,
    pub season: Option<String>,
    #[serde(default)]
    pub description: String,
}
