use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A posted job role. Owned by the administrator who created it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRole {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub responsibilities: String,
    pub requirements: String,
    /// Declaration order is significant: score reasons follow it.
    pub required_skills: Vec<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}
