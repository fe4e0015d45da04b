use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ActionType {
    Created,
    Updated,
    Deleted,
    Login,
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ActivityStatus {
    #[serde(rename = "successful")]
    #[strum(serialize = "successful")]
    Successful,
    #[serde(rename = "failed")]
    #[strum(serialize = "failed")]
    Failed,
}

/// Snapshot of the acting user, denormalized so historic entries stay
/// readable after the user record changes or disappears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: i64,
    pub full_name: String,
    pub role: Role,
}

/// Append-only audit record. Entries are never mutated or deleted once
/// written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub user: UserSnapshot,
    pub action_type: ActionType,
    pub details: String,
    pub status: ActivityStatus,
    pub is_system_action: bool,
}
