use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

use crate::task_id::TaskId;

/// Stable identifier of an authenticated user, as issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A task row as stored by the backend.
///
/// Single-owner tables name the owner column `user_id`; it is read into
/// `assigned_to`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted_at: Option<DateTime<Utc>>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Insert payload. The backend assigns `id` and `inserted_at`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
}

/// Partial update payload.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl TaskPatch {
    pub fn completion(is_completed: bool) -> Self {
        Self {
            is_completed: Some(is_completed),
        }
    }
}

/// Which rows a fetch asks the backend for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Rows assigned to or created by this user.
    Owner(UserId),
}

impl Scope {
    pub fn includes(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Owner(user) => {
                task.assigned_to.as_ref() == Some(user) || task.created_by.as_ref() == Some(user)
            }
        }
    }
}

/// Fetch scope policy chosen in configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum ScopePolicy {
    #[default]
    Mine,
    All,
}

impl fmt::Display for ScopePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mine => write!(f, "mine"),
            Self::All => write!(f, "all"),
        }
    }
}
