use thiserror::Error;

use crate::task_id::TaskId;

#[derive(Debug, Error)]
pub enum TickError {
    #[error("task cannot be empty")]
    EmptyTitle,

    #[error("{0}")]
    Remote(String),

    #[error("not signed in (run `tick login` first)")]
    NoSession,

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("invalid task id '{0}': {1}")]
    InvalidTaskId(String, String),

    #[error("missing backend URL or anon key (set TICK_URL and TICK_ANON_KEY, or run `tick init`)")]
    NotConfigured,

    #[error("invalid date '{0}' (expected YYYY-MM-DD or RFC 3339)")]
    InvalidDate(String),

    #[error("invalid scope '{0}' (expected 'mine' or 'all')")]
    InvalidScope(String),

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TickError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "validation_error",
            Self::Remote(_) => "remote_error",
            Self::NoSession => "no_session",
            Self::TaskNotFound(_) => "task_not_found",
            Self::InvalidTaskId(_, _) => "invalid_task_id",
            Self::NotConfigured => "not_configured",
            Self::InvalidDate(_) => "invalid_date",
            Self::InvalidScope(_) => "invalid_scope",
            Self::Locked(_) => "locked",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Http(_) => "http_error",
        }
    }

    /// Build a remote failure from anything the backend reports.
    pub fn remote(message: impl std::fmt::Display) -> Self {
        Self::Remote(message.to_string())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

pub type Result<T> = std::result::Result<T, TickError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_message_is_displayed_verbatim() {
        let err = TickError::remote("duplicate key value violates unique constraint");
        assert_eq!(
            err.to_string(),
            "duplicate key value violates unique constraint"
        );
        assert_eq!(err.code(), "remote_error");
        assert!(err.is_remote());
    }

    #[test]
    fn empty_title_is_a_validation_error() {
        assert_eq!(TickError::EmptyTitle.code(), "validation_error");
        assert!(!TickError::EmptyTitle.is_remote());
    }
}
