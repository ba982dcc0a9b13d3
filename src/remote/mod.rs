pub mod auth;
pub mod memory;
pub mod rest;

use serde::Deserialize;

use crate::error::Result;
use crate::model::{NewTask, Scope, Task, TaskPatch};
use crate::task_id::TaskId;

pub use auth::AuthClient;
pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// CRUD over the hosted "tasks" collection.
///
/// Every failure the service reports comes back as `TickError::Remote`
/// carrying its message.
pub trait TaskBackend {
    fn select_all(&self, scope: &Scope) -> Result<Vec<Task>>;
    fn insert(&self, task: &NewTask) -> Result<Task>;
    fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task>;
    fn delete(&self, id: &TaskId) -> Result<()>;
}

impl<B: TaskBackend + ?Sized> TaskBackend for &B {
    fn select_all(&self, scope: &Scope) -> Result<Vec<Task>> {
        (**self).select_all(scope)
    }

    fn insert(&self, task: &NewTask) -> Result<Task> {
        (**self).insert(task)
    }

    fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &TaskId) -> Result<()> {
        (**self).delete(id)
    }
}

impl<B: TaskBackend + ?Sized> TaskBackend for Box<B> {
    fn select_all(&self, scope: &Scope) -> Result<Vec<Task>> {
        (**self).select_all(scope)
    }

    fn insert(&self, task: &NewTask) -> Result<Task> {
        (**self).insert(task)
    }

    fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &TaskId) -> Result<()> {
        (**self).delete(id)
    }
}

/// Error bodies from the REST and auth services. Field names differ between
/// the two and between service versions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

/// Best human-readable message for a failed response.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error);

    match (message, parsed.details) {
        (Some(message), Some(details)) if !details.is_empty() => format!("{message} ({details})"),
        (Some(message), _) => message,
        (None, _) if !body.trim().is_empty() => format!("HTTP {status}: {}", body.trim()),
        (None, _) => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_service_fields() {
        assert_eq!(
            error_message(
                409,
                r#"{"code":"23505","message":"duplicate key","details":"Key (id)=(1) already exists.","hint":null}"#
            ),
            "duplicate key (Key (id)=(1) already exists.)"
        );
        assert_eq!(
            error_message(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(422, r#"{"code":422,"msg":"User already registered"}"#), "User already registered");
    }

    #[test]
    fn error_message_falls_back_to_status() {
        assert_eq!(error_message(502, ""), "HTTP 502");
        assert_eq!(error_message(500, "upstream timeout"), "HTTP 500: upstream timeout");
    }
}
