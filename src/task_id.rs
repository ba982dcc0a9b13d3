use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TickError;

/// Server-assigned task identifier.
///
/// The backend decides the shape (uuid text or bigserial integer); locally it
/// is opaque text, compared and displayed as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Parse a command-line id, keeping the raw input in the error.
    pub fn parse_arg(input: &str) -> crate::error::Result<Self> {
        input
            .parse()
            .map_err(|err: TaskIdParseError| TickError::InvalidTaskId(input.to_string(), err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskIdParseError {
    Empty,
    Whitespace,
}

impl fmt::Display for TaskIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "task id cannot be empty"),
            Self::Whitespace => write!(f, "task id cannot contain whitespace"),
        }
    }
}

impl std::error::Error for TaskIdParseError {}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = TaskIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TaskIdParseError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(TaskIdParseError::Whitespace);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<uuid::Uuid> for TaskId {
    fn from(value: uuid::Uuid) -> Self {
        Self(value.to_string())
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

impl TryFrom<&str> for TaskId {
    type Error = TaskIdParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TaskIdVisitor;

        impl serde::de::Visitor<'_> for TaskIdVisitor {
            type Value = TaskId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a text or integer task id")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(TaskId::from(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if value < 0 {
                    return Err(E::custom("task id cannot be negative"));
                }
                Ok(TaskId::from(value as u64))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(E::custom)
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&value)
            }
        }

        deserializer.deserialize_any(TaskIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_arg_reports_input_and_reason() {
        assert_eq!(TaskId::parse_arg(" 42 ").unwrap().as_str(), "42");

        let err = TaskId::parse_arg("a b").unwrap_err();
        assert_eq!(err.code(), "invalid_task_id");
        assert_eq!(
            err.to_string(),
            "invalid task id 'a b': task id cannot contain whitespace"
        );
    }

    #[test]
    fn deserializes_uuid_text_and_integer_ids() {
        let text: TaskId =
            serde_json::from_str(r#""4e83cb09-0e0b-4bdb-a914-e0c278668885""#).unwrap();
        assert_eq!(text.as_str(), "4e83cb09-0e0b-4bdb-a914-e0c278668885");

        let numeric: TaskId = serde_json::from_str("42").unwrap();
        assert_eq!(numeric, TaskId::from(42));
        assert_eq!(serde_json::to_string(&numeric).unwrap(), r#""42""#);
    }

    #[test]
    fn rejects_negative_and_empty_ids() {
        assert!(serde_json::from_str::<TaskId>("-1").is_err());
        assert_eq!("  ".parse::<TaskId>(), Err(TaskIdParseError::Empty));
        assert_eq!("a b".parse::<TaskId>(), Err(TaskIdParseError::Whitespace));
    }

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let id: TaskId = " 17 ".parse().unwrap();
        assert_eq!(id, TaskId::from(17));
    }
}
