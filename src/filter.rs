use std::fmt;

use chrono::{DateTime, FixedOffset};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::model::{Task, UserId};

/// Display criterion over the in-memory task collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "kebab-case")]
pub enum Filter {
    #[default]
    All,
    AssignedToMe,
    CreatedByMe,
    Overdue,
    DueToday,
}

impl Filter {
    pub const ALL: [Self; 5] = [
        Self::All,
        Self::AssignedToMe,
        Self::CreatedByMe,
        Self::Overdue,
        Self::DueToday,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All Tasks",
            Self::AssignedToMe => "Assigned to Me",
            Self::CreatedByMe => "My Created Tasks",
            Self::Overdue => "Overdue",
            Self::DueToday => "Due Today",
        }
    }

    /// `Overdue` compares instants; `DueToday` compares calendar dates in
    /// `now`'s offset. A due date at 23:59 today is therefore due today but not
    /// overdue, even though both read "today" to the user.
    pub fn matches(self, task: &Task, user: Option<&UserId>, now: &DateTime<FixedOffset>) -> bool {
        match self {
            Self::All => true,
            Self::AssignedToMe => user.is_some() && task.assigned_to.as_ref() == user,
            Self::CreatedByMe => user.is_some() && task.created_by.as_ref() == user,
            Self::Overdue => task.due_date.is_some_and(|due| due < *now),
            Self::DueToday => task
                .due_date
                .is_some_and(|due| due.with_timezone(&now.timezone()).date_naive() == now.date_naive()),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::AssignedToMe => write!(f, "assigned-to-me"),
            Self::CreatedByMe => write!(f, "created-by-me"),
            Self::Overdue => write!(f, "overdue"),
            Self::DueToday => write!(f, "due-today"),
        }
    }
}

/// Select the tasks matching `filter`, keeping their order.
pub fn apply(
    filter: Filter,
    tasks: &[Task],
    user: Option<&UserId>,
    now: &DateTime<FixedOffset>,
) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task, user, now))
        .cloned()
        .collect()
}
