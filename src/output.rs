use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;

use crate::error::Result;
use crate::model::Task;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

fn checkbox(task: &Task) -> &'static str {
    if task.is_completed { "[x]" } else { "[ ]" }
}

pub fn format_due(due: Option<&DateTime<Utc>>) -> String {
    due.map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn print_task(task: &Task, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(task)?),
        Format::Pretty => {
            println!("{} {} ({})", checkbox(task), task.title, task.id);
            if let Some(ref assignee) = task.assigned_to {
                println!("  assigned to: {}", assignee);
            }
            if let Some(ref creator) = task.created_by {
                println!("  created by: {}", creator);
            }
            if task.due_date.is_some() {
                println!("  due: {}", format_due(task.due_date.as_ref()));
            }
        }
        Format::Minimal => println!("{}", minimal_row(task)),
    }
    Ok(())
}

pub fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() > max_len {
        let truncated: String = title.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}

/// Uuids are cut to their first group; any other id is printed whole so it
/// can be passed back to `toggle` or `delete`.
fn short_id(id: &str) -> String {
    if uuid::Uuid::parse_str(id).is_ok() {
        id.chars().take(8).collect()
    } else {
        id.to_string()
    }
}

fn minimal_row(task: &Task) -> String {
    let assignee = task.assigned_to.as_ref().map(|u| short_id(u.as_str()));
    format!(
        "{:>8} {:3} {:24} {:16} {}",
        short_id(task.id.as_str()),
        checkbox(task),
        truncate_title(&task.title, 24),
        format_due(task.due_date.as_ref()),
        assignee.as_deref().unwrap_or("-"),
    )
}

pub fn print_tasks(tasks: &[Task], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(tasks)?),
        Format::Pretty => {
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in tasks {
                print_task(task, Format::Pretty)?;
                println!();
            }
        }
        Format::Minimal => {
            println!(
                "{:>8} {:3} {:24} {:16} ASSIGNEE",
                "ID", "", "TITLE", "DUE"
            );
            println!("{}", "-".repeat(64));
            for task in tasks {
                println!("{}", minimal_row(task));
            }
        }
    }
    Ok(())
}

pub fn print_session(session: Option<&Session>, format: Format) -> Result<()> {
    match (format, session) {
        (Format::Json, Some(session)) => println!(
            "{}",
            serde_json::json!({
                "signed_in": true,
                "user": session.user,
                "expires_at": session.expires_at,
            })
        ),
        (Format::Json, None) => println!("{}", serde_json::json!({ "signed_in": false })),
        (_, Some(session)) => {
            let email = session.user.email.as_deref().unwrap_or("-");
            println!("{} ({})", session.user_id(), email);
        }
        (_, None) => println!("Not signed in."),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserId;
    use crate::task_id::TaskId;

    fn task(title: &str) -> Task {
        Task {
            id: TaskId::from(4_000_000_123),
            title: title.into(),
            assigned_to: Some(UserId::new("4e83cb09-0e0b-4bdb-a914-e0c278668885")),
            created_by: None,
            due_date: None,
            is_completed: true,
            inserted_at: None,
        }
    }

    #[test]
    fn truncate_title_keeps_short_titles() {
        assert_eq!(truncate_title("short", 12), "short");
        assert_eq!(truncate_title("a much longer title", 12), "a much lo...");
    }

    #[test]
    fn minimal_row_shortens_ids_and_marks_completion() {
        let row = minimal_row(&task("Buy milk"));
        assert!(row.starts_with("4000000123 [x] Buy milk"));
        assert!(row.ends_with("4e83cb09"));
        assert!(row.contains(" - "));
    }

    #[test]
    fn short_id_only_cuts_uuids() {
        assert_eq!(short_id("4e83cb09-0e0b-4bdb-a914-e0c278668885"), "4e83cb09");
        assert_eq!(short_id("123456789012"), "123456789012");
        assert_eq!(short_id("42"), "42");
        assert_eq!(short_id("local-demo"), "local-demo");
    }
}
