use std::cell::RefCell;
use std::collections::HashMap;

use chrono::Utc;

use crate::error::{Result, TickError};
use crate::model::{NewTask, Scope, Task, TaskPatch};
use crate::remote::TaskBackend;
use crate::task_id::TaskId;

/// A backend call, as observed by `MemoryBackend`.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SelectAll(Scope),
    Insert(NewTask),
    Update(TaskId, TaskPatch),
    Delete(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SelectAll,
    Insert,
    Update,
    Delete,
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Self::SelectAll(_) => Operation::SelectAll,
            Self::Insert(_) => Operation::Insert,
            Self::Update(_, _) => Operation::Update,
            Self::Delete(_) => Operation::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdStyle {
    Uuid,
    Sequential,
}

#[derive(Debug)]
struct Rows {
    tasks: Vec<Task>,
    next_id: u64,
}

/// In-process task table with the same contract as the hosted one.
///
/// Rows live as long as the value. Every call is recorded, and a failure can
/// be queued per operation to exercise error paths.
#[derive(Debug)]
pub struct MemoryBackend {
    rows: RefCell<Rows>,
    calls: RefCell<Vec<Call>>,
    failures: RefCell<HashMap<Operation, String>>,
    id_style: IdStyle,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::with_style(IdStyle::Uuid)
    }
}

impl MemoryBackend {
    /// Rows get uuid ids, like a `uuid default gen_random_uuid()` column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows get 1, 2, 3... like a bigserial column.
    pub fn sequential() -> Self {
        Self::with_style(IdStyle::Sequential)
    }

    fn with_style(id_style: IdStyle) -> Self {
        Self {
            rows: RefCell::new(Rows {
                tasks: Vec::new(),
                next_id: 1,
            }),
            calls: RefCell::new(Vec::new()),
            failures: RefCell::new(HashMap::new()),
            id_style,
        }
    }

    /// Store rows directly, bypassing the call log. Sequential ids continue
    /// after the largest numeric id seeded.
    pub fn seed(&self, tasks: impl IntoIterator<Item = Task>) {
        let mut rows = self.rows.borrow_mut();
        for task in tasks {
            if let Ok(n) = task.id.as_str().parse::<u64>() {
                rows.next_id = rows.next_id.max(n + 1);
            }
            rows.tasks.push(task);
        }
    }

    /// Make the next call of `operation` fail with `message`.
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.failures.borrow_mut().insert(operation, message.into());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn rows(&self) -> Vec<Task> {
        self.rows.borrow().tasks.clone()
    }

    fn record(&self, call: Call) -> Result<()> {
        let operation = call.operation();
        self.calls.borrow_mut().push(call);
        match self.failures.borrow_mut().remove(&operation) {
            Some(message) => Err(TickError::Remote(message)),
            None => Ok(()),
        }
    }

    fn next_id(&self, rows: &mut Rows) -> TaskId {
        match self.id_style {
            IdStyle::Uuid => TaskId::from(uuid::Uuid::new_v4()),
            IdStyle::Sequential => {
                let id = rows.next_id;
                rows.next_id += 1;
                TaskId::from(id)
            }
        }
    }
}

impl TaskBackend for MemoryBackend {
    fn select_all(&self, scope: &Scope) -> Result<Vec<Task>> {
        self.record(Call::SelectAll(scope.clone()))?;
        Ok(self
            .rows
            .borrow()
            .tasks
            .iter()
            .filter(|task| scope.includes(task))
            .cloned()
            .collect())
    }

    fn insert(&self, task: &NewTask) -> Result<Task> {
        self.record(Call::Insert(task.clone()))?;
        let mut rows = self.rows.borrow_mut();
        let id = self.next_id(&mut rows);
        let row = Task {
            id,
            title: task.title.clone(),
            assigned_to: task.assigned_to.clone(),
            created_by: task.created_by.clone(),
            due_date: task.due_date,
            is_completed: task.is_completed,
            inserted_at: Some(Utc::now()),
        };
        rows.tasks.push(row.clone());
        Ok(row)
    }

    fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        self.record(Call::Update(id.clone(), patch.clone()))?;
        let mut rows = self.rows.borrow_mut();
        let row = rows
            .tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| TickError::Remote(format!("no task with id {id}")))?;
        if let Some(done) = patch.is_completed {
            row.is_completed = done;
        }
        Ok(row.clone())
    }

    fn delete(&self, id: &TaskId) -> Result<()> {
        self.record(Call::Delete(id.clone()))?;
        let mut rows = self.rows.borrow_mut();
        let before = rows.tasks.len();
        rows.tasks.retain(|task| &task.id != id);
        if rows.tasks.len() == before {
            return Err(TickError::Remote(format!("no task with id {id}")));
        }
        Ok(())
    }
}
