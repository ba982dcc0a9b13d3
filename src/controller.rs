//! The task store and view controller.
//!
//! Owns the in-memory task collection for the signed-in user, mutates it only
//! after the backend confirms, and derives the filtered view shown to the
//! user. Every backend failure is caught here: logged, recorded as
//! `last_error`, shown as an error notification and handed back to the caller.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock, parse_due_date};
use crate::error::{Result, TickError};
use crate::filter::{self, Filter};
use crate::model::{NewTask, Scope, ScopePolicy, Task, TaskPatch, UserId};
use crate::notify::{Notification, Notifier};
use crate::remote::TaskBackend;
use crate::session::AuthContext;
use crate::task_id::TaskId;

/// Unsubmitted add-task input, kept verbatim until an add succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    /// User id to assign; blank means the signed-in user.
    pub assignee: String,
    /// `YYYY-MM-DD` or RFC 3339; blank means no due date.
    pub due: String,
}

impl Draft {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.assignee.is_empty() && self.due.is_empty()
    }
}

/// A toggle that has been issued but whose response is not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToggle {
    pub id: TaskId,
    /// Completion state sent to the backend.
    pub requested: bool,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The backend-confirmed completion state is now shown.
    Applied(bool),
    /// A newer toggle for the same task was issued; this response was dropped.
    Superseded,
}

pub struct TaskController<B, N> {
    backend: B,
    auth: AuthContext,
    notifier: N,
    clock: Box<dyn Clock>,
    scope: ScopePolicy,
    all_tasks: Vec<Task>,
    visible_tasks: Vec<Task>,
    active_filter: Filter,
    draft: Draft,
    last_error: Option<String>,
    /// Latest issued toggle sequence per task.
    toggles: HashMap<TaskId, u64>,
    next_toggle: u64,
}

impl<B: TaskBackend, N: Notifier> TaskController<B, N> {
    pub fn new(backend: B, auth: AuthContext, notifier: N) -> Self {
        Self {
            backend,
            auth,
            notifier,
            clock: Box::new(SystemClock),
            scope: ScopePolicy::default(),
            all_tasks: Vec::new(),
            visible_tasks: Vec::new(),
            active_filter: Filter::default(),
            draft: Draft::default(),
            last_error: None,
            toggles: HashMap::new(),
            next_toggle: 0,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_scope(mut self, scope: ScopePolicy) -> Self {
        self.scope = scope;
        self
    }

    pub fn all_tasks(&self) -> &[Task] {
        &self.all_tasks
    }

    pub fn visible_tasks(&self) -> &[Task] {
        &self.visible_tasks
    }

    pub fn active_filter(&self) -> Filter {
        self.active_filter
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn set_draft(&mut self, draft: Draft) {
        self.draft = draft;
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Current time according to the controller's clock.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.all_tasks.iter().find(|task| &task.id == id)
    }

    /// Replace the collection with the backend's current rows.
    ///
    /// Signed out with the `mine` scope there is nobody to fetch for, so this
    /// is a no-op rather than an error.
    pub fn refresh(&mut self) -> Result<()> {
        let scope = match (self.scope, self.auth.user_id()) {
            (ScopePolicy::All, _) => Scope::All,
            (ScopePolicy::Mine, Some(user)) => Scope::Owner(user),
            (ScopePolicy::Mine, None) => {
                debug!("no session; skipping fetch");
                return Ok(());
            }
        };

        match self.backend.select_all(&scope) {
            Ok(tasks) => {
                debug!(count = tasks.len(), "fetched tasks");
                self.all_tasks = tasks;
                self.last_error = None;
                self.recompute();
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to fetch tasks");
                Err(self.report(err, |e| format!("Failed to fetch tasks: {e}")))
            }
        }
    }

    /// Insert a task, then re-fetch so it shows with its server-assigned id.
    ///
    /// The creator is always the signed-in user; `assignee` defaults to them.
    pub fn add(
        &mut self,
        title: &str,
        assignee: Option<UserId>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(self.report(TickError::EmptyTitle, |_| "Task cannot be empty".into()));
        }
        let Some(user) = self.auth.user_id() else {
            self.notifier
                .show(Notification::info("Sign in to add tasks."));
            return Err(TickError::NoSession);
        };

        let new_task = NewTask {
            title: title.to_string(),
            assigned_to: Some(assignee.unwrap_or_else(|| user.clone())),
            created_by: Some(user),
            due_date,
            is_completed: false,
        };

        let task = match self.backend.insert(&new_task) {
            Ok(task) => task,
            Err(err) => {
                error!(error = %err, "failed to add task");
                return Err(self.report(err, |e| e.to_string()));
            }
        };
        info!(id = %task.id, "task added");

        if let Err(err) = self.refresh() {
            warn!(error = %err, "task added but re-fetch failed; appending it");
            if self.task(&task.id).is_none() {
                self.all_tasks.push(task.clone());
            }
            self.recompute();
        }
        self.draft = Draft::default();
        self.notifier
            .show(Notification::success("Task added successfully!"));
        Ok(task)
    }

    /// Submit the current draft. The draft survives any failure.
    pub fn add_from_draft(&mut self) -> Result<Task> {
        let draft = self.draft.clone();
        let assignee = Some(draft.assignee.trim())
            .filter(|a| !a.is_empty())
            .map(UserId::new);
        let due_date = match draft.due.trim() {
            "" => None,
            text => match parse_due_date(text, &self.clock.now()) {
                Ok(due) => Some(due),
                Err(err) => return Err(self.report(err, |e| e.to_string())),
            },
        };
        self.add(&draft.title, assignee, due_date)
    }

    /// Record a toggle for `id` and decide the state to request.
    ///
    /// The request is computed from the local state at issue time, so two
    /// toggles issued back to back both ask for the same value.
    pub fn begin_toggle(&mut self, id: &TaskId) -> Result<PendingToggle> {
        let Some(current) = self.task(id).map(|task| task.is_completed) else {
            return Err(self.report(TickError::TaskNotFound(id.clone()), |e| e.to_string()));
        };
        self.next_toggle += 1;
        let seq = self.next_toggle;
        self.toggles.insert(id.clone(), seq);
        Ok(PendingToggle {
            id: id.clone(),
            requested: !current,
            seq,
        })
    }

    pub fn send_toggle(&self, pending: &PendingToggle) -> Result<Task> {
        self.backend
            .update(&pending.id, &TaskPatch::completion(pending.requested))
    }

    /// Apply a toggle response.
    ///
    /// Only the most recently issued toggle for a task may change it; older
    /// responses are dropped whatever order they arrive in. The shown state is
    /// the one the backend confirmed, not the locally computed negation.
    pub fn complete_toggle(
        &mut self,
        pending: PendingToggle,
        response: Result<Task>,
    ) -> Result<ToggleOutcome> {
        let latest = self.toggles.get(&pending.id) == Some(&pending.seq);
        if !latest {
            match &response {
                Ok(_) => debug!(id = %pending.id, "dropping superseded toggle response"),
                Err(err) => warn!(id = %pending.id, error = %err, "superseded toggle failed"),
            }
            return Ok(ToggleOutcome::Superseded);
        }
        self.toggles.remove(&pending.id);

        match response {
            Ok(confirmed) => {
                let done = confirmed.is_completed;
                if let Some(task) = self.all_tasks.iter_mut().find(|t| t.id == pending.id) {
                    task.is_completed = done;
                }
                self.recompute();
                debug!(id = %pending.id, done, "toggle applied");
                Ok(ToggleOutcome::Applied(done))
            }
            Err(err) => {
                error!(id = %pending.id, error = %err, "failed to toggle task");
                Err(self.report(err, |e| format!("Error updating task: {e}")))
            }
        }
    }

    pub fn toggle_completion(&mut self, id: &TaskId) -> Result<ToggleOutcome> {
        let pending = self.begin_toggle(id)?;
        let response = self.send_toggle(&pending);
        self.complete_toggle(pending, response)
    }

    pub fn remove(&mut self, id: &TaskId) -> Result<()> {
        if let Err(err) = self.backend.delete(id) {
            error!(%id, error = %err, "failed to delete task");
            return Err(self.report(err, |e| format!("Error deleting task: {e}")));
        }
        info!(%id, "task deleted");
        self.all_tasks.retain(|task| &task.id != id);
        self.visible_tasks.retain(|task| &task.id != id);
        self.toggles.remove(id);
        self.notifier
            .show(Notification::success("Task deleted successfully!"));
        Ok(())
    }

    /// Pure recomputation of the visible subset; no backend call.
    pub fn apply_filter(&mut self, criterion: Filter) {
        self.active_filter = criterion;
        self.recompute();
    }

    /// React to a sign-in or sign-out: drop the old user's rows and fetch the
    /// new user's.
    pub fn session_changed(&mut self) -> Result<()> {
        self.all_tasks.clear();
        self.visible_tasks.clear();
        self.toggles.clear();
        self.refresh()
    }

    fn recompute(&mut self) {
        let user = self.auth.user_id();
        self.visible_tasks = filter::apply(
            self.active_filter,
            &self.all_tasks,
            user.as_ref(),
            &self.clock.now(),
        );
    }

    fn report(&mut self, err: TickError, message: impl FnOnce(&TickError) -> String) -> TickError {
        self.last_error = Some(err.to_string());
        self.notifier.show(Notification::error(message(&err)));
        err
    }
}
