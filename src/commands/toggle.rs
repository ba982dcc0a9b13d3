use crate::commands::App;
use crate::error::{Result, TickError};
use crate::output;
use crate::task_id::TaskId;

pub fn run(app: &App, id: TaskId) -> Result<()> {
    let mut controller = app.controller()?;
    controller.refresh()?;
    controller.toggle_completion(&id)?;
    let task = controller
        .task(&id)
        .ok_or_else(|| TickError::TaskNotFound(id.clone()))?;
    output::print_task(task, app.format)
}
