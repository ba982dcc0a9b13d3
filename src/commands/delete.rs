use crate::commands::App;
use crate::error::Result;
use crate::output::{self, Format};
use crate::task_id::TaskId;

pub fn run(app: &App, id: TaskId) -> Result<()> {
    let mut controller = app.controller()?;
    controller.refresh()?;
    let task = controller.task(&id).cloned();
    controller.remove(&id)?;

    match (task, app.format) {
        (Some(task), format) => output::print_task(&task, format)?,
        (None, Format::Json) => println!("{}", serde_json::json!({ "id": id, "deleted": true })),
        (None, _) => println!("Deleted {id}"),
    }
    Ok(())
}
