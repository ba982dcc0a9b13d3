use crate::commands::App;
use crate::controller::Draft;
use crate::error::Result;
use crate::output;

pub fn run(app: &App, title: String, assign_to: Option<String>, due: Option<String>) -> Result<()> {
    let mut controller = app.controller()?;
    controller.set_draft(Draft {
        title,
        assignee: assign_to.unwrap_or_default(),
        due: due.unwrap_or_default(),
    });
    let task = controller.add_from_draft()?;
    output::print_task(&task, app.format)
}
