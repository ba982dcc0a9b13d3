use crate::commands::App;
use crate::error::Result;
use crate::filter::Filter;
use crate::output;

pub fn run(app: &App, filter: Filter) -> Result<()> {
    let mut controller = app.controller()?;
    controller.refresh()?;
    controller.apply_filter(filter);
    output::print_tasks(controller.visible_tasks(), app.format)
}
