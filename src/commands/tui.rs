use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use tracing::debug;

use super::App;
use super::auth;
use crate::controller::TaskController;
use crate::error::Result;
use crate::filter::Filter;
use crate::model::Task;
use crate::notify::{Notification, Notifier, RecordingNotifier, Severity, Toast, ToastPhase};
use crate::output::{format_due, truncate_title};
use crate::remote::TaskBackend;
use crate::session::Subscription;
use crate::task_id::TaskId;

const TICK_RATE: Duration = Duration::from_millis(200);
const TOAST_WIDTH: u16 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Assignee,
    Due,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Self::Title => Self::Assignee,
            Self::Assignee => Self::Due,
            Self::Due => Self::Title,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Assignee => "Assign to",
            Self::Due => "Due",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Adding(Field),
}

#[derive(Debug, Clone)]
struct ActiveToast {
    toast: Toast,
    shown_at: Instant,
}

impl ActiveToast {
    fn phase(&self, now: Instant) -> ToastPhase {
        self.toast.phase(now.saturating_duration_since(self.shown_at))
    }
}

struct TickTuiApp<'a, B> {
    controller: TaskController<B, RecordingNotifier>,
    app: Option<&'a App>,
    mode: Mode,
    selected: usize,
    help_visible: bool,
    needs_refresh: bool,
    toast: Option<ActiveToast>,
    session_dirty: Rc<Cell<bool>>,
    _session: Subscription,
}

impl<'a, B: TaskBackend> TickTuiApp<'a, B> {
    fn new(controller: TaskController<B, RecordingNotifier>, app: Option<&'a App>) -> Self {
        let session_dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&session_dirty);
        let subscription = controller
            .auth()
            .on_session_change(move |_| flag.set(true));

        Self {
            controller,
            app,
            mode: Mode::Browse,
            selected: 0,
            help_visible: false,
            needs_refresh: false,
            toast: None,
            session_dirty,
            _session: subscription,
        }
    }

    fn refresh(&mut self) {
        self.needs_refresh = false;
        if let Err(err) = self.controller.refresh() {
            debug!(error = %err, "refresh failed");
        }
        self.normalize_selection();
    }

    /// Housekeeping between frames: pick up a new session, surface the newest
    /// notification and retire an expired toast.
    fn tick(&mut self, now: Instant) {
        if self.session_dirty.replace(false) {
            if let Err(err) = self.controller.session_changed() {
                debug!(error = %err, "reload after session change failed");
            }
            self.normalize_selection();
        }

        if let Some(notification) = self.controller.notifier().take().pop() {
            self.toast = Some(ActiveToast {
                toast: Toast::new(notification),
                shown_at: now,
            });
        }

        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.phase(now) == ToastPhase::Dismissed)
        {
            self.toast = None;
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }

        if let Mode::Adding(field) = self.mode {
            self.handle_add_key(field, key);
            return false;
        }

        match key.code {
            KeyCode::Char('q') => true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
            KeyCode::Char('?') => {
                self.help_visible = !self.help_visible;
                false
            }
            KeyCode::Char(digit @ '1'..='5') => {
                let index = digit as usize - '1' as usize;
                self.controller.apply_filter(Filter::ALL[index]);
                self.normalize_selection();
                false
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
                false
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
                false
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.toggle_selected();
                false
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                self.delete_selected();
                false
            }
            KeyCode::Char('a') => {
                self.mode = Mode::Adding(Field::Title);
                false
            }
            KeyCode::Char('r') => {
                self.needs_refresh = true;
                false
            }
            KeyCode::Char('o') => {
                self.sign_out();
                false
            }
            _ => false,
        }
    }

    fn handle_add_key(&mut self, field: Field, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.controller.set_draft(Default::default());
                self.mode = Mode::Browse;
            }
            KeyCode::Tab => self.mode = Mode::Adding(field.next()),
            KeyCode::Enter => {
                if self.controller.add_from_draft().is_ok() {
                    self.mode = Mode::Browse;
                    self.normalize_selection();
                }
            }
            KeyCode::Backspace => {
                self.field_mut(field).pop();
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.field_mut(field).push(ch);
            }
            _ => {}
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        let draft = self.controller.draft_mut();
        match field {
            Field::Title => &mut draft.title,
            Field::Assignee => &mut draft.assignee,
            Field::Due => &mut draft.due,
        }
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.controller
            .visible_tasks()
            .get(self.selected)
            .map(|task| task.id.clone())
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if let Err(err) = self.controller.toggle_completion(&id) {
            debug!(%id, error = %err, "toggle failed");
        }
        self.normalize_selection();
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if let Err(err) = self.controller.remove(&id) {
            debug!(%id, error = %err, "delete failed");
        }
        self.normalize_selection();
    }

    fn sign_out(&mut self) {
        let Some(app) = self.app else {
            return;
        };
        let notification = match auth::sign_out(app) {
            Ok(()) => Notification::info("Signed out."),
            Err(err) => Notification::error(format!("Sign-out failed: {err}")),
        };
        self.controller.notifier().show(notification);
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.controller.visible_tasks().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
    }

    fn normalize_selection(&mut self) {
        let len = self.controller.visible_tasks().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn controls_line(&self) -> String {
        match self.mode {
            Mode::Adding(_) => "Tab next field | Enter add | Esc cancel | Backspace delete".into(),
            Mode::Browse => {
                "1-5 filter | j/k move | space toggle | x delete | a add | r refresh | o sign out | ? help | q quit"
                    .into()
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let form_height = if matches!(self.mode, Mode::Adding(_)) { 5 } else { 0 };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(form_height),
                Constraint::Length(3),
            ])
            .split(frame.area());

        let active = self.controller.active_filter();
        let tab_titles = Filter::ALL
            .iter()
            .enumerate()
            .map(|(i, filter)| Line::from(format!("{} {}", i + 1, filter.label())))
            .collect::<Vec<_>>();
        let selected_tab = Filter::ALL.iter().position(|f| *f == active).unwrap_or(0);

        frame.render_widget(
            Tabs::new(tab_titles)
                .select(selected_tab)
                .block(Block::default().borders(Borders::ALL).title("tick"))
                .highlight_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
            outer[0],
        );

        frame.render_widget(
            Paragraph::new(self.summary())
                .block(Block::default().borders(Borders::ALL).title("Summary"))
                .wrap(Wrap { trim: true }),
            outer[1],
        );

        self.render_tasks(frame, outer[2]);

        if let Mode::Adding(field) = self.mode {
            self.render_add_form(frame, outer[3], field);
        }

        frame.render_widget(
            Paragraph::new(self.controls_line())
                .block(Block::default().borders(Borders::ALL).title("Controls"))
                .wrap(Wrap { trim: true }),
            outer[4],
        );

        self.render_toast(frame, Instant::now());

        if self.help_visible {
            let popup = centered_rect(70, 60, frame.area());
            frame.render_widget(Clear, popup);
            frame.render_widget(
                Paragraph::new(
                    "tick tui controls\n\n\
                     Filters:\n\
                     - 1 all, 2 assigned to me, 3 created by me, 4 overdue, 5 due today\n\n\
                     Tasks:\n\
                     - Up/Down, j/k: move selection\n\
                     - Space/Enter: toggle completion\n\
                     - x/Delete: delete task\n\
                     - a: add a task (Tab cycles title, assignee, due)\n\n\
                     Other:\n\
                     - r: re-fetch from the server\n\
                     - o: sign out\n\
                     - q: quit\n\
                     - ?: toggle this help",
                )
                .block(Block::default().borders(Borders::ALL).title("Help"))
                .wrap(Wrap { trim: true }),
                popup,
            );
        }
    }

    fn summary(&self) -> String {
        let all = self.controller.all_tasks();
        let done = all.iter().filter(|task| task.is_completed).count();
        let user = self
            .controller
            .auth()
            .user_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "signed out".to_string());

        let mut summary = format!(
            "user={user}  tasks={}  done={done}  shown={}",
            all.len(),
            self.controller.visible_tasks().len(),
        );
        if let Some(error) = self.controller.last_error() {
            summary.push_str(&format!("  last_error={error}"));
        }
        summary
    }

    fn task_row(task: &Task, overdue: bool) -> ListItem<'static> {
        let mark = if task.is_completed { "[x]" } else { "[ ]" };
        let mut text = format!("{mark} {}", truncate_title(&task.title, 48));
        if task.due_date.is_some() {
            text.push_str(&format!("  due {}", format_due(task.due_date.as_ref())));
        }
        if let Some(assignee) = &task.assigned_to {
            text.push_str(&format!("  @{assignee}"));
        }

        let style = if task.is_completed {
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT)
        } else if overdue {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        ListItem::new(text).style(style)
    }

    fn render_tasks(&self, frame: &mut Frame, area: Rect) {
        let tasks = self.controller.visible_tasks();
        let title = self.controller.active_filter().label();
        if tasks.is_empty() {
            frame.render_widget(
                Paragraph::new("(no tasks)")
                    .block(Block::default().borders(Borders::ALL).title(title))
                    .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let now = self.controller.now();
        let items = tasks
            .iter()
            .map(|task| Self::task_row(task, Filter::Overdue.matches(task, None, &now)))
            .collect::<Vec<_>>();

        let mut state = ListState::default();
        state.select(Some(self.selected));

        frame.render_stateful_widget(
            List::new(items)
                .block(Block::default().borders(Borders::ALL).title(title))
                .highlight_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("❯ "),
            area,
            &mut state,
        );
    }

    fn render_add_form(&self, frame: &mut Frame, area: Rect, active: Field) {
        let draft = self.controller.draft();
        let lines = [
            (Field::Title, draft.title.as_str()),
            (Field::Assignee, draft.assignee.as_str()),
            (Field::Due, draft.due.as_str()),
        ]
        .into_iter()
        .map(|(field, value)| {
            if field == active {
                Line::styled(
                    format!("{:>9}: {value}_", field.label()),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Line::from(format!("{:>9}: {value}", field.label()))
            }
        })
        .collect::<Vec<_>>();

        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("New task")),
            area,
        );
    }

    fn render_toast(&self, frame: &mut Frame, now: Instant) {
        let Some(active) = &self.toast else {
            return;
        };
        let phase = active.phase(now);
        if phase == ToastPhase::Dismissed {
            return;
        }

        let notification = &active.toast.notification;
        let color = match notification.severity {
            Severity::Success => Color::Green,
            Severity::Error => Color::Red,
            Severity::Info => Color::Blue,
        };
        let mut style = Style::default().fg(color);
        if phase == ToastPhase::Fading {
            style = style.add_modifier(Modifier::DIM);
        }

        let area = frame.area();
        let width = TOAST_WIDTH.min(area.width);
        let rect = Rect::new(area.x + area.width - width, area.y, width, area.height.min(3));
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(notification.message.as_str())
                .style(style)
                .block(Block::default().borders(Borders::ALL).border_style(style)),
            rect,
        );
    }
}

pub fn run(app: &App) -> Result<()> {
    let controller = app.controller_with(RecordingNotifier::new())?;

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut tui = TickTuiApp::new(controller, Some(app));
    let run_result = run_loop(&mut terminal, &mut tui);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn run_loop<B: Backend, T: TaskBackend>(
    terminal: &mut Terminal<B>,
    app: &mut TickTuiApp<'_, T>,
) -> Result<()> {
    app.refresh();
    let mut last_tick = Instant::now();

    loop {
        app.tick(Instant::now());
        terminal
            .draw(|frame| app.render(frame))
            .map_err(|err| std::io::Error::other(err.to_string()))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && app.handle_key(key)
        {
            break;
        }

        if app.needs_refresh {
            app.refresh();
        }

        if last_tick.elapsed() >= TICK_RATE {
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
