use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{prelude::*, widgets::*};
use std::collections::HashMap;
use std::{io, sync::Arc, time::Duration};

use chrono::Local;
use log::info;
use tokio::runtime::Handle;

use crate::app::add_form::{get_add_form_ui, AddForm};
use crate::app::camera::Camera;
use crate::app::filter::{remaining_heading, visible_tasks, Filter};
use crate::app::geolocation::{Geolocator, PendingAdds};
use crate::app::models::TaskId;
use crate::app::photo_modal::{get_photo_modal_ui, PhotoModal};
use crate::app::photo_viewer::PhotoViewer;
use crate::app::store::{TaskActions, TaskStore};
use crate::app::task_edit::{get_task_edit_ui, EditState};
use crate::app::task_list::*;

// UI state of one task row: its edit mode and its photo modal
#[derive(Debug, Default)]
pub struct TaskRow {
    pub edit: EditState,
    pub photo: PhotoModal,
}

pub struct App {
    pub store: TaskStore,
    pub filter: Filter,
    pub list: TaskList,
    pub rows: HashMap<TaskId, TaskRow>,
    pub add_form: AddForm,
    pub pending: PendingAdds,
    camera: Box<dyn Camera>,
    viewer: Box<dyn PhotoViewer>,
}

impl App {
    pub fn new(
        store: TaskStore,
        geolocator: Arc<dyn Geolocator>,
        geolocation_timeout: Duration,
        camera: Box<dyn Camera>,
        viewer: Box<dyn PhotoViewer>,
        runtime: Handle,
    ) -> App {
        App {
            store,
            filter: Filter::default(),
            list: TaskList::default(),
            rows: HashMap::new(),
            add_form: AddForm::default(),
            pending: PendingAdds::new(geolocator, geolocation_timeout, runtime),
            camera,
            viewer,
        }
    }

    // Id of the task under the list selection
    pub fn selected_id(&self) -> Option<TaskId> {
        let visible = visible_tasks(self.store.tasks(), self.filter);
        self.list.selected_id(&visible)
    }

    fn visible_len(&self) -> usize {
        visible_tasks(self.store.tasks(), self.filter).len()
    }

    // Put the selection back on the given task after the list was re-derived
    fn reselect(&mut self, id: &TaskId) {
        let visible = visible_tasks(self.store.tasks(), self.filter);
        match visible.iter().position(|task| &task.id == id) {
            Some(i) => self.list.state.select(Some(i)),
            None => self.list.clamp(visible.len()),
        }
    }

    // Commit the additions whose position lookup has finished
    pub fn on_tick(&mut self) {
        for (name, location) in self.pending.drain_ready() {
            self.store.add(&name, location);
        }
    }

    // Commit every addition before exit, without location if its lookup is still running
    pub fn flush_pending(&mut self) {
        let pending = self.pending.drain_all();
        if !pending.is_empty() {
            info!(
                "event=task_add_flush module=ui status=ok count={}",
                pending.len()
            );
        }
        for (name, location) in pending {
            self.store.add(&name, location);
        }
    }

    /// Handles one key press and returns `true` when the app should quit.
    ///
    /// Input goes to the first of: the add form, the photo modal of the
    /// selected row, the edit form of the selected row, the list.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.add_form.active {
            self.handle_add_form_key(code);
            return false;
        }

        if let Some(id) = self.selected_id() {
            if let Some(row) = self.rows.get_mut(&id) {
                if row.photo.is_open() {
                    match code {
                        KeyCode::Enter => row.photo.save(&id, &mut self.store),
                        KeyCode::Esc => row.photo.close(),
                        _ => {}
                    }
                    return false;
                }
                if row.edit.is_editing() {
                    self.handle_edit_key(&id, code);
                    return false;
                }
            }
        }

        self.handle_list_key(code)
    }

    fn handle_add_form_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                if let Some(name) = self.add_form.submit() {
                    info!("event=task_add_requested module=ui status=ok");
                    self.pending.request(name);
                }
            }
            KeyCode::Esc => self.add_form.cancel(),
            KeyCode::Backspace => self.add_form.delete_char(),
            KeyCode::Char(to_insert) => self.add_form.input(to_insert),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, id: &TaskId, code: KeyCode) {
        let Some(row) = self.rows.get_mut(id) else {
            return;
        };
        match code {
            KeyCode::Enter => {
                row.edit.save(id, &mut self.store);
                self.reselect(id);
            }
            KeyCode::Esc => row.edit.cancel(),
            _ => {
                let Some(draft) = row.edit.draft_mut() else {
                    return;
                };
                match code {
                    KeyCode::Down => draft.move_cursor_down(),
                    KeyCode::Up => draft.move_cursor_up(),
                    KeyCode::Left => draft.move_cursor_left(),
                    KeyCode::Right => draft.move_cursor_right(),
                    KeyCode::Backspace => draft.delete_char(),
                    KeyCode::Char(to_insert) => draft.input(to_insert),
                    _ => {}
                }
            }
        }
    }

    fn handle_list_key(&mut self, code: KeyCode) -> bool {
        let selected = self.selected_id();
        match code {
            KeyCode::Char('q') => {
                self.flush_pending();
                return true;
            }
            KeyCode::Char('a') => self.add_form.open(),
            KeyCode::Down => self.list.next(self.visible_len()),
            KeyCode::Up => self.list.previous(self.visible_len()),
            KeyCode::Left => self.list.unselect(),
            KeyCode::Tab => self.set_filter(self.filter.next()),
            KeyCode::BackTab => self.set_filter(self.filter.previous()),
            KeyCode::Char('1') => self.set_filter(Filter::All),
            KeyCode::Char('2') => self.set_filter(Filter::Active),
            KeyCode::Char('3') => self.set_filter(Filter::Completed),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(id) = selected {
                    self.store.toggle_completed(&id);
                    self.reselect(&id);
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(id) = selected {
                    self.store.delete(&id);
                    // Dropping the row also releases a camera it may hold
                    self.rows.remove(&id);
                    self.list.clamp(self.visible_len());
                }
            }
            KeyCode::Char('e') => {
                if let Some(task) = selected.and_then(|id| self.store.get(&id)) {
                    self.rows.entry(task.id.clone()).or_default().edit.start(task);
                }
            }
            KeyCode::Char('p') => {
                if let Some(id) = selected {
                    self.rows
                        .entry(id)
                        .or_default()
                        .photo
                        .open_camera(self.camera.as_ref());
                }
            }
            KeyCode::Char('v') => {
                if let Some(task) = selected.and_then(|id| self.store.get(&id)) {
                    self.rows
                        .entry(task.id.clone())
                        .or_default()
                        .photo
                        .view_photo(task, self.viewer.as_ref());
                }
            }
            _ => {}
        }
        false
    }

    fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.list.clamp(self.visible_len());
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    loop {
        app.on_tick();
        terminal.draw(|f| draw_ui(f, &mut app))?;

        if crossterm::event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key.code) {
                    info!("event=app_exit module=ui status=ok");
                    return Ok(());
                }
            }
        }
    }
}

// Draws the whole user interface
fn draw_ui(f: &mut Frame, app: &mut App) {
    // Filter bar, add form, then the list and side panel
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(f.size());

    // DRAW FILTER BAR
    let filters = Tabs::new(Filter::ALL.iter().map(|filter| filter.name()).collect::<Vec<_>>())
        .block(Block::default().borders(Borders::ALL).title("TodoMatic"))
        .select(app.filter.index())
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(filters, rows[0]);

    // DRAW ADD FORM
    let add_form = Paragraph::new(get_add_form_ui(&app.add_form, app.pending.len())).block(
        Block::default()
            .borders(Borders::ALL)
            .title("What needs to be done?"),
    );
    f.render_widget(add_form, rows[1]);

    // Create two chunks of screen in 60-40 ratio
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[2]);

    let visible = visible_tasks(app.store.tasks(), app.filter);
    let selected = app.list.selected_id(&visible);

    // DRAW LEFT PART
    // Create a List from the visible tasks and highlight the currently selected one
    let task_list = List::new(get_list_items_ui(&visible))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(remaining_heading(visible.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(task_list, chunks[0], &mut app.list.state);

    // DRAW RIGHT PART
    let selected_row = selected
        .as_ref()
        .and_then(|id| app.rows.get(id).map(|row| (id, row)));
    let draft = selected_row.and_then(|(_, row)| row.edit.draft());

    if let Some(draft) = draft {
        let edit_task = Paragraph::new(get_task_edit_ui(draft))
            .block(Block::new().title("Edit Task").borders(Borders::ALL))
            .style(Style::new().white());

        f.render_widget(edit_task, chunks[1]);
    } else {
        // If not editing, display statistics and instructions in vertically split layout
        let right_side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        let instructions = Paragraph::new(get_instructions_ui())
            .block(Block::new().title("Commands").borders(Borders::ALL))
            .style(Style::new().white());

        let statistics = Statistics::from_tasks(app.store.tasks(), Local::now().date_naive());
        let statistics = Paragraph::new(get_statistics_ui(&statistics))
            .block(Block::new().title("Statistics").borders(Borders::ALL))
            .style(Style::new().white());

        f.render_widget(instructions, right_side[0]);
        f.render_widget(statistics, right_side[1]);
    }

    // DRAW PHOTO MODAL on top of everything else
    if let Some((id, row)) = selected_row {
        if let (true, Some(task)) = (row.photo.is_open(), app.store.get(id)) {
            let title = match row.photo {
                PhotoModal::CameraOpen(_) => "Take Photo",
                _ => "Photo",
            };
            let area = centered_rect(50, 40, f.size());
            let modal = Paragraph::new(get_photo_modal_ui(&row.photo, task))
                .block(Block::new().title(title).borders(Borders::ALL))
                .style(Style::new().white());
            f.render_widget(Clear, area);
            f.render_widget(modal, area);
        }
    }
}

// Rectangle of the given size (in percent) in the middle of `area`
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
