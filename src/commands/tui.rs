use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};

use crate::config::Config;
use crate::error::{Result, TaskNerdError};
use crate::model::{self, Task, TaskPatch};
use crate::query::{self, MatchRank, Query};
use crate::store::{NewTask, Store, TaskFilter};
use crate::view::{self, Palette, Row};

const TICK_RATE: Duration = Duration::from_millis(200);
const DELETE_CONFIRM_WINDOW: Duration = Duration::from_secs(3);
const STATUS_TTL: Duration = Duration::from_secs(4);

/// Per-process UI state that feeds the query engine on every draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub query: String,
    pub hide_completed: bool,
    pub selected: Option<u64>,
}

impl Session {
    pub fn query(&self) -> Query {
        Query::new(self.query.clone(), self.hide_completed)
    }
}

/// Single-line text field with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LineInput {
    text: String,
    cursor: usize,
}

impl LineInput {
    fn new(text: impl Into<String>, cursor_at_start: bool) -> Self {
        let text = text.into();
        let cursor = if cursor_at_start {
            0
        } else {
            text.chars().count()
        };
        Self { text, cursor }
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_offset(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len())
    }

    fn handle(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let at = self.byte_offset();
                self.text.insert(at, ch);
                self.cursor += 1;
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                let at = self.byte_offset();
                self.text.remove(at);
            }
            KeyCode::Delete if self.cursor < self.len() => {
                let at = self.byte_offset();
                self.text.remove(at);
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.len(),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Append,
    Prepend,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModalField {
    Title,
    Description,
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Normal,
    Search,
    NewTask {
        input: LineInput,
        after: Option<u64>,
        default_category: Option<String>,
    },
    EditTitle {
        task_id: u64,
        input: LineInput,
    },
    EditModal {
        task_id: u64,
        title: LineInput,
        description: LineInput,
        focus: ModalField,
    },
    /// The database file is missing; ask before creating it.
    CreateStore,
}

/// `d` arms a delete, a second `d` confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKey {
    Idle,
    DeleteConfirm { task_id: u64, armed_at: Instant },
}

#[derive(Debug, Clone)]
struct StatusMessage {
    text: String,
    error: bool,
    shown_at: Instant,
}

pub struct App {
    db_path: PathBuf,
    store: Option<Store>,
    tasks: Vec<Task>,
    session: Session,
    mode: Mode,
    pending: PendingKey,
    status: Option<StatusMessage>,
    config: Config,
    configured_palette: Palette,
    palette: Palette,
    last_index: usize,
}

impl App {
    pub fn new(db_path: &Path, store: Option<Store>, config: Config) -> Self {
        let palette = Palette::from_config(&config);
        let mode = if store.is_some() {
            Mode::Normal
        } else {
            Mode::CreateStore
        };

        let mut app = Self {
            db_path: db_path.to_path_buf(),
            store,
            tasks: Vec::new(),
            session: Session::default(),
            mode,
            pending: PendingKey::Idle,
            status: None,
            config,
            configured_palette: palette,
            palette,
            last_index: 0,
        };
        app.reload();
        app
    }

    fn store(&self) -> Result<&Store> {
        self.store
            .as_ref()
            .ok_or_else(|| TaskNerdError::StoreNotFound(self.db_path.clone()))
    }

    /// Re-read every task from the store.
    fn reload(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        match store.list_tasks(&TaskFilter::default()) {
            Ok(tasks) => self.tasks = tasks,
            Err(err) => self.report(err),
        }
        self.normalize_selection();
    }

    fn visible_ids(&self) -> Vec<u64> {
        query::filter_tasks(&self.tasks, &self.session.query()).task_ids()
    }

    fn selected_task(&self) -> Option<&Task> {
        let id = self.session.selected?;
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Keep the selection on a visible task, falling back to the row at the
    /// previous index when the selected task was filtered out.
    fn normalize_selection(&mut self) {
        let ids = self.visible_ids();
        if ids.is_empty() {
            self.session.selected = None;
            return;
        }
        match self
            .session
            .selected
            .and_then(|id| ids.iter().position(|&v| v == id))
        {
            Some(idx) => self.last_index = idx,
            None => {
                let idx = self.last_index.min(ids.len() - 1);
                self.session.selected = Some(ids[idx]);
                self.last_index = idx;
            }
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let ids = self.visible_ids();
        if ids.is_empty() {
            return;
        }
        let current = self
            .session
            .selected
            .and_then(|id| ids.iter().position(|&v| v == id))
            .unwrap_or(0);
        let next = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta as usize).min(ids.len() - 1)
        };
        self.session.selected = Some(ids[next]);
        self.last_index = next;
    }

    fn select_edge(&mut self, last: bool) {
        let ids = self.visible_ids();
        let picked = if last { ids.last() } else { ids.first() };
        if let Some(&id) = picked {
            self.session.selected = Some(id);
            self.last_index = if last { ids.len() - 1 } else { 0 };
        }
    }

    fn select(&mut self, id: u64) {
        self.session.selected = Some(id);
        self.normalize_selection();
    }

    fn report(&mut self, err: TaskNerdError) {
        log::warn!("command failed: {err}");
        self.status = Some(StatusMessage {
            text: err.to_string(),
            error: true,
            shown_at: Instant::now(),
        });
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            error: false,
            shown_at: Instant::now(),
        });
    }

    /// Expire the delete confirmation and stale status messages.
    pub fn tick_at(&mut self, now: Instant) {
        if let PendingKey::DeleteConfirm { armed_at, .. } = self.pending
            && now.duration_since(armed_at) >= DELETE_CONFIRM_WINDOW
        {
            self.pending = PendingKey::Idle;
            self.status = None;
        }
        if self
            .status
            .as_ref()
            .is_some_and(|s| now.duration_since(s.shown_at) >= STATUS_TTL)
            && self.pending == PendingKey::Idle
        {
            self.status = None;
        }
    }

    /// Dispatch one key event. Returns `true` when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Search => {
                self.handle_search_key(key);
                false
            }
            Mode::NewTask { .. } | Mode::EditTitle { .. } => {
                self.handle_input_key(key);
                false
            }
            Mode::EditModal { .. } => {
                self.handle_modal_key(key);
                false
            }
            Mode::CreateStore => self.handle_create_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        if let PendingKey::DeleteConfirm { task_id, .. } = self.pending {
            self.pending = PendingKey::Idle;
            self.status = None;
            match key.code {
                KeyCode::Char('d') => {
                    self.delete(task_id);
                    return false;
                }
                KeyCode::Esc => return false,
                _ => {}
            }
        }

        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Home | KeyCode::Char('g') => self.select_edge(false),
            KeyCode::End | KeyCode::Char('G') => self.select_edge(true),
            KeyCode::Char('o') => self.start_new_task(),
            KeyCode::Char('a') | KeyCode::Char('i') => self.start_edit(EditKind::Append),
            KeyCode::Char('I') => self.start_edit(EditKind::Prepend),
            KeyCode::Char('s') => self.start_edit(EditKind::Replace),
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit_modal(),
            KeyCode::Char('d') => {
                if let Some(task_id) = self.session.selected {
                    self.pending = PendingKey::DeleteConfirm {
                        task_id,
                        armed_at: Instant::now(),
                    };
                    self.info("Press d again to delete, Esc to cancel");
                }
            }
            KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('/') => {
                self.mode = Mode::Search;
                self.status = None;
            }
            KeyCode::F(1) => {
                self.session.hide_completed = !self.session.hide_completed;
                self.normalize_selection();
            }
            KeyCode::Char('D') => self.toggle_theme(),
            KeyCode::Char('r') => {
                self.reload();
                self.info("Reloaded");
            }
            KeyCode::Esc => {
                if !self.session.query.is_empty() {
                    self.session.query.clear();
                    self.normalize_selection();
                }
            }
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.mode = Mode::Normal,
            KeyCode::Backspace => {
                self.session.query.pop();
                self.normalize_selection();
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.session.query.push(ch);
                self.normalize_selection();
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => {
                let mode = std::mem::replace(&mut self.mode, Mode::Normal);
                match mode {
                    Mode::NewTask {
                        input,
                        after,
                        default_category,
                    } => self.submit_new_task(&input.text, after, default_category),
                    Mode::EditTitle { task_id, input } => self.submit_title(task_id, &input.text),
                    other => self.mode = other,
                }
            }
            _ => match &mut self.mode {
                Mode::NewTask { input, .. } | Mode::EditTitle { input, .. } => input.handle(key),
                _ => {}
            },
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => {
                if let Mode::EditModal {
                    task_id,
                    title,
                    description,
                    ..
                } = std::mem::replace(&mut self.mode, Mode::Normal)
                {
                    let patch = TaskPatch {
                        title: Some(title.text),
                        description: Some(description.text),
                        ..TaskPatch::default()
                    };
                    self.apply_patch(task_id, &patch);
                }
            }
            _ => {
                if let Mode::EditModal {
                    title,
                    description,
                    focus,
                    ..
                } = &mut self.mode
                {
                    match key.code {
                        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                            *focus = match *focus {
                                ModalField::Title => ModalField::Description,
                                ModalField::Description => ModalField::Title,
                            };
                        }
                        _ => match *focus {
                            ModalField::Title => title.handle(key),
                            ModalField::Description => description.handle(key),
                        },
                    }
                }
            }
        }
    }

    fn handle_create_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Enter | KeyCode::Char('y') => {
                match Store::initialize(&self.db_path) {
                    Ok(store) => {
                        self.store = Some(store);
                        self.mode = Mode::Normal;
                        self.reload();
                        self.info(format!("Created {}", self.db_path.display()));
                    }
                    Err(err) => self.report(err),
                }
                false
            }
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('n') => true,
            _ => false,
        }
    }

    fn start_new_task(&mut self) {
        let (after, default_category) = match self.selected_task() {
            Some(task) => (Some(task.id), task.category.clone()),
            None => (None, None),
        };
        self.mode = Mode::NewTask {
            input: LineInput::default(),
            after,
            default_category,
        };
    }

    fn start_edit(&mut self, kind: EditKind) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let input = match kind {
            EditKind::Append => LineInput::new(task.title.clone(), false),
            EditKind::Prepend => LineInput::new(task.title.clone(), true),
            EditKind::Replace => LineInput::default(),
        };
        self.mode = Mode::EditTitle {
            task_id: task.id,
            input,
        };
    }

    fn open_edit_modal(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        self.mode = Mode::EditModal {
            task_id: task.id,
            title: LineInput::new(task.title.clone(), false),
            description: LineInput::new(task.description.clone().unwrap_or_default(), false),
            focus: ModalField::Title,
        };
    }

    /// A `#token` in the text overrides the category inherited from the
    /// selected task. Keeps the input open for the next entry.
    fn submit_new_task(&mut self, text: &str, after: Option<u64>, default_category: Option<String>) {
        if text.trim().is_empty() {
            return;
        }
        let (title, explicit) = model::extract_category(text);
        let new = NewTask {
            title,
            description: None,
            category: explicit.or(default_category),
            after,
        };

        match self.store().and_then(|store| store.insert_task(new)) {
            Ok(task) => {
                self.reload();
                self.select(task.id);
                self.mode = Mode::NewTask {
                    input: LineInput::default(),
                    after: Some(task.id),
                    default_category: task.category,
                };
            }
            Err(err) => self.report(err),
        }
    }

    fn submit_title(&mut self, task_id: u64, text: &str) {
        let patch = TaskPatch {
            title: Some(text.to_string()),
            ..TaskPatch::default()
        };
        self.apply_patch(task_id, &patch);
    }

    fn apply_patch(&mut self, task_id: u64, patch: &TaskPatch) {
        match self.store().and_then(|store| store.update_task(task_id, patch)) {
            Ok(task) => {
                self.reload();
                self.select(task.id);
            }
            Err(err) => self.report(err),
        }
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.session.selected else {
            return;
        };
        match self.store().and_then(|store| store.toggle_task(id)) {
            Ok(_) => self.reload(),
            Err(err) => self.report(err),
        }
    }

    fn delete(&mut self, task_id: u64) {
        let ids = self.visible_ids();
        let next = ids.iter().position(|&id| id == task_id).and_then(|idx| {
            ids.get(idx + 1)
                .or_else(|| idx.checked_sub(1).and_then(|prev| ids.get(prev)))
                .copied()
        });

        match self.store().and_then(|store| store.delete_task(task_id)) {
            Ok(()) => {
                self.session.selected = next;
                self.reload();
                self.info(format!("Deleted task {task_id}"));
            }
            Err(err) => self.report(err),
        }
    }

    fn toggle_theme(&mut self) {
        self.palette = if self.palette.dark {
            Palette::light()
        } else if self.configured_palette.dark {
            self.configured_palette
        } else {
            Palette::dark()
        };
    }

    fn render(&self, frame: &mut Frame) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.render_header(frame, outer[0]);
        self.render_list(frame, outer[1]);
        self.render_bar(frame, outer[2]);

        frame.render_widget(
            Paragraph::new(self.controls_line()).style(Style::default().fg(self.palette.muted)),
            outer[3],
        );

        match &self.mode {
            Mode::CreateStore => self.render_create_prompt(frame),
            Mode::EditModal {
                title,
                description,
                focus,
                ..
            } => self.render_edit_modal(frame, title, description, *focus),
            _ => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let done = self.tasks.iter().filter(|t| t.is_completed()).count();
        let mut spans = vec![
            Span::styled(
                " Task Nerd ",
                Style::default()
                    .fg(self.palette.primary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {} tasks, {} done", self.tasks.len(), done),
                Style::default().fg(self.palette.muted),
            ),
        ];
        if self.session.hide_completed {
            spans.push(Span::styled(
                "  [hiding completed]",
                Style::default().fg(self.palette.warning),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_list(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.palette.muted));

        let task_view = query::filter_tasks(&self.tasks, &self.session.query());
        let rows = view::build_rows(&task_view, &self.config);

        if rows.is_empty() && !matches!(self.mode, Mode::NewTask { .. }) {
            let message = if self.store.is_none() {
                String::new()
            } else if self.tasks.is_empty() {
                "No tasks yet. Press 'o' to add one.".to_string()
            } else {
                format!("No tasks match {:?}.", self.session.query.trim())
            };
            frame.render_widget(
                Paragraph::new(message)
                    .style(Style::default().fg(self.palette.muted))
                    .block(block)
                    .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let mut items = Vec::with_capacity(rows.len() + 1);
        let mut selected = None;

        if let Mode::NewTask {
            input, after: None, ..
        } = &self.mode
        {
            items.push(self.input_item(input, false));
        }

        for row in &rows {
            match row {
                Row::Header(category) => items.push(ListItem::new(Line::from(Span::styled(
                    format!("# {category}"),
                    Style::default()
                        .fg(self.palette.accent)
                        .add_modifier(Modifier::BOLD),
                )))),
                Row::Task(task_row) => {
                    if self.session.selected == Some(task_row.task.id) {
                        selected = Some(items.len());
                    }
                    items.push(self.task_item(task_row));

                    if let Mode::NewTask {
                        input,
                        after: Some(after),
                        ..
                    } = &self.mode
                        && *after == task_row.task.id
                    {
                        items.push(self.input_item(input, task_row.indented));
                    }
                }
            }
        }

        let mut state = ListState::default();
        state.select(selected);

        frame.render_stateful_widget(
            List::new(items)
                .block(block)
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol("❯ "),
            area,
            &mut state,
        );
    }

    fn task_item(&self, row: &view::TaskRow<'_>) -> ListItem<'static> {
        let task = row.task;
        let indent = if row.indented { "  " } else { "" };
        let title = match &self.mode {
            Mode::EditTitle { task_id, input } if *task_id == task.id => input.text.clone(),
            _ => task.title.clone(),
        };

        let mut title_style = Style::default().fg(self.palette.foreground);
        if task.is_completed() {
            title_style = title_style
                .fg(self.palette.muted)
                .add_modifier(Modifier::CROSSED_OUT);
        }

        let mut spans = vec![
            Span::raw(indent),
            Span::styled(
                format!("{} ", view::status_marker(task.status)),
                Style::default().fg(if task.is_completed() {
                    self.palette.success
                } else {
                    self.palette.primary
                }),
            ),
            Span::styled(title, title_style),
        ];
        if let Some(date) = &row.completed_on {
            spans.push(Span::styled(
                format!("  {date}"),
                Style::default().fg(self.palette.muted),
            ));
        }
        if row.rank == MatchRank::Description {
            spans.push(Span::styled(
                "  (matched in description)",
                Style::default()
                    .fg(self.palette.muted)
                    .add_modifier(Modifier::ITALIC),
            ));
        }

        let mut lines = vec![Line::from(spans)];
        if let Some(preview) = row.preview {
            lines.push(Line::from(Span::styled(
                format!("{indent}    {preview}"),
                Style::default()
                    .fg(self.palette.muted)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
        ListItem::new(lines)
    }

    fn input_item(&self, input: &LineInput, indented: bool) -> ListItem<'static> {
        let indent = if indented { "  " } else { "" };
        ListItem::new(Line::from(vec![
            Span::raw(indent),
            Span::styled("[ ] ", Style::default().fg(self.palette.primary)),
            Span::styled(
                format!("{}▏", input.text),
                Style::default().fg(self.palette.primary),
            ),
        ]))
    }

    /// Bottom bar: the active text input, or the status message, or the
    /// current filter.
    fn render_bar(&self, frame: &mut Frame, area: Rect) {
        let (prefix, input) = match &self.mode {
            Mode::Search => {
                let input = LineInput::new(self.session.query.clone(), false);
                ("/", Some(input))
            }
            Mode::NewTask { input, .. } => ("new: ", Some(input.clone())),
            Mode::EditTitle { input, .. } => ("edit: ", Some(input.clone())),
            _ => ("", None),
        };

        if let Some(input) = input {
            frame.render_widget(
                Paragraph::new(format!("{prefix}{}", input.text))
                    .style(Style::default().fg(self.palette.primary)),
                area,
            );
            let x = area.x + (prefix.chars().count() + input.cursor) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let line = match &self.status {
            Some(status) => Span::styled(
                status.text.clone(),
                Style::default().fg(if status.error {
                    self.palette.error
                } else {
                    self.palette.warning
                }),
            ),
            None if !self.session.query.is_empty() => Span::styled(
                format!("/{}", self.session.query),
                Style::default().fg(self.palette.warning),
            ),
            None => Span::raw(""),
        };
        frame.render_widget(Paragraph::new(Line::from(line)), area);
    }

    fn controls_line(&self) -> String {
        match &self.mode {
            Mode::Normal => {
                let hide = if self.session.hide_completed {
                    "F1 show done"
                } else {
                    "F1 hide done"
                };
                format!(
                    "j/k move | o add | a/i/I/s edit | e details | space done | dd delete | / search | {hide} | D theme | r reload | q quit"
                )
            }
            Mode::Search => "type to filter | Enter/Esc close (filter stays)".to_string(),
            Mode::NewTask { .. } => "Enter add | Esc cancel | #word sets category".to_string(),
            Mode::EditTitle { .. } => "Enter save | Esc cancel".to_string(),
            Mode::EditModal { .. } => "Enter save | Tab switch field | Esc cancel".to_string(),
            Mode::CreateStore => "Enter create | Esc exit".to_string(),
        }
    }

    fn render_create_prompt(&self, frame: &mut Frame) {
        let popup = centered_rect(60, 40, frame.area());
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(format!(
                "No tasks database was found. Would you like to create one?\n\n\
                 Path: {}\n\n\
                 [Enter] Create database    [Esc] Exit",
                self.db_path.display()
            ))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.palette.primary))
                    .title("Database Not Found"),
            )
            .wrap(Wrap { trim: true }),
            popup,
        );
    }

    fn render_edit_modal(
        &self,
        frame: &mut Frame,
        title: &LineInput,
        description: &LineInput,
        focus: ModalField,
    ) {
        let popup = centered_rect(70, 40, frame.area());
        frame.render_widget(Clear, popup);

        let label = Style::default().fg(self.palette.muted);
        let value = Style::default().fg(self.palette.foreground);
        let lines = vec![
            Line::from(Span::styled("Title:", label)),
            Line::from(Span::styled(title.text.clone(), value)),
            Line::from(Span::styled("Description:", label)),
            Line::from(Span::styled(description.text.clone(), value)),
            Line::from(""),
            Line::from(Span::styled(
                "[Enter] Save    [Tab] Switch field    [Esc] Cancel",
                label,
            )),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.palette.primary))
            .title("Edit Task");
        let inner = block.inner(popup);
        frame.render_widget(Paragraph::new(lines).block(block), popup);

        let (input, row) = match focus {
            ModalField::Title => (title, 1),
            ModalField::Description => (description, 3),
        };
        let x = inner.x + input.cursor.min(inner.width.saturating_sub(1) as usize) as u16;
        frame.set_cursor_position((x, inner.y + row));
    }
}

/// Launch the TUI. A missing database is offered for creation; any other
/// open failure is returned before the terminal is touched.
pub fn run(db_path: &Path, config: Config) -> Result<()> {
    let store = match Store::open(db_path) {
        Ok(store) => Some(store),
        Err(TaskNerdError::StoreNotFound(_)) => None,
        Err(err) => return Err(err),
    };
    let mut app = App::new(db_path, store, config);
    run_tui(&mut app)
}

fn run_tui(app: &mut App) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal
            .draw(|frame| app.render(frame))
            .map_err(|err| std::io::Error::other(err.to_string()))?;

        if event::poll(TICK_RATE)?
            && let Event::Key(key) = event::read()?
            && app.handle_key(key)
        {
            break;
        }

        app.tick_at(Instant::now());
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
