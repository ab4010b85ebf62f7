use crate::backend::{Credentials, Registration, TaskBackend};
use crate::model::{Statistics, Task, TaskFilter, TaskId};
use crate::theme::Theme;
use crate::tui::action::Action;
use crate::view_model::TaskViewModel;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum InputMode {
    Normal,
    Creating,
    Searching,
    EditingTitle,
    EditingDescription,
    AuthUsername,
    AuthEmail,
    AuthPassword,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum AuthKind {
    Login,
    Register,
}

/// What the UI loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Send(Action),
    ToggleTheme,
    Quit,
}

#[derive(Debug, Clone)]
struct AuthForm {
    kind: AuthKind,
    username: String,
    email: String,
}

pub struct AppState {
    pub view: Vec<Task>,
    pub stats: Statistics,
    pub filter: TaskFilter,
    pub list_state: ListState,
    pub message: String,
    pub loading: bool,
    pub mode: InputMode,
    pub input_buffer: String,
    pub cursor_position: usize,
    pub editing_id: Option<TaskId>,
    pub username: Option<String>,
    pub theme: Theme,
    auth: AuthForm,
}

impl AppState {
    pub fn new(theme: Theme) -> Self {
        let mut l_state = ListState::default();
        l_state.select(Some(0));
        Self {
            view: vec![],
            stats: Statistics::default(),
            filter: TaskFilter::default(),
            list_state: l_state,
            message: "l: Login | r: Register | q: Quit".to_string(),
            loading: false,
            mode: InputMode::Normal,
            input_buffer: String::new(),
            cursor_position: 0,
            editing_id: None,
            username: None,
            theme,
            auth: AuthForm {
                kind: AuthKind::Login,
                username: String::new(),
                email: String::new(),
            },
        }
    }

    pub fn logged_in(&self) -> bool {
        self.username.is_some()
    }

    pub fn auth_kind(&self) -> AuthKind {
        self.auth.kind
    }

    /// Pulls the current filtered view and statistics out of the model.
    pub fn refresh<B: TaskBackend>(&mut self, model: &TaskViewModel<B>) {
        self.view = model.filtered_view(&self.filter);
        self.stats = model.statistics();
        self.loading = model.is_loading();
        self.clamp_selection();
    }

    pub fn clear_session(&mut self) {
        self.username = None;
        self.view.clear();
        self.stats = Statistics::default();
        self.filter = TaskFilter::default();
        self.loading = false;
        self.mode = InputMode::Normal;
        self.reset_input();
        self.list_state.select(Some(0));
    }

    fn clamp_selection(&mut self) {
        let sel = self.list_state.selected().unwrap_or(0);
        if self.view.is_empty() {
            self.list_state.select(Some(0));
        } else if sel >= self.view.len() {
            self.list_state.select(Some(self.view.len() - 1));
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.list_state.selected().and_then(|i| self.view.get(i))
    }

    // --- Input buffer editing ---

    fn byte_index(&self) -> usize {
        self.input_buffer
            .char_indices()
            .map(|(i, _)| i)
            .nth(self.cursor_position)
            .unwrap_or(self.input_buffer.len())
    }
    pub fn move_cursor_left(&mut self) {
        let cursor_moved_left = self.cursor_position.saturating_sub(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_left);
    }
    pub fn move_cursor_right(&mut self) {
        let cursor_moved_right = self.cursor_position.saturating_add(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_right);
    }
    pub fn enter_char(&mut self, new_char: char) {
        let idx = self.byte_index();
        self.input_buffer.insert(idx, new_char);
        self.move_cursor_right();
    }
    pub fn delete_char(&mut self) {
        if self.cursor_position != 0 {
            let current_index = self.cursor_position;
            let before = self.input_buffer.chars().take(current_index - 1);
            let after = self.input_buffer.chars().skip(current_index);
            self.input_buffer = before.chain(after).collect();
            self.move_cursor_left();
        }
    }
    pub fn reset_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }
    fn set_input(&mut self, text: &str) {
        self.input_buffer = text.to_string();
        self.cursor_position = self.input_buffer.chars().count();
    }
    fn clamp_cursor(&self, new_cursor_pos: usize) -> usize {
        new_cursor_pos.clamp(0, self.input_buffer.chars().count())
    }

    // --- Navigation ---

    pub fn next(&mut self) {
        let len = self.view.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }
    pub fn previous(&mut self) {
        let len = self.view.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }
    pub fn jump_forward(&mut self, step: usize) {
        if self.view.is_empty() {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0);
        let new_index = (current + step).min(self.view.len() - 1);
        self.list_state.select(Some(new_index));
    }
    pub fn jump_backward(&mut self, step: usize) {
        if self.view.is_empty() {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some(current.saturating_sub(step)));
    }

    // --- Key handling ---

    pub fn on_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Command::Quit);
        }
        match self.mode {
            InputMode::Normal if self.logged_in() => self.on_task_key(key),
            InputMode::Normal => self.on_welcome_key(key),
            _ => self.on_input_key(key),
        }
    }

    fn on_welcome_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Char('q') => Some(Command::Quit),
            KeyCode::Char('t') => Some(Command::ToggleTheme),
            KeyCode::Char('l') => {
                self.begin_auth(AuthKind::Login);
                None
            }
            KeyCode::Char('r') => {
                self.begin_auth(AuthKind::Register);
                None
            }
            _ => None,
        }
    }

    fn begin_auth(&mut self, kind: AuthKind) {
        self.auth = AuthForm {
            kind,
            username: String::new(),
            email: String::new(),
        };
        self.reset_input();
        self.mode = InputMode::AuthUsername;
    }

    fn on_task_key(&mut self, key: KeyEvent) -> Option<Command> {
        let selected = self.selected_task().cloned();
        match key.code {
            KeyCode::Char('q') => Some(Command::Quit),
            KeyCode::Char('t') => Some(Command::ToggleTheme),
            KeyCode::Char('L') => Some(Command::Send(Action::Logout)),
            KeyCode::Char('R') => Some(Command::Send(Action::Reload)),
            KeyCode::Char('a') => {
                self.reset_input();
                self.mode = InputMode::Creating;
                self.message = "Example: Buy milk !high // 2 litres".to_string();
                None
            }
            KeyCode::Char('/') => {
                self.set_input(&self.filter.query.clone());
                self.mode = InputMode::Searching;
                None
            }
            KeyCode::Tab | KeyCode::Char('f') => {
                self.filter.status = self.filter.status.next();
                self.message = format!("Showing {} tasks", self.filter.status);
                None
            }
            KeyCode::Esc => {
                self.filter.query.clear();
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.next();
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.previous();
                None
            }
            KeyCode::PageDown => {
                self.jump_forward(10);
                None
            }
            KeyCode::PageUp => {
                self.jump_backward(10);
                None
            }
            KeyCode::Char(' ') => selected.map(|t| Command::Send(Action::ToggleTask(t.id))),
            KeyCode::Char('d') => selected.map(|t| Command::Send(Action::DeleteTask(t.id))),
            KeyCode::Char('+') => selected.and_then(|t| {
                let raised = t.priority.raised();
                (raised != t.priority).then(|| Command::Send(Action::SetPriority(t.id, raised)))
            }),
            KeyCode::Char('-') => selected.and_then(|t| {
                let lowered = t.priority.lowered();
                (lowered != t.priority).then(|| Command::Send(Action::SetPriority(t.id, lowered)))
            }),
            KeyCode::Char('e') => {
                if let Some(t) = selected {
                    self.editing_id = Some(t.id);
                    self.set_input(&t.title);
                    self.mode = InputMode::EditingTitle;
                }
                None
            }
            KeyCode::Char('E') => {
                if let Some(t) = selected {
                    self.editing_id = Some(t.id);
                    self.set_input(t.description.as_deref().unwrap_or(""));
                    self.mode = InputMode::EditingDescription;
                }
                None
            }
            _ => None,
        }
    }

    fn on_input_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Enter => self.submit_input(),
            KeyCode::Esc => {
                if self.mode == InputMode::Searching {
                    self.filter.query.clear();
                }
                self.mode = InputMode::Normal;
                self.editing_id = None;
                self.reset_input();
                None
            }
            KeyCode::Char(c) => {
                self.enter_char(c);
                self.sync_search();
                None
            }
            KeyCode::Backspace => {
                self.delete_char();
                self.sync_search();
                None
            }
            KeyCode::Left => {
                self.move_cursor_left();
                None
            }
            KeyCode::Right => {
                self.move_cursor_right();
                None
            }
            _ => None,
        }
    }

    fn sync_search(&mut self) {
        if self.mode == InputMode::Searching {
            self.filter.query = self.input_buffer.clone();
        }
    }

    fn submit_input(&mut self) -> Option<Command> {
        let text = self.input_buffer.clone();
        self.reset_input();
        match self.mode {
            InputMode::Searching => {
                self.mode = InputMode::Normal;
                None
            }
            InputMode::Creating => {
                self.mode = InputMode::Normal;
                Some(Command::Send(Action::CreateTask(text)))
            }
            InputMode::EditingTitle => {
                self.mode = InputMode::Normal;
                self.editing_id
                    .take()
                    .map(|id| Command::Send(Action::EditTitle(id, text)))
            }
            InputMode::EditingDescription => {
                self.mode = InputMode::Normal;
                self.editing_id
                    .take()
                    .map(|id| Command::Send(Action::EditDescription(id, text)))
            }
            InputMode::AuthUsername => {
                self.auth.username = text;
                self.mode = match self.auth.kind {
                    AuthKind::Login => InputMode::AuthPassword,
                    AuthKind::Register => InputMode::AuthEmail,
                };
                None
            }
            InputMode::AuthEmail => {
                self.auth.email = text;
                self.mode = InputMode::AuthPassword;
                None
            }
            InputMode::AuthPassword => {
                self.mode = InputMode::Normal;
                self.message = "Signing in...".to_string();
                let username = std::mem::take(&mut self.auth.username);
                let action = match self.auth.kind {
                    AuthKind::Login => Action::Login(Credentials::new(username, text)),
                    AuthKind::Register => Action::Register(Registration {
                        username,
                        email: std::mem::take(&mut self.auth.email),
                        password: text,
                    }),
                };
                Some(Command::Send(action))
            }
            InputMode::Normal => None,
        }
    }
}
