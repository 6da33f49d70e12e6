//! Application state and key handling.
//!
//! [`App::handle_key_event`] never talks to the network itself: gestures
//! that change remote state come back as a [`NetCommand`] for the main loop
//! to forward. Gestures that only affect the local view (selection, filter,
//! manual reorder) are applied directly.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use todo_proto::task::{MutationFailure, Task};

use crate::net::NetCommand;
use crate::tasks::{Filter, OrderReconciler, mutation};

/// Which panel receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The new-task input line (default).
    Input,
    /// The task list.
    List,
}

/// Main application state.
pub struct App {
    /// Current text in the new-task input.
    pub input: String,
    /// Cursor position in `input`, in characters.
    pub cursor_position: usize,
    /// Which panel is focused.
    pub focus: Focus,
    /// The ordered, filtered task view.
    pub tasks: OrderReconciler,
    /// Selected row among the visible tasks.
    pub selected: usize,
    /// One-line message shown in the status bar.
    pub notice: Option<String>,
    /// Whether the feed is live.
    pub is_connected: bool,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Title limit applied before a create is sent.
    pub max_title_len: usize,
}

impl App {
    /// Create an empty, offline application.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(Filter::All, todo_proto::task::MAX_TITLE_LENGTH)
    }

    /// Create an application with a starting filter and title limit.
    #[must_use]
    pub const fn with_settings(filter: Filter, max_title_len: usize) -> Self {
        Self {
            input: String::new(),
            cursor_position: 0,
            focus: Focus::Input,
            tasks: OrderReconciler::with_filter(filter),
            selected: 0,
            notice: None,
            is_connected: false,
            should_quit: false,
            max_title_len,
        }
    }

    /// Reconcile the view against a fresh snapshot.
    pub fn apply_snapshot(&mut self, tasks: &[Task]) {
        self.tasks.on_snapshot(tasks);
        self.clamp_selection();
    }

    pub fn set_connection_status(&mut self, connected: bool) {
        self.is_connected = connected;
        if !connected {
            self.push_notice("Disconnected from server");
        }
    }

    /// Show a one-line notice in the status bar.
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
    }

    /// Report a mutation the store rejected.
    pub fn mutation_failed(&mut self, failure: &MutationFailure) {
        self.push_notice(format!("Request failed: {failure}"));
    }

    /// The task under the selection, if any row is visible.
    #[must_use]
    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.visible_at(self.selected)
    }

    /// Footer text, e.g. `"1 item left"`.
    #[must_use]
    pub fn items_left_label(&self) -> String {
        let n = self.tasks.items_left();
        if n == 1 {
            "1 item left".to_string()
        } else {
            format!("{n} items left")
        }
    }

    /// Handle a key event, returning a command to send if the key asked for one.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<NetCommand> {
        self.notice = None;

        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => {
                self.should_quit = true;
                return None;
            }
            (KeyCode::Tab | KeyCode::BackTab, _) => {
                self.toggle_focus();
                return None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Input => self.handle_input_key(key),
            Focus::List => self.handle_list_key(key),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        match key.code {
            KeyCode::Enter => return self.submit_task(),
            KeyCode::Char(c) => self.enter_char(c),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Left => self.cursor_position = self.cursor_position.saturating_sub(1),
            KeyCode::Right => {
                self.cursor_position = (self.cursor_position + 1).min(self.input.chars().count());
            }
            KeyCode::Home => self.cursor_position = 0,
            KeyCode::End => self.cursor_position = self.input.chars().count(),
            _ => {}
        }
        None
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Option<NetCommand> {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Char('K') => self.move_selected_up(),
            KeyCode::Char('J') => self.move_selected_down(),
            KeyCode::Char(' ') | KeyCode::Enter => {
                return self
                    .selected_task()
                    .map(|t| NetCommand::Mutate(mutation::toggle_task(t)));
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                return self
                    .selected_task()
                    .map(|t| NetCommand::Mutate(mutation::delete_task(&t.id)));
            }
            KeyCode::Char('c') => {
                if self.tasks.completed_count() == 0 {
                    self.push_notice("No completed tasks");
                    return None;
                }
                return Some(NetCommand::Mutate(mutation::clear_completed()));
            }
            KeyCode::Char('f') => self.set_filter(self.tasks.filter().next()),
            KeyCode::Char('1') => self.set_filter(Filter::All),
            KeyCode::Char('2') => self.set_filter(Filter::Active),
            KeyCode::Char('3') => self.set_filter(Filter::Completed),
            _ => {}
        }
        None
    }

    const fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::List,
            Focus::List => Focus::Input,
        };
    }

    /// Validate the input line and turn it into a create request.
    fn submit_task(&mut self) -> Option<NetCommand> {
        match mutation::create_task(&self.input, self.max_title_len) {
            Ok(m) => {
                self.input.clear();
                self.cursor_position = 0;
                Some(NetCommand::Mutate(m))
            }
            Err(e) => {
                self.push_notice(e.to_string());
                None
            }
        }
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn enter_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor_position);
        self.input.insert(at, c);
        self.cursor_position += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            let at = self.byte_offset(self.cursor_position - 1);
            self.input.remove(at);
            self.cursor_position -= 1;
        }
    }

    const fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn select_next(&mut self) {
        if self.selected + 1 < self.tasks.visible_len() {
            self.selected += 1;
        }
    }

    fn move_selected_up(&mut self) {
        if self.selected == 0 {
            return;
        }
        match self.tasks.move_visible(self.selected, self.selected - 1) {
            Ok(()) => self.selected -= 1,
            Err(e) => self.push_notice(e.to_string()),
        }
    }

    fn move_selected_down(&mut self) {
        if self.selected + 1 >= self.tasks.visible_len() {
            return;
        }
        match self.tasks.move_visible(self.selected, self.selected + 1) {
            Ok(()) => self.selected += 1,
            Err(e) => self.push_notice(e.to_string()),
        }
    }

    fn set_filter(&mut self, filter: Filter) {
        self.tasks.set_filter(filter);
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = self.tasks.visible_len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
