//! New-task input box.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::theme;
use crate::app::{App, Focus};

/// Render the input line, drawing a block cursor when focused.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == Focus::Input;

    let line = if app.input.is_empty() && !is_focused {
        Line::from(Span::styled("What needs to be done?", theme::dimmed()))
    } else if is_focused {
        let (before, after): (String, String) = {
            let mut chars = app.input.chars();
            let before = chars.by_ref().take(app.cursor_position).collect();
            (before, chars.collect())
        };
        Line::from(vec![
            Span::styled(before, theme::normal()),
            Span::styled("█", theme::normal()),
            Span::styled(after, theme::normal()),
        ])
    } else {
        Line::from(Span::styled(app.input.as_str(), theme::normal()))
    };

    let block = Block::default()
        .title("New task")
        .borders(Borders::ALL)
        .border_style(theme::border(is_focused));

    frame.render_widget(Paragraph::new(line).block(block), area);
}
