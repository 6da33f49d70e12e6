//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, Focus};

/// Render the status bar at the bottom of the screen.
///
/// A pending notice replaces the key help until the next key press.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let (dot_color, status_text) = if app.is_connected {
        (theme::SUCCESS, "Connected")
    } else {
        (theme::OFFLINE, "Offline")
    };

    let tail = app.notice.as_deref().map_or_else(
        || {
            let help = match app.focus {
                Focus::Input => "Enter: add | Tab: list | Esc: quit",
                Focus::List => {
                    "Space: toggle | d: delete | J/K: move | f/1-3: filter | c: clear done | Tab: input | q: quit"
                }
            };
            Span::styled(help, theme::dimmed())
        },
        |notice| Span::styled(notice, theme::normal().fg(theme::WARNING)),
    );

    let status_line = Line::from(vec![
        Span::styled(concat!("todo v", env!("CARGO_PKG_VERSION")), theme::bold()),
        Span::raw(" | "),
        Span::styled("●", theme::normal().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
        Span::raw(" | "),
        tail,
    ]);

    let paragraph = Paragraph::new(status_line).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
