//! Task list and footer.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs},
};

use super::theme;
use crate::app::{App, Focus};
use crate::tasks::Filter;

/// Render the filtered list in the local order, with the footer below it.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    render_list(frame, chunks[0], app);
    render_footer(frame, chunks[1], app);
}

fn render_list(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == Focus::List;

    let items: Vec<ListItem> = app
        .tasks
        .visible()
        .map(|task| {
            let (checkbox, style) = if task.completed {
                ("[✓]", theme::completed())
            } else {
                ("[ ]", theme::normal())
            };
            ListItem::new(Line::from(vec![
                Span::styled(checkbox, style),
                Span::raw(" "),
                Span::styled(task.title.as_str(), style),
            ]))
        })
        .collect();

    let block = Block::default()
        .title(Span::styled("Todos", theme::panel_title(theme::TASKS_TITLE)))
        .borders(Borders::ALL)
        .border_style(theme::border(is_focused));

    if items.is_empty() {
        let hint = if app.tasks.is_empty() {
            "Nothing to do yet"
        } else {
            "No tasks match this filter"
        };
        let paragraph = Paragraph::new(Span::styled(hint, theme::dimmed())).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::selected());
    let mut state = ListState::default().with_selected(is_focused.then_some(app.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(16), Constraint::Min(10)])
        .split(area);

    let left = Paragraph::new(Span::styled(app.items_left_label(), theme::dimmed()));
    frame.render_widget(left, chunks[0]);

    let active = app.tasks.filter();
    let selected = Filter::ALL.iter().position(|f| *f == active).unwrap_or(0);
    let tabs = Tabs::new(Filter::ALL.iter().map(|f| f.label()))
        .select(selected)
        .style(theme::dimmed())
        .highlight_style(theme::highlighted());
    frame.render_widget(tabs, chunks[1]);
}
