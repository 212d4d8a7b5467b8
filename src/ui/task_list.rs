use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::app::{App, ViewMode};
use crate::ui::theme::{source_color, status_color, status_marker};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let visible = app.visible_tasks();

    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let selected = i == app.selected;

            let marker = Span::styled(
                format!("{} ", status_marker(task.status)),
                Style::default().fg(status_color(task.status)),
            );

            let sync_flag = if task.out_of_sync {
                Span::styled("! ", Style::default().fg(ratatui::style::Color::Red))
            } else {
                Span::raw("  ")
            };

            // Truncate title to fit
            let max_title = area.width.saturating_sub(24) as usize;
            let title: String = task.title.chars().take(max_title).collect();
            let title_style = if selected {
                Style::default()
                    .fg(ratatui::style::Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let title_span = Span::styled(title, title_style);

            let key_span = match &task.jira_key {
                Some(key) => Span::styled(
                    format!(" {key}"),
                    Style::default().fg(ratatui::style::Color::Green),
                ),
                None => Span::raw(""),
            };

            let source_span = Span::styled(
                format!(" [{}]", task.source),
                Style::default().fg(source_color(task.source)),
            );

            let line = Line::from(vec![marker, sync_flag, title_span, key_span, source_span]);
            ListItem::new(line)
        })
        .collect();

    let filter_label = match app.view_mode {
        ViewMode::Focus => "focus",
        _ => app.filter.label(),
    };
    let title = if app.loading {
        format!(" Tasks — {filter_label} (loading...) ")
    } else {
        format!(" Tasks — {filter_label} ({}) ", visible.len())
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ratatui::style::Color::Cyan))
            .title(title),
    );

    f.render_widget(list, area);
}
