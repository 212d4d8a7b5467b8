use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, ViewMode};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    if app.confirm_clear {
        spans.push(Span::styled(
            " Delete ALL tasks? y:confirm  any other key:cancel ",
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(ratatui::style::Color::Red),
        ));
    } else {
        match &app.view_mode {
            ViewMode::Dashboard | ViewMode::Focus => {
                spans.push(hint("↑↓", "navigate"));
                spans.push(hint("s", "send"));
                spans.push(hint("a", "assign"));
                spans.push(hint("d", "decline"));
                spans.push(hint("u", "restore"));
                spans.push(hint("x", "delete"));
                spans.push(hint("n", "new"));
                spans.push(hint("tab", "filter"));
                spans.push(hint("f", "focus"));
                spans.push(hint("r", "refresh"));
                spans.push(hint("C", "clear all"));
                spans.push(hint("q", "quit"));
            }
            ViewMode::Capture => {
                spans.push(hint("tab/↑↓", "field"));
                spans.push(hint("enter", "save"));
                spans.push(hint("esc", "discard"));
            }
            ViewMode::Assign => {
                spans.push(hint("↑↓", "navigate"));
                spans.push(hint("enter", "send"));
                spans.push(hint("esc", "back"));
            }
        }

        // Filter indicator
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!(" {} ", app.filter.label().to_uppercase()),
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(ratatui::style::Color::DarkGray),
        ));
    }

    // Flash message
    if let Some((msg, _)) = &app.flash_message {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            msg.clone(),
            Style::default().fg(ratatui::style::Color::Yellow),
        ));
    }

    let line = Line::from(spans);
    let paragraph = Paragraph::new(line);
    f.render_widget(paragraph, area);
}

fn hint(key: &str, desc: &str) -> Span<'static> {
    Span::styled(
        format!(" {key}:{desc} "),
        Style::default().fg(ratatui::style::Color::DarkGray),
    )
}
