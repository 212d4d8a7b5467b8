use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

/// Shown while the task store is being woken. The poll has no deadline; the
/// screen just counts attempts until the store answers or the user quits.
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let attempts = app.waking.unwrap_or(0);

    let mut lines = vec![
        Line::raw(""),
        Line::from(Span::styled(
            "Waking the task store...",
            Style::default().fg(ratatui::style::Color::Yellow),
        )),
        Line::raw(""),
    ];
    if attempts > 0 {
        lines.push(Line::from(Span::styled(
            format!("{attempts} probe(s) unanswered — retrying every 3s"),
            Style::default().fg(ratatui::style::Color::Gray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Checking...",
            Style::default().fg(ratatui::style::Color::Gray),
        )));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        "Cached tasks stay available; actions sync once the store answers.",
        Style::default().fg(ratatui::style::Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines)
        .alignment(ratatui::layout::Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ratatui::style::Color::Yellow))
                .title(" snag "),
        );

    f.render_widget(paragraph, area);
}
