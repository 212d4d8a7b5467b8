use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::theme::{priority_color, source_color, status_color};

fn label(text: &'static str) -> Span<'static> {
    Span::styled(text, Style::default().fg(ratatui::style::Color::Gray))
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(task) = app.selected_task() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ratatui::style::Color::Cyan))
            .title(" Details ");
        f.render_widget(block, area);
        return;
    };

    let mut lines: Vec<Line> = Vec::new();

    let mut status_spans = vec![
        label("Status: "),
        Span::styled(
            task.status.as_str(),
            Style::default().fg(status_color(task.status)),
        ),
    ];
    if task.out_of_sync {
        status_spans.push(Span::styled(
            "  (out of sync with store)",
            Style::default().fg(ratatui::style::Color::Red),
        ));
    }
    lines.push(Line::from(status_spans));

    lines.push(Line::from(vec![
        label("Source: "),
        Span::styled(task.source.as_str(), Style::default().fg(source_color(task.source))),
    ]));

    lines.push(Line::from(vec![
        label("Priority: "),
        Span::styled(
            task.priority.as_str(),
            Style::default().fg(priority_color(task.priority)),
        ),
    ]));

    if let Some(deadline) = &task.deadline {
        lines.push(Line::from(vec![
            label("Deadline: "),
            Span::raw(deadline.to_string()),
        ]));
    }

    if !task.created_at.is_empty() {
        lines.push(Line::from(vec![
            label("Created: "),
            Span::raw(task.created_at.clone()),
        ]));
    }

    if let Some(url) = &task.url {
        lines.push(Line::from(vec![
            label("URL: "),
            Span::styled(url.clone(), Style::default().fg(ratatui::style::Color::Blue)),
        ]));
    }

    if let Some(key) = &task.jira_key {
        let mut spans = vec![label("Jira: "), Span::raw(key.clone())];
        if let Some(status) = &task.jira_status {
            spans.push(Span::styled(
                format!(" ({status})"),
                Style::default().fg(ratatui::style::Color::Green),
            ));
        }
        lines.push(Line::from(spans));
    }

    if let Some(assignee) = &task.assignee {
        lines.push(Line::from(vec![
            label("Assignee: "),
            Span::raw(assignee.clone()),
        ]));
    }

    if !task.description.is_empty() {
        lines.push(Line::raw(""));
        let truncated: String = task.description.chars().take(300).collect();
        lines.push(Line::raw(truncated));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ratatui::style::Color::Cyan))
                .title(" Details "),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}
