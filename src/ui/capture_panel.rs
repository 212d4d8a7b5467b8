use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, CaptureField};
use crate::ui::theme::{priority_color, source_color};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let Some(form) = &app.capture else {
        return;
    };

    let active = Style::default()
        .fg(ratatui::style::Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let inactive = Style::default().fg(ratatui::style::Color::Gray);
    let field_label = |field: CaptureField, text: &'static str| {
        Span::styled(
            text,
            if form.field == field { active } else { inactive },
        )
    };

    let mut lines: Vec<Line> = Vec::new();

    if !form.draft.text.is_empty() {
        let snippet: String = form.draft.text.chars().take(200).collect();
        lines.push(Line::from(vec![
            Span::styled("Snippet: ", inactive),
            Span::raw(snippet),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Source: ", inactive),
            Span::styled(
                form.draft.source().as_str(),
                Style::default().fg(source_color(form.draft.source())),
            ),
        ]));
        if let Some(url) = &form.draft.url {
            lines.push(Line::from(vec![
                Span::styled("URL: ", inactive),
                Span::styled(url.clone(), Style::default().fg(ratatui::style::Color::Blue)),
            ]));
        }
        lines.push(Line::raw(""));
    }

    lines.push(Line::from(vec![
        field_label(CaptureField::Title, "Title:    "),
        Span::raw(form.title_input.clone()),
        cursor_for(form, CaptureField::Title),
    ]));
    lines.push(Line::from(vec![
        field_label(CaptureField::Priority, "Priority: "),
        Span::styled(
            form.draft.priority.as_str(),
            Style::default().fg(priority_color(form.draft.priority)),
        ),
        Span::styled("  (space to cycle)", inactive),
    ]));
    lines.push(Line::from(vec![
        field_label(CaptureField::Deadline, "Deadline: "),
        Span::raw(form.deadline_input.clone()),
        cursor_for(form, CaptureField::Deadline),
        Span::styled("  (YYYY-MM-DD, optional)", inactive),
    ]));

    if let Some(error) = &form.error {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(ratatui::style::Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ratatui::style::Color::Yellow))
                .title(" Confirm Capture — enter: save, esc: discard "),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);
}

fn cursor_for(form: &crate::app::CaptureForm, field: CaptureField) -> Span<'static> {
    if form.field == field {
        Span::styled("▏", Style::default().fg(ratatui::style::Color::Yellow))
    } else {
        Span::raw("")
    }
}
