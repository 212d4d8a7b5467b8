use ratatui::style::Color;

use crate::model::task::{Priority, Source, TaskStatus};

pub fn source_color(source: Source) -> Color {
    match source {
        Source::Email => Color::Rgb(0xEA, 0x43, 0x35),
        Source::Chat => Color::Rgb(0x4A, 0x15, 0x4B),
        Source::Jira => Color::Rgb(0x00, 0x52, 0xCC),
        Source::Web => Color::Gray,
    }
}

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Highest => Color::Red,
        Priority::High => Color::Yellow,
        Priority::Medium => Color::Blue,
        Priority::Low => Color::Gray,
    }
}

pub fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Yellow,
        TaskStatus::Sent => Color::Green,
        TaskStatus::Declined => Color::DarkGray,
    }
}

pub fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "○",
        TaskStatus::Sent => "✓",
        TaskStatus::Declined => "✗",
    }
}
