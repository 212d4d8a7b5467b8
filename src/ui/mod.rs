pub mod assign_panel;
pub mod capture_panel;
pub mod detail_panel;
pub mod footer;
pub mod standby;
pub mod task_list;
pub mod theme;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::app::{App, ViewMode};

pub fn render(f: &mut Frame, app: &App) {
    let size = f.area();

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(1)])
        .split(size);
    let main_area = vertical[0];
    let bottom_area = vertical[1];

    // Capture works offline, so the form wins over the standby screen.
    if app.waking.is_some() && app.view_mode != ViewMode::Capture {
        standby::render(f, main_area, app);
        footer::render(f, bottom_area, app);
        return;
    }

    match app.view_mode {
        ViewMode::Dashboard => {
            // List (60%) + Detail (40%)
            let horizontal = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(main_area);

            task_list::render(f, horizontal[0], app);
            detail_panel::render(f, horizontal[1], app);
        }
        ViewMode::Focus => {
            task_list::render(f, main_area, app);
        }
        ViewMode::Capture => {
            capture_panel::render(f, main_area, app);
        }
        ViewMode::Assign => {
            assign_panel::render(f, main_area, app);
        }
    }

    footer::render(f, bottom_area, app);
}
