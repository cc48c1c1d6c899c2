//! Layout helpers — split the terminal area into regions.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Screen regions, top to bottom: search input, column header, result rows
/// with the scrollbar column on their right, status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub search_area: Rect,
    pub header_area: Rect,
    pub rows_area: Rect,
    pub scrollbar_area: Rect,
    pub status_area: Rect,
}

impl AppLayout {
    /// Compute the layout from the full terminal area.
    pub fn from_area(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // search input
                Constraint::Length(1), // column header
                Constraint::Min(1),    // result rows
                Constraint::Length(1), // status bar
            ])
            .split(area);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(rows[2]);

        let header_area = Rect {
            width: body[0].width,
            ..rows[1]
        };

        Self {
            search_area: rows[0],
            header_area,
            rows_area: body[0],
            scrollbar_area: body[1],
            status_area: rows[3],
        }
    }
}

pub fn contains(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x
        && col < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}
