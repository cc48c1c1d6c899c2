//! UI / rendering layer — everything that touches Ratatui widgets.
//!
//! Rendering reads `&AppState` only.  [`sync_layout`] is the one place the
//! terminal geometry flows back into the view before a frame is drawn.

pub mod layout;
pub mod results;
pub mod search;
pub mod spinner;
pub mod theme;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::backend::LifecycleState;
use crate::app::state::{AppState, Focus};
use crate::core::sort::SortPhase;

use layout::AppLayout;
use results::ResultsWidget;
use search::SearchBar;
use spinner::ActivityIndicator;
use theme::Theme;

/// Push the current terminal geometry into the view (viewport height,
/// scrollbar track, horizontal scroll extent).
pub fn sync_layout(state: &mut AppState, area: Rect) {
    state.terminal_area = area;
    let layout = AppLayout::from_area(area);
    state.view.set_viewport_height(f64::from(layout.rows_area.height));
    state
        .view
        .set_content_width(results::content_width(), layout.rows_area.width);
}

pub fn draw(frame: &mut Frame, state: &AppState) {
    let area = frame.area();
    let layout = AppLayout::from_area(area);

    frame.render_widget(
        SearchBar {
            query: &state.query,
            has_focus: state.focus == Focus::Search,
        },
        layout.search_area,
    );
    frame.render_widget(
        ActivityIndicator {
            label: activity_label(state),
            tick: state.tick,
        },
        layout.search_area,
    );

    frame.render_widget(ResultsWidget { state }, area);

    frame.render_widget(
        Paragraph::new(status_line(state)).style(Theme::status_bar_style()),
        layout.status_area,
    );
}

fn activity_label(state: &AppState) -> Option<&'static str> {
    match state.lifecycle {
        LifecycleState::Initializing => return Some("indexing"),
        LifecycleState::Updating => return Some("rescanning"),
        LifecycleState::Ready | LifecycleState::Unavailable(_) => {}
    }
    match state.sort_phase() {
        SortPhase::Waiting => Some("loading rows"),
        SortPhase::Sorting => Some("sorting"),
        SortPhase::Idle if state.searching => Some("searching"),
        SortPhase::Idle => None,
    }
}

fn status_line(state: &AppState) -> Line<'static> {
    let mut spans = Vec::new();
    if let LifecycleState::Unavailable(reason) = &state.lifecycle {
        spans.push(Span::styled(format!(" unavailable: {reason} "), Theme::error_style()));
    }

    let count = state.view.row_count();
    let mut summary = format!(
        " {} | {count} results | {} indexed | {} searches",
        state.root.display(),
        state.status.scanned_files,
        state.status.processed_events
    );
    if !state.sorting_enabled() {
        summary.push_str(" | sorting off");
    }
    summary.push_str(" | ");
    summary.push_str(&scroll_position(
        state.view.scroll_offset(),
        state.view.max_scroll_offset(),
    ));
    spans.push(Span::raw(summary));

    let hint = state
        .status_message
        .clone()
        .unwrap_or_else(|| state.config.status_bar_hint());
    spans.push(Span::raw(format!(" | {hint}")));
    Line::from(spans)
}

/// Where the viewport sits in the list, pager style.
fn scroll_position(offset: f64, max: f64) -> String {
    if max <= 0.0 {
        "All".into()
    } else if offset <= 0.0 {
        "Top".into()
    } else if offset >= max {
        "Bot".into()
    } else {
        format!("{:.0}%", offset / max * 100.0)
    }
}
