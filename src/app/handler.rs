//! Input handling — maps key/mouse events to state mutations.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::config::Action;
use crate::core::sort::SortKey;
use crate::ui::layout::{contains, AppLayout};
use crate::ui::results::column_at;

use super::state::{AppState, Focus};

/// Columns moved per horizontal scroll step.
const HSCROLL_STEP: i32 = 8;

/// Process a key event, dispatching on focus.
pub fn handle_key(state: &mut AppState, key: KeyEvent) {
    // Ctrl+c always quits, even while typing.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        state.should_quit = true;
        return;
    }

    match state.focus {
        Focus::Search => handle_search_key(state, key),
        Focus::Results => handle_results_key(state, key),
    }
}

/// Bracketed paste goes into the query when the search input has focus.
pub fn handle_paste(state: &mut AppState, text: &str) {
    if state.focus != Focus::Search {
        return;
    }
    state.query.extend(text.chars().filter(|c| !c.is_control()));
    state.request_search();
}

// ── Search input ────────────────────────────────────────────────

fn handle_search_key(state: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Tab | KeyCode::Down => {
            state.focus = Focus::Results;
        }
        KeyCode::Backspace => {
            if state.query.pop().is_some() {
                state.request_search();
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.query.clear();
            state.request_search();
        }
        KeyCode::Char(ch)
            if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            state.query.push(ch);
            state.request_search();
        }
        _ => {}
    }
}

// ── Result list (configurable bindings) ─────────────────────────

fn handle_results_key(state: &mut AppState, key: KeyEvent) {
    let Some(action) = state.config.match_key(key) else {
        return;
    };
    match action {
        Action::MoveUp => state.move_selection(-1),
        Action::MoveDown => state.move_selection(1),
        Action::PageUp => state.page_selection(-1),
        Action::PageDown => state.page_selection(1),
        Action::ScrollTop => state.select_first(),
        Action::ScrollBottom => state.select_last(),
        Action::ScrollLeft => {
            state.view.scroll_horizontally(-HSCROLL_STEP);
        }
        Action::ScrollRight => {
            state.view.scroll_horizontally(HSCROLL_STEP);
        }
        Action::SortByPath => state.toggle_sort(SortKey::FullPath),
        Action::SortBySize => state.toggle_sort(SortKey::Size),
        Action::SortByModified => state.toggle_sort(SortKey::Modified),
        Action::SortByCreated => state.toggle_sort(SortKey::Created),
        Action::FocusSearch => state.focus = Focus::Search,
        Action::Rescan => state.needs_rescan = true,
        Action::Quit => state.should_quit = true,
    }
}

// ── Mouse ───────────────────────────────────────────────────────

/// Process a mouse event.
pub fn handle_mouse(state: &mut AppState, mouse: MouseEvent) {
    let layout = AppLayout::from_area(state.terminal_area);
    let wheel = state.config.view.wheel_rows as f64 * state.view.metrics().row_height;

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let (col, row) = (mouse.column, mouse.row);
            if contains(layout.scrollbar_area, col, row) {
                state.view.scrollbar_pointer_down(track_y(&layout, row));
            } else if contains(layout.header_area, col, row) {
                let x = col - layout.header_area.x + state.view.header_left();
                if let Some(key) = column_at(x).and_then(|c| c.sort_key) {
                    state.toggle_sort(key);
                }
            } else if contains(layout.rows_area, col, row) {
                state.focus = Focus::Results;
                let pos = state.view.first_visible() + usize::from(row - layout.rows_area.y);
                state.select(pos);
            } else if contains(layout.search_area, col, row) {
                state.focus = Focus::Search;
            }
        }
        // Drags and releases are tracked anywhere on screen, not just over
        // the scrollbar.
        MouseEventKind::Drag(MouseButton::Left) => {
            if state.view.is_dragging_scrollbar() {
                state.view.scrollbar_pointer_move(track_y(&layout, mouse.row));
            }
        }
        MouseEventKind::Up(MouseButton::Left) => state.view.scrollbar_pointer_up(),
        MouseEventKind::ScrollUp => {
            state.view.scroll_by(-wheel);
        }
        MouseEventKind::ScrollDown => {
            state.view.scroll_by(wheel);
        }
        MouseEventKind::ScrollLeft => {
            state.view.scroll_horizontally(-HSCROLL_STEP);
        }
        MouseEventKind::ScrollRight => {
            state.view.scroll_horizontally(HSCROLL_STEP);
        }
        _ => {}
    }
}

/// Pointer position on the scrollbar track, at the centre of the cell.
/// Negative or past the end when the pointer left the track.
fn track_y(layout: &AppLayout, row: u16) -> f64 {
    f64::from(row) - f64::from(layout.scrollbar_area.y) + 0.5
}
