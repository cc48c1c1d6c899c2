//! Central application state.
//!
//! All mutable state lives here so that rendering is a pure function over
//! `&AppState` and every asynchronous completion is applied through one of
//! the `on_*` methods from the event loop.

use std::path::PathBuf;
use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::app::backend::{BackendEvent, IndexEntry, LifecycleState, StatusUpdate};
use crate::app::view::{Align, ViewController};
use crate::config::AppConfig;
use crate::core::{
    loader::{BatchLoader, LoadOutcome, LoaderUpdate, MetadataSource},
    range::RowMetrics,
    sort::{sorting_enabled, SortEngine, SortKey, SortPhase, SortState, SortStep, SortUpdate},
    types::ResultSequence,
};

/// Which widget receives typed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    Search,
    #[default]
    Results,
}

/// A search the event loop should hand to the backend.
#[derive(Debug)]
pub struct SearchRequest {
    pub search_id: u64,
    pub query: String,
    pub entries: Arc<[IndexEntry]>,
}

/// Top-level application state.
pub struct AppState {
    /// Directory being indexed.
    pub root: PathBuf,
    pub config: AppConfig,
    pub focus: Focus,
    pub query: String,
    pub lifecycle: LifecycleState,
    pub status: StatusUpdate,
    /// Result rows, scroll state and the row cache.
    pub view: ViewController,
    /// Selected position in the displayed sequence.
    pub selected: Option<usize>,
    /// An optional status message shown in the bottom bar.
    pub status_message: Option<String>,
    /// Controls the main event loop.
    pub should_quit: bool,
    /// Set by handlers; the event loop starts a fresh index build.
    pub needs_rescan: bool,
    /// `true` while the current search is still streaming.
    pub searching: bool,
    /// Monotonic counter driving the spinner.
    pub tick: u64,
    /// Last drawn frame area; mouse hit-testing uses it.
    pub terminal_area: Rect,

    /// Bumped whenever the raw sequence is replaced.
    generation: u64,
    /// Results in backend order.
    raw: ResultSequence,
    sort_state: Option<SortState>,
    sort: SortEngine,
    index: Arc<[IndexEntry]>,
    search_id: u64,
    needs_search: bool,
}

impl AppState {
    pub fn new(
        root: PathBuf,
        config: AppConfig,
        source: Arc<dyn MetadataSource>,
        loader_tx: UnboundedSender<LoaderUpdate>,
        sort_tx: UnboundedSender<SortUpdate>,
    ) -> Self {
        let metrics = RowMetrics {
            row_height: 1.0,
            overscan: config.view.overscan,
        };
        let loader = BatchLoader::new(source, loader_tx);
        let view = ViewController::new(metrics, config.view.min_thumb, loader);

        Self {
            root,
            config,
            focus: Focus::default(),
            query: String::new(),
            lifecycle: LifecycleState::default(),
            status: StatusUpdate::default(),
            view,
            selected: None,
            status_message: None,
            should_quit: false,
            needs_rescan: false,
            searching: false,
            tick: 0,
            terminal_area: Rect::default(),
            generation: 0,
            raw: ResultSequence::from(Vec::new()),
            sort_state: None,
            sort: SortEngine::new(sort_tx),
            index: Arc::from(Vec::new()),
            search_id: 0,
            needs_search: false,
        }
    }

    // ── accessors ──────────────────────────────────────────────

    pub fn sort_state(&self) -> Option<SortState> {
        self.sort_state
    }

    pub fn sort_phase(&self) -> SortPhase {
        self.sort.phase()
    }

    pub fn sorting_enabled(&self) -> bool {
        sorting_enabled(self.raw.len(), self.config.view.sort_threshold)
    }

    // ── results ────────────────────────────────────────────────

    /// Adopt a new result set under a new generation and start a fresh
    /// sort attempt.  Backend order goes on screen at once only when there
    /// is no sort to wait for; otherwise the current order stays until the
    /// new sort commits.
    pub fn replace_results(&mut self, rows: ResultSequence) {
        self.generation += 1;
        debug!(generation = self.generation, rows = rows.len(), "results replaced");
        self.view.reset_generation(self.generation);
        self.raw = rows;
        if self.sort_state.is_none() || !self.sorting_enabled() {
            self.view.set_rows(self.raw.clone());
            self.clamp_selection();
        } else {
            // The rows still on screen lost their metadata with the reset.
            self.view.reload_visible();
        }
        self.restart_sort();
    }

    /// Cycle the sort for `key`.  Refused while the result set is too large.
    pub fn toggle_sort(&mut self, key: SortKey) {
        if !self.sorting_enabled() {
            self.status_message = Some(format!(
                "Sorting is disabled above {} results",
                self.config.view.sort_threshold
            ));
            return;
        }
        self.sort_state = SortState::toggle(self.sort_state, key);
        self.status_message = None;
        self.restart_sort();
    }

    fn restart_sort(&mut self) {
        let enabled = self.sorting_enabled();
        if !enabled && self.sort_state.take().is_some() {
            info!(rows = self.raw.len(), "too many results; sort cleared");
        }
        let step = self
            .sort
            .request(self.raw.clone(), self.sort_state, enabled, self.view.loader_mut());
        if let SortStep::Commit(rows) = step {
            self.show(rows);
        }
    }

    /// Put `rows` on screen.  The selection follows its row through the
    /// reorder and is re-centred when it moved.
    fn show(&mut self, rows: ResultSequence) {
        if Arc::ptr_eq(&rows, self.view.rows()) {
            return;
        }
        let selected = self
            .selected
            .and_then(|pos| self.view.rows().get(pos).copied())
            .and_then(|index| rows.iter().position(|&i| i == index));
        let moved = selected.is_some() && selected != self.selected;
        self.view.set_rows(rows);
        match selected {
            Some(pos) => {
                self.selected = Some(pos);
                if moved {
                    self.view.scroll_to_index(pos, Align::Center);
                }
            }
            None => self.clamp_selection(),
        }
    }

    // ── async completions ──────────────────────────────────────

    pub fn on_loader_update(&mut self, update: LoaderUpdate) {
        match self.view.apply_loader_update(update) {
            LoadOutcome::Merged { .. } => self.sort.on_rows_merged(self.view.loader().cache()),
            LoadOutcome::Failed { error } => {
                if let Some(unsorted) = self.sort.on_fetch_failed() {
                    self.status_message = Some(format!("Sort unavailable: {error}"));
                    self.show(unsorted);
                }
            }
            LoadOutcome::Stale => {}
        }
    }

    pub fn on_sort_update(&mut self, update: SortUpdate) {
        if let Some(sorted) = self.sort.apply(update) {
            self.show(sorted);
        }
    }

    pub fn on_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Status(status) => self.status = status,
            BackendEvent::Lifecycle(lifecycle) => {
                info!(?lifecycle, "backend lifecycle");
                self.lifecycle = lifecycle;
            }
            BackendEvent::QuickActivate => self.focus = Focus::Search,
            BackendEvent::Indexed { entries } => {
                self.index = entries;
                // Old handles point into the previous index.
                self.replace_results(ResultSequence::from(Vec::new()));
                self.needs_search = true;
            }
            BackendEvent::Results {
                search_id,
                rows,
                done,
            } => {
                if search_id != self.search_id {
                    debug!(search_id, current = self.search_id, "dropping stale search results");
                    return;
                }
                self.searching = !done;
                self.replace_results(rows);
            }
        }
    }

    // ── search ─────────────────────────────────────────────────

    /// The query changed; search again on the next loop iteration.
    pub fn request_search(&mut self) {
        self.needs_search = true;
    }

    /// Take the pending search, if any, under a new search id.
    pub fn next_search(&mut self) -> Option<SearchRequest> {
        if !std::mem::take(&mut self.needs_search) {
            return None;
        }
        self.search_id += 1;
        self.searching = true;
        Some(SearchRequest {
            search_id: self.search_id,
            query: self.query.clone(),
            entries: Arc::clone(&self.index),
        })
    }

    // ── selection ──────────────────────────────────────────────

    /// Move the selection by whole pages.  The viewport follows so the new
    /// selection heads the page going down and ends it going up.
    pub fn page_selection(&mut self, pages: isize) {
        let rows = self.view.viewport_height() / self.view.metrics().row_height;
        let page = (rows.floor() as isize).max(1);
        self.move_selection(pages.saturating_mul(page));
        if let Some(pos) = self.selected {
            let align = if pages < 0 { Align::End } else { Align::Start };
            self.view.scroll_to_index(pos, align);
        }
    }

    /// Move the selection by `delta` rows and keep it in view.
    pub fn move_selection(&mut self, delta: isize) {
        let count = self.view.row_count();
        if count == 0 {
            self.selected = None;
            return;
        }
        let next = match self.selected {
            Some(pos) => pos.saturating_add_signed(delta).min(count - 1),
            None if delta < 0 => count - 1,
            None => 0,
        };
        self.select(next);
    }

    pub fn select(&mut self, pos: usize) {
        if pos < self.view.row_count() {
            self.selected = Some(pos);
            self.view.scroll_to_index(pos, Align::Auto);
        }
    }

    pub fn select_first(&mut self) {
        self.view.scroll_to_top();
        if self.view.row_count() > 0 {
            self.selected = Some(0);
        }
    }

    pub fn select_last(&mut self) {
        if let Some(last) = self.view.row_count().checked_sub(1) {
            self.select(last);
        }
    }

    fn clamp_selection(&mut self) {
        let count = self.view.row_count();
        self.selected = match self.selected {
            _ if count == 0 => None,
            Some(pos) => Some(pos.min(count - 1)),
            None => None,
        };
    }
}
