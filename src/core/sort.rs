//! Metadata-driven sorting of a result sequence.
//!
//! A sort needs metadata for *every* row, not just the visible ones, so a
//! request goes through three phases:
//!
//! 1. **Waiting** — the whole sequence is handed to the [`BatchLoader`];
//!    the engine advances a cursor over the sequence as batches merge.
//! 2. **Sorting** — once every row is cached, sort keys are snapshotted and
//!    the comparison runs on a worker thread.
//! 3. **Commit** — the worker reports a [`SortUpdate`]; it is accepted only
//!    if its token is still the newest.
//!
//! Every request bumps the token, so a superseded attempt can never reach
//! the screen.  Its fetches still complete and stay cached for reuse.

use std::cmp::Ordering;

use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::cache::RowCache;
use super::loader::BatchLoader;
use super::types::{ResultIndex, ResultSequence, RowMetadata};

// ───────────────────────────────────────── sort state ────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    FullPath,
    Size,
    Modified,
    Created,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::FullPath => "Path",
            SortKey::Size => "Size",
            SortKey::Modified => "Modified",
            SortKey::Created => "Created",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn asc(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Desc,
        }
    }

    /// State after the user toggles `key`: the same key cycles
    /// asc → desc → unsorted, a different key starts at asc.
    pub fn toggle(current: Option<SortState>, key: SortKey) -> Option<SortState> {
        match current {
            Some(state) if state.key == key => match state.direction {
                SortDirection::Asc => Some(Self::desc(key)),
                SortDirection::Desc => None,
            },
            _ => Some(Self::asc(key)),
        }
    }
}

/// Sorting is offered only while the result set is small enough to fetch
/// metadata for every row.
pub fn sorting_enabled(result_count: usize, threshold: usize) -> bool {
    result_count <= threshold
}

// ───────────────────────────────────────── comparator ────────

/// Absent numeric metadata sorts as the smallest possible value in both
/// directions: first when ascending, last when descending.
const MISSING: i128 = i128::MIN;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Text(String),
    Number(i128),
}

#[derive(Debug, Clone)]
struct SortEntry {
    index: ResultIndex,
    position: usize,
    value: SortValue,
}

fn sort_value(row: Option<&RowMetadata>, key: SortKey) -> SortValue {
    let number = |v: Option<i128>| SortValue::Number(v.unwrap_or(MISSING));
    match key {
        SortKey::FullPath => {
            SortValue::Text(row.map(|r| r.path.to_lowercase()).unwrap_or_default())
        }
        SortKey::Size => number(row.and_then(|r| r.size).map(i128::from)),
        SortKey::Modified => number(row.and_then(|r| r.modified).map(i128::from)),
        SortKey::Created => number(row.and_then(|r| r.created).map(i128::from)),
    }
}

/// Root-locale collation for path text, ignoring case: accented letters
/// sort next to their base letter instead of after `z`.
fn path_collator() -> Option<CollatorBorrowed<'static>> {
    let mut options = CollatorOptions::default();
    options.strength = Some(Strength::Secondary);
    Collator::try_new(Default::default(), options)
        .map_err(|e| warn!(error = %e, "path collation unavailable; using code point order"))
        .ok()
}

fn compare_values(a: &SortValue, b: &SortValue, collator: Option<&CollatorBorrowed<'_>>) -> Ordering {
    match (a, b, collator) {
        (SortValue::Text(a), SortValue::Text(b), Some(collator)) => collator.compare(a, b),
        _ => a.cmp(b),
    }
}

/// Direction flips the value comparison only; ties always fall back to
/// ascending original position.
fn compare_entries(
    a: &SortEntry,
    b: &SortEntry,
    direction: SortDirection,
    collator: Option<&CollatorBorrowed<'_>>,
) -> Ordering {
    let by_value = compare_values(&a.value, &b.value, collator);
    let by_value = match direction {
        SortDirection::Asc => by_value,
        SortDirection::Desc => by_value.reverse(),
    };
    by_value.then(a.position.cmp(&b.position))
}

fn snapshot<'a>(
    source: &[ResultIndex],
    key: SortKey,
    lookup: impl Fn(ResultIndex) -> Option<&'a RowMetadata>,
) -> Vec<SortEntry> {
    source
        .iter()
        .enumerate()
        .map(|(position, &index)| SortEntry {
            index,
            position,
            value: sort_value(lookup(index), key),
        })
        .collect()
}

fn sort_entries(mut entries: Vec<SortEntry>, state: SortState) -> Vec<ResultIndex> {
    let collator = match state.key {
        SortKey::FullPath => path_collator(),
        SortKey::Size | SortKey::Modified | SortKey::Created => None,
    };
    // The position tie-break makes the order total, so unstable is fine.
    entries.sort_unstable_by(|a, b| compare_entries(a, b, state.direction, collator.as_ref()));
    entries.into_iter().map(|e| e.index).collect()
}

// ───────────────────────────────────────── engine ────────────

/// A finished sort, delivered to the event loop.
#[derive(Debug)]
pub struct SortUpdate {
    pub token: u64,
    pub sorted: ResultSequence,
}

/// What the caller should display after a request.
#[derive(Debug, PartialEq, Eq)]
pub enum SortStep {
    /// Show this sequence now; nothing is pending.
    Commit(ResultSequence),
    /// A sort is underway; keep the current display until it commits.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPhase {
    Idle,
    Waiting,
    Sorting,
}

struct WaitingSort {
    token: u64,
    generation: u64,
    state: SortState,
    source: ResultSequence,
    /// Every position before the cursor is known to be cached.
    cursor: usize,
}

pub struct SortEngine {
    token: u64,
    waiting: Option<WaitingSort>,
    running: Option<u64>,
    tx: mpsc::UnboundedSender<SortUpdate>,
}

impl SortEngine {
    pub fn new(tx: mpsc::UnboundedSender<SortUpdate>) -> Self {
        Self {
            token: 0,
            waiting: None,
            running: None,
            tx,
        }
    }

    pub fn phase(&self) -> SortPhase {
        if self.waiting.is_some() {
            SortPhase::Waiting
        } else if self.running.is_some() {
            SortPhase::Sorting
        } else {
            SortPhase::Idle
        }
    }

    /// Start a new attempt for `source`, superseding any earlier one.
    pub fn request(
        &mut self,
        source: ResultSequence,
        state: Option<SortState>,
        enabled: bool,
        loader: &mut BatchLoader,
    ) -> SortStep {
        self.token = self.token.wrapping_add(1);
        self.waiting = None;
        self.running = None;

        let state = match state {
            Some(state) if enabled && !source.is_empty() => state,
            _ => return SortStep::Commit(source),
        };

        debug!(
            token = self.token,
            key = state.key.label(),
            direction = ?state.direction,
            rows = source.len(),
            "sort requested"
        );
        loader.ensure_loaded(source.iter().copied());
        self.waiting = Some(WaitingSort {
            token: self.token,
            generation: loader.generation(),
            state,
            source,
            cursor: 0,
        });
        self.advance(loader.cache());
        SortStep::Pending
    }

    /// Call after a batch merged; starts the comparison once every row of
    /// the waiting attempt is cached.
    pub fn on_rows_merged(&mut self, cache: &RowCache) {
        self.advance(cache);
    }

    /// A current-generation fetch failed.  The waiting attempt can no longer
    /// complete, so it falls back to the unsorted source if still current.
    /// There is no automatic retry; the next request starts over.
    pub fn on_fetch_failed(&mut self) -> Option<ResultSequence> {
        let waiting = self.waiting.take()?;
        if waiting.token != self.token {
            return None;
        }
        warn!(
            token = waiting.token,
            "metadata fetch failed while sorting; showing results unsorted"
        );
        Some(waiting.source)
    }

    /// Accept a finished sort if nothing newer was requested since.
    pub fn apply(&mut self, update: SortUpdate) -> Option<ResultSequence> {
        if update.token != self.token {
            debug!(
                token = update.token,
                current = self.token,
                "dropping superseded sort result"
            );
            return None;
        }
        self.running = None;
        debug!(token = update.token, rows = update.sorted.len(), "sort committed");
        Some(update.sorted)
    }

    fn advance(&mut self, cache: &RowCache) {
        let Some(waiting) = self.waiting.as_mut() else {
            return;
        };
        if waiting.generation != cache.generation() {
            self.waiting = None;
            return;
        }
        while waiting.cursor < waiting.source.len()
            && cache.contains(waiting.source[waiting.cursor])
        {
            waiting.cursor += 1;
        }
        if waiting.cursor < waiting.source.len() {
            return;
        }

        let Some(waiting) = self.waiting.take() else {
            return;
        };
        if waiting.token != self.token {
            return;
        }

        let entries = snapshot(&waiting.source, waiting.state.key, |i| cache.get(i));
        let state = waiting.state;
        let token = waiting.token;
        let tx = self.tx.clone();
        self.running = Some(token);
        std::thread::spawn(move || {
            let sorted = ResultSequence::from(sort_entries(entries, state));
            let _ = tx.send(SortUpdate { token, sorted });
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::core::loader::LoaderUpdate;
    use crate::core::testing::StubSource;
    use crate::core::types::sequence_of;

    fn row(path: &str, size: Option<u64>) -> RowMetadata {
        RowMetadata {
            path: path.into(),
            size,
            ..Default::default()
        }
    }

    fn raw(seq: &[ResultIndex]) -> Vec<u32> {
        seq.iter().map(|i| i.0).collect()
    }

    /// Reorder `source` by `state`, reading metadata through `lookup`.
    fn sort_sequence<'a>(
        source: &[ResultIndex],
        state: SortState,
        lookup: impl Fn(ResultIndex) -> Option<&'a RowMetadata>,
    ) -> Vec<ResultIndex> {
        sort_entries(snapshot(source, state.key, lookup), state)
    }

    // ── state ──────────────────────────────────────────────────

    #[test]
    fn toggling_one_key_cycles_asc_desc_off() {
        let first = SortState::toggle(None, SortKey::Size);
        assert_eq!(first, Some(SortState::asc(SortKey::Size)));
        let second = SortState::toggle(first, SortKey::Size);
        assert_eq!(second, Some(SortState::desc(SortKey::Size)));
        let third = SortState::toggle(second, SortKey::Size);
        assert_eq!(third, None);
    }

    #[test]
    fn switching_key_restarts_at_asc() {
        let state = Some(SortState::desc(SortKey::Size));
        assert_eq!(
            SortState::toggle(state, SortKey::Modified),
            Some(SortState::asc(SortKey::Modified))
        );
    }

    #[test]
    fn threshold_gates_sorting() {
        assert!(sorting_enabled(1000, 1000));
        assert!(!sorting_enabled(1500, 1000));
        assert!(sorting_enabled(0, 0));
    }

    // ── comparator ─────────────────────────────────────────────

    #[test]
    fn size_desc_sinks_missing_values() {
        let rows: HashMap<ResultIndex, RowMetadata> = [
            (ResultIndex(0), row("/a", Some(10))),
            (ResultIndex(1), row("/b", None)),
            (ResultIndex(2), row("/c", Some(30))),
        ]
        .into_iter()
        .collect();
        let source = sequence_of([0, 1, 2]);

        let sorted = sort_sequence(&source, SortState::desc(SortKey::Size), |i| rows.get(&i));
        assert_eq!(raw(&sorted), vec![2, 0, 1]);

        let sorted = sort_sequence(&source, SortState::asc(SortKey::Size), |i| rows.get(&i));
        assert_eq!(raw(&sorted), vec![1, 0, 2]);
    }

    #[test]
    fn path_sort_ignores_case() {
        let rows: HashMap<ResultIndex, RowMetadata> = [
            (ResultIndex(0), row("/b.txt", None)),
            (ResultIndex(1), row("/A.txt", None)),
            (ResultIndex(2), row("/c.txt", None)),
        ]
        .into_iter()
        .collect();
        let source = sequence_of([0, 1, 2]);

        let sorted = sort_sequence(&source, SortState::asc(SortKey::FullPath), |i| rows.get(&i));
        assert_eq!(raw(&sorted), vec![1, 0, 2]);
    }

    #[test]
    fn path_sort_places_accented_letters_with_their_base() {
        let rows: HashMap<ResultIndex, RowMetadata> = [
            (ResultIndex(0), row("/fig", None)),
            (ResultIndex(1), row("/éclair", None)),
            (ResultIndex(2), row("/Zebra", None)),
        ]
        .into_iter()
        .collect();
        let source = sequence_of([0, 1, 2]);

        let sorted = sort_sequence(&source, SortState::asc(SortKey::FullPath), |i| rows.get(&i));
        assert_eq!(raw(&sorted), vec![1, 0, 2]);
        let sorted = sort_sequence(&source, SortState::desc(SortKey::FullPath), |i| rows.get(&i));
        assert_eq!(raw(&sorted), vec![2, 0, 1]);
    }

    #[test]
    fn ties_keep_original_order_in_both_directions() {
        let rows: HashMap<ResultIndex, RowMetadata> = [
            (ResultIndex(5), row("/Same", Some(1))),
            (ResultIndex(3), row("/same", Some(1))),
            (ResultIndex(9), row("/SAME", Some(1))),
        ]
        .into_iter()
        .collect();
        let source = sequence_of([5, 3, 9]);

        for state in [
            SortState::asc(SortKey::FullPath),
            SortState::desc(SortKey::FullPath),
            SortState::asc(SortKey::Size),
            SortState::desc(SortKey::Size),
        ] {
            let sorted = sort_sequence(&source, state, |i| rows.get(&i));
            assert_eq!(raw(&sorted), vec![5, 3, 9], "{state:?}");
        }
    }

    #[test]
    fn output_is_a_sorted_stable_permutation() {
        // Small LCG so the data set is varied but deterministic.
        let mut seed: u64 = 0x2545_f491;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            seed >> 33
        };
        let mut rows = HashMap::new();
        for i in 0..400u32 {
            let size = if next() % 5 == 0 { None } else { Some(next() % 16) };
            rows.insert(
                ResultIndex(i),
                RowMetadata {
                    path: format!("/dir/{}", next() % 23),
                    size,
                    modified: Some((next() % 7) as i64),
                    created: None,
                    ..Default::default()
                },
            );
        }
        let source = sequence_of((0..400u32).rev());
        let position: HashMap<ResultIndex, usize> =
            source.iter().enumerate().map(|(p, &i)| (i, p)).collect();

        let collator = path_collator();
        for key in [SortKey::FullPath, SortKey::Size, SortKey::Modified, SortKey::Created] {
            let collator = (key == SortKey::FullPath).then_some(collator.as_ref()).flatten();
            for direction in [SortDirection::Asc, SortDirection::Desc] {
                let state = SortState { key, direction };
                let sorted = sort_sequence(&source, state, |i| rows.get(&i));

                let mut a = raw(&sorted);
                let mut b = raw(&source);
                a.sort_unstable();
                b.sort_unstable();
                assert_eq!(a, b, "not a permutation for {state:?}");

                for pair in sorted.windows(2) {
                    let va = sort_value(rows.get(&pair[0]), key);
                    let vb = sort_value(rows.get(&pair[1]), key);
                    let ord = match direction {
                        SortDirection::Asc => compare_values(&va, &vb, collator),
                        SortDirection::Desc => compare_values(&vb, &va, collator),
                    };
                    assert_ne!(ord, Ordering::Greater, "{state:?}");
                    if ord == Ordering::Equal {
                        assert!(position[&pair[0]] < position[&pair[1]], "unstable for {state:?}");
                    }
                }
            }
        }
    }

    // ── engine ─────────────────────────────────────────────────

    struct Rig {
        source: Arc<StubSource>,
        loader: BatchLoader,
        engine: SortEngine,
        loads: mpsc::UnboundedReceiver<LoaderUpdate>,
        sorts: mpsc::UnboundedReceiver<SortUpdate>,
    }

    fn rig(source: StubSource) -> Rig {
        let source = Arc::new(source);
        let (load_tx, loads) = mpsc::unbounded_channel();
        let (sort_tx, sorts) = mpsc::unbounded_channel();
        Rig {
            loader: BatchLoader::new(source.clone(), load_tx),
            engine: SortEngine::new(sort_tx),
            source,
            loads,
            sorts,
        }
    }

    impl Rig {
        /// Apply the next loader completion and let the engine react.
        fn pump_load(&mut self) {
            let update = self.loads.blocking_recv().expect("loader completion");
            if let crate::core::loader::LoadOutcome::Merged { .. } = self.loader.apply(update) {
                self.engine.on_rows_merged(self.loader.cache());
            }
        }
    }

    fn sized(sizes: &[Option<u64>]) -> StubSource {
        StubSource::with_rows(
            sizes
                .iter()
                .enumerate()
                .map(|(i, &size)| (i as u32, row(&format!("/r{i}"), size))),
        )
    }

    #[test]
    fn unsorted_request_commits_immediately() {
        let mut rig = rig(StubSource::new());
        let source = sequence_of([3, 1, 2]);

        let step = rig.engine.request(source.clone(), None, true, &mut rig.loader);
        assert_eq!(step, SortStep::Commit(source.clone()));
        assert_eq!(rig.engine.phase(), SortPhase::Idle);
        assert!(rig.source.calls().is_empty());

        let disabled = Some(SortState::asc(SortKey::Size));
        let step = rig.engine.request(source.clone(), disabled, false, &mut rig.loader);
        assert_eq!(step, SortStep::Commit(source));
        assert!(rig.source.calls().is_empty());
    }

    #[test]
    fn empty_source_commits_immediately() {
        let mut rig = rig(StubSource::new());
        let empty = sequence_of(Vec::new());
        let step = rig.engine.request(
            empty.clone(),
            Some(SortState::asc(SortKey::Size)),
            true,
            &mut rig.loader,
        );
        assert_eq!(step, SortStep::Commit(empty));
    }

    #[test]
    fn request_fetches_everything_then_commits_sorted() {
        let mut rig = rig(sized(&[Some(10), None, Some(30)]));
        let source = sequence_of([0, 1, 2]);

        let step = rig.engine.request(
            source.clone(),
            Some(SortState::desc(SortKey::Size)),
            true,
            &mut rig.loader,
        );
        assert_eq!(step, SortStep::Pending);
        assert_eq!(rig.engine.phase(), SortPhase::Waiting);

        rig.pump_load();
        assert_eq!(rig.source.calls(), vec![source.to_vec()]);
        assert_eq!(rig.engine.phase(), SortPhase::Sorting);

        let update = rig.sorts.blocking_recv().expect("sort result");
        let committed = rig.engine.apply(update).expect("current token commits");
        assert_eq!(raw(&committed), vec![2, 0, 1]);
        assert_eq!(rig.engine.phase(), SortPhase::Idle);
    }

    #[test]
    fn superseded_request_never_commits() {
        let mut rig = rig(sized(&[Some(1), Some(2), Some(3)]));
        let source = sequence_of([0, 1, 2]);

        rig.engine.request(
            source.clone(),
            Some(SortState::asc(SortKey::Size)),
            true,
            &mut rig.loader,
        );
        // Second toggle lands before the first fetch resolves.
        rig.engine.request(
            source.clone(),
            Some(SortState::desc(SortKey::Size)),
            true,
            &mut rig.loader,
        );
        rig.pump_load();
        // Only one fetch: the second request found everything in flight.
        assert_eq!(rig.source.calls().len(), 1);
        let update = rig.sorts.blocking_recv().expect("sort result");
        assert_eq!(update.token, 2);
        let committed = rig.engine.apply(update).expect("second request commits");
        assert_eq!(raw(&committed), vec![2, 1, 0]);
    }

    #[test]
    fn late_result_from_older_token_is_dropped() {
        let mut rig = rig(sized(&[Some(1), Some(2), Some(3)]));
        let source = sequence_of([0, 1, 2]);

        // Warm the cache so both requests go straight to the worker.
        rig.loader.ensure_loaded(source.iter().copied());
        rig.pump_load();

        rig.engine.request(
            source.clone(),
            Some(SortState::asc(SortKey::Size)),
            true,
            &mut rig.loader,
        );
        rig.engine.request(
            source.clone(),
            Some(SortState::desc(SortKey::Size)),
            true,
            &mut rig.loader,
        );

        let mut updates = vec![
            rig.sorts.blocking_recv().expect("first"),
            rig.sorts.blocking_recv().expect("second"),
        ];
        // Deliver the newer result first, then the stale one.
        updates.sort_by_key(|u| std::cmp::Reverse(u.token));
        let newest = rig.engine.apply(updates.remove(0)).expect("newest commits");
        assert_eq!(raw(&newest), vec![2, 1, 0]);
        assert!(rig.engine.apply(updates.remove(0)).is_none());
    }

    #[test]
    fn fetch_failure_falls_back_to_unsorted() {
        let mut rig = rig(sized(&[Some(5), Some(1)]));
        rig.source.set_failing(true);
        let source = sequence_of([0, 1]);

        rig.engine.request(
            source.clone(),
            Some(SortState::asc(SortKey::Size)),
            true,
            &mut rig.loader,
        );
        let update = rig.loads.blocking_recv().expect("completion");
        assert!(matches!(
            rig.loader.apply(update),
            crate::core::loader::LoadOutcome::Failed { .. }
        ));

        assert_eq!(rig.engine.on_fetch_failed(), Some(source));
        assert_eq!(rig.engine.phase(), SortPhase::Idle);
        // Nothing left to fall back from.
        assert_eq!(rig.engine.on_fetch_failed(), None);
    }

    #[test]
    fn generation_change_abandons_waiting_sort() {
        let mut rig = rig(sized(&[Some(5), Some(1)]));
        let source = sequence_of([0, 1]);

        rig.engine.request(
            source,
            Some(SortState::asc(SortKey::Size)),
            true,
            &mut rig.loader,
        );
        rig.loader.reset(1);
        let stale = rig.loads.blocking_recv().expect("completion");
        assert_eq!(
            rig.loader.apply(stale),
            crate::core::loader::LoadOutcome::Stale
        );
        rig.engine.on_rows_merged(rig.loader.cache());

        assert_eq!(rig.engine.phase(), SortPhase::Idle);
        assert!(rig.sorts.try_recv().is_err());
    }
}
