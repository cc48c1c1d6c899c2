//! In-process demo backend.
//!
//! Indexes a directory tree once (and again on rescan), answers substring
//! queries by streaming growing result snapshots, and serves
//! `fetch_row_metadata` from filesystem metadata.  A [`ResultIndex`] is a
//! position in the current index.
//!
//! Everything here runs on plain threads and reports back to the event
//! loop as [`BackendEvent`]s.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::core::loader::MetadataSource;
use crate::core::types::{EntryKind, FetchError, ResultIndex, ResultSequence, RowMetadata};

/// Indexing progress is reported every this many entries.
pub const STATUS_EVERY: usize = 512;

// ───────────────────────────────────────── events ────────────

/// Progress counters shown in the status bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub scanned_files: u64,
    pub processed_events: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    Initializing,
    Updating,
    Ready,
    Unavailable(String),
}

/// Everything the backend tells the screen.
#[derive(Debug)]
pub enum BackendEvent {
    Status(StatusUpdate),
    Lifecycle(LifecycleState),
    /// Bring the search input into focus.
    QuickActivate,
    /// A fresh index replaced the old one; earlier handles are meaningless.
    Indexed { entries: Arc<[IndexEntry]> },
    /// Snapshot of the matches found so far for `search_id`.
    Results {
        search_id: u64,
        rows: ResultSequence,
        done: bool,
    },
}

// ───────────────────────────────────────── index ─────────────

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub path: PathBuf,
    pub name_lower: String,
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub root: PathBuf,
    pub show_hidden: bool,
    pub respect_gitignore: bool,
}

/// Walk `options.root` (excluding the root itself) into a flat index.
///
/// Unreadable entries are skipped.  `on_progress` is called with the entry
/// count every [`STATUS_EVERY`] entries.
pub fn build_index(options: &IndexOptions, mut on_progress: impl FnMut(usize)) -> Result<Vec<IndexEntry>> {
    let root = &options.root;
    let meta = std::fs::metadata(root).with_context(|| format!("reading {}", root.display()))?;
    if !meta.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    let walker = WalkBuilder::new(root)
        .hidden(!options.show_hidden)
        .git_ignore(options.respect_gitignore)
        .ignore(options.respect_gitignore)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut out = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.into_path();
        let Some(name) = path.file_name() else {
            continue;
        };
        let name_lower = name.to_string_lossy().to_lowercase();
        out.push(IndexEntry { path, name_lower });
        if out.len() % STATUS_EVERY == 0 {
            on_progress(out.len());
        }
    }
    Ok(out)
}

/// Handles of every entry whose name contains `query`, case-insensitively.
/// An empty (or all-whitespace) query matches everything.
pub fn matching<'a>(entries: &'a [IndexEntry], query: &str) -> impl Iterator<Item = ResultIndex> + 'a {
    let needle = query.trim().to_lowercase();
    entries
        .iter()
        .enumerate()
        .filter(move |(_, entry)| entry.name_lower.contains(needle.as_str()))
        .filter_map(|(i, _)| u32::try_from(i).ok().map(ResultIndex))
}

// ───────────────────────────────────────── metadata ──────────

/// [`MetadataSource`] over the current index.  The index is swapped
/// wholesale on rescan.
pub struct IndexSource {
    entries: RwLock<Arc<[IndexEntry]>>,
}

impl IndexSource {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::from(Vec::new())),
        }
    }

    pub fn replace(&self, entries: Arc<[IndexEntry]>) {
        match self.entries.write() {
            Ok(mut slot) => *slot = entries,
            Err(poisoned) => *poisoned.into_inner() = entries,
        }
    }

}

impl Default for IndexSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataSource for IndexSource {
    fn fetch_row_metadata(&self, indices: &[ResultIndex]) -> Result<Vec<RowMetadata>, FetchError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| FetchError::Unavailable("index lock poisoned".into()))?
            .clone();
        indices
            .iter()
            .map(|&index| {
                entries
                    .get(index.0 as usize)
                    .map(|entry| row_metadata(&entry.path))
                    .ok_or(FetchError::UnknownIndex(index))
            })
            .collect()
    }
}

/// Stat `path` without following symlinks.  Fields that can't be read are
/// left `None`.
pub fn row_metadata(path: &Path) -> RowMetadata {
    let shown = path.to_string_lossy().into_owned();
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            debug!(path = %shown, error = %e, "stat failed");
            return RowMetadata {
                path: shown,
                ..Default::default()
            };
        }
    };

    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Unknown
    };

    RowMetadata {
        path: shown,
        size: (kind != EntryKind::Dir).then(|| meta.len()),
        modified: meta.modified().ok().and_then(unix_seconds),
        created: meta.created().ok().and_then(unix_seconds),
        kind,
    }
}

fn unix_seconds(time: SystemTime) -> Option<i64> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).ok(),
        Err(e) => i64::try_from(e.duration().as_secs()).ok().map(|s| -s),
    }
}

// ───────────────────────────────────────── runtime ───────────

/// Owns the index source and spawns indexing and search workers.
pub struct Backend {
    options: IndexOptions,
    source: Arc<IndexSource>,
    tx: UnboundedSender<BackendEvent>,
    stream_chunk: usize,
    /// Newest search id; older workers stop early.
    latest_search: Arc<AtomicU64>,
    scanned: Arc<AtomicU64>,
    processed: Arc<AtomicU64>,
}

impl Backend {
    pub fn new(options: IndexOptions, stream_chunk: usize, tx: UnboundedSender<BackendEvent>) -> Self {
        Self {
            options,
            source: Arc::new(IndexSource::new()),
            tx,
            stream_chunk: stream_chunk.max(1),
            latest_search: Arc::new(AtomicU64::new(0)),
            scanned: Arc::new(AtomicU64::new(0)),
            processed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn source(&self) -> Arc<IndexSource> {
        Arc::clone(&self.source)
    }

    /// Make a freshly built index the one metadata is served from.  Called
    /// from the event loop together with the screen's result reset.
    pub fn install(&self, entries: Arc<[IndexEntry]>) {
        self.source.replace(entries);
    }

    /// Build (or rebuild) the index on a worker thread.
    pub fn spawn_indexer(&self, rescan: bool) {
        let options = self.options.clone();
        let tx = self.tx.clone();
        let scanned = Arc::clone(&self.scanned);
        let processed = Arc::clone(&self.processed);

        std::thread::spawn(move || {
            let phase = if rescan {
                LifecycleState::Updating
            } else {
                LifecycleState::Initializing
            };
            let _ = tx.send(BackendEvent::Lifecycle(phase));

            let status = |count: usize| {
                scanned.store(count as u64, Ordering::Relaxed);
                StatusUpdate {
                    scanned_files: count as u64,
                    processed_events: processed.load(Ordering::Relaxed),
                }
            };

            match build_index(&options, |count| {
                let _ = tx.send(BackendEvent::Status(status(count)));
            }) {
                Ok(entries) => {
                    info!(root = %options.root.display(), entries = entries.len(), "index built");
                    let _ = tx.send(BackendEvent::Status(status(entries.len())));
                    let _ = tx.send(BackendEvent::Indexed {
                        entries: Arc::from(entries),
                    });
                    let _ = tx.send(BackendEvent::Lifecycle(LifecycleState::Ready));
                }
                Err(e) => {
                    warn!(error = %e, "indexing failed");
                    let _ = tx.send(BackendEvent::Lifecycle(LifecycleState::Unavailable(format!("{e:#}"))));
                }
            }
        });
    }

    /// Run `query` over `entries` on a worker thread, streaming a snapshot
    /// every `stream_chunk` matches and a final one when done.
    pub fn spawn_search(&self, search_id: u64, query: String, entries: Arc<[IndexEntry]>) {
        self.latest_search.store(search_id, Ordering::Relaxed);
        let latest = Arc::clone(&self.latest_search);
        let tx = self.tx.clone();
        let chunk = self.stream_chunk;
        let scanned = Arc::clone(&self.scanned);
        let processed = Arc::clone(&self.processed);

        std::thread::spawn(move || {
            let mut rows = Vec::new();
            for index in matching(&entries, &query) {
                rows.push(index);
                if rows.len() % chunk != 0 {
                    continue;
                }
                if latest.load(Ordering::Relaxed) != search_id {
                    debug!(search_id, "search superseded");
                    return;
                }
                let snapshot = BackendEvent::Results {
                    search_id,
                    rows: ResultSequence::from(rows.as_slice()),
                    done: false,
                };
                if tx.send(snapshot).is_err() {
                    return;
                }
            }

            debug!(search_id, matches = rows.len(), "search finished");
            let _ = tx.send(BackendEvent::Results {
                search_id,
                rows: ResultSequence::from(rows),
                done: true,
            });
            let processed = processed.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = tx.send(BackendEvent::Status(StatusUpdate {
                scanned_files: scanned.load(Ordering::Relaxed),
                processed_events: processed,
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("src/nested")).expect("mkdir");
        fs::write(dir.path().join("README.md"), "hello").expect("write");
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").expect("write");
        fs::write(dir.path().join("src/nested/Mainframe.txt"), "x").expect("write");
        fs::write(dir.path().join(".hidden"), "").expect("write");
        dir
    }

    fn options(root: &Path) -> IndexOptions {
        IndexOptions {
            root: root.to_path_buf(),
            show_hidden: false,
            respect_gitignore: false,
        }
    }

    fn names(entries: &[IndexEntry], rows: impl IntoIterator<Item = ResultIndex>) -> Vec<String> {
        rows.into_iter()
            .map(|i| entries[i.0 as usize].name_lower.clone())
            .collect()
    }

    #[test]
    fn index_skips_root_and_hidden_entries() {
        let dir = tree();
        let entries = build_index(&options(dir.path()), |_| {}).expect("index");
        let all = names(&entries, matching(&entries, ""));
        assert_eq!(all.len(), 5);
        assert!(!all.contains(&".hidden".to_string()));

        let mut with_hidden = options(dir.path());
        with_hidden.show_hidden = true;
        let entries = build_index(&with_hidden, |_| {}).expect("index");
        assert_eq!(entries.len(), 6);
    }

    #[test]
    fn index_of_missing_root_fails() {
        let dir = tree();
        let missing = dir.path().join("nope");
        assert!(build_index(&options(&missing), |_| {}).is_err());
        assert!(build_index(&options(&dir.path().join("README.md")), |_| {}).is_err());
    }

    #[test]
    fn progress_reported_every_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 0..(STATUS_EVERY + 10) {
            fs::write(dir.path().join(format!("f{i}")), "").expect("write");
        }
        let mut reports = Vec::new();
        build_index(&options(dir.path()), |n| reports.push(n)).expect("index");
        assert_eq!(reports, vec![STATUS_EVERY]);
    }

    #[test]
    fn matching_is_case_insensitive_on_name() {
        let dir = tree();
        let entries = build_index(&options(dir.path()), |_| {}).expect("index");
        let mut hits = names(&entries, matching(&entries, "  MAIN "));
        hits.sort();
        assert_eq!(hits, vec!["main.rs", "mainframe.txt"]);
        // Directory components of the path don't match.
        assert!(matching(&entries, "nested").count() == 1);
    }

    #[test]
    fn source_serves_aligned_metadata() {
        let dir = tree();
        let entries: Arc<[IndexEntry]> = build_index(&options(dir.path()), |_| {})
            .expect("index")
            .into();
        let source = IndexSource::new();
        source.replace(entries.clone());

        let readme = matching(&entries, "readme").next().expect("readme");
        let src = matching(&entries, "src").next().expect("src");
        let rows = source.fetch_row_metadata(&[src, readme]).expect("fetch");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, EntryKind::Dir);
        assert_eq!(rows[0].size, None);
        assert_eq!(rows[1].kind, EntryKind::File);
        assert_eq!(rows[1].size, Some(5));
        assert!(rows[1].path.ends_with("README.md"));
        assert!(rows[1].modified.is_some());
    }

    #[test]
    fn unknown_index_fails_the_batch() {
        let source = IndexSource::new();
        assert_eq!(
            source.fetch_row_metadata(&[ResultIndex(3)]),
            Err(FetchError::UnknownIndex(ResultIndex(3)))
        );
    }

    #[test]
    fn vanished_file_has_no_metadata() {
        let dir = tree();
        let path = dir.path().join("README.md");
        fs::remove_file(&path).expect("remove");
        let row = row_metadata(&path);
        assert_eq!(row.path, path.to_string_lossy());
        assert_eq!(row.size, None);
        assert_eq!(row.modified, None);
        assert_eq!(row.kind, EntryKind::Unknown);
    }

    fn recv(rx: &mut mpsc::UnboundedReceiver<BackendEvent>) -> BackendEvent {
        for _ in 0..500 {
            if let Ok(event) = rx.try_recv() {
                return event;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("backend event never arrived");
    }

    #[test]
    fn indexer_reports_lifecycle_and_entries() {
        let dir = tree();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Backend::new(options(dir.path()), 2, tx);
        backend.spawn_indexer(false);

        assert!(matches!(recv(&mut rx), BackendEvent::Lifecycle(LifecycleState::Initializing)));
        assert!(matches!(
            recv(&mut rx),
            BackendEvent::Status(StatusUpdate { scanned_files: 5, .. })
        ));
        let BackendEvent::Indexed { entries } = recv(&mut rx) else {
            panic!("expected index");
        };
        assert_eq!(entries.len(), 5);
        assert!(matches!(recv(&mut rx), BackendEvent::Lifecycle(LifecycleState::Ready)));

        let first = [ResultIndex(0)];
        assert!(backend.source().fetch_row_metadata(&first).is_err());
        backend.install(entries.clone());
        let rows = backend.source().fetch_row_metadata(&first).expect("installed index");
        assert_eq!(rows[0].path, entries[0].path.to_string_lossy());
    }

    #[test]
    fn indexer_reports_unavailable_root() {
        let dir = tree();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Backend::new(options(&dir.path().join("gone")), 2, tx);
        backend.spawn_indexer(true);

        assert!(matches!(recv(&mut rx), BackendEvent::Lifecycle(LifecycleState::Updating)));
        assert!(matches!(
            recv(&mut rx),
            BackendEvent::Lifecycle(LifecycleState::Unavailable(_))
        ));
    }

    #[test]
    fn search_streams_growing_snapshots() {
        let dir = tree();
        let entries: Arc<[IndexEntry]> = build_index(&options(dir.path()), |_| {})
            .expect("index")
            .into();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Backend::new(options(dir.path()), 2, tx);
        backend.spawn_search(7, String::new(), entries);

        let mut sizes = Vec::new();
        loop {
            match recv(&mut rx) {
                BackendEvent::Results { search_id, rows, done } => {
                    assert_eq!(search_id, 7);
                    sizes.push(rows.len());
                    if done {
                        break;
                    }
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(sizes, vec![2, 4, 5]);
        assert!(matches!(
            recv(&mut rx),
            BackendEvent::Status(StatusUpdate { processed_events: 1, .. })
        ));
    }
}
