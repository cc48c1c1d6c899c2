//! User configuration — view settings, keybindings and persistence.
//!
//! Settings are stored as a simple key-value text file at
//! `$XDG_CONFIG_HOME/result-pane/config.toml` (default
//! `~/.config/result-pane/config.toml`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, warn};

// ───────────────────────────────────────── actions ───────────

/// All configurable user actions on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    ScrollTop,
    ScrollBottom,
    ScrollLeft,
    ScrollRight,
    SortByPath,
    SortBySize,
    SortByModified,
    SortByCreated,
    FocusSearch,
    Rescan,
    Quit,
}

impl Action {
    /// Ordered list of all actions (serialisation order).
    pub const ALL: &[Action] = &[
        Action::MoveUp,
        Action::MoveDown,
        Action::PageUp,
        Action::PageDown,
        Action::ScrollTop,
        Action::ScrollBottom,
        Action::ScrollLeft,
        Action::ScrollRight,
        Action::SortByPath,
        Action::SortBySize,
        Action::SortByModified,
        Action::SortByCreated,
        Action::FocusSearch,
        Action::Rescan,
        Action::Quit,
    ];

    fn config_key(self) -> &'static str {
        match self {
            Action::MoveUp => "move_up",
            Action::MoveDown => "move_down",
            Action::PageUp => "page_up",
            Action::PageDown => "page_down",
            Action::ScrollTop => "scroll_top",
            Action::ScrollBottom => "scroll_bottom",
            Action::ScrollLeft => "scroll_left",
            Action::ScrollRight => "scroll_right",
            Action::SortByPath => "sort_by_path",
            Action::SortBySize => "sort_by_size",
            Action::SortByModified => "sort_by_modified",
            Action::SortByCreated => "sort_by_created",
            Action::FocusSearch => "focus_search",
            Action::Rescan => "rescan",
            Action::Quit => "quit",
        }
    }

    fn from_config_key(s: &str) -> Option<Self> {
        Action::ALL.iter().copied().find(|a| a.config_key() == s)
    }
}

// ───────────────────────────────────────── key bind ──────────

/// A single key binding — key code + modifier combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyBind {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBind {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Does this binding match a key event?  Only CTRL/ALT/SHIFT are
    /// compared.  SHIFT is ignored for characters because terminals report
    /// `G` as `Shift+G`.
    pub fn matches(&self, event: KeyEvent) -> bool {
        let mut mask = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT;
        if matches!(self.code, KeyCode::Char(_)) {
            mask.remove(KeyModifiers::SHIFT);
        }
        self.code == event.code && (self.modifiers & mask) == (event.modifiers & mask)
    }

    /// User-friendly display string (e.g. `"PgDn"`, `"Ctrl+c"`, `"q"`).
    pub fn display(&self) -> String {
        let mut s = modifier_prefix(self.modifiers);
        s.push_str(&match self.code {
            KeyCode::Char(' ') => "Space".into(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Up => "↑".into(),
            KeyCode::Down => "↓".into(),
            KeyCode::Left => "←".into(),
            KeyCode::Right => "→".into(),
            KeyCode::PageUp => "PgUp".into(),
            KeyCode::PageDown => "PgDn".into(),
            other => key_name(other),
        });
        s
    }

    /// Serialise to config-file format (e.g. `"Alt+Up"`, `"Ctrl+c"`, `"q"`).
    fn to_config_string(&self) -> String {
        let mut s = modifier_prefix(self.modifiers);
        s.push_str(&key_name(self.code));
        s
    }

    /// Parse a key string like `"Ctrl+c"`, `"Alt+Up"`, `"q"`, `"Enter"`.
    fn parse(s: &str) -> Option<Self> {
        let mut modifiers = KeyModifiers::NONE;
        let parts: Vec<&str> = s.split('+').collect();
        let (key_part, mods) = parts.split_last()?;

        for part in mods {
            match part.to_lowercase().as_str() {
                "ctrl" => modifiers |= KeyModifiers::CONTROL,
                "alt" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                _ => return None,
            }
        }

        // Single characters keep their case: `G` and `g` are different keys.
        let mut chars = key_part.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(KeyBind::new(KeyCode::Char(c), modifiers));
        }

        let code = match key_part.to_lowercase().as_str() {
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "enter" | "return" => KeyCode::Enter,
            "esc" | "escape" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "backspace" | "bksp" => KeyCode::Backspace,
            "delete" | "del" => KeyCode::Delete,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" | "pgup" => KeyCode::PageUp,
            "pagedown" | "pgdn" => KeyCode::PageDown,
            "space" => KeyCode::Char(' '),
            s if s.starts_with('f') && s.len() > 1 => KeyCode::F(s[1..].parse().ok()?),
            _ => return None,
        };

        Some(KeyBind { code, modifiers })
    }
}

fn modifier_prefix(modifiers: KeyModifiers) -> String {
    let mut s = String::new();
    if modifiers.contains(KeyModifiers::CONTROL) {
        s.push_str("Ctrl+");
    }
    if modifiers.contains(KeyModifiers::ALT) {
        s.push_str("Alt+");
    }
    if modifiers.contains(KeyModifiers::SHIFT) {
        s.push_str("Shift+");
    }
    s
}

fn key_name(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "Space".into(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Up => "Up".into(),
        KeyCode::Down => "Down".into(),
        KeyCode::Left => "Left".into(),
        KeyCode::Right => "Right".into(),
        KeyCode::Enter => "Enter".into(),
        KeyCode::Esc => "Esc".into(),
        KeyCode::Tab => "Tab".into(),
        KeyCode::Backspace => "Backspace".into(),
        KeyCode::Delete => "Delete".into(),
        KeyCode::Home => "Home".into(),
        KeyCode::End => "End".into(),
        KeyCode::PageUp => "PageUp".into(),
        KeyCode::PageDown => "PageDown".into(),
        KeyCode::F(n) => format!("F{n}"),
        other => format!("{other:?}"),
    }
}

// ───────────────────────────────────────── settings ──────────

/// Tunables for the result view and the demo backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    /// Rows materialised above and below the viewport.
    pub overscan: usize,
    /// Sorting is disabled above this many results.
    pub sort_threshold: usize,
    /// Minimum scrollbar thumb height, in rows.
    pub min_thumb: f64,
    /// Rows moved per mouse-wheel notch.
    pub wheel_rows: usize,
    /// Matches per streamed result snapshot.
    pub stream_chunk: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            overscan: 5,
            sort_threshold: 20_000,
            min_thumb: 1.0,
            wheel_rows: 3,
            stream_chunk: 256,
        }
    }
}

// ───────────────────────────────────────── config ────────────

/// Application configuration — view settings and keybindings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bindings: HashMap<Action, Vec<KeyBind>>,
    pub view: ViewSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bindings: Self::default_bindings(),
            view: ViewSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn default_bindings() -> HashMap<Action, Vec<KeyBind>> {
        use Action::*;
        use KeyCode::*;
        let n = KeyModifiers::NONE;
        let ctrl = KeyModifiers::CONTROL;
        let mut m = HashMap::new();

        m.insert(MoveUp, vec![KeyBind::new(Up, n), KeyBind::new(Char('k'), n)]);
        m.insert(MoveDown, vec![KeyBind::new(Down, n), KeyBind::new(Char('j'), n)]);
        m.insert(Action::PageUp, vec![KeyBind::new(KeyCode::PageUp, n), KeyBind::new(Char('b'), ctrl)]);
        m.insert(Action::PageDown, vec![KeyBind::new(KeyCode::PageDown, n), KeyBind::new(Char('f'), ctrl)]);
        m.insert(ScrollTop, vec![KeyBind::new(Home, n), KeyBind::new(Char('g'), n)]);
        m.insert(ScrollBottom, vec![KeyBind::new(End, n), KeyBind::new(Char('G'), n)]);
        m.insert(ScrollLeft, vec![KeyBind::new(Left, n), KeyBind::new(Char('h'), n)]);
        m.insert(ScrollRight, vec![KeyBind::new(Right, n), KeyBind::new(Char('l'), n)]);
        m.insert(SortByPath, vec![KeyBind::new(Char('1'), n)]);
        m.insert(SortBySize, vec![KeyBind::new(Char('2'), n)]);
        m.insert(SortByModified, vec![KeyBind::new(Char('3'), n)]);
        m.insert(SortByCreated, vec![KeyBind::new(Char('4'), n)]);
        m.insert(FocusSearch, vec![KeyBind::new(Char('/'), n), KeyBind::new(Tab, n)]);
        m.insert(Rescan, vec![KeyBind::new(Char('r'), n)]);
        m.insert(Quit, vec![KeyBind::new(Char('q'), n), KeyBind::new(Char('c'), ctrl)]);

        m
    }

    /// Find the action that matches a key event.  When multiple bindings
    /// match, the one with the most modifiers wins.
    pub fn match_key(&self, event: KeyEvent) -> Option<Action> {
        let mut best: Option<(Action, u32)> = None;
        for (&action, binds) in &self.bindings {
            for bind in binds.iter().filter(|b| b.matches(event)) {
                let count = bind.modifiers.bits().count_ones();
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((action, count));
                }
            }
        }
        best.map(|(action, _)| action)
    }

    fn short_binding(&self, action: Action) -> String {
        match self.bindings.get(&action).and_then(|b| b.first()) {
            Some(bind) => bind.display(),
            None => "?".into(),
        }
    }

    /// Build the status-bar hint string from current bindings.
    pub fn status_bar_hint(&self) -> String {
        format!(
            "{}/{}: move | {}-{}: sort | {}: search | {}: rescan | {}: quit",
            self.short_binding(Action::MoveUp),
            self.short_binding(Action::MoveDown),
            self.short_binding(Action::SortByPath),
            self.short_binding(Action::SortByCreated),
            self.short_binding(Action::FocusSearch),
            self.short_binding(Action::Rescan),
            self.short_binding(Action::Quit),
        )
    }

    // ── persistence ─────────────────────────────────────────────

    /// Load config from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                debug!(path = %path.display(), "loaded config");
                Self::parse(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable config; using defaults");
                Self::default()
            }
        }
    }

    /// Persist to the default location and return the path written.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(path, self.serialise())
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Parse the config text.  Unknown keys and malformed values are
    /// skipped; anything not mentioned keeps its default.
    pub fn parse(s: &str) -> Self {
        let mut config = Self::default();

        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            let view = &mut config.view;
            match key {
                "overscan" => {
                    if let Ok(v) = value.parse::<usize>() {
                        view.overscan = v.min(500);
                    }
                    continue;
                }
                "sort_threshold" => {
                    if let Ok(v) = value.parse() {
                        view.sort_threshold = v;
                    }
                    continue;
                }
                "min_thumb" => {
                    if let Ok(v) = value.parse::<f64>() {
                        if v.is_finite() && v >= 0.0 {
                            view.min_thumb = v;
                        }
                    }
                    continue;
                }
                "wheel_rows" => {
                    if let Ok(v) = value.parse::<usize>() {
                        view.wheel_rows = v.clamp(1, 100);
                    }
                    continue;
                }
                "stream_chunk" => {
                    if let Ok(v) = value.parse::<usize>() {
                        view.stream_chunk = v.max(1);
                    }
                    continue;
                }
                _ => {}
            }

            let Some(action) = Action::from_config_key(key) else {
                debug!(key, "ignoring unknown config key");
                continue;
            };

            let parsed: Vec<KeyBind> = value
                .split(',')
                .filter_map(|part| KeyBind::parse(part.trim().trim_matches('"')))
                .collect();
            if !parsed.is_empty() {
                config.bindings.insert(action, parsed);
            }
        }

        config
    }

    fn serialise(&self) -> String {
        let view = &self.view;
        let mut lines = vec![
            "# result-pane configuration".to_string(),
            String::new(),
            "# View settings".to_string(),
            format!("overscan = {}", view.overscan),
            format!("sort_threshold = {}", view.sort_threshold),
            format!("min_thumb = {}", view.min_thumb),
            format!("wheel_rows = {}", view.wheel_rows),
            format!("stream_chunk = {}", view.stream_chunk),
            String::new(),
            "# Key bindings".to_string(),
            "# Format: action = Key1, Key2, ...".to_string(),
            "# Modifiers: Ctrl+, Alt+, Shift+ (prefix)".to_string(),
            "# Special keys: Up, Down, Left, Right, Enter, Esc, Tab,".to_string(),
            "#   Backspace, Delete, Home, End, PageUp, PageDown, Space, F1-F12".to_string(),
            String::new(),
        ];

        for &action in Action::ALL {
            if let Some(binds) = self.bindings.get(&action) {
                let keys: Vec<String> = binds.iter().map(|b| b.to_config_string()).collect();
                lines.push(format!("{} = {}", action.config_key(), keys.join(", ")));
            }
        }
        lines.push(String::new());
        lines.join("\n")
    }
}

/// Return the config file path (`$XDG_CONFIG_HOME/result-pane/config.toml`).
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
    config_dir.join("result-pane").join("config.toml")
}
