//! Terminal event abstraction.
//!
//! A blocking reader thread polls crossterm and forwards events over a
//! channel so the main loop can `select!` on them next to the loader, sort
//! and backend channels.

use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;
use tracing::warn;

/// High-level events consumed by the application.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Paste(String),
    /// The terminal changed size; the next draw picks up the new area.
    Resize,
    /// Nothing happened for a tick; advances the spinner.
    Tick,
}

impl AppEvent {
    fn from_crossterm(ev: CtEvent) -> Option<Self> {
        match ev {
            // Windows reports releases too; only presses and repeats act.
            CtEvent::Key(k) if k.kind == KeyEventKind::Release => None,
            CtEvent::Key(k) => Some(AppEvent::Key(k)),
            CtEvent::Mouse(m) => Some(AppEvent::Mouse(m)),
            CtEvent::Paste(text) => Some(AppEvent::Paste(text)),
            CtEvent::Resize(..) => Some(AppEvent::Resize),
            _ => None,
        }
    }
}

/// Spawn the reader and return the receiving end.
pub fn spawn_event_reader(tick_rate: Duration) -> mpsc::UnboundedReceiver<AppEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || loop {
        let next = match event::poll(tick_rate) {
            Ok(true) => match event::read() {
                Ok(ev) => AppEvent::from_crossterm(ev),
                Err(e) => {
                    warn!(error = %e, "terminal read failed");
                    None
                }
            },
            Ok(false) => Some(AppEvent::Tick),
            Err(e) => {
                warn!(error = %e, "terminal poll failed");
                return;
            }
        };
        if let Some(app_event) = next {
            if tx.send(app_event).is_err() {
                return; // receiver dropped
            }
        }
    });

    rx
}
