//! Core engine — range math, row cache, batch loading, sorting, scrollbar.
//!
//! Nothing in this module depends on any TUI or rendering crate.  State is
//! mutated only from the event loop; background work reports back through
//! channels tagged with a generation or token.

pub mod cache;
pub mod header_sync;
pub mod loader;
pub mod range;
pub mod scrollbar;
pub mod sort;
pub mod types;

#[cfg(test)]
pub mod testing;
