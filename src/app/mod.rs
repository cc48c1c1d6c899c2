//! Application orchestration — state management, backend workers, event
//! loop plumbing and input handling.

pub mod backend;
pub mod event;
pub mod handler;
pub mod state;
pub mod view;
