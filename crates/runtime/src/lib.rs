//! Lifecycle primitives for the sessionview service.
//!
//! Everything here is independent of what a "sync" actually does:
//! - [`watcher`]: debounced recursive directory watching
//! - [`scheduler`]: fixed-interval ticks with a stop hook
//! - [`process`]: port probing before the listener binds
//! - [`launcher`]: readiness-gated browser launch

pub mod error;
pub mod launcher;
pub mod process;
pub mod scheduler;
pub mod watcher;

pub use error::{Result, WatchError};
pub use launcher::{Launcher, SystemOpener, UrlOpener};
pub use process::{PortChoice, port_available, resolve_port};
pub use scheduler::Scheduler;
pub use watcher::{ChangeCallback, Debounce, Watcher};
