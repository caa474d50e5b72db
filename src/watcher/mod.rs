//! Live index maintenance from filesystem notifications
//!
//! [`Monitor`] registers a recursive `notify` watcher per root. Raw events are
//! translated to [`PathEvent`]s and pushed through a bounded channel to one writer
//! thread, which applies them with the same exclusion rules as a directory walk.

pub mod events;
pub mod monitor;

pub use events::{PathEvent, translate};
pub use monitor::{Monitor, MonitorStats};
