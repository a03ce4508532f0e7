//! The seam between herbie and the window manager.
//!
//! The task runner only talks to a [`WindowManager`]; the real backend is
//! [`HerbstClient`](crate::herbstluft::client::HerbstClient), tests use an
//! in-memory double.

use crate::command::{Command, TagInfo};

/// Abstraction over a window manager that can dump and load layouts and run
/// commands.
pub trait WindowManager {
    /// The error type produced by this window manager.
    type Error: std::error::Error + Send + 'static;

    /// Layout text of `tag`, as produced by `dump`.
    fn dump(&self, tag: &str) -> Result<String, Self::Error>;

    /// Tags in index order.
    fn tags(&self) -> Result<Vec<TagInfo>, Self::Error>;

    /// Run a single command immediately and return its output.
    fn call(&self, command: &Command) -> Result<String, Self::Error>;

    /// Run `commands` as one chained call.  An empty slice is a no-op.
    fn chain(&self, commands: &[Command]) -> Result<(), Self::Error>;
}
