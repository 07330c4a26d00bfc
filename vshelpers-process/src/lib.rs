//! External process output capture.
//!
//! [`ProcessRunner`] spawns a command, drains its standard output and
//! standard error through the `vshelpers-buffer` normalizer and hands back a
//! [`ProcessResult`] holding both buffers and a [`ProcessHandle`] for the
//! exited process, or the first error encountered.

pub mod options;
pub mod result;
pub mod runner;

pub use options::{RunOptions, ShellKind};
pub use result::{ProcessHandle, ProcessResult};
pub use runner::{ProcessRunner, run};
