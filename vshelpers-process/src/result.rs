use std::process::ExitStatus;

use bytes::Bytes;
use vshelpers_commons::{Encoding, Result};

/// The exited process a [`ProcessResult`] came from.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    program: String,
    args: Vec<String>,
    pid: Option<u32>,
    status: ExitStatus,
}

impl ProcessHandle {
    pub(crate) fn new(program: String, args: Vec<String>, pid: Option<u32>, status: ExitStatus) -> Self {
        Self {
            program,
            args,
            pid,
            status,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// OS process id, if it was still known after spawning.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn status(&self) -> ExitStatus {
        self.status
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Signal that terminated the process (Unix only).
    pub fn signal(&self) -> Option<i32> {
        exit_signal(&self.status)
    }
}

/// Captured output of one finished command.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub stdout: Bytes,
    pub stderr: Bytes,
    pub handle: ProcessHandle,
}

impl ProcessResult {
    /// Decode standard output; blank or None uses UTF-8.
    pub fn stdout_text(&self, encoding: Option<&str>) -> Result<String> {
        Ok(Encoding::resolve(encoding, Encoding::Utf8)?.decode(&self.stdout))
    }

    pub fn stderr_text(&self, encoding: Option<&str>) -> Result<String> {
        Ok(Encoding::resolve(encoding, Encoding::Utf8)?.decode(&self.stderr))
    }
}

#[cfg(unix)]
pub(crate) fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
pub(crate) fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
