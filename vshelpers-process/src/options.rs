use std::ffi::OsString;
use std::path::PathBuf;

use vshelpers_commons::EnvMap;

/// Per-call settings for [`ProcessRunner::run`](crate::ProcessRunner::run).
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Working directory for the process (inherits the current one if None).
    pub cwd: Option<PathBuf>,
    /// Complete environment for the process. When None, the runner's
    /// environment provider supplies it.
    pub env: Option<EnvMap>,
    /// Encoding applied to textual output; blank or None uses the default.
    pub encoding: Option<String>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Replace the environment with exactly these variables.
    pub fn env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

/// Shell family used by [`ProcessRunner::run_shell`](crate::ProcessRunner::run_shell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellKind {
    Unix,
    Windows,
}

impl ShellKind {
    /// Shell of the platform this binary was built for.
    pub const fn native() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }

    /// Program and leading arguments that run `command_line`.
    pub fn invocation(self, command_line: String) -> (&'static str, Vec<String>) {
        match self {
            Self::Unix => ("sh", vec!["-c".to_string(), command_line]),
            Self::Windows => ("cmd", vec!["/C".to_string(), command_line]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_sets_every_field() {
        let opts = RunOptions::new()
            .cwd("/tmp")
            .env([("A", "1")])
            .encoding("latin1");

        assert_eq!(opts.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(opts.encoding.as_deref(), Some("latin1"));
        let env = opts.env.unwrap_or_default();
        assert_eq!(env.get(&OsString::from("A")), Some(&OsString::from("1")));
    }

    #[test]
    fn shell_invocations() {
        assert_eq!(
            ShellKind::Unix.invocation("ls -la".to_string()),
            ("sh", vec!["-c".to_string(), "ls -la".to_string()])
        );
        assert_eq!(ShellKind::Windows.invocation("dir".to_string()).0, "cmd");
    }
}
