//! Launch external commands and capture their output.
//!
//! Standard output and standard error are wrapped as reader-backed
//! [`ReadableStream`]s and drained through the normalizer while the child is
//! awaited, so a chatty process can never stall on a full pipe. The outcome
//! of every call is delivered through its own [`CompletionGuard`].

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use bytes::Bytes;
use tokio::process::Command;
use vshelpers_buffer::{Normalizer, ReadableStream, Value, to_string_safe};
use vshelpers_commons::{
    CompletionGuard, EnvironmentProvider, Error, InheritedEnvironment, Result, RunnerConfig,
    normalize_encoding,
};

use crate::options::{RunOptions, ShellKind};
use crate::result::{ProcessHandle, ProcessResult, exit_signal};

pub struct ProcessRunner {
    config: RunnerConfig,
    normalizer: Normalizer,
    environment: Arc<dyn EnvironmentProvider>,
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("config", &self.config)
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            config: RunnerConfig::default(),
            normalizer: Normalizer::default(),
            environment: Arc::new(InheritedEnvironment),
        }
    }
}

impl ProcessRunner {
    /// Build a runner from validated configuration. Processes inherit the
    /// current environment unless [`Self::with_environment`] says otherwise.
    pub fn new(config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        let normalizer = Normalizer::new(&config.normalizer)?;
        Ok(Self {
            config,
            normalizer,
            environment: Arc::new(InheritedEnvironment),
        })
    }

    /// Use `provider` for calls that do not pass their own environment.
    pub fn with_environment(mut self, provider: impl EnvironmentProvider + 'static) -> Self {
        self.environment = Arc::new(provider);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `command` with `args` and capture both output streams.
    ///
    /// The command and every argument are converted with
    /// [`to_string_safe`]; argument order and count are kept exactly, nil
    /// and empty arguments included. Fails with [`Error::Spawn`] when the
    /// command cannot be launched and with [`Error::Execution`] when it exits
    /// unsuccessfully (unless `fail_on_nonzero_exit` is off). Output is never
    /// returned alongside an error.
    pub async fn run<I>(
        &self,
        command: impl Into<Value>,
        args: I,
        options: RunOptions,
    ) -> Result<ProcessResult>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let program = to_string_safe(&command.into());
        let args: Vec<String> = args
            .into_iter()
            .map(|arg| to_string_safe(&arg.into()))
            .collect();

        let (guard, outcome) = CompletionGuard::<ProcessResult, Error>::channel();
        self.execute(program, args, &options, &guard).await;
        outcome.await.unwrap_or(Err(Error::Interrupted))
    }

    /// Run a whole command line through the platform shell.
    pub async fn run_shell(
        &self,
        command_line: impl Into<Value>,
        options: RunOptions,
    ) -> Result<ProcessResult> {
        let (shell, args) = ShellKind::native().invocation(to_string_safe(&command_line.into()));
        self.run(shell, args, options).await
    }

    /// Spawn the command and settle `guard` from whichever step ends the
    /// run: spawn failure, a failed wait or drain, a rejected exit status, or
    /// the finished result.
    async fn execute(
        &self,
        program: String,
        args: Vec<String>,
        options: &RunOptions,
        guard: &CompletionGuard<ProcessResult, Error>,
    ) {
        let env = match &options.env {
            Some(env) => env.clone(),
            None => self.environment.vars(),
        };
        let encoding = normalize_encoding(options.encoding.as_deref())
            .or_else(|| normalize_encoding(self.config.encoding.as_deref()));

        let mut command = Command::new(&program);
        command
            .args(&args)
            .env_clear()
            .envs(&env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &options.cwd {
            command.current_dir(cwd);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                tracing::debug!(%program, error = %source, "failed to spawn process");
                guard.fail(Error::Spawn { program, source });
                return;
            }
        };
        let pid = child.id();
        tracing::debug!(%program, ?args, ?pid, "spawned process");

        let stdout = stream_value(child.stdout.take().map(ReadableStream::from_reader));
        let stderr = stream_value(child.stderr.take().map(ReadableStream::from_reader));

        let joined = tokio::try_join!(
            async { child.wait().await.map_err(Error::Io) },
            self.normalizer.normalize(stderr, encoding.as_deref()),
            self.normalizer.normalize(stdout, encoding.as_deref()),
        );
        let (status, stderr, stdout) = match joined {
            Ok(outputs) => outputs,
            Err(error) => {
                tracing::debug!(%program, ?pid, %error, "process output capture failed");
                guard.fail(error);
                return;
            }
        };
        tracing::debug!(%program, ?pid, code = ?status.code(), "process exited");

        if !status.success() && self.config.fail_on_nonzero_exit {
            guard.fail(Error::Execution {
                program,
                code: status.code(),
                signal: exit_signal(&status),
            });
            return;
        }

        guard.succeed(ProcessResult {
            stdout: stdout.unwrap_or_else(Bytes::new),
            stderr: stderr.unwrap_or_else(Bytes::new),
            handle: ProcessHandle::new(program, args, pid, status),
        });
    }
}

fn stream_value(stream: Option<ReadableStream>) -> Value {
    stream.map_or(Value::Nil, Value::Stream)
}

/// Run `command` with the default runner: inherited environment, UTF-8.
pub async fn run<I>(command: impl Into<Value>, args: I, options: RunOptions) -> Result<ProcessResult>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    ProcessRunner::default().run(command, args, options).await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vshelpers_commons::StaticEnvironment;

    fn path_only() -> StaticEnvironment {
        StaticEnvironment::new(std::env::var_os("PATH").map(|path| ("PATH", path)))
    }

    #[tokio::test]
    async fn captures_echo_output() -> anyhow::Result<()> {
        let result = run("echo", ["hello"], RunOptions::new()).await?;

        assert_eq!(result.stdout.as_ref(), b"hello\n");
        assert!(result.stderr.is_empty());
        assert!(result.handle.success());
        assert_eq!(result.handle.exit_code(), Some(0));
        assert_eq!(result.handle.program(), "echo");
        assert_eq!(result.handle.args(), ["hello".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn preserves_argument_order_and_empties() -> anyhow::Result<()> {
        let args: Vec<Value> = vec!["%s|".into(), "a".into(), "".into(), Value::Nil, 7.into()];
        let result = run("printf", args, RunOptions::new()).await?;
        assert_eq!(result.stdout_text(None)?, "a|||7|");
        Ok(())
    }

    #[tokio::test]
    async fn captures_stderr_separately() -> anyhow::Result<()> {
        let result = ProcessRunner::default()
            .run_shell("printf out; printf err >&2", RunOptions::new())
            .await?;
        assert_eq!(result.stdout.as_ref(), b"out");
        assert_eq!(result.stderr.as_ref(), b"err");
        Ok(())
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let err = run("definitely-not-a-real-binary-vshelpers", Vec::<String>::new(), RunOptions::new())
            .await
            .unwrap_err();
        match err {
            Error::Spawn { program, source } => {
                assert_eq!(program, "definitely-not-a-real-binary-vshelpers");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn every_exit_path_settles_the_call_guard_once() -> anyhow::Result<()> {
        let runner = ProcessRunner::default();

        let (guard, outcome) = CompletionGuard::<ProcessResult, Error>::channel();
        let missing = "definitely-not-a-real-binary-vshelpers".to_string();
        runner.execute(missing, Vec::new(), &RunOptions::new(), &guard).await;
        assert!(guard.has_fired());
        assert!(!guard.fail(Error::Interrupted));
        assert!(matches!(outcome.await?, Err(Error::Spawn { .. })));

        let (guard, outcome) = CompletionGuard::<ProcessResult, Error>::channel();
        let (shell, args) = ShellKind::native().invocation("exit 4".to_string());
        runner.execute(shell.to_string(), args, &RunOptions::new(), &guard).await;
        assert!(guard.has_fired());
        assert!(matches!(outcome.await?, Err(Error::Execution { code: Some(4), .. })));

        let (guard, outcome) = CompletionGuard::<ProcessResult, Error>::channel();
        runner.execute("echo".to_string(), vec!["ok".to_string()], &RunOptions::new(), &guard).await;
        assert!(guard.has_fired());
        assert!(!guard.fail(Error::Interrupted));
        let result = outcome.await?.map_err(anyhow::Error::from)?;
        assert_eq!(result.stdout.as_ref(), b"ok\n");
        Ok(())
    }

    #[tokio::test]
    async fn nonzero_exit_fails_without_partial_output() {
        let err = ProcessRunner::default()
            .run_shell("echo partial; exit 3", RunOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Execution { code: Some(3), .. }));
    }

    #[tokio::test]
    async fn nonzero_exit_can_be_inspected_when_allowed() -> anyhow::Result<()> {
        let config = RunnerConfig {
            fail_on_nonzero_exit: false,
            ..RunnerConfig::default()
        };
        let result = ProcessRunner::new(config)?
            .run_shell("echo partial; exit 3", RunOptions::new())
            .await?;
        assert!(!result.handle.success());
        assert_eq!(result.handle.exit_code(), Some(3));
        assert_eq!(result.stdout.as_ref(), b"partial\n");
        Ok(())
    }

    #[tokio::test]
    async fn uses_injected_environment() -> anyhow::Result<()> {
        let mut vars = path_only().vars();
        vars.insert("GREETING".into(), "from provider".into());
        let runner = ProcessRunner::default().with_environment(StaticEnvironment::new(vars));

        let result = runner.run_shell("printf \"$GREETING\"", RunOptions::new()).await?;
        assert_eq!(result.stdout_text(None)?, "from provider");

        let overridden = runner
            .run_shell(
                "printf \"${GREETING:-unset}\"",
                RunOptions::new().env(path_only().vars()),
            )
            .await?;
        assert_eq!(overridden.stdout_text(None)?, "unset");
        Ok(())
    }

    #[tokio::test]
    async fn runs_in_requested_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("marker.txt"), b"here")?;

        let result = run("cat", ["marker.txt"], RunOptions::new().cwd(dir.path())).await?;
        assert_eq!(result.stdout.as_ref(), b"here");
        Ok(())
    }

    #[tokio::test]
    async fn large_output_does_not_stall() -> anyhow::Result<()> {
        let result = ProcessRunner::default()
            .run_shell("head -c 300000 /dev/zero", RunOptions::new())
            .await?;
        assert_eq!(result.stdout.len(), 300_000);
        Ok(())
    }
}
