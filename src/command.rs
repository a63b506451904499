//! Running external tools with a deadline and cancellation.
//!
//! Both the dump and migration steps go through [`ExternalCommand`]: the child
//! inherits this process's stdout/stderr, gets the caller's environment plus
//! any extra variables, and is killed if the deadline expires or the
//! [`CancellationToken`] fires first.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CommandError;

/// An external program invocation.
#[derive(Clone)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl ExternalCommand {
    /// Create a command for `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            timeout: None,
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable on top of the inherited environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Bound the whole run by `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The program being run.
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// The arguments passed to the program.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// The deadline, if one is set.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Keys of the extra environment variables.
    pub fn env_keys(&self) -> impl Iterator<Item = &str> {
        self.envs.iter().map(|(k, _)| k.as_str())
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Run the command to completion.
    ///
    /// Returns once the child has exited. On deadline expiry or cancellation
    /// the child is killed and reaped before the error is returned, so the
    /// caller may safely clean up anything the child was writing.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), CommandError> {
        let program = self.program_name();

        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled { program });
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        debug!(
            program = %program,
            args = ?self.args,
            env = ?self.env_keys().collect::<Vec<_>>(),
            timeout_ms = ?self.timeout.map(|t| t.as_millis()),
            "Spawning external command"
        );

        let mut child = cmd.spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CommandError::NotFound {
                    program: program.clone(),
                    source,
                }
            } else {
                CommandError::Spawn {
                    program: program.clone(),
                    source,
                }
            }
        })?;

        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        let killed = tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|source| CommandError::Wait {
                    program: program.clone(),
                    source,
                })?;
                debug!(program = %program, status = %status, "External command exited");
                if status.success() {
                    return Ok(());
                }
                return Err(CommandError::Exit { program: program.clone(), status });
            }
            _ = deadline => CommandError::TimedOut {
                program: program.clone(),
                // `deadline` only completes when a timeout is set
                timeout: self.timeout.unwrap_or_default(),
            },
            _ = cancel.cancelled() => CommandError::Cancelled { program: program.clone() },
        };

        warn!(program = %program, reason = %killed, "Killing external command");
        if let Err(e) = child.kill().await {
            warn!(program = %program, error = %e, "Failed to kill external command");
        }

        Err(killed)
    }
}

impl fmt::Debug for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalCommand")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &self.env_keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}
