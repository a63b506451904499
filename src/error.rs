//! Error types for toolbox operations.

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result type for toolbox operations.
pub type ToolboxResult<T> = Result<T, ToolboxError>;

/// Errors produced while validating a connection URL.
#[derive(Error, Debug)]
pub enum UrlError {
    /// The input string was empty.
    #[error("empty database URL")]
    EmptyInput,

    /// The input could not be parsed as a URL.
    #[error("malformed database URL: {0}")]
    Malformed(#[from] url::ParseError),

    /// A percent-encoded component does not decode to valid UTF-8.
    #[error("database URL {component} is not valid UTF-8 after percent-decoding")]
    InvalidEncoding {
        /// Name of the offending component.
        component: &'static str,
    },

    /// The URL parsed, but one or more required components are empty.
    #[error(
        "incomplete database URL (missing {}); got user={user:?} host={host:?} port={port:?} db={database:?}",
        .missing.join(", ")
    )]
    Incomplete {
        /// Names of the empty components.
        missing: Vec<&'static str>,
        /// Resolved user name.
        user: String,
        /// Resolved host.
        host: String,
        /// Resolved port.
        port: String,
        /// Resolved database name.
        database: String,
    },
}

impl UrlError {
    /// Check if the URL was missing a given component (`"user"`, `"password"`,
    /// `"host"`, `"port"` or `"database"`).
    pub fn is_missing(&self, component: &str) -> bool {
        match self {
            Self::Incomplete { missing, .. } => missing.iter().any(|m| *m == component),
            _ => false,
        }
    }
}

/// Errors produced while running an external command.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The executable could not be found.
    #[error("{program}: executable not found")]
    NotFound {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process could not be started for another reason.
    #[error("{program}: failed to start: {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the process failed.
    #[error("{program}: failed to wait for process: {source}")]
    Wait {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("{program}: {status}")]
    Exit {
        /// Program that was invoked.
        program: String,
        /// Exit status of the process.
        status: ExitStatus,
    },

    /// The deadline expired and the process was killed.
    #[error("{program}: deadline of {}ms exceeded, process killed", .timeout.as_millis())]
    TimedOut {
        /// Program that was invoked.
        program: String,
        /// The deadline that expired.
        timeout: Duration,
    },

    /// The caller cancelled the operation and the process was killed.
    #[error("{program}: cancelled, process killed")]
    Cancelled {
        /// Program that was invoked.
        program: String,
    },
}

impl CommandError {
    /// Name of the program the error refers to.
    pub fn program(&self) -> &str {
        match self {
            Self::NotFound { program, .. }
            | Self::Spawn { program, .. }
            | Self::Wait { program, .. }
            | Self::Exit { program, .. }
            | Self::TimedOut { program, .. }
            | Self::Cancelled { program } => program,
        }
    }

    /// Check if the process was killed because its deadline expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Check if the process was killed because the caller cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Check if the executable was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if the process was killed before it finished.
    pub fn was_killed(&self) -> bool {
        self.is_timeout() || self.is_cancelled()
    }

    /// Exit code of the process, if it exited on its own with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { status, .. } => status.code(),
            _ => None,
        }
    }
}

/// Errors that can occur during toolbox operations.
#[derive(Error, Debug)]
pub enum ToolboxError {
    /// The connection URL failed validation.
    #[error("invalid database URL: {0}")]
    InvalidUrl(#[from] UrlError),

    /// Dropping the tables failed.
    #[error("drop tables: {0}")]
    SchemaResetFailed(#[source] tokio_postgres::Error),

    /// Dropping the tables was cancelled by the caller.
    #[error("drop tables: cancelled")]
    SchemaResetCancelled,

    /// Tables were dropped but the migration tool failed.
    #[error("migrate up failed: {0}")]
    MigrationFailed(#[source] CommandError),

    /// The dump tool failed.
    #[error("pg_dump failed: {0}")]
    DumpFailed(#[source] CommandError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// File system error.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ToolboxError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    fn command(&self) -> Option<&CommandError> {
        match self {
            Self::MigrationFailed(e) | Self::DumpFailed(e) => Some(e),
            _ => None,
        }
    }

    /// Check if the operation failed because a deadline expired.
    pub fn is_timeout(&self) -> bool {
        self.command().is_some_and(CommandError::is_timeout)
    }

    /// Check if the operation failed because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::SchemaResetCancelled)
            || self.command().is_some_and(CommandError::is_cancelled)
    }

    /// Check if the operation failed because an executable was missing.
    pub fn is_not_found(&self) -> bool {
        self.command().is_some_and(CommandError::is_not_found)
    }
}
