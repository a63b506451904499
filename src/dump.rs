//! Running `pg_dump` against a connection URL with a deadline.

use std::io;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::ExternalCommand;
use crate::descriptor::ConnectionDescriptor;
use crate::error::{ToolboxError, ToolboxResult};
use crate::toolbox::PgToolbox;

impl PgToolbox {
    /// Build the `pg_dump` invocation for `desc` writing to `out_file`.
    ///
    /// Produces a compressed custom-format archive with large objects and
    /// verbose progress. The password travels in the configured environment
    /// variable and never appears in the argument list.
    pub fn dump_command(
        &self,
        desc: &ConnectionDescriptor,
        out_file: &Path,
        timeout: Duration,
    ) -> ExternalCommand {
        ExternalCommand::new(&self.config().pg_dump_bin)
            .args(["-h", desc.host.as_str()])
            .args(["-p", desc.port.as_str()])
            .args(["-U", desc.user.as_str()])
            .args(["-d", desc.database.as_str()])
            .args(["-F", "c"])
            .arg("-b")
            .arg("-v")
            .arg("-f")
            .arg(out_file)
            .env(self.config().password_env.as_str(), desc.password.as_str())
            .timeout(timeout)
    }

    /// Dump the database at `db_url` into `out_file`.
    ///
    /// The URL is validated first; an invalid URL fails with
    /// [`ToolboxError::InvalidUrl`] before anything is spawned. `timeout`
    /// bounds the whole dump. If the deadline expires or `cancel` fires, the
    /// dump process is killed and whatever it left at `out_file` is removed.
    /// Use [`ToolboxError::is_timeout`] and [`ToolboxError::is_cancelled`] to
    /// tell those cases apart from other failures.
    ///
    /// That removal does not distinguish a partial dump from a file that was
    /// already at `out_file` before the call: an existing backup at the same
    /// path is deleted too, even if the child was killed before opening it.
    /// Write to a fresh path when an earlier backup must survive a failed run.
    pub async fn pg_dump_to_file(
        &self,
        db_url: &str,
        out_file: impl AsRef<Path>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ToolboxResult<()> {
        let out_file = out_file.as_ref();
        let desc = ConnectionDescriptor::parse(db_url)?;

        info!(
            target_db = %desc,
            out_file = %out_file.display(),
            timeout = ?timeout,
            "Starting pg_dump"
        );

        match self.dump_command(&desc, out_file, timeout).run(cancel).await {
            Ok(()) => {
                info!(out_file = %out_file.display(), "pg_dump finished");
                Ok(())
            }
            Err(e) => {
                if e.was_killed() {
                    remove_partial_dump(out_file).await;
                }
                Err(ToolboxError::DumpFailed(e))
            }
        }
    }
}

async fn remove_partial_dump(out_file: &Path) {
    match tokio::fs::remove_file(out_file).await {
        Ok(()) => debug!(out_file = %out_file.display(), "Removed partial dump"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            out_file = %out_file.display(),
            error = %e,
            "Failed to remove partial dump"
        ),
    }
}

/// Dump the database at `db_url` into `out_file` with the default
/// configuration.
///
/// See [`PgToolbox::pg_dump_to_file`].
pub async fn pg_dump_to_file(
    db_url: &str,
    out_file: impl AsRef<Path>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ToolboxResult<()> {
    PgToolbox::default()
        .pg_dump_to_file(db_url, out_file, timeout, cancel)
        .await
}
