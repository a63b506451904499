//! Dropping every table in the `public` schema, then running migrations.

use std::path::Path;

use tokio_postgres::{Client, NoTls};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::command::ExternalCommand;
use crate::error::{ToolboxError, ToolboxResult};
use crate::progress::announce;
use crate::toolbox::PgToolbox;

/// Drops every table in the `public` schema with `CASCADE`.
///
/// Runs as a single server-side block, so either every table goes or none do.
pub const DROP_ALL_TABLES_SQL: &str = r#"
DO
$$
DECLARE
    _tbl text;
BEGIN
    FOR _tbl IN
        SELECT tablename
        FROM pg_tables
        WHERE schemaname = 'public'
    LOOP
        EXECUTE 'DROP TABLE IF EXISTS ' || quote_ident(_tbl) || ' CASCADE';
    END LOOP;
END
$$;
"#;

/// Drop every table in the `public` schema.
///
/// The connection belongs to the caller and is left open. If `cancel` fires
/// while the statement is running, a cancel request is sent to the server
/// and [`ToolboxError::SchemaResetCancelled`] is returned.
pub async fn drop_all_tables(client: &Client, cancel: &CancellationToken) -> ToolboxResult<()> {
    if cancel.is_cancelled() {
        return Err(ToolboxError::SchemaResetCancelled);
    }

    debug!(sql = %DROP_ALL_TABLES_SQL, "Executing schema reset");

    tokio::select! {
        result = client.batch_execute(DROP_ALL_TABLES_SQL) => {
            result.map_err(ToolboxError::SchemaResetFailed)
        }
        _ = cancel.cancelled() => {
            if let Err(e) = client.cancel_token().cancel_query(NoTls).await {
                warn!(error = %e, "Failed to send cancel request for schema reset");
            }
            Err(ToolboxError::SchemaResetCancelled)
        }
    }
}

impl PgToolbox {
    /// Build the `migrate ... up` invocation for `db_url` and `migrations_path`.
    pub fn migrate_command(&self, db_url: &str, migrations_path: &Path) -> ExternalCommand {
        ExternalCommand::new(&self.config().migrate_bin)
            .arg("-database")
            .arg(db_url)
            .arg("-path")
            .arg(migrations_path)
            .arg("up")
            .timeout(self.config().migration_timeout)
    }

    /// Drop every table in the `public` schema, then apply migrations.
    ///
    /// The table drop always runs first; if it fails the migration tool is
    /// never started. `db_url` is handed to the migration tool as-is. When
    /// `migrations_path` is `None` or empty the migration step is skipped.
    pub async fn drop_tables_and_migrate(
        &self,
        client: &Client,
        db_url: &str,
        migrations_path: Option<&Path>,
        cancel: &CancellationToken,
    ) -> ToolboxResult<()> {
        announce("Clearing all tables in the database...");
        drop_all_tables(client, cancel).await?;
        announce("All tables cleared in the database.");

        let Some(path) = migrations_path.filter(|p| !p.as_os_str().is_empty()) else {
            announce("No migrations path provided; skipping migrate.");
            return Ok(());
        };

        announce(format_args!(
            "Running DB migrations from {}...",
            path.display()
        ));
        self.migrate_command(db_url, path)
            .run(cancel)
            .await
            .map_err(ToolboxError::MigrationFailed)?;
        announce("Migrations applied.");

        Ok(())
    }
}

/// Drop every table in the `public` schema, then apply migrations with the
/// default configuration.
///
/// See [`PgToolbox::drop_tables_and_migrate`].
pub async fn drop_tables_and_migrate(
    client: &Client,
    db_url: &str,
    migrations_path: Option<&Path>,
    cancel: &CancellationToken,
) -> ToolboxResult<()> {
    PgToolbox::default()
        .drop_tables_and_migrate(client, db_url, migrations_path, cancel)
        .await
}
