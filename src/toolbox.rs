//! The configured entry point for toolbox operations.

use crate::config::ToolboxConfig;

/// Toolbox operations bound to a [`ToolboxConfig`].
///
/// The free functions [`crate::pg_dump_to_file`] and
/// [`crate::drop_tables_and_migrate`] use [`PgToolbox::default`].
#[derive(Debug, Clone, Default)]
pub struct PgToolbox {
    config: ToolboxConfig,
}

impl PgToolbox {
    /// Create a toolbox with the given configuration.
    pub fn new(config: ToolboxConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ToolboxConfig {
        &self.config
    }
}

impl From<ToolboxConfig> for PgToolbox {
    fn from(config: ToolboxConfig) -> Self {
        Self::new(config)
    }
}
