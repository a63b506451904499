//! Operator-facing progress lines.

use std::fmt::Display;

use chrono::{Local, SecondsFormat};
use tracing::info;

/// Print a timestamped progress line to stdout and mirror it to tracing.
pub(crate) fn announce(message: impl Display) {
    let ts = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
    println!("[{}] {}", ts, message);
    info!("{}", message);
}
