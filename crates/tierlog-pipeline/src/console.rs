//! Immediate console emission of every entry.

use tierlog_core::logging::ENTRY_TARGET;
use tierlog_core::{LogEntry, LogLevel};
use tracing::{debug, error, info, warn};

/// Emit `entry` through `tracing` under the [`ENTRY_TARGET`] target.
///
/// The installed subscriber decides format and destination; filtering on
/// the target separates application entries from pipeline diagnostics.
pub(crate) fn emit(entry: &LogEntry) {
    let meta = entry.metadata();
    let request_id = meta.request_id();
    let metadata = if meta.is_empty() {
        String::new()
    } else {
        serde_json::to_string(meta).unwrap_or_default()
    };

    macro_rules! emit_at {
        ($mac:ident) => {
            $mac!(
                target: ENTRY_TARGET,
                entry_id = %entry.id(),
                log_type = entry.log_type().as_str(),
                request_id,
                metadata = metadata.as_str(),
                "{}",
                entry.message()
            )
        };
    }

    match entry.level() {
        LogLevel::Debug => emit_at!(debug),
        LogLevel::Info => emit_at!(info),
        LogLevel::Warn => emit_at!(warn),
        LogLevel::Error => emit_at!(error),
    }
}
