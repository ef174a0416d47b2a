//! struct-log - structured logging for the vault modules
//!
//! Module results travel on stdout, so every log line goes to stderr. With
//! `JSON_LOG=true` each event is one JSON object per line; otherwise the
//! plain `tracing_subscriber::fmt` format is used. `RUST_LOG` filters both.

mod builder;
mod error;
mod formatting_layer;
mod storage;

pub use builder::StructLogBuilder;
pub use error::SetupError;
pub use formatting_layer::JsonLogLayer;
pub use storage::{FieldStorage, StorageLayer};
pub use tracing_appender::non_blocking::WorkerGuard;

/// Install the global subscriber for a module binary.
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn setup_logger(
    application: impl Into<String>,
    version: impl Into<String>,
) -> Result<Option<WorkerGuard>, SetupError> {
    StructLogBuilder::new(application, version).json_from_env().init()
}
