use thiserror::Error;

/// Errors that can occur during logger setup
#[derive(Debug, Error)]
pub enum SetupError {
    /// `log` records are already bridged into `tracing`
    #[error("log tracer already initialized")]
    LogTracerAlreadyInitialized,

    #[error("global tracing subscriber already set")]
    SubscriberAlreadySet,
}
