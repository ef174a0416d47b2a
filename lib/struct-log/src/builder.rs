use std::env;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::error::SetupError;
use crate::formatting_layer::JsonLogLayer;
use crate::storage::StorageLayer;

const DEFAULT_FILTER: &str = "warn";

/// Builder for the stderr logger
pub struct StructLogBuilder {
    application: String,
    version: String,
    hostname: Option<String>,
    json_enabled: bool,
}

impl StructLogBuilder {
    pub fn new(application: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            version: version.into(),
            hostname: None,
            json_enabled: false,
        }
    }

    /// Override the hostname reported in JSON lines
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn json_enabled(mut self, enabled: bool) -> Self {
        self.json_enabled = enabled;
        self
    }

    /// Enable JSON output when `JSON_LOG` parses as `true`
    pub fn json_from_env(mut self) -> Self {
        self.json_enabled = env::var("JSON_LOG").is_ok_and(|s| s.parse().unwrap_or_default());
        self
    }

    fn filter() -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }

    pub fn init(self) -> Result<Option<WorkerGuard>, SetupError> {
        if !self.json_enabled {
            tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .with_env_filter(Self::filter())
                .try_init()
                .map_err(|_| SetupError::SubscriberAlreadySet)?;
            return Ok(None);
        }

        LogTracer::init().map_err(|_| SetupError::LogTracerAlreadyInitialized)?;

        let (non_blocking, guard) = tracing_appender::non_blocking(io::stderr());

        let layer = match self.hostname {
            Some(hostname) => JsonLogLayer::with_hostname(self.application, self.version, hostname, non_blocking),
            None => JsonLogLayer::new(self.application, self.version, non_blocking),
        };

        let subscriber = Registry::default()
            .with(Self::filter())
            .with(StorageLayer)
            .with(layer);

        tracing::subscriber::set_global_default(subscriber).map_err(|_| SetupError::SubscriberAlreadySet)?;

        Ok(Some(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_disabled_by_default() {
        let builder = StructLogBuilder::new("vault_approle", "0.1.0");
        assert!(!builder.json_enabled);
        assert!(builder.json_enabled(true).json_enabled);
    }

    #[test]
    fn test_hostname_override() {
        let builder = StructLogBuilder::new("vault_approle", "0.1.0").hostname("runner-1");
        assert_eq!(builder.hostname.as_deref(), Some("runner-1"));
    }
}
