use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;
use std::io::Write;
use time::format_description::well_known::Rfc3339;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use crate::storage::FieldStorage;

/// Writes every event as a single JSON line
pub struct JsonLogLayer<W: for<'a> MakeWriter<'a> + 'static> {
    make_writer: W,
    hostname: String,
    version: String,
    application: String,
}

const DATE: &str = "date";
const RUNTIME: &str = "runtime";
const APPLICATION: &str = "application";
const LEVEL: &str = "level";
const HOSTNAME: &str = "hostname";
const MESSAGE: &str = "message";
const LOGGER: &str = "logger";
const LINENO: &str = "lineno";
const FILE: &str = "file";
const VERSION: &str = "version";

const RESERVED_FIELDS: [&str; 10] = [
    DATE,
    RUNTIME,
    APPLICATION,
    LEVEL,
    HOSTNAME,
    MESSAGE,
    LOGGER,
    LINENO,
    FILE,
    VERSION,
];

impl<W: for<'a> MakeWriter<'a> + 'static> JsonLogLayer<W> {
    pub fn new(application: String, version: String, make_writer: W) -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        Self::with_hostname(application, version, hostname, make_writer)
    }

    pub fn with_hostname(application: String, version: String, hostname: String, make_writer: W) -> Self {
        Self {
            make_writer,
            hostname,
            version,
            application,
        }
    }

    fn serialize_core_fields(
        &self,
        map_serializer: &mut impl SerializeMap<Error = serde_json::Error>,
        message: &str,
        event: &Event,
    ) -> Result<(), serde_json::Error> {
        let metadata = event.metadata();
        map_serializer.serialize_entry(RUNTIME, "rust")?;
        map_serializer.serialize_entry(APPLICATION, &self.application)?;
        map_serializer.serialize_entry(VERSION, &self.version)?;
        map_serializer.serialize_entry(HOSTNAME, &self.hostname)?;
        if let Ok(date) = time::OffsetDateTime::now_utc().format(&Rfc3339) {
            map_serializer.serialize_entry(DATE, &date)?;
        }
        map_serializer.serialize_entry(LEVEL, &metadata.level().as_str().to_lowercase())?;
        map_serializer.serialize_entry(LOGGER, metadata.target())?;
        map_serializer.serialize_entry(LINENO, &metadata.line())?;
        map_serializer.serialize_entry(FILE, &metadata.file())?;
        map_serializer.serialize_entry(MESSAGE, message)?;
        Ok(())
    }

    fn format<S>(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> Result<Vec<u8>, serde_json::Error>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let mut event_fields = FieldStorage::default();
        event.record(&mut event_fields);

        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::new(&mut buffer);
        let mut map_serializer = serializer.serialize_map(None)?;

        let message = event_message(event, &event_fields);
        self.serialize_core_fields(&mut map_serializer, message, event)?;

        for (key, value) in event_fields.values() {
            if !RESERVED_FIELDS.contains(&key.as_str()) {
                map_serializer.serialize_entry(key, value)?;
            }
        }

        // span fields, skipping names the event already set
        if let Some(span) = ctx.lookup_current() {
            if let Some(storage) = span.extensions().get::<FieldStorage>() {
                for (key, value) in storage.values() {
                    if !RESERVED_FIELDS.contains(&key.as_str()) && event_fields.get(key).is_none() {
                        map_serializer.serialize_entry(key, value)?;
                    }
                }
            }
        }

        map_serializer.end()?;
        Ok(buffer)
    }

    fn emit(&self, mut buffer: Vec<u8>) -> Result<(), std::io::Error> {
        buffer.write_all(b"\n")?;
        self.make_writer.make_writer().write_all(&buffer)
    }
}

impl<S, W> Layer<S> for JsonLogLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if let Ok(formatted) = self.format(event, &ctx) {
            let _ = self.emit(formatted);
        }
    }
}

/// The `message` field, or the event target when there is none.
fn event_message<'a>(event: &'a Event<'_>, fields: &'a FieldStorage) -> &'a str {
    match fields.get(MESSAGE) {
        Some(Value::String(message)) => message,
        _ => event.metadata().target(),
    }
}
