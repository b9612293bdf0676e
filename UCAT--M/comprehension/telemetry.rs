use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{DrillEvent, EventPublisher};
use shared_logging::{JsonLogger, LogLevel, LogRecord, LogSink};
use tokio::runtime::{Handle, Runtime};

/// Builder configuring comprehension telemetry sinks.
pub struct ComprehensionTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    sink: Option<Arc<dyn LogSink>>,
    min_level: LogLevel,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl ComprehensionTelemetryBuilder {
    /// Creates a new builder for the given module label.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            sink: None,
            min_level: LogLevel::Info,
            event_publisher: None,
        }
    }

    /// Writes JSON lines to this file.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Writes to a caller-supplied sink instead of a file.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Drops records below `level`.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Registers the publisher receiving scored-session events.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Finalizes the builder.
    pub fn build(self) -> Result<ComprehensionTelemetry> {
        let sink: Option<Arc<dyn LogSink>> = match (self.sink, self.log_path) {
            (Some(sink), _) => Some(sink),
            (None, Some(path)) => Some(Arc::new(JsonLogger::with_min_level(path, self.min_level)?)),
            (None, None) => None,
        };
        let event = self.event_publisher.map(EventHandle::new).transpose()?;
        Ok(ComprehensionTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                min_level: self.min_level,
                sink,
                event,
            }),
        })
    }
}

/// Telemetry handle shared by the synthesizer, catalog and scorer.
#[derive(Clone)]
pub struct ComprehensionTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for ComprehensionTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComprehensionTelemetry")
            .field("module", &self.inner.module)
            .field("min_level", &self.inner.min_level)
            .finish_non_exhaustive()
    }
}

struct TelemetryInner {
    module: String,
    min_level: LogLevel,
    sink: Option<Arc<dyn LogSink>>,
    event: Option<EventHandle>,
}

struct EventHandle {
    runtime: Runtime,
    publisher: Arc<dyn EventPublisher>,
}

impl EventHandle {
    fn new(publisher: Arc<dyn EventPublisher>) -> Result<Self> {
        Ok(Self {
            runtime: Runtime::new()?,
            publisher,
        })
    }

    fn publish(&self, event: DrillEvent) -> Result<()> {
        if let Ok(handle) = Handle::try_current() {
            let publisher = Arc::clone(&self.publisher);
            handle.spawn(async move {
                if let Err(err) = publisher.publish(event).await {
                    eprintln!("drill event publish failed: {err:?}");
                }
            });
            Ok(())
        } else {
            self.runtime.block_on(self.publisher.publish(event))
        }
    }
}

impl ComprehensionTelemetry {
    /// Returns a builder for this telemetry helper.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> ComprehensionTelemetryBuilder {
        ComprehensionTelemetryBuilder::new(module)
    }

    /// Logs a structured record.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if level < self.inner.min_level {
            return Ok(());
        }
        if let Some(sink) = &self.inner.sink {
            let record = LogRecord::new(&self.inner.module, level, message).with_fields(metadata);
            sink.write(&record)?;
        }
        Ok(())
    }

    /// Publishes a prepared event as-is.
    pub fn publish(&self, event: DrillEvent) -> Result<()> {
        if let Some(handle) = &self.inner.event {
            handle.publish(event)?;
        }
        Ok(())
    }
}

/// Logs through an optional handle, swallowing sink failures.
pub(crate) fn log_quietly(
    telemetry: Option<&ComprehensionTelemetry>,
    level: LogLevel,
    message: &str,
    metadata: Value,
) {
    if let Some(tel) = telemetry {
        let _ = tel.log(level, message, metadata);
    }
}
