//! Call instrumentation.
//!
//! [`wrap`] turns an async operation into an [`Instrumented`] one that reports
//! every call to a [`LogSink`]: a `Started` line before the operation runs,
//! then exactly one `Succeeded` or `Failed` line. Results and errors pass
//! through untouched.

use std::fmt::{self, Debug, Display};
use std::fs::OpenOptions;
use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::core::config::{LoggingConfig, SinkKind};

/// Target of the events emitted by [`TracingSink`].
pub const CALL_LOG_TARGET: &str = "xrates::calls";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Destination of call log lines.
pub trait LogSink: Send + Sync {
    fn emit(&self, level: LogLevel, message: &str);
}

/// Leveled sink, emits each line as a `tracing` event tagged with a logger name.
pub struct TracingSink {
    logger: String,
}

impl TracingSink {
    pub fn new(logger: impl Into<String>) -> Self {
        Self {
            logger: logger.into(),
        }
    }
}

impl LogSink for TracingSink {
    fn emit(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => info!(target: CALL_LOG_TARGET, logger = %self.logger, "{message}"),
            LogLevel::Error => error!(target: CALL_LOG_TARGET, logger = %self.logger, "{message}"),
        }
    }
}

/// Raw text sink, appends every message as one line.
pub struct StreamSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StreamSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Opens `path` for appending, creating it when missing.
    pub fn append_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::new(file))
    }
}

impl LogSink for StreamSink {
    fn emit(&self, _level: LogLevel, message: &str) {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(writer, "{message}").and_then(|_| writer.flush()) {
            warn!(error = %e, "Failed to write call log line");
        }
    }
}

/// Builds the sink selected by the logging configuration.
pub fn sink_from_config(config: &LoggingConfig) -> io::Result<Arc<dyn LogSink>> {
    let sink: Arc<dyn LogSink> = match config.sink {
        SinkKind::Logger => Arc::new(TracingSink::new(config.logger_name.clone())),
        SinkKind::Stream => match &config.log_file {
            Some(path) => Arc::new(StreamSink::append_file(path)?),
            None => Arc::new(StreamSink::stdout()),
        },
    };
    Ok(sink)
}

/// Arguments of an instrumented call, as echoed in the `Started` line.
pub trait CallArgs {
    fn positional(&self) -> String;

    fn keyword(&self) -> String {
        "{}".to_string()
    }
}

/// Positional-only arguments, rendered with `Debug`.
#[derive(Debug, Clone, PartialEq)]
pub struct Positional<T>(pub T);

impl<T: Debug> CallArgs for Positional<T> {
    fn positional(&self) -> String {
        format!("{:?}", self.0)
    }
}

/// Name under which an error shows up in the `Failed` line.
pub trait ErrorKind {
    fn kind(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Started {
        op: String,
        args: String,
        kwargs: String,
    },
    Succeeded {
        op: String,
        result: String,
    },
    Failed {
        op: String,
        kind: String,
        message: String,
    },
}

impl LogEvent {
    pub fn level(&self) -> LogLevel {
        match self {
            LogEvent::Started { .. } | LogEvent::Succeeded { .. } => LogLevel::Info,
            LogEvent::Failed { .. } => LogLevel::Error,
        }
    }
}

impl Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = self.level();
        match self {
            LogEvent::Started { op, args, kwargs } => {
                write!(f, "{level}: {op} called with args={args}, kwargs={kwargs}")
            }
            LogEvent::Succeeded { op, result } => write!(f, "{level}: {op} returned {result}"),
            LogEvent::Failed { op, kind, message } => {
                write!(f, "{level}: {op} raised {kind}: {message}")
            }
        }
    }
}

/// Descriptive fields of a wrapped operation, copied onto the wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMeta {
    pub name: String,
    pub description: Option<String>,
}

impl OperationMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

pub struct Instrumented<F> {
    meta: OperationMeta,
    sink: Arc<dyn LogSink>,
    operation: F,
}

/// Wraps `operation` so every call is reported to `sink`.
pub fn wrap<F>(meta: OperationMeta, sink: Arc<dyn LogSink>, operation: F) -> Instrumented<F> {
    Instrumented {
        meta,
        sink,
        operation,
    }
}

impl<F> Instrumented<F> {
    pub fn meta(&self) -> &OperationMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    pub async fn call<A, Fut, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        A: CallArgs,
        Fut: Future<Output = Result<T, E>>,
        T: Debug,
        E: ErrorKind + Display,
    {
        self.report(LogEvent::Started {
            op: self.meta.name.clone(),
            args: args.positional(),
            kwargs: args.keyword(),
        });

        match (self.operation)(args).await {
            Ok(result) => {
                self.report(LogEvent::Succeeded {
                    op: self.meta.name.clone(),
                    result: format!("{result:?}"),
                });
                Ok(result)
            }
            Err(err) => {
                self.report(LogEvent::Failed {
                    op: self.meta.name.clone(),
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn report(&self, event: LogEvent) {
        self.sink.emit(event.level(), &event.to_string());
    }
}
