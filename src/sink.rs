//! Logging sinks that receive [`Event`]s.
//!
//! A sink decides how and where an event ends up. It only sees events through the
//! [`Event`] trait, so new event kinds can be logged without touching sink code.

use crate::event::{Event, Flag};
use crate::format::{PlainFormatter, TextFormatter};
use crate::Result;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Mutex;

/// A destination for log events.
pub trait EventSink: Send + Sync {
    /// Returns `true` if events with this flag should be handed to [`handle`](Self::handle).
    ///
    /// Callers check this before building an event, so disabled flags cost nothing.
    fn enabled(&self, _flag: &Flag) -> bool {
        true
    }

    /// Processes an event.
    ///
    /// # Errors
    ///
    /// Returns the rendering or write error; callers decide whether to surface it.
    fn handle(&self, event: &dyn Event) -> Result<()>;
}

/// Sends events to `tracing` as `INFO` records.
///
/// The rendered text goes into the message and the flag into a `flag` field.
#[derive(Debug, Default)]
pub struct TracingSink {
    flags: Option<HashSet<Flag>>,
}

impl TracingSink {
    /// Creates a sink that accepts every flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the sink to the given flags.
    pub fn with_flags(mut self, flags: impl IntoIterator<Item = Flag>) -> Self {
        self.flags = Some(flags.into_iter().collect());
        self
    }
}

impl EventSink for TracingSink {
    fn enabled(&self, flag: &Flag) -> bool {
        self.flags.as_ref().is_none_or(|flags| flags.contains(flag))
    }

    fn handle(&self, event: &dyn Event) -> Result<()> {
        let text = event.text(&PlainFormatter)?;
        tracing::info!(
            flag = %event.flag(),
            ts = %event.timestamp().to_rfc3339(),
            "{}",
            text
        );
        Ok(())
    }
}

/// How a [`WriterSink`] lays out each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `<timestamp> [<flag>] <text>` followed by a newline.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Writes events to any [`Write`] implementation, one record per line.
///
/// # Examples
///
/// ```
/// use outbound::sink::{EventSink, OutputFormat, WriterSink};
/// use outbound::event::OutgoingRequestEvent;
/// use outbound::meta::RequestMeta;
/// use std::sync::Arc;
///
/// let sink = WriterSink::new(Vec::new()).format(OutputFormat::Json);
/// let event = OutgoingRequestEvent::now(Arc::new(RequestMeta::new("GET", None)));
/// sink.handle(&event).unwrap();
///
/// let out = String::from_utf8(sink.into_inner()).unwrap();
/// assert!(out.starts_with(r#"{"flag":"request""#));
/// ```
pub struct WriterSink<W> {
    writer: Mutex<W>,
    format: OutputFormat,
    formatter: Box<dyn TextFormatter>,
    flags: Option<HashSet<Flag>>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Creates a text sink with plain status codes.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            format: OutputFormat::Text,
            formatter: Box::new(PlainFormatter),
            flags: None,
        }
    }

    /// Sets the output format.
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the formatter used in text mode.
    pub fn formatter(mut self, formatter: impl TextFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Restricts the sink to the given flags.
    pub fn with_flags(mut self, flags: impl IntoIterator<Item = Flag>) -> Self {
        self.flags = Some(flags.into_iter().collect());
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn render(&self, event: &dyn Event) -> Result<Vec<u8>> {
        let mut record = Vec::new();
        match self.format {
            OutputFormat::Text => {
                write!(record, "{} [{}] ", event.timestamp().to_rfc3339(), event.flag())?;
                event.write_text(self.formatter.as_ref(), &mut record)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut record, &event.to_json()?)?;
            }
        }
        record.push(b'\n');
        Ok(record)
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn enabled(&self, flag: &Flag) -> bool {
        self.flags.as_ref().is_none_or(|flags| flags.contains(flag))
    }

    fn handle(&self, event: &dyn Event) -> Result<()> {
        // Rendered before locking; the lock only covers the write.
        let record = self.render(event)?;
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(&record)?;
        writer.flush()?;
        Ok(())
    }
}
