//! Reporting sink: renders device identities as output lines.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

use crate::config::OutputFormat;
use crate::device::{DeviceAction, DeviceIdentity};

/// Kind of report line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Present in the startup snapshot
    Present,
    Added,
    Removed,
}

impl ReportKind {
    /// Report kind for a live change; `None` for ignored actions
    pub fn for_action(action: &DeviceAction) -> Option<Self> {
        match action {
            DeviceAction::Added => Some(ReportKind::Added),
            DeviceAction::Removed => Some(ReportKind::Removed),
            DeviceAction::Other(_) => None,
        }
    }

    fn text_label(self) -> &'static str {
        match self {
            ReportKind::Present => "device",
            ReportKind::Added => "added",
            ReportKind::Removed => "removed",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text_label())
    }
}

/// Destination for report lines
pub trait ReportSink {
    fn record(&mut self, kind: ReportKind, device: &DeviceIdentity) -> io::Result<()>;
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn record(&mut self, kind: ReportKind, device: &DeviceIdentity) -> io::Result<()> {
        (**self).record(kind, device)
    }
}

/// JSON shape of one report line.
///
/// Paths that are not valid UTF-8 are rendered lossily, with U+FFFD for the
/// bad bytes, the same way the text format renders them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    pub kind: ReportKind,
    pub node: Option<String>,
    pub syspath: String,
}

impl ReportLine {
    pub fn new(kind: ReportKind, device: &DeviceIdentity) -> Self {
        Self {
            kind,
            node: device.node().map(|p| p.to_string_lossy().into_owned()),
            syspath: device.syspath().to_string_lossy().into_owned(),
        }
    }
}

/// Line-oriented reporter; every line is flushed as soon as it is written
pub struct LineReporter<W> {
    writer: W,
    format: OutputFormat,
    lines: usize,
}

impl<W: Write> LineReporter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            lines: 0,
        }
    }

    /// Number of lines written so far
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl LineReporter<io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> ReportSink for LineReporter<W> {
    fn record(&mut self, kind: ReportKind, device: &DeviceIdentity) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.writer, "{}: {}", kind, device)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, &ReportLine::new(kind, device))?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.writer.flush()?;
        self.lines += 1;
        Ok(())
    }
}
