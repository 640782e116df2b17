//! JSON and JSONL output for diff results.
//!
//! [`OutputWriter`] serializes arbitrary items; [`JsonResultSink`] plugs it
//! into the batch driver as a [`ResultSink`].

use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::collab::ResultSink;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{JobKey, PageRecord};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// A writer that serializes items to JSON or JSONL format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer. `pretty` only affects JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write multiple items.
    ///
    /// For JSON format, writes as a JSON array.
    /// For JSONL format, writes one object per line.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, items)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, items).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += items.len();
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    /// Get the number of items written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// A page record tagged with the job it belongs to.
#[derive(Debug, Serialize)]
pub struct PageOutput<'a> {
    pub project: &'a str,
    pub run: &'a str,
    #[serde(flatten)]
    pub record: &'a PageRecord,
}

impl<'a> PageOutput<'a> {
    pub fn new(job: &'a JobKey, record: &'a PageRecord) -> Self {
        Self {
            project: &job.project,
            run: &job.run,
            record,
        }
    }
}

struct SinkState<W: Write> {
    writer: OutputWriter<W>,
    /// JSON format only: records held until `finish` writes the array
    pending: Vec<serde_json::Value>,
}

/// Result sink that writes each page as it completes.
///
/// JSONL lines are written (and flushed) immediately. JSON output is an
/// array, so it is buffered and written by [`JsonResultSink::finish`].
pub struct JsonResultSink<W: Write + Send> {
    state: Mutex<SinkState<W>>,
    format: OutputFormat,
}

impl<W: Write + Send> JsonResultSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer: OutputWriter::new(writer, format, true),
                pending: Vec::new(),
            }),
            format,
        }
    }

    /// Write any buffered records and return the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        let mut state = self
            .state
            .into_inner()
            .map_err(|_| io::Error::other("result sink poisoned"))?;
        if self.format == OutputFormat::Json {
            let pending = std::mem::take(&mut state.pending);
            state.writer.write_all(&pending)?;
        }
        state.writer.flush()?;
        Ok(state.writer.into_inner())
    }
}

impl<W: Write + Send> ResultSink for JsonResultSink<W> {
    fn record_page(&self, job: &JobKey, record: &PageRecord) -> PipelineResult<()> {
        let store_err = |message: String| PipelineError::Store { message };
        let mut state = self
            .state
            .lock()
            .map_err(|_| store_err("result sink poisoned".to_string()))?;
        let output = PageOutput::new(job, record);

        match self.format {
            OutputFormat::JsonLines => {
                let write_err = |e: io::Error| store_err(format!("Cannot write result: {e}"));
                state.writer.write(&output).map_err(write_err)?;
                state.writer.flush().map_err(write_err)?;
            }
            OutputFormat::Json => {
                let value = serde_json::to_value(&output)
                    .map_err(|e| store_err(format!("Cannot serialize result: {e}")))?;
                state.pending.push(value);
            }
        }
        Ok(())
    }
}

/// Convenience function to serialize an item to a JSON string.
pub fn to_json<T: Serialize>(item: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(item)
    } else {
        serde_json::to_string(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiffStatus, Viewport, ViewportRecord};
    use std::collections::BTreeMap;

    fn record(page: &str) -> PageRecord {
        let mut viewports = BTreeMap::new();
        viewports.insert(
            Viewport::Mobile,
            ViewportRecord::failed("File not found: prod.png"),
        );
        PageRecord::from_viewports(page, viewports)
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("jsonl"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("NDJSON"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn test_write_all_json_array() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write_all(&[record("a"), record("b")]).unwrap();
        assert_eq!(writer.items_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with('['));
        assert!(output.trim().ends_with(']'));
    }

    #[test]
    fn test_jsonl_sink_flattens_job() {
        let sink = JsonResultSink::new(Vec::new(), OutputFormat::JsonLines);
        let job = JobKey::new("shop", "r1");
        sink.record_page(&job, &record("home")).unwrap();
        sink.record_page(&job, &record("cart")).unwrap();

        let output = String::from_utf8(sink.finish().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["project"], "shop");
        assert_eq!(first["run"], "r1");
        assert_eq!(first["page"], "home");
        assert_eq!(first["status"], "failed");
        assert_eq!(first["viewports"]["mobile"]["status"], "failed");
        assert!(first["viewports"]["mobile"].get("metrics").is_none());
    }

    #[test]
    fn test_json_sink_writes_array_on_finish() {
        let sink = JsonResultSink::new(Vec::new(), OutputFormat::Json);
        let job = JobKey::new("shop", "r1");
        sink.record_page(&job, &record("home")).unwrap();
        sink.record_page(&job, &record("cart")).unwrap();

        let output = String::from_utf8(sink.finish().unwrap()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let pages = parsed.as_array().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1]["page"], "cart");
    }

    #[test]
    fn test_record_round_trips() {
        let original = record("home");
        let json = to_json(&original, false).unwrap();
        let back: PageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
        assert_eq!(back.viewports[&Viewport::Mobile].status, DiffStatus::Failed);
    }
}
