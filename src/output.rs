// Streaming writers for churn records.

use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::OutputFormat;
use crate::error::Result;
use crate::model::ChurnRecord;

/// Receives each record as soon as its commit is processed.
pub trait ChurnSink {
    fn append(&mut self, record: &ChurnRecord) -> Result<()>;

    /// Called once, after the last record of a successful run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl ChurnSink for Vec<ChurnRecord> {
    fn append(&mut self, record: &ChurnRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Writes a single JSON array. The closing bracket is only written by
/// `finish`, so a failed run leaves an unterminated array behind.
pub struct JsonArraySink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonArraySink<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writer.write_all(b"[")?;
        writer.flush()?;
        Ok(Self { writer, written: 0 })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChurnSink for JsonArraySink<W> {
    fn append(&mut self, record: &ChurnRecord) -> Result<()> {
        if self.written > 0 {
            self.writer.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.write_all(b"]")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// One JSON object per line; every complete line is a valid record even if
/// the run dies midway.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChurnSink for JsonLinesSink<W> {
    fn append(&mut self, record: &ChurnRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn output_path(dir: &Path, format: OutputFormat, now: DateTime<Utc>) -> PathBuf {
    dir.join(format!(
        "output_{}.{}",
        now.format("%Y-%m-%dT%H:%M:%S%z"),
        format.extension()
    ))
}

/// Creates the output directory if needed and opens a sink appending to
/// `path`.
pub fn open_file_sink(path: &Path, format: OutputFormat) -> Result<Box<dyn ChurnSink>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file: File = OpenOptions::new().create(true).append(true).open(path)?;
    let writer = BufWriter::new(file);
    Ok(match format {
        OutputFormat::JsonArray => Box::new(JsonArraySink::new(writer)?),
        OutputFormat::JsonLines => Box::new(JsonLinesSink::new(writer)),
    })
}
