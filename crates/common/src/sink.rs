use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A measurement that serializes to one comma-separated line.
pub trait CsvRecord {
    fn csv_line(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
#[error("sink i/o failure on {path}: {source}")]
pub struct SinkError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Newline-delimited record sink.
///
/// Opening truncates any prior contents, so re-running the suite
/// never appends to stale data. Every record is flushed as it is
/// appended; a crash mid-run preserves everything written so far.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| SinkError {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it to disk.
    pub fn append(&mut self, record: &impl CsvRecord) -> Result<(), SinkError> {
        let line = record.csv_line();
        let write = writeln!(self.writer, "{}", line).and_then(|_| self.writer.flush());
        write.map_err(|source| SinkError {
            path: self.path.clone(),
            source,
        })
    }

    /// Flush and close the sink.
    pub fn finish(mut self) -> Result<(), SinkError> {
        self.writer.flush().map_err(|source| SinkError {
            path: self.path.clone(),
            source,
        })
    }
}
