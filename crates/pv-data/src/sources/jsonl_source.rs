use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

use super::ScriptSource;
use crate::script::ScriptItem;
use crate::DataError;

/// Script stored as one JSON item per line.
///
/// Progress is counted in bytes. Blank lines are skipped.
pub struct JsonlSource {
    name: String,
    reader: Box<dyn BufRead + Send>,
    total_bytes: Option<u64>,
    bytes_read: u64,
    line: Vec<u8>,
    line_number: usize,
}

impl JsonlSource {
    /// Open a script file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let total = file.metadata()?.len();
        debug!("Opened script {} ({} bytes)", path.display(), total);
        Ok(Self::from_reader(path.display().to_string(), BufReader::new(file), Some(total)))
    }

    /// Read a script from any byte stream
    pub fn from_reader<R: Read + Send + 'static>(name: impl Into<String>, reader: R, total_bytes: Option<u64>) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(BufReader::new(reader)),
            total_bytes,
            bytes_read: 0,
            line: Vec::new(),
            line_number: 0,
        }
    }
}

impl ScriptSource for JsonlSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_item(&mut self) -> Result<Option<ScriptItem>, DataError> {
        loop {
            self.line.clear();
            let read = self.reader.read_until(b'\n', &mut self.line)?;
            if read == 0 {
                return Ok(None);
            }
            self.bytes_read += read as u64;
            self.line_number += 1;

            let text = std::str::from_utf8(&self.line)
                .map_err(|e| DataError::MalformedPayload(format!("{} line {}: {}", self.name, self.line_number, e)))?
                .trim();
            if text.is_empty() {
                continue;
            }
            return serde_json::from_str(text).map(Some).map_err(|e| {
                DataError::MalformedPayload(format!("{} line {}: {}", self.name, self.line_number, e))
            });
        }
    }

    fn total_units(&self) -> Option<u64> {
        self.total_bytes
    }

    fn consumed_units(&self) -> u64 {
        self.bytes_read
    }
}
