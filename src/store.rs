use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::codec::{DecodeError, LineCodec, NoteCodec, TaskCodec};
use crate::models::{Note, Task};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to create store directory: {0}")]
    DirectoryError(String),
}

/// A line that could not be decoded during a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based position in the input
    pub line_no: usize,
    pub content: String,
    pub reason: DecodeError,
}

/// Outcome of a bulk load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedLine>,
}

/// Ordered, in-memory collection of records backed by a line codec
pub struct Store<C: LineCodec> {
    codec: C,
    items: Vec<C::Item>,
}

pub type TaskStore = Store<TaskCodec>;
pub type NoteStore = Store<NoteCodec>;

impl<C: LineCodec> Store<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            items: Vec::new(),
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Decode every line and append the successes in input order.
    ///
    /// Lines that fail to decode are logged, reported and dropped; they never
    /// stop the rest of the batch from loading.
    pub fn load_all<I, S>(&mut self, lines: I) -> LoadReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = LoadReport::default();
        for (index, line) in lines.into_iter().enumerate() {
            self.load_line(index + 1, line.as_ref(), &mut report);
        }
        debug!(loaded = report.loaded, skipped = report.skipped.len(), "load finished");
        report
    }

    fn load_line(&mut self, line_no: usize, line: &str, report: &mut LoadReport) {
        match self.codec.decode(line) {
            Ok(item) => {
                self.items.push(item);
                report.loaded += 1;
            }
            Err(reason) => {
                warn!(line_no, content = %line, reason = %reason, "skipping unreadable line");
                report.skipped.push(SkippedLine {
                    line_no,
                    content: line.to_string(),
                    reason,
                });
            }
        }
    }

    /// Encode every record in current order, one line each, without terminators
    pub fn save_all(&self) -> impl Iterator<Item = String> + '_ {
        self.items.iter().map(|item| self.codec.encode(item))
    }

    /// Read newline separated records from a byte stream.
    ///
    /// A line that is not valid UTF-8 is skipped like any other bad line; other
    /// read errors are returned.
    pub fn read_from<R: BufRead>(&mut self, mut reader: R) -> Result<LoadReport, StoreError> {
        let mut report = LoadReport::default();
        let mut buf = Vec::new();
        let mut line_no = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;
            match std::str::from_utf8(&buf) {
                Ok(line) => self.load_line(line_no, line, &mut report),
                Err(_) => {
                    let content = String::from_utf8_lossy(&buf).trim_end().to_string();
                    warn!(line_no, content = %content, "skipping line with invalid UTF-8");
                    report.skipped.push(SkippedLine {
                        line_no,
                        content,
                        reason: DecodeError::InvalidEncoding,
                    });
                }
            }
        }
        debug!(loaded = report.loaded, skipped = report.skipped.len(), "read finished");
        Ok(report)
    }

    /// Write every record followed by a newline
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), StoreError> {
        for line in self.save_all() {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load records from `path`, appending to the store. A missing file is an
    /// empty store.
    pub fn load_file(&mut self, path: &Path) -> Result<LoadReport, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "store file not found, starting empty");
            return Ok(LoadReport::default());
        }
        let file = fs::File::open(path)?;
        self.read_from(BufReader::new(file))
    }

    /// Replace the file at `path` with the current records
    pub fn save_file(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::DirectoryError(e.to_string()))?;
            }
        }

        let tmp_path = temp_path(path);
        {
            let file = fs::File::create(&tmp_path)?;
            self.write_to(BufWriter::new(file))?;
        }
        fs::rename(&tmp_path, path)?;
        debug!(path = %path.display(), records = self.items.len(), "store saved");
        Ok(())
    }

    pub fn push(&mut self, item: C::Item) {
        self.items.push(item);
    }

    /// Insert at `index`, clamped to the end of the list
    pub fn insert(&mut self, index: usize, item: C::Item) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    pub fn remove(&mut self, index: usize) -> Option<C::Item> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Option<&C::Item> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut C::Item> {
        self.items.get_mut(index)
    }

    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&C::Item) -> bool,
    {
        self.items.iter().position(predicate)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, C::Item> {
        self.items.iter()
    }

    pub fn items(&self) -> &[C::Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Sibling of `path` with `.tmp` appended to the whole file name
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl<C: LineCodec + Default> Default for Store<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl TaskStore {
    pub fn tasks(&self) -> &[Task] {
        self.items()
    }
}

impl NoteStore {
    /// Look up a note by id. Ids are expected to be unique; the first match wins.
    pub fn find_note(&self, id: &str) -> Option<&Note> {
        self.iter().find(|note| note.id == id)
    }

    pub fn find_note_mut(&mut self, id: &str) -> Option<&mut Note> {
        self.items.iter_mut().find(|note| note.id == id)
    }
}
