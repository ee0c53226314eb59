//! Line codec for the flat text files.
//!
//! Each record is one line of fields joined by [`FIELD_SEPARATOR`]. Separators
//! are never escaped, so a field containing ` | ` (or `;;` inside a note log)
//! cannot be stored faithfully. That is a limitation of the file format.
//!
//! Task lines:
//!
//! ```text
//! T | 0 | read book
//! D | 1 | return book | 2024-01-15
//! E | 0 | Meeting | Mon 2pm /to Mon 3pm
//! ```
//!
//! Note lines carry nine fields:
//! `id | title | filename | created | modified | pinned | archived | archive | logs`.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::date_parser::DateParser;
use crate::models::{Note, Schedule, Task, TaskKind, VariantTag};

pub const FIELD_SEPARATOR: &str = " | ";
pub const EVENT_RANGE_MARKER: &str = " /to ";
pub const LOG_SEPARATOR: &str = ";;";
pub const NOTE_FIELD_COUNT: usize = 9;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const TIMESTAMP_FORMAT_MINUTES: &str = "%Y-%m-%dT%H:%M";

/// Why a line could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("line is blank")]
    Blank,
    #[error("line is not valid UTF-8")]
    InvalidEncoding,
    #[error("unknown record type '{0}'")]
    UnknownTag(String),
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("{0} is empty")]
    MissingField(&'static str),
    #[error("event is missing the '/to' marker")]
    MissingRangeMarker,
    #[error("invalid timestamp in {field}: '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// A value that cannot be written without corrupting the line around it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} cannot contain a line break")]
    LineBreak(&'static str),
    #[error("{field} cannot contain '{separator}' or end with part of it")]
    Separator {
        field: &'static str,
        separator: &'static str,
    },
}

/// Converts one item to a line and back.
///
/// A decode error is a signal to skip the line, not a failure of the batch.
pub trait LineCodec {
    type Item;

    fn encode(&self, item: &Self::Item) -> String;
    fn decode(&self, line: &str) -> Result<Self::Item, DecodeError>;
}

/// Codec for `T`/`D`/`E` task lines. Holds the date parser used to fill in
/// the parsed side of deadline and event schedules.
#[derive(Debug, Clone, Default)]
pub struct TaskCodec {
    parser: DateParser,
}

impl TaskCodec {
    pub fn new(parser: DateParser) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &DateParser {
        &self.parser
    }
}

impl LineCodec for TaskCodec {
    type Item = Task;

    fn encode(&self, item: &Task) -> String {
        encode_task(item)
    }

    fn decode(&self, line: &str) -> Result<Task, DecodeError> {
        decode_task(line, &self.parser)
    }
}

/// Codec for nine-field note lines
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteCodec;

impl LineCodec for NoteCodec {
    type Item = Note;

    fn encode(&self, item: &Note) -> String {
        encode_note(item)
    }

    fn decode(&self, line: &str) -> Result<Note, DecodeError> {
        decode_note(line)
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Only the literal "1" counts as set
fn parse_flag(field: &str) -> bool {
    field == "1"
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn require(field: &str, name: &'static str) -> Result<String, DecodeError> {
    if field.trim().is_empty() {
        Err(DecodeError::MissingField(name))
    } else {
        Ok(field.to_string())
    }
}

fn optional(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

fn split_fields(line: &str, expected: usize) -> Result<Vec<&str>, DecodeError> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() != expected {
        return Err(DecodeError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Whether `value` followed by `separator` splits back into `value` exactly.
/// Catches both an embedded separator and a value ending in the start of one.
fn fits_before(value: &str, separator: &str) -> bool {
    format!("{}{}", value, separator).find(separator) == Some(value.len())
}

/// Check that `value` can be stored in a field delimited by `separator`
pub fn check_field(
    field: &'static str,
    value: &str,
    separator: &'static str,
) -> Result<(), FieldError> {
    if value.contains(['\n', '\r']) {
        return Err(FieldError::LineBreak(field));
    }
    if !fits_before(value, separator) {
        return Err(FieldError::Separator { field, separator });
    }
    Ok(())
}

/// Check that every text field of `task` survives [`encode_task`]
pub fn check_task(task: &Task) -> Result<(), FieldError> {
    check_field("Task name", &task.name, FIELD_SEPARATOR)?;
    match &task.kind {
        TaskKind::Todo => Ok(()),
        TaskKind::Deadline { due } => check_field("Due date", due.raw(), FIELD_SEPARATOR),
        TaskKind::Event { from, to } => {
            check_field("Event start", from.raw(), FIELD_SEPARATOR)?;
            check_field("Event start", from.raw(), EVENT_RANGE_MARKER)?;
            check_field("Event end", to.raw(), FIELD_SEPARATOR)
        }
    }
}

/// Check that a note log entry survives [`encode_note`]
pub fn check_log_entry(entry: &str) -> Result<(), FieldError> {
    check_field("Log entry", entry, FIELD_SEPARATOR)?;
    check_field("Log entry", entry, LOG_SEPARATOR)
}

/// Check that every text field of `note` survives [`encode_note`]
pub fn check_note(note: &Note) -> Result<(), FieldError> {
    check_field("Note id", &note.id, FIELD_SEPARATOR)?;
    check_field("Note title", &note.title, FIELD_SEPARATOR)?;
    if let Some(filename) = &note.filename {
        check_field("File name", filename, FIELD_SEPARATOR)?;
    }
    if let Some(archive_name) = &note.archive_name {
        check_field("Archive name", archive_name, FIELD_SEPARATOR)?;
    }
    note.logs.iter().try_for_each(|entry| check_log_entry(entry))
}

/// Encode a task line. Values are written as-is; run [`check_task`] first
/// on anything that did not come from a decoded line.
pub fn encode_task(task: &Task) -> String {
    let letter = task.tag().letter().unwrap_or_default();
    let mut fields = vec![letter.to_string(), flag(task.done).to_string(), task.name.clone()];
    match &task.kind {
        TaskKind::Todo => {}
        TaskKind::Deadline { due } => fields.push(due.raw().to_string()),
        // The end of an event sits in the same slot a deadline's due date does
        TaskKind::Event { from, to } => {
            fields.push(format!("{}{}{}", from.raw(), EVENT_RANGE_MARKER, to.raw()));
        }
    }
    fields.join(FIELD_SEPARATOR)
}

pub fn decode_task(line: &str, parser: &DateParser) -> Result<Task, DecodeError> {
    let line = strip_line_ending(line);
    if line.trim().is_empty() {
        return Err(DecodeError::Blank);
    }

    let letter = line.split(FIELD_SEPARATOR).next().unwrap_or_default();
    let tag = VariantTag::from_letter(letter)
        .ok_or_else(|| DecodeError::UnknownTag(letter.to_string()))?;

    let expected = match tag {
        VariantTag::Todo => 3,
        _ => 4,
    };
    let fields = split_fields(line, expected)?;
    let done = parse_flag(fields[1]);
    let name = require(fields[2], "name")?;

    let kind = match tag {
        VariantTag::Deadline => TaskKind::Deadline {
            due: Schedule::new(fields[3], parser),
        },
        VariantTag::Event => {
            let (from, to) = fields[3]
                .split_once(EVENT_RANGE_MARKER)
                .ok_or(DecodeError::MissingRangeMarker)?;
            TaskKind::Event {
                from: Schedule::new(from, parser),
                to: Schedule::new(to, parser),
            }
        }
        _ => TaskKind::Todo,
    };

    Ok(Task {
        name,
        done,
        body: String::new(),
        kind,
    })
}

fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(value: &str, field: &'static str) -> Result<NaiveDateTime, DecodeError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT_MINUTES))
        .map_err(|_| DecodeError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

/// Encode a note line. Values are written as-is; run [`check_note`] first
/// on anything that did not come from a decoded line.
pub fn encode_note(note: &Note) -> String {
    let fields = [
        note.id.clone(),
        note.title.clone(),
        note.filename.clone().unwrap_or_default(),
        format_timestamp(&note.created_at),
        format_timestamp(&note.modified_at),
        flag(note.pinned).to_string(),
        flag(note.archived).to_string(),
        note.archive_name.clone().unwrap_or_default(),
        note.logs.join(LOG_SEPARATOR),
    ];
    fields.join(FIELD_SEPARATOR)
}

pub fn decode_note(line: &str) -> Result<Note, DecodeError> {
    let line = strip_line_ending(line);
    if line.trim().is_empty() {
        return Err(DecodeError::Blank);
    }

    let fields = split_fields(line, NOTE_FIELD_COUNT)?;
    let logs = if fields[8].is_empty() {
        Vec::new()
    } else {
        fields[8].split(LOG_SEPARATOR).map(str::to_string).collect()
    };

    Ok(Note {
        id: require(fields[0], "id")?,
        title: require(fields[1], "title")?,
        filename: optional(fields[2]),
        created_at: parse_timestamp(fields[3], "created")?,
        modified_at: parse_timestamp(fields[4], "modified")?,
        pinned: parse_flag(fields[5]),
        archived: parse_flag(fields[6]),
        archive_name: optional(fields[7]),
        logs,
    })
}
