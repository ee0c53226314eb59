use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::date_parser::{DateParser, format_for_display};

/// Behaviour shared by everything that can be written to a store file
pub trait Record {
    /// Encode as a single line of the persisted format
    fn to_line(&self) -> String;
    /// Human readable one-line summary
    fn render(&self) -> String;
}

/// The closed set of record shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantTag {
    Todo,
    Deadline,
    Event,
    Note,
}

impl VariantTag {
    /// Leading token of a task line. Notes have none.
    pub fn letter(self) -> Option<&'static str> {
        match self {
            VariantTag::Todo => Some("T"),
            VariantTag::Deadline => Some("D"),
            VariantTag::Event => Some("E"),
            VariantTag::Note => None,
        }
    }

    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "T" => Some(VariantTag::Todo),
            "D" => Some(VariantTag::Deadline),
            "E" => Some(VariantTag::Event),
            _ => None,
        }
    }
}

/// A user-entered point in time.
///
/// `parsed` is derived from `raw` and only ever changes through
/// [`Schedule::new`] or [`Schedule::set_raw`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    raw: String,
    parsed: Option<NaiveDateTime>,
}

impl Schedule {
    pub fn new(raw: impl Into<String>, parser: &DateParser) -> Self {
        let raw = raw.into();
        let parsed = parser.parse(&raw);
        Self { raw, parsed }
    }

    pub fn set_raw(&mut self, raw: impl Into<String>, parser: &DateParser) {
        *self = Self::new(raw, parser);
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn parsed(&self) -> Option<NaiveDateTime> {
        self.parsed
    }

    /// Formatted date when it parsed, otherwise the text exactly as entered
    pub fn display(&self) -> String {
        match &self.parsed {
            Some(value) => format_for_display(value),
            None => self.raw.clone(),
        }
    }
}

/// Variant specific task data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    Todo,
    Deadline { due: Schedule },
    Event { from: Schedule, to: Schedule },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub done: bool,
    /// Free text kept in memory only; the task line has no slot for it
    #[serde(default)]
    pub body: String,
    #[serde(flatten)]
    pub kind: TaskKind,
}

impl Task {
    pub fn todo(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            body: String::new(),
            kind: TaskKind::Todo,
        }
    }

    pub fn deadline(name: impl Into<String>, by: impl Into<String>, parser: &DateParser) -> Self {
        Self {
            name: name.into(),
            done: false,
            body: String::new(),
            kind: TaskKind::Deadline {
                due: Schedule::new(by, parser),
            },
        }
    }

    pub fn event(
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        parser: &DateParser,
    ) -> Self {
        Self {
            name: name.into(),
            done: false,
            body: String::new(),
            kind: TaskKind::Event {
                from: Schedule::new(from, parser),
                to: Schedule::new(to, parser),
            },
        }
    }

    pub fn tag(&self) -> VariantTag {
        match self.kind {
            TaskKind::Todo => VariantTag::Todo,
            TaskKind::Deadline { .. } => VariantTag::Deadline,
            TaskKind::Event { .. } => VariantTag::Event,
        }
    }

    pub fn mark_done(&mut self) {
        self.done = true;
    }

    pub fn mark_undone(&mut self) {
        self.done = false;
    }

    /// Due date of a deadline, or the end of an event
    pub fn due(&self) -> Option<&Schedule> {
        match &self.kind {
            TaskKind::Todo => None,
            TaskKind::Deadline { due } => Some(due),
            TaskKind::Event { to, .. } => Some(to),
        }
    }

    /// Start of an event
    pub fn start(&self) -> Option<&Schedule> {
        match &self.kind {
            TaskKind::Event { from, .. } => Some(from),
            _ => None,
        }
    }

    fn status_icon(&self) -> &'static str {
        if self.done { "[X]" } else { "[ ]" }
    }
}

impl Record for Task {
    fn to_line(&self) -> String {
        codec::encode_task(self)
    }

    fn render(&self) -> String {
        let letter = self.tag().letter().unwrap_or("?");
        let mut line = format!("[{}]{} {}", letter, self.status_icon(), self.name);
        match &self.kind {
            TaskKind::Todo => {}
            TaskKind::Deadline { due } => {
                line.push_str(&format!(" (by: {})", due.display()));
            }
            TaskKind::Event { from, to } => {
                line.push_str(&format!(" (from: {} to: {})", from.display(), to.display()));
            }
        }
        if !self.body.is_empty() {
            line.push_str(&format!("\n    {}", self.body));
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub filename: Option<String>,
    pub archive_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
    pub pinned: bool,
    pub archived: bool,
    pub logs: Vec<String>,
}

impl Note {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            id: id.into(),
            title: title.into(),
            filename: None,
            archive_name: None,
            created_at: now,
            modified_at: now,
            pinned: false,
            archived: false,
            logs: Vec::new(),
        }
    }

    fn touch(&mut self) {
        self.modified_at = chrono::Local::now().naive_local();
    }

    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn pin(&mut self) {
        self.pinned = true;
        self.touch();
    }

    pub fn unpin(&mut self) {
        self.pinned = false;
        self.touch();
    }

    /// Move the note to the archive, optionally under a named archive
    pub fn archive(&mut self, archive_name: Option<String>) {
        self.archived = true;
        self.archive_name = archive_name;
        self.touch();
    }

    pub fn unarchive(&mut self) {
        self.archived = false;
        self.archive_name = None;
        self.touch();
    }

    pub fn add_log(&mut self, entry: impl Into<String>) {
        self.logs.push(entry.into());
        self.touch();
    }
}

impl Record for Note {
    fn to_line(&self) -> String {
        codec::encode_note(self)
    }

    fn render(&self) -> String {
        let mut flags = String::new();
        if self.pinned {
            flags.push_str(" [pinned]");
        }
        if self.archived {
            match &self.archive_name {
                Some(name) => flags.push_str(&format!(" [archived: {}]", name)),
                None => flags.push_str(" [archived]"),
            }
        }
        let mut line = format!(
            "{}: {}{} (modified {})",
            self.id,
            self.title,
            flags,
            format_for_display(&self.modified_at)
        );
        for entry in &self.logs {
            line.push_str(&format!("\n    - {}", entry));
        }
        line
    }
}
