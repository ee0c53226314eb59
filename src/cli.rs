use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::codec::{self, FieldError, FIELD_SEPARATOR, NoteCodec, TaskCodec};
use crate::config::Config;
use crate::models::{Note, Record, Task};
use crate::store::{LoadReport, NoteStore, StoreError, TaskStore};
use crate::utils::generate_note_id;

#[derive(Parser)]
#[command(name = "tnj")]
#[command(about = "Tasks and notes kept in plain text files")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use development mode (uses separate dev config/data files)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a plain task
    Todo {
        /// Task name
        name: String,
    },
    /// Add a task that is due by a date
    Deadline {
        /// Task name
        name: String,
        /// Due date, e.g. 2024-01-15 or 2/12/2019 1800
        #[arg(long)]
        by: String,
    },
    /// Add a task spanning a period of time
    Event {
        /// Event name
        name: String,
        /// Start of the event
        #[arg(long)]
        from: String,
        /// End of the event
        #[arg(long)]
        to: String,
    },
    /// List tasks
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a task as done
    Mark {
        /// Task number as shown by `list`
        index: usize,
    },
    /// Mark a task as not done
    Unmark {
        /// Task number as shown by `list`
        index: usize,
    },
    /// Delete a task
    Delete {
        /// Task number as shown by `list`
        index: usize,
    },
    /// Manage notes
    #[command(subcommand)]
    Note(NoteCommands),
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Add a note
    Add {
        /// Note title
        title: String,
        /// Note id (generated from the current time if omitted)
        #[arg(long)]
        id: Option<String>,
        /// File holding the note body
        #[arg(long)]
        file: Option<String>,
    },
    /// List notes
    List {
        /// Include archived notes
        #[arg(long)]
        all: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pin a note
    Pin { id: String },
    /// Unpin a note
    Unpin { id: String },
    /// Archive a note
    Archive {
        id: String,
        /// Name of the archive to file it under
        #[arg(long)]
        name: Option<String>,
    },
    /// Restore an archived note
    Unarchive { id: String },
    /// Append a log entry to a note
    Log { id: String, entry: String },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Failed to encode JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("No task numbered {0}")]
    NoSuchTask(usize),
    #[error("No note with id '{0}'")]
    NoSuchNote(String),
    #[error("Note id '{0}' is already taken")]
    DuplicateNote(String),
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
    #[error("{0}")]
    InvalidField(#[from] FieldError),
}

fn require_text(value: &str, field: &'static str) -> Result<(), CliError> {
    if value.trim().is_empty() {
        Err(CliError::EmptyField(field))
    } else {
        Ok(())
    }
}

/// Turn a 1-based task number into a store index
fn task_index(store: &TaskStore, number: usize) -> Result<usize, CliError> {
    if number == 0 || number > store.len() {
        Err(CliError::NoSuchTask(number))
    } else {
        Ok(number - 1)
    }
}

fn report_skipped(kind: &str, report: &LoadReport) {
    if !report.skipped.is_empty() {
        eprintln!(
            "Warning: skipped {} unreadable {} line(s)",
            report.skipped.len(),
            kind
        );
    }
}

/// Handle the todo/deadline/event commands
pub fn handle_add_task(task: Task, store: &mut TaskStore) -> Result<String, CliError> {
    require_text(&task.name, "Task name")?;
    codec::check_task(&task)?;
    let summary = task.render();
    store.push(task);
    Ok(format!(
        "Added task:\n  {}\nNow you have {} task(s) in the list.",
        summary,
        store.len()
    ))
}

/// Handle the list command
pub fn handle_list(store: &TaskStore, json: bool) -> Result<String, CliError> {
    if json {
        return Ok(serde_json::to_string_pretty(store.tasks())?);
    }
    if store.is_empty() {
        return Ok("No tasks yet.".to_string());
    }
    let lines: Vec<String> = store
        .iter()
        .enumerate()
        .map(|(i, task)| format!("{}. {}", i + 1, task.render()))
        .collect();
    Ok(lines.join("\n"))
}

/// Handle the mark/unmark commands
pub fn handle_set_done(store: &mut TaskStore, number: usize, done: bool) -> Result<String, CliError> {
    let index = task_index(store, number)?;
    let task = store.get_mut(index).ok_or(CliError::NoSuchTask(number))?;
    if done {
        task.mark_done();
    } else {
        task.mark_undone();
    }
    Ok(format!("Updated task:\n  {}", task.render()))
}

/// Handle the delete command
pub fn handle_delete(store: &mut TaskStore, number: usize) -> Result<String, CliError> {
    let index = task_index(store, number)?;
    let task = store.remove(index).ok_or(CliError::NoSuchTask(number))?;
    Ok(format!(
        "Removed task:\n  {}\nNow you have {} task(s) in the list.",
        task.render(),
        store.len()
    ))
}

/// Handle the note subcommands
pub fn handle_note(command: NoteCommands, store: &mut NoteStore) -> Result<String, CliError> {
    match command {
        NoteCommands::Add { title, id, file } => {
            require_text(&title, "Note title")?;
            let id = id.unwrap_or_else(generate_note_id);
            require_text(&id, "Note id")?;
            if store.find_note(&id).is_some() {
                return Err(CliError::DuplicateNote(id));
            }
            let mut note = Note::new(id, title);
            note.filename = file;
            codec::check_note(&note)?;
            let summary = note.render();
            store.push(note);
            Ok(format!("Added note:\n  {}", summary))
        }
        NoteCommands::List { all, json } => {
            let notes: Vec<&Note> = store.iter().filter(|n| all || !n.archived).collect();
            if json {
                return Ok(serde_json::to_string_pretty(&notes)?);
            }
            if notes.is_empty() {
                return Ok("No notes yet.".to_string());
            }
            // Pinned notes first, otherwise keep file order
            let mut ordered = notes;
            ordered.sort_by_key(|n| !n.pinned);
            Ok(ordered.iter().map(|n| n.render()).collect::<Vec<_>>().join("\n"))
        }
        NoteCommands::Pin { id } => update_note(store, &id, Note::pin),
        NoteCommands::Unpin { id } => update_note(store, &id, Note::unpin),
        NoteCommands::Archive { id, name } => {
            if let Some(name) = &name {
                codec::check_field("Archive name", name, FIELD_SEPARATOR)?;
            }
            update_note(store, &id, |n| n.archive(name))
        }
        NoteCommands::Unarchive { id } => update_note(store, &id, Note::unarchive),
        NoteCommands::Log { id, entry } => {
            require_text(&entry, "Log entry")?;
            codec::check_log_entry(&entry)?;
            update_note(store, &id, |n| n.add_log(entry))
        }
    }
}

fn update_note<F>(store: &mut NoteStore, id: &str, apply: F) -> Result<String, CliError>
where
    F: FnOnce(&mut Note),
{
    let note = store
        .find_note_mut(id)
        .ok_or_else(|| CliError::NoSuchNote(id.to_string()))?;
    apply(note);
    Ok(format!("Updated note:\n  {}", note.render()))
}

fn load_tasks(config: &Config) -> Result<TaskStore, CliError> {
    let mut store = TaskStore::new(TaskCodec::new(config.date_parser()));
    report_skipped("task", &store.load_file(&config.get_tasks_path())?);
    Ok(store)
}

/// Load the task file, apply `update`, and write the file back
fn update_tasks<F>(config: &Config, update: F) -> Result<String, CliError>
where
    F: FnOnce(&mut TaskStore) -> Result<String, CliError>,
{
    let mut store = load_tasks(config)?;
    let message = update(&mut store)?;
    store.save_file(&config.get_tasks_path())?;
    Ok(message)
}

fn run_note(command: NoteCommands, config: &Config) -> Result<String, CliError> {
    let path = config.get_notes_path();
    let mut store = NoteStore::new(NoteCodec);
    report_skipped("note", &store.load_file(&path)?);

    let mutates = !matches!(command, NoteCommands::List { .. });
    let message = handle_note(command, &mut store)?;
    if mutates {
        store.save_file(&path)?;
    }
    Ok(message)
}

/// Run a command against the files named in `config`
pub fn run(command: Commands, config: &Config) -> Result<(), CliError> {
    let parser = config.date_parser();

    let message = match command {
        Commands::Todo { name } => {
            update_tasks(config, |store| handle_add_task(Task::todo(name), store))?
        }
        Commands::Deadline { name, by } => update_tasks(config, |store| {
            handle_add_task(Task::deadline(name, by, &parser), store)
        })?,
        Commands::Event { name, from, to } => update_tasks(config, |store| {
            handle_add_task(Task::event(name, from, to, &parser), store)
        })?,
        Commands::List { json } => handle_list(&load_tasks(config)?, json)?,
        Commands::Mark { index } => {
            update_tasks(config, |store| handle_set_done(store, index, true))?
        }
        Commands::Unmark { index } => {
            update_tasks(config, |store| handle_set_done(store, index, false))?
        }
        Commands::Delete { index } => update_tasks(config, |store| handle_delete(store, index))?,
        Commands::Note(note_command) => run_note(note_command, config)?,
    };

    println!("{}", message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_parser::DateParser;

    fn store_with(tasks: Vec<Task>) -> TaskStore {
        let mut store = TaskStore::default();
        for task in tasks {
            store.push(task);
        }
        store
    }

    #[test]
    fn cli_parses_nested_note_commands() {
        let cli = Cli::try_parse_from(["tnj", "--dev", "note", "archive", "n1", "--name", "old"]).unwrap();
        assert!(cli.dev);
        assert!(matches!(
            cli.command,
            Commands::Note(NoteCommands::Archive { ref id, name: Some(ref name) }) if id == "n1" && name == "old"
        ));
    }

    #[test]
    fn cli_requires_event_bounds() {
        assert!(Cli::try_parse_from(["tnj", "event", "Meeting", "--from", "Mon 2pm"]).is_err());
    }

    #[test]
    fn adding_rejects_blank_names() {
        let mut store = TaskStore::default();
        let result = handle_add_task(Task::todo("  "), &mut store);
        assert!(matches!(result, Err(CliError::EmptyField(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn task_numbers_are_one_based() {
        let mut store = store_with(vec![Task::todo("a"), Task::todo("b")]);
        handle_set_done(&mut store, 2, true).unwrap();
        assert!(store.get(1).is_some_and(|t| t.done));

        assert!(matches!(handle_set_done(&mut store, 0, true), Err(CliError::NoSuchTask(0))));
        assert!(matches!(handle_delete(&mut store, 3), Err(CliError::NoSuchTask(3))));
    }

    #[test]
    fn list_numbers_each_task() {
        let parser = DateParser::default();
        let store = store_with(vec![Task::todo("a"), Task::deadline("b", "whenever", &parser)]);
        assert_eq!(
            handle_list(&store, false).unwrap(),
            "1. [T][ ] a\n2. [D][ ] b (by: whenever)"
        );
    }

    #[test]
    fn list_as_json_includes_the_kind() {
        let store = store_with(vec![Task::todo("a")]);
        let json = handle_list(&store, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "a");
        assert_eq!(value[0]["kind"], "todo");
    }

    #[test]
    fn duplicate_note_ids_are_refused() {
        let mut store = NoteStore::default();
        let add = || NoteCommands::Add {
            title: "t".to_string(),
            id: Some("n1".to_string()),
            file: None,
        };
        handle_note(add(), &mut store).unwrap();
        assert!(matches!(handle_note(add(), &mut store), Err(CliError::DuplicateNote(_))));
    }

    #[test]
    fn note_updates_require_a_known_id() {
        let mut store = NoteStore::default();
        let result = handle_note(NoteCommands::Pin { id: "nope".to_string() }, &mut store);
        assert!(matches!(result, Err(CliError::NoSuchNote(_))));
    }

    #[test]
    fn archived_notes_are_hidden_unless_asked_for() {
        let mut store = NoteStore::default();
        let mut archived = Note::new("a", "old");
        archived.archive(None);
        store.push(archived);
        store.push(Note::new("b", "new"));

        let listed = handle_note(NoteCommands::List { all: false, json: false }, &mut store).unwrap();
        assert!(listed.starts_with("b: new"));
        assert!(!listed.contains("old"));

        let listed = handle_note(NoteCommands::List { all: true, json: false }, &mut store).unwrap();
        assert!(listed.contains("a: old [archived]"));
    }

    #[test]
    fn task_text_that_would_break_the_line_is_refused() {
        let parser = DateParser::default();
        let mut store = TaskStore::default();
        let refused = [
            Task::todo("a | b"),
            Task::todo("line1\nline2"),
            Task::deadline("pay rent", "friday | noon", &parser),
            Task::event("Meeting", "Mon /to Tue", "Wed", &parser),
        ];
        for task in refused {
            let result = handle_add_task(task, &mut store);
            assert!(matches!(result, Err(CliError::InvalidField(_))));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn note_text_that_would_break_the_line_is_refused() {
        let mut store = NoteStore::default();
        let result = handle_note(
            NoteCommands::Add {
                title: "a | b".to_string(),
                id: Some("n1".to_string()),
                file: None,
            },
            &mut store,
        );
        assert!(matches!(result, Err(CliError::InvalidField(_))));
        assert!(store.is_empty());

        store.push(Note::new("n1", "kept"));
        let result = handle_note(
            NoteCommands::Log {
                id: "n1".to_string(),
                entry: "x;;y".to_string(),
            },
            &mut store,
        );
        assert!(matches!(result, Err(CliError::InvalidField(_))));
        let result = handle_note(
            NoteCommands::Archive {
                id: "n1".to_string(),
                name: Some("old\nstuff".to_string()),
            },
            &mut store,
        );
        assert!(matches!(result, Err(CliError::InvalidField(_))));

        let note = store.find_note("n1").unwrap();
        assert!(note.logs.is_empty());
        assert!(!note.archived);
    }
}
