pub mod cli;
pub mod codec;
pub mod config;
pub mod date_parser;
pub mod logging;
pub mod models;
pub mod store;
pub mod utils;

pub use codec::{DecodeError, LineCodec, NoteCodec, TaskCodec};
pub use config::Config;
pub use date_parser::{DateLayout, DateParser};
pub use models::{Note, Record, Schedule, Task, TaskKind, VariantTag};
pub use store::{LoadReport, NoteStore, SkippedLine, Store, StoreError, TaskStore};
pub use utils::Profile;
