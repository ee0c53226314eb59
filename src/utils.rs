use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    /// Application directory name for this profile
    pub fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "tnj-dev",
            Profile::Prod => "tnj",
        }
    }
}

/// Get the configuration directory path for TNJ
/// If profile is Dev, uses "tnj-dev" instead of "tnj"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "tnj", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path for TNJ
/// If profile is Dev, uses "tnj-dev" instead of "tnj"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "tnj", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Generate a note id from the current local time, e.g. `20240115-093000`
pub fn generate_note_id() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}
