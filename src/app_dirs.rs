use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn home() -> Option<PathBuf> {
        std::env::var_os("HOME").map(PathBuf::from)
    }

    fn state_dir() -> Option<PathBuf> {
        if let Some(home) = Self::home() {
            Some(home.join(".local").join("state").join("wpm"))
        } else {
            ProjectDirs::from("", "", "wpm").map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wpm").map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
    }

    /// Race history, `~/.wpm.csv` unless overridden on the command line.
    pub fn stats_path() -> Option<PathBuf> {
        Self::home()
            .map(|home| home.join(".wpm.csv"))
            .or_else(|| {
                ProjectDirs::from("", "", "wpm")
                    .map(|proj_dirs| proj_dirs.data_local_dir().join("wpm.csv"))
            })
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("wpm.log"))
    }
}
