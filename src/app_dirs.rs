use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Directory session snapshot files are written to.
    pub fn sessions_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("shotlog");
            Some(state_dir.join("sessions"))
        } else {
            ProjectDirs::from("", "", "shotlog")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("sessions"))
        }
    }
}
