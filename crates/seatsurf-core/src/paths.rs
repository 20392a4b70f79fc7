//! Standard paths used by seatsurf

use std::path::{Path, PathBuf};

/// Environment variable overriding the state directory
pub const HOME_ENV: &str = "SEATSURFING_HOME";

/// Standard seatsurf paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// State directory (~/.seatsurfing)
    pub root: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        if let Ok(dir) = std::env::var(HOME_ENV) {
            if !dir.trim().is_empty() {
                return Self::at(dir);
            }
        }

        let root = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(".seatsurfing");

        Self { root }
    }

    /// Use an explicit state directory
    pub fn at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Persisted credentials (config.json)
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Persisted location/space snapshot (spaces.json)
    pub fn spaces_cache(&self) -> PathBuf {
        self.root.join("spaces.json")
    }
}
