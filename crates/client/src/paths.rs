//! Path resolution for Taskwire's local files.
//!
//! Resolved once at startup from: CLI `--data-dir` > `TASKWIRE_DATA_DIR` env > `~/.taskwire`.
//! The resolved `DataDir` is passed to whatever needs a path.

use std::io;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "TASKWIRE_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Priority: `explicit` arg > `TASKWIRE_DATA_DIR` env > `~/.taskwire`.
    /// Falls back to the system temp dir when no home directory exists.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        let root = if let Some(p) = explicit {
            p.to_path_buf()
        } else if let Ok(env_val) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(env_val)
        } else {
            dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(".taskwire")
        };
        Self { root }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn token_path(&self) -> PathBuf {
        self.root.join("token")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Create the data dir and its subdirectories.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}
