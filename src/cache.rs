use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::data_dir;
use crate::model::task::{Draft, Task};

/// Whole-list task mirror on disk. Callers read-modify-write the full list;
/// two racing writers resolve last-write-wins, which is fine for a
/// single-user cache.
pub struct TaskCache {
    path: PathBuf,
}

impl TaskCache {
    pub fn new() -> Self {
        Self {
            path: data_dir().join("tasks.json"),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Missing or unreadable file is an empty list, never an error.
    pub fn get(&self) -> Vec<Task> {
        let Ok(contents) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        serde_json::from_str(&contents).unwrap_or_default()
    }

    pub fn set(&self, tasks: &[Task]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(tasks)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl Default for TaskCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-slot stash for a capture that could not be handed to a running
/// dashboard. The standalone confirmation surface picks it up on start.
pub struct DraftSlot {
    path: PathBuf,
}

impl DraftSlot {
    pub fn new() -> Self {
        Self {
            path: data_dir().join("capture.json"),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn put(&self, draft: &Draft) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(draft)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    pub fn get(&self) -> Option<Draft> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// Read and clear, so a confirmed or abandoned capture is not re-offered.
    pub fn take(&self) -> Option<Draft> {
        let draft = self.get();
        if draft.is_some() {
            let _ = std::fs::remove_file(&self.path);
        }
        draft
    }
}

impl Default for DraftSlot {
    fn default() -> Self {
        Self::new()
    }
}
