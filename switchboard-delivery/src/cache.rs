// ABOUTME: JSON-backed coordination audit cache (assignments, mission progress, events).
// ABOUTME: Read-modify-write with each section capped to the most recent N entries.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Default number of entries kept per section.
pub const DEFAULT_CACHE_LIMIT: usize = 100;

/// Which audit list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSection {
    Assignments,
    MissionProgress,
    Events,
}

/// On-disk shape of the cache file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheFile {
    #[serde(default)]
    pub assignments: Vec<Value>,
    #[serde(default)]
    pub mission_progress: Vec<Value>,
    #[serde(default)]
    pub events: Vec<Value>,
}

impl CacheFile {
    fn section_mut(&mut self, section: CacheSection) -> &mut Vec<Value> {
        match section {
            CacheSection::Assignments => &mut self.assignments,
            CacheSection::MissionProgress => &mut self.mission_progress,
            CacheSection::Events => &mut self.events,
        }
    }
}

/// Audit trail writer.
///
/// Writers inside one process are serialized by an async mutex. Separate
/// processes sharing the file can still lose updates.
pub struct CoordinationCache {
    path: PathBuf,
    limit: usize,
    write_lock: Mutex<()>,
}

impl CoordinationCache {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache. A missing or corrupt file reads as empty.
    pub async fn load(&self) -> CacheFile {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Coordination cache is corrupt, starting fresh"
                );
                CacheFile::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read coordination cache");
                CacheFile::default()
            }
        }
    }

    /// Append `entry` to `section`, stamping it with `recorded_at`.
    pub async fn record(&self, section: CacheSection, mut entry: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Value::Object(map) = &mut entry {
            map.entry("recorded_at")
                .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        }

        let mut file = self.load().await;
        let list = file.section_mut(section);
        list.push(entry);
        if list.len() > self.limit {
            let excess = list.len() - self.limit;
            list.drain(..excess);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let body = serde_json::to_string_pretty(&file)?;
        tokio::fs::write(&self.path, body)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
