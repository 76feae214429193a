//! Recent-files list
//!
//! Newline-separated UTF-8 paths, most recent first, capped. Stored in the
//! per-user data directory; loading tolerates a missing file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = "slateview";
const RECENT_FILE: &str = "recent.txt";

/// Default cap on remembered entries.
pub const DEFAULT_MAX_RECENT: usize = 10;

#[derive(Clone, Debug)]
pub struct RecentFiles {
    entries: Vec<PathBuf>,
    limit: usize,
}

impl RecentFiles {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Default storage location; `None` when the platform has no data dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(DATA_DIR).join(RECENT_FILE))
    }

    /// Load from a file. A missing file yields an empty list.
    pub fn load(path: &Path, limit: usize) -> io::Result<Self> {
        let mut recent = Self::new(limit);
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(recent),
            Err(error) => return Err(error),
        };
        for line in contents.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            recent.entries.push(PathBuf::from(line));
            if recent.entries.len() >= recent.limit {
                break;
            }
        }
        Ok(recent)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string_lossy());
            out.push('\n');
        }
        fs::write(path, out)
    }

    /// Promote a path to the front, dropping duplicates (case-insensitive,
    /// as the list may carry paths from case-preserving filesystems).
    pub fn add(&mut self, path: &Path) {
        let needle = path.to_string_lossy().to_lowercase();
        self.entries
            .retain(|entry| entry.to_string_lossy().to_lowercase() != needle);
        self.entries.insert(0, path.to_path_buf());
        self.entries.truncate(self.limit);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
