//! Viewer configuration
//!
//! Tunables for interaction behavior. The hit tolerance and the
//! topmost-wins tie-break are empirical UI choices, so they live here
//! rather than as hard-coded invariants. Persisted as JSON in the per-user
//! config directory; a missing or unreadable file falls back to defaults.

use std::fs;
use std::io;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = "slateview";
const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Image hit-test tolerance in client pixels.
    pub image_hit_tolerance_px: f64,
    /// Prefer the frontmost image when several overlap under the cursor.
    pub topmost_image_wins: bool,
    /// Pointer travel (pixels, per axis) beyond which a press-release pair
    /// counts as a drag instead of a click.
    pub drag_threshold_px: i32,
    /// Pixels scrolled per wheel notch.
    pub scroll_step_px: i32,
    /// Number of rendered frames kept for identical-state re-renders.
    pub frame_cache_size: usize,
    /// Quality for JPEG export containers.
    pub jpeg_quality: u8,
    /// Entries kept in the recent-files list.
    pub max_recent: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            image_hit_tolerance_px: 2.0,
            topmost_image_wins: true,
            drag_threshold_px: 2,
            scroll_step_px: 30,
            frame_cache_size: crate::viewer::DEFAULT_FRAME_CACHE_SIZE,
            jpeg_quality: 90,
            max_recent: 10,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] io::Error),

    #[error("config parse: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-user config file path; `None` when no config directory exists on
/// this platform.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load the persisted config, falling back to defaults on any failure.
#[must_use]
pub fn load() -> ViewerConfig {
    let Some(path) = config_path() else {
        return ViewerConfig::default();
    };
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(error) => {
                warn!("ignoring malformed config {}: {error}", path.display());
                ViewerConfig::default()
            }
        },
        Err(_) => ViewerConfig::default(),
    }
}

/// Persist the config as pretty JSON, creating the directory when needed.
pub fn save(config: &ViewerConfig) -> Result<(), ConfigError> {
    let Some(path) = config_path() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ViewerConfig::default();
        assert!(config.image_hit_tolerance_px > 0.0);
        assert!(config.topmost_image_wins);
        assert!(config.frame_cache_size > 0);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: ViewerConfig = serde_json::from_str(r#"{"drag_threshold_px": 5}"#).unwrap();
        assert_eq!(config.drag_threshold_px, 5);
        assert_eq!(config.scroll_step_px, ViewerConfig::default().scroll_step_px);
    }

    #[test]
    fn round_trips_through_json() {
        let mut config = ViewerConfig::default();
        config.topmost_image_wins = false;
        config.jpeg_quality = 75;
        let json = serde_json::to_string(&config).unwrap();
        let back: ViewerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
