// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for a sync session.
//!
//! Configuration is passed to [`Syncer::new()`](crate::Syncer::new) and can
//! be constructed programmatically or deserialized from JSON. The CLI loads
//! an optional file and then applies its flags on top.
//!
//! # Quick Start
//!
//! ```rust
//! use object_sync::config::SyncConfig;
//!
//! let config = SyncConfig {
//!     marker: "2024/".into(),
//!     end: Some("2025/".into()),
//!     threads: 32,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! SyncConfig
//! ├── marker: String            # exclusive lower bound ("" = from the start)
//! ├── end: Option<String>       # exclusive upper bound
//! ├── threads: usize            # replication workers
//! ├── page_size: usize          # keys per listing request
//! ├── queue_capacity: usize     # bounded work queue between diff and workers
//! ├── spill_threshold: u64      # objects above this go through a temp file
//! └── progress: ProgressConfig  # terminal progress bar
//! ```
//!
//! # JSON Example
//!
//! ```json
//! {
//!   "marker": "logs/2024-01-01",
//!   "threads": 50,
//!   "progress": { "enabled": true, "interval": "500ms" }
//! }
//! ```

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Maximum number of keys per listing request.
pub const MAX_RESULTS: usize = 10_240;

/// Objects larger than this are spilled to a temp file during replication.
pub const SPILL_THRESHOLD: u64 = 10 << 20;

/// Capacity of the work queue between the diff engine and the workers.
pub const QUEUE_CAPACITY: usize = 1024;

// ═══════════════════════════════════════════════════════════════════════════════
// SyncConfig: one sync invocation
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object passed to `Syncer::new()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Only keys strictly after this marker are synced.
    #[serde(default)]
    pub marker: String,

    /// Only keys strictly before this bound are synced. Empty means unbounded.
    #[serde(default)]
    pub end: Option<String>,

    /// Number of concurrent replication workers.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Keys requested per listing page. Also the lookahead of each listing.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Capacity of the work queue. A full queue blocks the diff engine.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Size in bytes above which objects are spilled to disk.
    #[serde(default = "default_spill_threshold")]
    pub spill_threshold: u64,

    /// Terminal progress bar settings.
    #[serde(default)]
    pub progress: ProgressConfig,
}

fn default_threads() -> usize {
    10
}

fn default_page_size() -> usize {
    MAX_RESULTS
}

fn default_queue_capacity() -> usize {
    QUEUE_CAPACITY
}

fn default_spill_threshold() -> u64 {
    SPILL_THRESHOLD
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            marker: String::new(),
            end: None,
            threads: default_threads(),
            page_size: MAX_RESULTS,
            queue_capacity: QUEUE_CAPACITY,
            spill_threshold: SPILL_THRESHOLD,
            progress: ProgressConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Small pages, queue and spill threshold so tests exercise paging and spilling.
    pub fn for_testing() -> Self {
        Self {
            threads: 4,
            page_size: 3,
            queue_capacity: 4,
            spill_threshold: 1024,
            ..Default::default()
        }
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("Can't read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| SyncError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Exclusive upper bound of the session, if any.
    pub fn end_bound(&self) -> Option<&str> {
        self.end.as_deref().filter(|end| !end.is_empty())
    }

    /// Check the config before any listing starts.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(SyncError::Config("threads must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(SyncError::Config("page_size must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(SyncError::Config("queue_capacity must be at least 1".into()));
        }
        if self.spill_threshold == 0 {
            return Err(SyncError::Config("spill_threshold must be at least 1".into()));
        }
        if let Some(end) = self.end_bound() {
            if end <= self.marker.as_str() {
                return Err(SyncError::Config(format!(
                    "end {:?} must sort after marker {:?}",
                    end, self.marker
                )));
            }
        }
        self.progress.validate()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ProgressConfig: terminal progress bar
// ═══════════════════════════════════════════════════════════════════════════════

/// Progress bar configuration.
///
/// `enabled` is decided by the caller (the CLI turns it on only for an
/// interactive terminal without `--verbose` or `--quiet`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Whether to render the bar at all.
    #[serde(default)]
    pub enabled: bool,

    /// Redraw interval as a duration string (e.g., "300ms").
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Bar width in columns.
    #[serde(default = "default_width")]
    pub width: usize,
}

fn default_interval() -> String {
    "300ms".to_string()
}

fn default_width() -> usize {
    80
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_interval(),
            width: default_width(),
        }
    }
}

impl ProgressConfig {
    /// Parse the interval string to a Duration.
    pub fn interval_duration(&self) -> Duration {
        humantime::parse_duration(&self.interval).unwrap_or(Duration::from_millis(300))
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(SyncError::Config("progress width must be at least 1".into()));
        }
        if self.interval_duration().is_zero() {
            return Err(SyncError::Config("progress interval must be non-zero".into()));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.marker, "");
        assert!(config.end.is_none());
        assert_eq!(config.threads, 10);
        assert_eq!(config.page_size, 10_240);
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.spill_threshold, 10 * 1024 * 1024);
        assert!(!config.progress.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_for_testing_config() {
        let config = SyncConfig::for_testing();
        assert_eq!(config.page_size, 3);
        assert_eq!(config.spill_threshold, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        for config in [
            SyncConfig { threads: 0, ..Default::default() },
            SyncConfig { page_size: 0, ..Default::default() },
            SyncConfig { queue_capacity: 0, ..Default::default() },
            SyncConfig { spill_threshold: 0, ..Default::default() },
        ] {
            assert!(matches!(config.validate(), Err(SyncError::Config(_))));
        }
    }

    #[test]
    fn test_validate_end_after_marker() {
        let ok = SyncConfig {
            marker: "a".into(),
            end: Some("b".into()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let equal = SyncConfig {
            marker: "b".into(),
            end: Some("b".into()),
            ..Default::default()
        };
        assert!(equal.validate().is_err());

        let before = SyncConfig {
            marker: "c".into(),
            end: Some("b".into()),
            ..Default::default()
        };
        let err = before.validate().unwrap_err();
        assert!(err.to_string().contains("must sort after marker"));
    }

    #[test]
    fn test_empty_end_is_unbounded() {
        let config = SyncConfig {
            marker: "m".into(),
            end: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.end_bound(), None);

        let parsed: SyncConfig = serde_json::from_str(r#"{"end": ""}"#).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.end_bound(), None);

        let bounded = SyncConfig {
            end: Some("z".into()),
            ..Default::default()
        };
        assert_eq!(bounded.end_bound(), Some("z"));
    }

    #[test]
    fn test_progress_interval_parsing() {
        let test_cases = [
            ("300ms", Duration::from_millis(300)),
            ("1s", Duration::from_secs(1)),
            ("2m", Duration::from_secs(120)),
        ];

        for (input, expected) in test_cases {
            let config = ProgressConfig {
                interval: input.to_string(),
                ..Default::default()
            };
            assert_eq!(config.interval_duration(), expected, "Failed for input: {}", input);
        }
    }

    #[test]
    fn test_progress_interval_invalid_fallback() {
        let config = ProgressConfig {
            interval: "soon".to_string(),
            ..Default::default()
        };
        assert_eq!(config.interval_duration(), Duration::from_millis(300));
    }

    #[test]
    fn test_progress_zero_width_rejected() {
        let config = SyncConfig {
            progress: ProgressConfig { width: 0, ..Default::default() },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"marker": "k", "progress": {"enabled": true}}"#).unwrap();
        assert_eq!(config.marker, "k");
        assert_eq!(config.threads, 10);
        assert_eq!(config.page_size, MAX_RESULTS);
        assert!(config.progress.enabled);
        assert_eq!(config.progress.interval, "300ms");
        assert_eq!(config.progress.width, 80);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = SyncConfig {
            marker: "from".into(),
            end: Some("to".into()),
            threads: 7,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.marker, "from");
        assert_eq!(parsed.end.as_deref(), Some("to"));
        assert_eq!(parsed.threads, 7);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.json");
        std::fs::write(&path, r#"{"threads": 3, "end": "z"}"#).unwrap();

        let config = SyncConfig::from_json_file(&path).unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.end.as_deref(), Some("z"));

        let missing = SyncConfig::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(missing, Err(SyncError::Config(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(SyncConfig::from_json_file(&path), Err(SyncError::Config(_))));
    }
}
