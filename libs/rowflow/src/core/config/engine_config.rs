// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Engine-run configuration loaded from YAML, JSON or TOML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{EngineError, Result};

/// Default capacity of every bounded row queue, in batches.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Above this container count the topological sort is skipped.
pub const DEFAULT_TOPOLOGY_SORT_THRESHOLD: usize = 150;

/// Per-run engine configuration.
///
/// Every field has a default so partial files are valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of each allocated queue (and of row-producer queues).
    pub queue_capacity: usize,
    /// Stabilize container order with the cocktail sort before init.
    pub sort_topologically: bool,
    /// Sorting is skipped when the container count reaches this value.
    pub topology_sort_threshold: usize,
    /// Capture periodic per-container performance snapshots.
    pub capture_snapshots: bool,
    pub snapshot_interval_ms: u64,
    /// Snapshots retained per container; 0 keeps all of them.
    pub snapshot_size_limit: usize,
    /// Pause between successive stop notifications during a hard stop.
    pub kill_grace_ms: u64,
    /// Wait slice used by queue polling and `wait_until_finished`.
    pub poll_interval_ms: u64,
    /// Extra row-shape checks in steps that support them.
    pub safe_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            sort_topologically: true,
            topology_sort_threshold: DEFAULT_TOPOLOGY_SORT_THRESHOLD,
            capture_snapshots: false,
            snapshot_interval_ms: 1000,
            snapshot_size_limit: 0,
            kill_grace_ms: 20,
            poll_interval_ms: 10,
            safe_mode: false,
        }
    }
}

impl EngineConfig {
    /// Environment variable overriding `queue_capacity`.
    pub const QUEUE_CAPACITY_ENV: &'static str = "ROWFLOW_QUEUE_CAPACITY";

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms.max(1))
    }

    /// Load from a file; the format is picked by extension
    /// (`.yaml`/`.yml`, `.json`, `.toml`).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let parsed: std::result::Result<Self, String> = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            "toml" => toml::from_str(&content).map_err(|e| e.to_string()),
            other => {
                return Err(EngineError::Configuration(format!(
                    "Unsupported config format '{}' for {}",
                    other,
                    path.display()
                )));
            }
        };

        let config = parsed.map_err(|e| {
            EngineError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;

        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Load from a file, returning defaults if it is missing or unparseable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No engine config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Apply `ROWFLOW_QUEUE_CAPACITY` if it is set to a positive integer.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(Self::QUEUE_CAPACITY_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => {
                    tracing::debug!("Queue capacity overridden by environment: {}", capacity);
                    self.queue_capacity = capacity;
                }
                _ => tracing::warn!(
                    "Ignoring {}={:?} (expected a positive integer)",
                    Self::QUEUE_CAPACITY_ENV,
                    raw
                ),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(EngineError::Configuration(
                "queue_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(config.sort_topologically);
        assert_eq!(config.topology_sort_threshold, 150);
        assert_eq!(config.kill_grace_ms, 20);
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "engine.yaml", "queue_capacity: 50\ncapture_snapshots: true\n");
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.queue_capacity, 50);
        assert!(config.capture_snapshots);
        assert_eq!(config.snapshot_interval_ms, 1000);
    }

    #[test]
    fn test_load_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = write_file(&dir, "engine.toml", "queue_capacity = 7\nkill_grace_ms = 0\n");
        let json_path = write_file(&dir, "engine.json", r#"{"sort_topologically": false}"#);

        let from_toml = EngineConfig::load(&toml_path).unwrap();
        assert_eq!(from_toml.queue_capacity, 7);
        assert_eq!(from_toml.kill_grace_ms, 0);

        let from_json = EngineConfig::load(&json_path).unwrap();
        assert!(!from_json.sort_topologically);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "engine.yaml", "queue_capacity: 0\n");
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert_eq!(EngineConfig::load_or_default(&missing), EngineConfig::default());

        let broken = write_file(&dir, "broken.yaml", "queue_capacity: [not a number\n");
        assert_eq!(EngineConfig::load_or_default(&broken), EngineConfig::default());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        // SAFETY: serialized with other env-touching tests.
        unsafe { std::env::set_var(EngineConfig::QUEUE_CAPACITY_ENV, "64") };
        let config = EngineConfig::default().with_env_overrides();
        unsafe { std::env::remove_var(EngineConfig::QUEUE_CAPACITY_ENV) };
        assert_eq!(config.queue_capacity, 64);
    }

    #[test]
    #[serial]
    fn test_env_override_ignores_garbage() {
        // SAFETY: serialized with other env-touching tests.
        unsafe { std::env::set_var(EngineConfig::QUEUE_CAPACITY_ENV, "zero") };
        let config = EngineConfig::default().with_env_overrides();
        unsafe { std::env::remove_var(EngineConfig::QUEUE_CAPACITY_ENV) };
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }
}
