//! Streaming configuration and runtime collaborators

use crate::error::{Result, StreamError};
use crate::render::RenderBackend;
use crate::storage::StorageBackend;
use crate::worker::WorkerPool;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Operating mode of the asset manager
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingMode {
    /// Manifest is mutable and guarded by a mutex
    Editor,
    /// Manifest is frozen after initialization
    #[default]
    Game,
}

/// Asset streaming settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Root directory all asset paths are relative to
    pub import_root: PathBuf,
    pub mode: OperatingMode,
    /// Per-frame budget for enabling completed async loads, in microseconds
    pub async_load_window_us: u64,
    /// Worker threads for async reads (0 = pool default)
    pub worker_threads: usize,
    /// Paths under this prefix are engine-internal system assets
    pub system_asset_prefix: String,
    /// Persisted manifest, relative to the import root
    pub manifest_file: Option<String>,
    /// Load every system asset synchronously at startup
    pub preload_system_assets: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            import_root: PathBuf::from("assets"),
            mode: OperatingMode::Game,
            async_load_window_us: 2_000,
            worker_threads: 0,
            system_asset_prefix: "system/".to_string(),
            manifest_file: None,
            preload_system_assets: true,
        }
    }
}

impl StreamConfig {
    /// Editor-mode settings rooted at `import_root`
    pub fn editor<P: Into<PathBuf>>(import_root: P) -> Self {
        Self {
            import_root: import_root.into(),
            mode: OperatingMode::Editor,
            ..Self::default()
        }
    }

    /// Game-mode settings rooted at `import_root`
    pub fn game<P: Into<PathBuf>>(import_root: P) -> Self {
        Self {
            import_root: import_root.into(),
            mode: OperatingMode::Game,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: StreamConfig = serde_json::from_str(json)
            .map_err(|e| StreamError::Config(format!("Invalid stream config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            StreamError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.async_load_window_us == 0 {
            return Err(StreamError::Config(
                "async_load_window_us must be greater than zero".to_string(),
            ));
        }
        if self.system_asset_prefix.starts_with('/') {
            return Err(StreamError::Config(format!(
                "system_asset_prefix '{}' must be relative",
                self.system_asset_prefix
            )));
        }
        Ok(())
    }

    pub fn async_load_window(&self) -> Duration {
        Duration::from_micros(self.async_load_window_us)
    }

    pub fn is_editor(&self) -> bool {
        self.mode == OperatingMode::Editor
    }

    /// Path of the `missing` system asset for a file extension
    pub fn missing_asset_path(&self, extension: &str) -> String {
        format!("{}missing.{extension}", self.system_asset_prefix)
    }
}

/// Collaborators handed to the asset manager at construction
#[derive(Clone)]
pub struct StreamContext {
    pub storage: Arc<dyn StorageBackend>,
    pub workers: Arc<dyn WorkerPool>,
    pub render: Arc<dyn RenderBackend>,
}

impl StreamContext {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        workers: Arc<dyn WorkerPool>,
        render: Arc<dyn RenderBackend>,
    ) -> Self {
        Self {
            storage,
            workers,
            render,
        }
    }
}
