//! Persistence for [`Settings`]

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::Settings;
use crate::error::{HookError, Result};

/// Load/save access to the current settings
///
/// Implementations must return the latest saved state from `load`, so a
/// change made by the CLI takes effect on the next intercepted request.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Settings>;
    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// TOML file on disk; a missing file reads as defaults
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Result<Settings> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(e) => {
                return Err(HookError::Settings(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        toml::from_str(&content).map_err(|e| {
            HookError::Settings(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        let content = toml::to_string_pretty(settings)
            .map_err(|e| HookError::Serialization(format!("Failed to encode settings: {e}")))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_private(&path, content.as_bytes()))
            .await
            .map_err(|e| HookError::Settings(format!("Settings write task failed: {e}")))??;

        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// Replace `path` atomically with an owner-only file
///
/// Each write gets its own temp file in the target directory, so concurrent
/// writers never share one and a reader never sees a torn file.
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".settings.")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    tmp.persist(path).map_err(|e| HookError::Io(e.error))?;
    Ok(())
}

/// In-process store, used by tests and embedders
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    inner: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Settings> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        *self.inner.write().await = settings.clone();
        Ok(())
    }
}
