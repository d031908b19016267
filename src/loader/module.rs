//! Bundle materialization
//!
//! Turns bundle source code into a ready-to-run package. Source that did not
//! come from a file yet is staged to a uniquely named temporary file first,
//! so every bundle goes through the same file-based load path. The staged
//! file is removed on every exit path.

use crate::error::{PackError, PackResult};
use crate::package::{FactoryRegistry, SharedPackage};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

/// Default upper bound on materializing one bundle
pub const MATERIALIZE_TIMEOUT: Duration = Duration::from_secs(10);

/// Staging directory used when none is configured, or when the configured
/// one cannot be created. Never under the disk cache directory.
pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("agentpack-staging")
}

/// Temporary bundle file, deleted when dropped
#[derive(Debug)]
struct StagedBundle {
    path: PathBuf,
}

impl StagedBundle {
    async fn write(dir: &Path, id: &str, code: &str) -> PackResult<Self> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| PackError::io(format!("creating staging dir {}", dir.display()), e))?;

        let name = format!(
            "{}-{}-{}.json",
            id,
            Utc::now().timestamp_millis(),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        let staged = Self {
            path: dir.join(name),
        };

        fs::write(&staged.path, code).await.map_err(|e| {
            PackError::io(format!("staging bundle {}", staged.path.display()), e)
        })?;

        Ok(staged)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedBundle {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Failed to remove staged bundle {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Materializes bundles into packages through the factory registry
#[derive(Clone)]
pub struct ModuleLoader {
    staging_dir: PathBuf,
    factories: FactoryRegistry,
    timeout: Duration,
}

impl ModuleLoader {
    pub fn new(staging_dir: impl Into<PathBuf>, factories: FactoryRegistry, timeout: Duration) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            factories,
            timeout,
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Stage `code` to a temporary file and load it from there
    pub async fn materialize_source(&self, id: &str, code: &str) -> PackResult<SharedPackage> {
        let staged = self.stage(id, code).await?;
        debug!(package_id = id, "Staged bundle at {}", staged.path().display());
        let result = self.materialize_file(id, staged.path()).await;
        drop(staged);
        result
    }

    async fn stage(&self, id: &str, code: &str) -> PackResult<StagedBundle> {
        match StagedBundle::write(&self.staging_dir, id, code).await {
            Ok(staged) => Ok(staged),
            Err(e) => {
                let fallback = default_staging_dir();
                if fallback == self.staging_dir {
                    return Err(e);
                }
                warn!(
                    package_id = id,
                    "Staging dir {} unusable ({}), using {}",
                    self.staging_dir.display(),
                    e,
                    fallback.display()
                );
                StagedBundle::write(&fallback, id, code).await
            }
        }
    }

    /// Load a bundle that is already on disk
    pub async fn materialize_file(&self, id: &str, path: &Path) -> PackResult<SharedPackage> {
        let source = fs::read_to_string(path)
            .await
            .map_err(|e| PackError::io(format!("reading bundle {}", path.display()), e))?;

        let factories = self.factories.clone();
        let owned_id = id.to_string();
        let task = tokio::task::spawn_blocking(move || factories.build(&owned_id, &source));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => {
                joined.map_err(|e| PackError::Internal(format!("materialize task failed: {}", e)))?
            }
            Err(_) => Err(PackError::Timeout {
                operation: format!("materializing package {}", id),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}
