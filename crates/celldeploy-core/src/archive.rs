//! Archive collaborators and the scoped export of an archive to disk

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempPath;
use tracing::{debug, warn};

use crate::error::DeployError;
use crate::state::ArchiveName;

/// A deployable application archive
pub trait Archive: Send + Sync {
    /// Display name, e.g. `shop.war`
    fn name(&self) -> &str;

    /// Write the archive contents to `path`
    fn export_to(&self, path: &Path) -> std::io::Result<()>;
}

/// Validates an exported archive's deployment descriptor
///
/// An empty list means the archive is deployable.
#[async_trait]
pub trait DescriptorValidator: Send + Sync {
    async fn validate(&self, archive: &Path) -> Vec<String>;
}

/// Validator that accepts every archive
#[derive(Debug, Clone, Default)]
pub struct SkipValidation;

#[async_trait]
impl DescriptorValidator for SkipValidation {
    async fn validate(&self, _archive: &Path) -> Vec<String> {
        Vec::new()
    }
}

/// Archive that already exists on disk
#[derive(Debug, Clone)]
pub struct FileArchive {
    name: String,
    source: PathBuf,
}

impl FileArchive {
    /// Use the file name of `source` as display name
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, source }
    }

    /// Override the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Archive for FileArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn export_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::copy(&self.source, path).map(|_| ())
    }
}

/// Archive exported to a temporary file, removed on drop
#[derive(Debug)]
pub struct ExportedArchive {
    path: Option<TempPath>,
}

impl ExportedArchive {
    /// Export `archive` to a fresh temporary file named after `name`
    ///
    /// # Errors
    /// Returns `DeployError::Archive` if the file cannot be created or written
    pub fn export(archive: &dyn Archive, name: &ArchiveName) -> Result<Self, DeployError> {
        let path = tempfile::Builder::new()
            .prefix(&name.app_name)
            .suffix(&name.extension)
            .tempfile()
            .map_err(|e| DeployError::Archive(e.to_string()))?
            .into_temp_path();

        // From here on the file is removed by `Drop`, including on export failure
        let exported = Self { path: Some(path) };
        archive
            .export_to(exported.path())
            .map_err(|e| DeployError::Archive(e.to_string()))?;

        debug!(archive = %archive.name(), path = %exported.path().display(), "exported archive");

        Ok(exported)
    }

    /// Location of the exported archive
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for ExportedArchive {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let location = path.display().to_string();
            match path.close() {
                Ok(()) => debug!(path = %location, "removed exported archive"),
                Err(e) => warn!(path = %location, error = %e, "failed to remove exported archive"),
            }
        }
    }
}
