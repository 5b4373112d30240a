//! Upload storage on disk
//!
//! Uploaded documents are kept under `<root>/uploads/<kind>/<uuid>-<name>`.
//! Database rows store the path relative to the uploads folder so the root
//! folder can be moved without rewriting rows.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Longest file-name stem kept after sanitising
const MAX_NAME_LEN: usize = 120;

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` and return the stored path relative to the uploads folder
    pub async fn save(&self, kind: &str, file_name: &str, bytes: &[u8]) -> std::io::Result<String> {
        let dir = self.root.join(kind);
        tokio::fs::create_dir_all(&dir).await?;

        let stored_name = format!("{}-{}", Uuid::new_v4().simple(), sanitize_file_name(file_name));
        tokio::fs::write(dir.join(&stored_name), bytes).await?;

        let relative = format!("{kind}/{stored_name}");
        debug!(path = %relative, size = bytes.len(), "Stored upload");
        Ok(relative)
    }

    /// Absolute path for a stored relative path
    ///
    /// Rejects absolute paths and `..` components so a row cannot point
    /// outside the uploads folder.
    pub fn resolve(&self, relative: &str) -> std::io::Result<PathBuf> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("stored path outside uploads folder: {relative}"),
            ));
        }
        Ok(self.root.join(rel))
    }

    pub async fn read(&self, relative: &str) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.resolve(relative)?).await
    }

    /// Delete a stored file; a file that is already gone is not an error
    pub async fn remove(&self, relative: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.resolve(relative)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %relative, "Stored file already missing");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort removal used after the owning row is gone
    pub async fn remove_quietly(&self, relative: Option<&str>) {
        if let Some(path) = relative {
            if let Err(e) = self.remove(path).await {
                warn!(path = %path, error = %e, "Failed to remove stored file");
            }
        }
    }
}

/// Reduce a client-supplied file name to a safe single path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        return "upload".to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}
