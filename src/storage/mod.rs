use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use thiserror::Error;

use crate::artifact::{ImageArtifact, DEFAULT_MIME};

const DEFAULT_OUTPUT_SUBDIR: &str = "Pictures";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("{path} has no file name")]
    MissingFileName { path: PathBuf },
    #[error("{path} is empty")]
    EmptyFile { path: PathBuf },
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Reads an image file into an artifact named after the file.
///
/// The MIME type comes from the file's magic bytes, then its extension, then PNG.
pub fn import_image(path: &Path) -> StorageResult<ImageArtifact> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StorageError::MissingFileName {
            path: path.to_path_buf(),
        })?
        .to_string();
    let bytes = fs::read(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(StorageError::EmptyFile {
            path: path.to_path_buf(),
        });
    }

    let mime = image::guess_format(&bytes)
        .or_else(|_| ImageFormat::from_path(path))
        .map(|format| format.to_mime_type())
        .unwrap_or(DEFAULT_MIME);
    tracing::debug!(path = %path.display(), mime, size = bytes.len(), "image imported");
    Ok(ImageArtifact::new(name, mime, bytes))
}

#[derive(Debug, Clone)]
pub struct StorageService {
    output_dir: PathBuf,
}

impl StorageService {
    pub const fn with_output_dir(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// `~/Pictures`, matching where desktop tools drop exported images.
    pub fn with_default_output_dir() -> StorageResult<Self> {
        let home = std::env::var_os("HOME").ok_or(StorageError::MissingHomeDirectory)?;
        let mut output_dir = PathBuf::from(home);
        output_dir.push(DEFAULT_OUTPUT_SUBDIR);
        Ok(Self::with_output_dir(output_dir))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn target_path(&self, artifact: &ImageArtifact) -> PathBuf {
        self.output_dir.join(artifact.download_name())
    }

    /// Writes `artifact` as `edited-<name>`, replacing any earlier export of the same name.
    pub fn export_artifact(&self, artifact: &ImageArtifact) -> StorageResult<PathBuf> {
        fs::create_dir_all(&self.output_dir).map_err(|source| StorageError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        let target = self.target_path(artifact);
        fs::write(&target, artifact.bytes()).map_err(|source| StorageError::Io {
            path: target.clone(),
            source,
        })?;
        tracing::info!(path = %target.display(), size = artifact.len(), "artifact exported");
        Ok(target)
    }
}
