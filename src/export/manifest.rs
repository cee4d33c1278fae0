//! Sidecar manifest recording how an artifact was laid out.
//!
//! The artifact header carries no layout tag; the manifest records which convention was
//! used. The artifact bytes never depend on it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ExportSummary;
use super::header::{ArtifactHeader, HEADER_LEN};
use super::layout::ExportLayout;

const MANIFEST_FORMAT_VERSION: i64 = 1;
const MANIFEST_SUFFIX: &str = ".manifest.json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported manifest format_version {0}")]
    UnsupportedVersion(i64),
}

/// Contents of `<artifact file name>.manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: i64,
    pub layout: ExportLayout,
    pub threshold: i32,
    pub n_literals: i32,
    pub n_clauses: i32,
    pub n_classes: i32,
    pub artifact_len: u64,
    /// Hex blake3 digest of the artifact bytes.
    pub blake3: String,
}

/// Outcome of checking artifact bytes against a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestCheck {
    Match,
    LengthMismatch,
    ChecksumMismatch,
    HeaderMismatch,
}

impl ArtifactManifest {
    pub fn new(header: &ArtifactHeader, summary: &ExportSummary) -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            layout: summary.layout,
            threshold: header.threshold,
            n_literals: header.n_literals,
            n_clauses: header.n_clauses,
            n_classes: header.n_classes,
            artifact_len: summary.bytes_written,
            blake3: summary.checksum.clone(),
        }
    }

    /// Compare `bytes` with the recorded length, header fields and checksum.
    pub fn verify(&self, bytes: &[u8]) -> ManifestCheck {
        if bytes.len() as u64 != self.artifact_len {
            return ManifestCheck::LengthMismatch;
        }
        if blake3::hash(bytes).to_hex().as_str() != self.blake3 {
            return ManifestCheck::ChecksumMismatch;
        }
        let header_matches = bytes
            .first_chunk::<HEADER_LEN>()
            .map(ArtifactHeader::decode)
            .is_some_and(|header| {
                header.threshold == self.threshold
                    && header.n_literals == self.n_literals
                    && header.n_clauses == self.n_clauses
                    && header.n_classes == self.n_classes
            });
        if !header_matches {
            return ManifestCheck::HeaderMismatch;
        }
        ManifestCheck::Match
    }
}

/// Manifest path paired with `artifact_path` (`model.bin` -> `model.bin.manifest.json`).
///
/// The suffix is appended to the whole file name so artifacts differing only in extension
/// keep separate manifests.
pub fn manifest_path_for(artifact_path: &Path) -> PathBuf {
    let mut name = artifact_path.as_os_str().to_owned();
    name.push(MANIFEST_SUFFIX);
    PathBuf::from(name)
}

/// Write `manifest` next to `artifact_path`, returning the manifest path.
pub fn write_manifest(
    artifact_path: &Path,
    manifest: &ArtifactManifest,
) -> Result<PathBuf, ManifestError> {
    let path = manifest_path_for(artifact_path);
    let bytes = serde_json::to_vec_pretty(manifest)?;
    std::fs::write(&path, bytes).map_err(|source| ManifestError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("Wrote artifact manifest to {}", path.display());
    Ok(path)
}

/// Load the manifest paired with `artifact_path`, if one exists.
pub fn load_manifest(artifact_path: &Path) -> Result<Option<ArtifactManifest>, ManifestError> {
    let path = manifest_path_for(artifact_path);
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = std::fs::read(&path).map_err(|source| ManifestError::Read {
        path: path.clone(),
        source,
    })?;
    let manifest: ArtifactManifest =
        serde_json::from_slice(&bytes).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;
    if manifest.format_version != MANIFEST_FORMAT_VERSION {
        return Err(ManifestError::UnsupportedVersion(manifest.format_version));
    }
    Ok(Some(manifest))
}
