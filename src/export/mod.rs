//! Binary export of trained clause classifiers.
//!
//! An artifact is a 28-byte header (seven little-endian `i32`: threshold, literal count,
//! clause count, class count, max state, min state, boost flag) followed by the `i16` weight
//! payload and the `i8` clause payload, with no padding. The payload order is chosen by the
//! caller through [`ExportLayout`].

mod header;
mod layout;
mod manifest;
mod reader;
mod writer;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::{ModelSnapshot, ShapeOrRangeError, StateFileError, load_model_state};

pub use header::{ArtifactHeader, HEADER_LEN};
pub use layout::{
    ClauseLayout, ExportLayout, WeightLayout, deinterleave_literals, interleave_literals,
    transpose,
};
pub use manifest::{
    ArtifactManifest, ManifestCheck, ManifestError, load_manifest, manifest_path_for,
    write_manifest,
};
pub use reader::{ArtifactReadError, decode_artifact, read_artifact, read_header};
pub use writer::{encode_artifact, encode_to_vec, write_artifact};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("model rejected before export: {0}")]
    ShapeOrRange(#[from] ShapeOrRangeError),
    #[error(transparent)]
    StateFile(#[from] StateFileError),
    #[error("Failed to create artifact {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to sync artifact {path}: {source}")]
    Sync {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Result of a completed export.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub layout: ExportLayout,
    pub bytes_written: u64,
    /// Hex blake3 digest of the written bytes.
    pub checksum: String,
}

/// Options for [`export_model_state`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub layout: ExportLayout,
    /// Also write `<artifact>.manifest.json` next to the artifact.
    pub write_manifest: bool,
}

/// Export a snapshot and, when requested, its sidecar manifest.
pub fn export_snapshot(
    snapshot: &ModelSnapshot,
    out_path: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let summary = write_artifact(snapshot, options.layout, out_path)?;
    if options.write_manifest {
        let header = ArtifactHeader::for_snapshot(snapshot);
        write_manifest(out_path, &ArtifactManifest::new(&header, &summary))?;
    }
    Ok(summary)
}

/// Load a JSON model state, validate it, and export it.
///
/// Validation completes before the destination is opened, so a rejected model never creates
/// or truncates `out_path`.
pub fn export_model_state(
    state_path: &Path,
    out_path: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let snapshot = load_model_state(state_path)?;
    export_snapshot(&snapshot, out_path, options)
}
