use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use thiserror::Error;

use crate::model::{MAX_STATE, MIN_STATE, ModelParams, ModelSnapshot, ShapeOrRangeError};

use super::header::{ArtifactHeader, HEADER_LEN};
use super::layout::ExportLayout;

#[derive(Debug, Error)]
pub enum ArtifactReadError {
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("artifact is {actual} bytes (expected {expected})")]
    LengthMismatch { expected: u64, actual: u64 },
    #[error("artifact header has negative dimensions")]
    InvalidDimensions,
    #[error("unexpected state bounds [{min}, {max}] (expected [-127, 127])")]
    StateBounds { min: i32, max: i32 },
    #[error("invalid boost flag {0} (expected 0 or 1)")]
    BoostFlag(i32),
    #[error("artifact content rejected: {0}")]
    Content(#[from] ShapeOrRangeError),
}

/// Read only the fixed header of the artifact at `path`.
pub fn read_header(path: &Path) -> Result<ArtifactHeader, ArtifactReadError> {
    let mut file = File::open(path).map_err(|source| io_error(path, source))?;
    let mut bytes = [0u8; HEADER_LEN];
    file.read_exact(&mut bytes)
        .map_err(|source| io_error(path, source))?;
    Ok(ArtifactHeader::decode(&bytes))
}

/// Read and decode the artifact at `path` written with `layout`.
pub fn read_artifact(path: &Path, layout: ExportLayout) -> Result<ModelSnapshot, ArtifactReadError> {
    let bytes = std::fs::read(path).map_err(|source| io_error(path, source))?;
    let snapshot = decode_artifact(&bytes, layout)?;
    tracing::info!(
        bytes = bytes.len(),
        "Read model artifact from {}",
        path.display()
    );
    Ok(snapshot)
}

/// Decode a complete artifact, undoing `layout` so the result is clause-major / block layout.
///
/// The layout cannot be detected from the bytes; decoding with the wrong layout yields a
/// permuted model rather than an error.
pub fn decode_artifact(
    bytes: &[u8],
    layout: ExportLayout,
) -> Result<ModelSnapshot, ArtifactReadError> {
    let header_bytes: &[u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(ArtifactReadError::LengthMismatch {
            expected: HEADER_LEN as u64,
            actual: bytes.len() as u64,
        })?;
    let header = ArtifactHeader::decode(header_bytes);
    check_header(&header)?;
    let expected = header
        .artifact_len()
        .ok_or(ArtifactReadError::InvalidDimensions)?;
    if bytes.len() as u64 != expected {
        return Err(ArtifactReadError::LengthMismatch {
            expected,
            actual: bytes.len() as u64,
        });
    }

    let params = ModelParams {
        threshold: header.threshold,
        n_literals: header.n_literals,
        n_clauses: header.n_clauses,
        n_classes: header.n_classes,
        boost_true_positive: header.boost_flag == 1,
    };
    let n_clauses = dimension(header.n_clauses)?;
    let n_classes = dimension(header.n_classes)?;
    let n_literals = dimension(header.n_literals)?;

    let weight_end = HEADER_LEN + n_clauses * n_classes * 2;
    let weight_values = bytes[HEADER_LEN..weight_end]
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect::<Vec<_>>();
    let arranged = Array2::from_shape_vec(
        layout.weights.payload_shape(n_clauses, n_classes),
        weight_values,
    )
    .map_err(|_| ArtifactReadError::InvalidDimensions)?;
    let weights = layout.weights.restore(arranged.view());

    let clause_values = bytes[weight_end..]
        .iter()
        .map(|byte| i8::from_le_bytes([*byte]))
        .collect::<Vec<_>>();
    let arranged = Array2::from_shape_vec((n_clauses, 2 * n_literals), clause_values)
        .map_err(|_| ArtifactReadError::InvalidDimensions)?;
    let clauses = layout.clauses.restore(arranged.view())?;

    Ok(ModelSnapshot::new(params, weights, clauses)?)
}

fn check_header(header: &ArtifactHeader) -> Result<(), ArtifactReadError> {
    if header.max_state != i32::from(MAX_STATE) || header.min_state != i32::from(MIN_STATE) {
        return Err(ArtifactReadError::StateBounds {
            min: header.min_state,
            max: header.max_state,
        });
    }
    if !matches!(header.boost_flag, 0 | 1) {
        return Err(ArtifactReadError::BoostFlag(header.boost_flag));
    }
    Ok(())
}

fn dimension(value: i32) -> Result<usize, ArtifactReadError> {
    usize::try_from(value).map_err(|_| ArtifactReadError::InvalidDimensions)
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactReadError {
    ArtifactReadError::Io {
        path: path.to_path_buf(),
        source,
    }
}
