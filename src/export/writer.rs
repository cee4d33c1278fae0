use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::model::ModelSnapshot;

use super::header::ArtifactHeader;
use super::layout::ExportLayout;
use super::{ExportError, ExportSummary};

/// Encode `snapshot` into `writer`: header, weight payload, clause payload.
///
/// Writes are issued row by row; pass a buffered writer for file targets. Returns the number
/// of bytes written.
pub fn encode_artifact<W: Write>(
    snapshot: &ModelSnapshot,
    layout: ExportLayout,
    writer: &mut W,
) -> io::Result<u64> {
    let header = ArtifactHeader::for_snapshot(snapshot);
    let header_bytes = header.encode();
    writer.write_all(&header_bytes)?;
    let mut written = header_bytes.len() as u64;

    let weights = layout.weights.arrange(snapshot.weights());
    tracing::debug!(layout = ?layout.weights, shape = ?weights.dim(), "Writing weight payload");
    let mut row_bytes = Vec::with_capacity(weights.ncols() * 2);
    for row in weights.rows() {
        row_bytes.clear();
        row_bytes.extend(row.iter().flat_map(|value| value.to_le_bytes()));
        writer.write_all(&row_bytes)?;
        written += row_bytes.len() as u64;
    }

    let clauses = layout
        .clauses
        .arrange(snapshot.clauses())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    tracing::debug!(layout = ?layout.clauses, shape = ?clauses.dim(), "Writing clause payload");
    let mut row_bytes = Vec::with_capacity(clauses.ncols());
    for row in clauses.rows() {
        row_bytes.clear();
        row_bytes.extend(row.iter().flat_map(|value| value.to_le_bytes()));
        writer.write_all(&row_bytes)?;
        written += row_bytes.len() as u64;
    }

    debug_assert_eq!(Some(written), header.artifact_len());
    Ok(written)
}

/// Encode `snapshot` into an in-memory buffer.
pub fn encode_to_vec(snapshot: &ModelSnapshot, layout: ExportLayout) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(len) = ArtifactHeader::for_snapshot(snapshot).artifact_len() {
        out.reserve(usize::try_from(len).unwrap_or(0));
    }
    encode_artifact(snapshot, layout, &mut out).expect("writing to a Vec does not fail");
    out
}

/// Write the artifact for `snapshot` to `path`, truncating any existing file.
///
/// Bytes go straight to the destination without a temp-file-and-rename step. If a write
/// fails part way the file is left truncated and must be treated as unusable; callers that
/// need atomic replacement should write to a scratch path and rename it themselves.
pub fn write_artifact(
    snapshot: &ModelSnapshot,
    layout: ExportLayout,
    path: &Path,
) -> Result<ExportSummary, ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = HashingWriter::new(BufWriter::new(file));
    let bytes_written =
        encode_artifact(snapshot, layout, &mut writer).map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    let (buffered, checksum) = writer.finish();
    let file = buffered.into_inner().map_err(|err| ExportError::Write {
        path: path.to_path_buf(),
        source: err.into_error(),
    })?;
    file.sync_all().map_err(|source| ExportError::Sync {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        bytes = bytes_written,
        weights = ?layout.weights,
        clauses = ?layout.clauses,
        "Wrote model artifact to {}",
        path.display()
    );
    Ok(ExportSummary {
        path: path.to_path_buf(),
        layout,
        bytes_written,
        checksum,
    })
}

/// Tees every written byte into a blake3 hasher.
struct HashingWriter<W> {
    inner: W,
    hasher: blake3::Hasher,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
        }
    }

    fn finish(self) -> (W, String) {
        (self.inner, self.hasher.finalize().to_hex().to_string())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
