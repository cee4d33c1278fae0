//! JSON model state files handed over by the training side.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::snapshot::{ModelParams, ModelSnapshot, ShapeOrRangeError};

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("Failed to open model state {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid model state {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Inconsistent model state {path}: {source}")]
    Shape {
        path: PathBuf,
        source: ShapeOrRangeError,
    },
}

/// Raw trained state as written by the training pipeline.
///
/// Numbers are kept at full width so narrowing into the export widths can be checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStateFile {
    pub threshold: i64,
    pub n_literals: i64,
    pub n_clauses: i64,
    pub n_classes: i64,
    #[serde(default)]
    pub boost_true_positive: bool,
    /// `n_clauses` rows of `n_classes` weights.
    pub weights: Vec<Vec<i64>>,
    /// `n_clauses` rows of `2*n_literals` states, positive block first.
    pub clauses: Vec<Vec<i64>>,
}

impl ModelStateFile {
    /// Validate and narrow into an exportable snapshot.
    pub fn into_snapshot(self) -> Result<ModelSnapshot, ShapeOrRangeError> {
        let params = ModelParams {
            threshold: scalar("threshold", self.threshold)?,
            n_literals: scalar("n_literals", self.n_literals)?,
            n_clauses: scalar("n_clauses", self.n_clauses)?,
            n_classes: scalar("n_classes", self.n_classes)?,
            boost_true_positive: self.boost_true_positive,
        };
        let weights = rows_to_matrix("weights", self.weights)?;
        let clauses = rows_to_matrix("clauses", self.clauses)?;
        ModelSnapshot::from_wide(params, weights.view(), clauses.view())
    }
}

/// Load a model state JSON file and convert it into a snapshot.
pub fn load_model_state(path: &Path) -> Result<ModelSnapshot, StateFileError> {
    let file = File::open(path).map_err(|source| StateFileError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let state: ModelStateFile =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StateFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(
        n_clauses = state.n_clauses,
        n_classes = state.n_classes,
        n_literals = state.n_literals,
        "Loaded model state from {}",
        path.display()
    );
    state.into_snapshot().map_err(|source| StateFileError::Shape {
        path: path.to_path_buf(),
        source,
    })
}

fn scalar(field: &'static str, value: i64) -> Result<i32, ShapeOrRangeError> {
    i32::try_from(value).map_err(|_| ShapeOrRangeError::ScalarOutOfRange { field, value })
}

fn rows_to_matrix(
    matrix: &'static str,
    rows: Vec<Vec<i64>>,
) -> Result<Array2<i64>, ShapeOrRangeError> {
    let n_rows = rows.len();
    let n_cols = rows.first().map(Vec::len).unwrap_or(0);
    let mut flat = Vec::with_capacity(n_rows * n_cols);
    for (row, values) in rows.into_iter().enumerate() {
        if values.len() != n_cols {
            return Err(ShapeOrRangeError::RaggedRow {
                matrix,
                row,
                expected: n_cols,
                actual: values.len(),
            });
        }
        flat.extend(values);
    }
    Ok(Array2::from_shape_vec((n_rows, n_cols), flat)
        .expect("rows share one length"))
}
