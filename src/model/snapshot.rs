use ndarray::{Array2, ArrayView2};
use thiserror::Error;

/// Upper bound of an automaton state in the exported format.
pub const MAX_STATE: i8 = 127;
/// Lower bound of an automaton state in the exported format.
pub const MIN_STATE: i8 = -127;

/// Precondition violations detected before an export touches the destination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeOrRangeError {
    /// A model dimension was zero or negative.
    #[error("{field} must be positive (got {value})")]
    NonPositiveDimension { field: &'static str, value: i64 },
    /// A scalar did not fit the signed 32-bit header slot.
    #[error("{field} value {value} does not fit in i32")]
    ScalarOutOfRange { field: &'static str, value: i64 },
    /// A matrix shape disagreed with the declared dimensions.
    #[error("{matrix} has shape {actual:?} (expected {expected:?})")]
    ShapeMismatch {
        matrix: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// A clause matrix whose rows cannot be split into literal pairs.
    #[error("{matrix} row width {width} is odd (expected positive/negated pairs)")]
    OddRowWidth { matrix: &'static str, width: usize },
    /// A provider row had the wrong number of columns.
    #[error("{matrix} row {row} has {actual} columns (expected {expected})")]
    RaggedRow {
        matrix: &'static str,
        row: usize,
        expected: usize,
        actual: usize,
    },
    /// A matrix element fell outside its storage range.
    #[error("{matrix}[{row}, {col}] = {value} outside [{min}, {max}]")]
    ValueOutOfRange {
        matrix: &'static str,
        row: usize,
        col: usize,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Scalar metadata of a trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelParams {
    pub threshold: i32,
    pub n_literals: i32,
    pub n_clauses: i32,
    pub n_classes: i32,
    pub boost_true_positive: bool,
}

/// Which half of a clause row an automaton state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// The literal itself.
    Positive,
    /// The negated literal.
    Negated,
}

/// Validated, shape-consistent model parameters ready for export.
///
/// Weights are stored clause-major (`n_clauses x n_classes`) and clause states in block
/// layout (`n_clauses x 2*n_literals`, positive states first). Construction enforces every
/// dimension and range invariant, so a value of this type can always be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSnapshot {
    params: ModelParams,
    weights: Array2<i16>,
    clauses: Array2<i8>,
}

impl ModelSnapshot {
    /// Build a snapshot from already-narrowed matrices.
    pub fn new(
        params: ModelParams,
        weights: Array2<i16>,
        clauses: Array2<i8>,
    ) -> Result<Self, ShapeOrRangeError> {
        let (n_literals, n_clauses, n_classes) = validate_params(&params)?;
        check_shape("weights", (n_clauses, n_classes), weights.dim())?;
        check_shape("clauses", (n_clauses, 2 * n_literals), clauses.dim())?;
        if let Some(((row, col), &value)) = clauses
            .indexed_iter()
            .find(|(_, value)| !(MIN_STATE..=MAX_STATE).contains(*value))
        {
            return Err(ShapeOrRangeError::ValueOutOfRange {
                matrix: "clauses",
                row,
                col,
                value: i64::from(value),
                min: i64::from(MIN_STATE),
                max: i64::from(MAX_STATE),
            });
        }
        Ok(Self {
            params,
            weights,
            clauses,
        })
    }

    /// Build a snapshot from wide accumulator matrices, narrowing every element with a
    /// checked conversion.
    pub fn from_wide(
        params: ModelParams,
        weights: ArrayView2<'_, i64>,
        clauses: ArrayView2<'_, i64>,
    ) -> Result<Self, ShapeOrRangeError> {
        let (n_literals, n_clauses, n_classes) = validate_params(&params)?;
        check_shape("weights", (n_clauses, n_classes), weights.dim())?;
        check_shape("clauses", (n_clauses, 2 * n_literals), clauses.dim())?;
        let weights = narrow(weights, "weights", i64::from(i16::MIN), i64::from(i16::MAX), |v| {
            i16::try_from(v).ok()
        })?;
        let clauses = narrow(
            clauses,
            "clauses",
            i64::from(MIN_STATE),
            i64::from(MAX_STATE),
            |v| i8::try_from(v).ok().filter(|s| *s >= MIN_STATE),
        )?;
        Self::new(params, weights, clauses)
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn threshold(&self) -> i32 {
        self.params.threshold
    }

    pub fn boost_true_positive(&self) -> bool {
        self.params.boost_true_positive
    }

    pub fn n_literals(&self) -> usize {
        self.clauses.ncols() / 2
    }

    pub fn n_clauses(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_classes(&self) -> usize {
        self.weights.ncols()
    }

    /// Weight matrix, `n_clauses x n_classes`.
    pub fn weights(&self) -> ArrayView2<'_, i16> {
        self.weights.view()
    }

    /// Clause state matrix in block layout, `n_clauses x 2*n_literals`.
    pub fn clauses(&self) -> ArrayView2<'_, i8> {
        self.clauses.view()
    }

    /// Automaton state of `literal` in `clause` for the given polarity.
    ///
    /// Returns `None` when either index is out of bounds.
    pub fn state(&self, clause: usize, literal: usize, polarity: Polarity) -> Option<i8> {
        let n_literals = self.n_literals();
        if literal >= n_literals {
            return None;
        }
        let col = match polarity {
            Polarity::Positive => literal,
            Polarity::Negated => n_literals + literal,
        };
        self.clauses.get((clause, col)).copied()
    }

    /// Weight of `clause` towards `class`.
    pub fn weight(&self, class: usize, clause: usize) -> Option<i16> {
        self.weights.get((clause, class)).copied()
    }
}

fn validate_params(params: &ModelParams) -> Result<(usize, usize, usize), ShapeOrRangeError> {
    Ok((
        positive("n_literals", params.n_literals)?,
        positive("n_clauses", params.n_clauses)?,
        positive("n_classes", params.n_classes)?,
    ))
}

fn positive(field: &'static str, value: i32) -> Result<usize, ShapeOrRangeError> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or(ShapeOrRangeError::NonPositiveDimension {
            field,
            value: i64::from(value),
        })
}

fn check_shape(
    matrix: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<(), ShapeOrRangeError> {
    if expected != actual {
        return Err(ShapeOrRangeError::ShapeMismatch {
            matrix,
            expected,
            actual,
        });
    }
    Ok(())
}

fn narrow<T>(
    wide: ArrayView2<'_, i64>,
    matrix: &'static str,
    min: i64,
    max: i64,
    convert: impl Fn(i64) -> Option<T>,
) -> Result<Array2<T>, ShapeOrRangeError> {
    let mut values = Vec::with_capacity(wide.len());
    for ((row, col), &value) in wide.indexed_iter() {
        let narrowed = convert(value).ok_or(ShapeOrRangeError::ValueOutOfRange {
            matrix,
            row,
            col,
            value,
            min,
            max,
        })?;
        values.push(narrowed);
    }
    Ok(Array2::from_shape_vec(wide.dim(), values)
        .expect("element count matches the source shape"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn params(n_literals: i32, n_clauses: i32, n_classes: i32) -> ModelParams {
        ModelParams {
            threshold: 10,
            n_literals,
            n_clauses,
            n_classes,
            boost_true_positive: false,
        }
    }

    #[test]
    fn accepts_consistent_shapes() {
        let snapshot = ModelSnapshot::new(
            params(2, 1, 3),
            array![[1, -2, 3]],
            array![[3, -4, 1, -2]],
        )
        .unwrap();
        assert_eq!(snapshot.n_literals(), 2);
        assert_eq!(snapshot.n_clauses(), 1);
        assert_eq!(snapshot.n_classes(), 3);
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let err = ModelSnapshot::new(params(2, 0, 1), Array2::zeros((0, 1)), Array2::zeros((0, 4)))
            .unwrap_err();
        assert_eq!(
            err,
            ShapeOrRangeError::NonPositiveDimension {
                field: "n_clauses",
                value: 0
            }
        );
        let err = ModelSnapshot::new(params(-1, 1, 1), array![[0]], array![[0, 0]]).unwrap_err();
        assert!(matches!(
            err,
            ShapeOrRangeError::NonPositiveDimension {
                field: "n_literals",
                ..
            }
        ));
    }

    #[test]
    fn rejects_shape_mismatch() {
        let err = ModelSnapshot::new(params(2, 1, 2), array![[1]], array![[0, 0, 0, 0]])
            .unwrap_err();
        assert_eq!(
            err,
            ShapeOrRangeError::ShapeMismatch {
                matrix: "weights",
                expected: (1, 2),
                actual: (1, 1)
            }
        );
        let err = ModelSnapshot::new(params(2, 1, 1), array![[1]], array![[0, 0, 0]])
            .unwrap_err();
        assert!(matches!(
            err,
            ShapeOrRangeError::ShapeMismatch {
                matrix: "clauses",
                ..
            }
        ));
    }

    #[test]
    fn rejects_state_below_min() {
        let err = ModelSnapshot::new(params(1, 1, 1), array![[1]], array![[0, -128]])
            .unwrap_err();
        assert_eq!(
            err,
            ShapeOrRangeError::ValueOutOfRange {
                matrix: "clauses",
                row: 0,
                col: 1,
                value: -128,
                min: -127,
                max: 127
            }
        );
    }

    #[test]
    fn from_wide_rejects_weight_overflow() {
        let err = ModelSnapshot::from_wide(
            params(1, 2, 1),
            array![[1i64], [40_000]].view(),
            array![[0i64, 0], [0, 0]].view(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ShapeOrRangeError::ValueOutOfRange {
                matrix: "weights",
                row: 1,
                col: 0,
                value: 40_000,
                min: -32768,
                max: 32767
            }
        );
    }

    #[test]
    fn from_wide_rejects_state_out_of_range() {
        let err = ModelSnapshot::from_wide(
            params(1, 1, 1),
            array![[1i64]].view(),
            array![[128i64, 0]].view(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ShapeOrRangeError::ValueOutOfRange {
                matrix: "clauses",
                value: 128,
                ..
            }
        ));
    }

    #[test]
    fn from_wide_keeps_boundary_values() {
        let snapshot = ModelSnapshot::from_wide(
            params(1, 1, 2),
            array![[-32768i64, 32767]].view(),
            array![[-127i64, 127]].view(),
        )
        .unwrap();
        assert_eq!(snapshot.weights(), array![[i16::MIN, i16::MAX]]);
        assert_eq!(snapshot.clauses(), array![[-127i8, 127]]);
    }

    #[test]
    fn accessors_follow_block_layout() {
        let snapshot = ModelSnapshot::new(
            params(2, 2, 2),
            array![[1, 2], [3, 4]],
            array![[3, -4, 1, -2], [5, 6, 7, 8]],
        )
        .unwrap();
        assert_eq!(snapshot.state(0, 1, Polarity::Positive), Some(-4));
        assert_eq!(snapshot.state(0, 1, Polarity::Negated), Some(-2));
        assert_eq!(snapshot.state(1, 0, Polarity::Negated), Some(7));
        assert_eq!(snapshot.state(0, 2, Polarity::Positive), None);
        assert_eq!(snapshot.state(2, 0, Polarity::Positive), None);
        assert_eq!(snapshot.weight(1, 0), Some(2));
        assert_eq!(snapshot.weight(0, 1), Some(3));
        assert_eq!(snapshot.weight(2, 0), None);
    }
}
