//! Matrix layout conventions understood by inference runtimes.
//!
//! Both transforms are pure permutations: elements are copied, never recomputed, and each
//! `arrange` has an exact `restore` inverse.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::model::ShapeOrRangeError;

/// Order of the weight payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightLayout {
    /// `(clause, class)` row-major, as stored in the snapshot.
    ClauseMajor,
    /// `(class, clause)` row-major, i.e. transposed.
    ClassMajor,
}

/// Order of the clause payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseLayout {
    /// Per clause: all positive states, then all negated states.
    Block,
    /// Per clause: `(positive, negated)` pairs for each literal.
    Interleaved,
}

/// Layout the consuming runtime expects. Chosen by the caller; there is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportLayout {
    pub weights: WeightLayout,
    pub clauses: ClauseLayout,
}

impl ExportLayout {
    /// Matrices written exactly as the snapshot stores them.
    pub const IDENTITY: Self = Self {
        weights: WeightLayout::ClauseMajor,
        clauses: ClauseLayout::Block,
    };

    /// Class-major weights and interleaved literal pairs.
    pub const TRANSPOSED_INTERLEAVED: Self = Self {
        weights: WeightLayout::ClassMajor,
        clauses: ClauseLayout::Interleaved,
    };

    /// Resolve a named preset (`identity` or `transposed-interleaved`).
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "identity" => Some(Self::IDENTITY),
            "transposed-interleaved" => Some(Self::TRANSPOSED_INTERLEAVED),
            _ => None,
        }
    }
}

impl WeightLayout {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clause-major" | "clause_major" => Some(Self::ClauseMajor),
            "class-major" | "class_major" => Some(Self::ClassMajor),
            _ => None,
        }
    }

    /// Reorder a clause-major weight matrix into this layout.
    pub fn arrange(self, weights: ArrayView2<'_, i16>) -> Array2<i16> {
        match self {
            Self::ClauseMajor => weights.to_owned(),
            Self::ClassMajor => transpose(weights),
        }
    }

    /// Undo [`WeightLayout::arrange`], returning the clause-major matrix.
    pub fn restore(self, arranged: ArrayView2<'_, i16>) -> Array2<i16> {
        match self {
            Self::ClauseMajor => arranged.to_owned(),
            Self::ClassMajor => transpose(arranged),
        }
    }

    /// Shape of the payload for a model with the given dimensions.
    pub fn payload_shape(self, n_clauses: usize, n_classes: usize) -> (usize, usize) {
        match self {
            Self::ClauseMajor => (n_clauses, n_classes),
            Self::ClassMajor => (n_classes, n_clauses),
        }
    }
}

impl ClauseLayout {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "block" => Some(Self::Block),
            "interleaved" => Some(Self::Interleaved),
            _ => None,
        }
    }

    /// Reorder a block-layout clause matrix into this layout.
    pub fn arrange(self, clauses: ArrayView2<'_, i8>) -> Result<Array2<i8>, ShapeOrRangeError> {
        let pairs = check_pair_width(clauses)?;
        Ok(match self {
            Self::Block => clauses.to_owned(),
            Self::Interleaved => interleave_literals(pairs)?,
        })
    }

    /// Undo [`ClauseLayout::arrange`], returning the block-layout matrix.
    pub fn restore(self, arranged: ArrayView2<'_, i8>) -> Result<Array2<i8>, ShapeOrRangeError> {
        let pairs = check_pair_width(arranged)?;
        Ok(match self {
            Self::Block => arranged.to_owned(),
            Self::Interleaved => deinterleave_literals(pairs)?,
        })
    }
}

/// Copy of `matrix` with its axes swapped, in standard row-major order.
pub fn transpose<T: Copy>(matrix: ArrayView2<'_, T>) -> Array2<T> {
    matrix.t().as_standard_layout().into_owned()
}

/// Block rows `[p0..pn, q0..qn]` to pair rows `[p0, q0, p1, q1, ..]`.
///
/// Fails with [`ShapeOrRangeError::OddRowWidth`] when rows cannot be split into pairs.
pub fn interleave_literals<T: Copy>(
    block: ArrayView2<'_, T>,
) -> Result<Array2<T>, ShapeOrRangeError> {
    let n_literals = check_pair_width(block)?.ncols() / 2;
    Ok(Array2::from_shape_fn(block.dim(), |(row, col)| {
        let literal = col / 2;
        if col % 2 == 0 {
            block[[row, literal]]
        } else {
            block[[row, n_literals + literal]]
        }
    }))
}

/// Inverse of [`interleave_literals`].
pub fn deinterleave_literals<T: Copy>(
    pairs: ArrayView2<'_, T>,
) -> Result<Array2<T>, ShapeOrRangeError> {
    let n_literals = check_pair_width(pairs)?.ncols() / 2;
    Ok(Array2::from_shape_fn(pairs.dim(), |(row, col)| {
        if col < n_literals {
            pairs[[row, 2 * col]]
        } else {
            pairs[[row, 2 * (col - n_literals) + 1]]
        }
    }))
}

fn check_pair_width<T>(
    matrix: ArrayView2<'_, T>,
) -> Result<ArrayView2<'_, T>, ShapeOrRangeError> {
    if matrix.ncols() % 2 != 0 {
        return Err(ShapeOrRangeError::OddRowWidth {
            matrix: "clauses",
            width: matrix.ncols(),
        });
    }
    Ok(matrix)
}
