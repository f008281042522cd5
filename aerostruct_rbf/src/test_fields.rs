/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides analytic displacement fields for validating interpolation operators.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Analytic fields that an augmented RBF operator must reproduce exactly.
use crate::error::{TransferError, TransferResult};
use faer::{Mat, MatRef};

/// Affine vector field `f(x) = A x + b`, evaluated one point per row.
///
/// Constant fields and rigid body motions are the special cases a
/// polynomial augmented interpolation operator reproduces exactly.
#[derive(Debug, Clone)]
pub struct TestFields {
    /// `(components, 3)` linear part.
    linear: Mat<f64>,

    /// One offset per component.
    offset: Vec<f64>,
}

impl TestFields {
    /// Constant field equal to `value` everywhere.
    pub fn constant(value: &[f64]) -> Self {
        Self {
            linear: Mat::zeros(value.len(), 3),
            offset: value.to_vec(),
        }
    }

    /// Affine field `f(x) = A x + b`. `A` has one row per component of `b`
    /// and one column per coordinate.
    ///
    /// # Errors
    /// [`TransferError::ShapeMismatch`] if `A` is not `(b.len(), 3)`.
    pub fn affine(linear: Mat<f64>, offset: &[f64]) -> TransferResult<Self> {
        if linear.shape() != (offset.len(), 3) {
            return Err(TransferError::ShapeMismatch {
                operation: "TestFields::affine",
                expected: format!("({}, 3) linear part", offset.len()),
                found: format!("{:?}", linear.shape()),
            });
        }
        Ok(Self {
            linear,
            offset: offset.to_vec(),
        })
    }

    /// Displacement of a rigid rotation by `angle` radians about the axis
    /// through `centre` parallel to z, followed by a `translation`.
    ///
    /// <div>
    /// $$
    /// d(x) = (R - I)(x - c) + t
    /// $$
    /// </div>
    pub fn rigid_body(angle: f64, centre: &[f64; 3], translation: &[f64; 3]) -> Self {
        let (sin, cos) = angle.sin_cos();
        let r_minus_i = faer::mat![
            [cos - 1.0, -sin, 0.0],
            [sin, cos - 1.0, 0.0],
            [0.0, 0.0, 0.0],
        ];

        let offset = (0..3)
            .map(|i| {
                translation[i]
                    - (0..3)
                        .map(|j| r_minus_i[(i, j)] * centre[j])
                        .sum::<f64>()
            })
            .collect::<Vec<f64>>();

        Self {
            linear: r_minus_i,
            offset,
        }
    }

    /// Number of field components.
    pub fn components(&self) -> usize {
        self.offset.len()
    }

    /// Evaluates the field at every row of `points`.
    ///
    /// # Errors
    /// [`TransferError::DimensionMismatch`] if `points` does not have 3 columns.
    pub fn evaluate(&self, points: MatRef<'_, f64>) -> TransferResult<Mat<f64>> {
        if points.ncols() != 3 {
            return Err(TransferError::DimensionMismatch {
                what: "field point",
                expected: 3,
                found: points.ncols(),
            });
        }

        Ok(Mat::from_fn(points.nrows(), self.components(), |i, k| {
            self.offset[k]
                + (0..3)
                    .map(|j| self.linear[(k, j)] * points[(i, j)])
                    .sum::<f64>()
        }))
    }
}
