/////////////////////////////////////////////////////////////////////////////////////////////
//
// Adds the checked dense inverse used by the interpolation operator builder.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # linalg
//!
//! Helper linear algebra functionality.

use crate::error::{TransferError, TransferResult};
use faer::{linalg::solvers::DenseSolveCore, Mat, MatRef};

/// Smallest over largest `|U_ii|` of a fully pivoted LU factorisation.
pub(crate) fn pivot_ratio(u: MatRef<'_, f64>) -> f64 {
    let (min, max) = u
        .diagonal()
        .column_vector()
        .iter()
        .fold((f64::INFINITY, 0.0f64), |(min, max), pivot| {
            (min.min(pivot.abs()), max.max(pivot.abs()))
        });
    if max == 0.0 {
        0.0
    } else {
        min / max
    }
}

/// Inverts a square matrix with a fully pivoted LU factorisation.
///
/// The matrix is numerically singular when its pivot ratio is at most
/// `n * tolerance`, the usual numerical rank test, or when the inverse has
/// non-finite entries. A `tolerance` of zero leaves only exactly singular
/// matrices rejected. `what` names the matrix in the error.
pub(crate) fn checked_inverse(
    a: MatRef<'_, f64>,
    tolerance: f64,
    what: &str,
) -> TransferResult<Mat<f64>> {
    let lu = a.full_piv_lu();

    let ratio = pivot_ratio(lu.U());
    let threshold = tolerance * a.nrows() as f64;
    // NaN pivots fail too.
    if !(ratio > threshold) {
        return Err(TransferError::SingularInterpolationSystem {
            reason: format!(
                "{what} is numerically singular: LU pivot ratio {ratio:.3e} is below {threshold:.3e}"
            ),
        });
    }

    let inverse = lu.inverse();
    let all_finite = inverse
        .col_iter()
        .all(|col| col.iter().all(|value| value.is_finite()));
    if !all_finite {
        return Err(TransferError::SingularInterpolationSystem {
            reason: format!("{what} has no finite inverse"),
        });
    }

    Ok(inverse)
}
