/////////////////////////////////////////////////////////////////////////////////////////////
//
// Selects and evaluates the affine polynomial block that augments the RBF system.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # polynomials
//!
//! The interpolation system is augmented with the affine monomials
//! `[1, x, y, z]` so that constant and linear fields (rigid body motion) are
//! reproduced exactly. Monomials are evaluated on coordinates centred on the
//! source bounding box and divided by its largest half extent, which leaves
//! their span unchanged but keeps the Schur complement well scaled.
//!
//! When the source cloud is planar or collinear some coordinate monomials are
//! linearly dependent on the others. Only an independent subset is kept, found
//! with a column pivoted QR. The scale is the same on every axis, so rounding
//! noise across a plane stays small enough to be treated as dependent.

use crate::common;
use faer::{Mat, MatRef};
use serde::{Deserialize, Serialize};

/// Relative threshold on the diagonal of `R` below which a monomial is
/// treated as dependent.
const RANK_TOLERANCE: f64 = 1e-10;

/// Affine polynomial basis fitted to a source point cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialBasis {
    translation_factor: Vec<f64>,
    scale_factor: Vec<f64>,

    /// Coordinate axes whose linear monomial is retained, in ascending order.
    axes: Vec<usize>,
}

impl PolynomialBasis {
    /// Fits the basis to `source_points`.
    pub fn from_source(source_points: MatRef<'_, f64>) -> Self {
        let (n, d) = source_points.shape();
        let (translation_factor, scale_factor) =
            common::get_isotropic_scaling_factors(source_points);

        let mut scaled_points = source_points.to_owned();
        common::scale_points(&mut scaled_points, &translation_factor, &scale_factor);

        // Remove the component along the constant monomial, which is always kept.
        let means: Vec<f64> = scaled_points
            .col_iter()
            .map(|col| col.sum() / n as f64)
            .collect();
        let centred = Mat::from_fn(n, d, |i, j| scaled_points[(i, j)] - means[j]);

        // QR with column pivoting to identify linearly independent monomials.
        let qrc = centred.col_piv_qr();
        let rc = qrc.thin_R();
        let (piv_fwd, _) = qrc.P().arrays();

        let thresh = RANK_TOLERANCE * rc.get(0, 0).abs().max(1.0);

        let rank = rc
            .diagonal()
            .column_vector()
            .iter()
            .filter(|val| val.abs() > thresh)
            .count();

        let mut axes: Vec<usize> = piv_fwd[..rank].to_vec();
        axes.sort();

        Self {
            translation_factor,
            scale_factor,
            axes,
        }
    }

    /// Number of retained monomials, including the constant.
    pub fn rank(&self) -> usize {
        1 + self.axes.len()
    }

    /// Number of monomials of the full affine basis.
    pub fn full_rank(&self) -> usize {
        1 + self.translation_factor.len()
    }

    /// Coordinate axes whose linear monomial is retained.
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    /// Evaluates the retained monomials at `points`, one row per point:
    /// a column of ones followed by the retained scaled coordinates.
    pub fn evaluate(&self, points: MatRef<'_, f64>) -> Mat<f64> {
        let mut scaled_points = points.to_owned();
        common::scale_points(&mut scaled_points, &self.translation_factor, &self.scale_factor);

        let mut monomials = Mat::<f64>::zeros(points.nrows(), self.rank());

        // constant column
        monomials.col_mut(0).fill(1.0);

        // linear columns
        for (k, &axis) in self.axes.iter().enumerate() {
            monomials.col_mut(1 + k).copy_from(scaled_points.col(axis));
        }

        monomials
    }
}
