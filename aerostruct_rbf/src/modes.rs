/////////////////////////////////////////////////////////////////////////////////////////////
//
// Transfers mode shapes between meshes and tracks modes with the modal assurance criterion.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Mode shape transfer and mode tracking.
//!
//! Mode matrices hold one row per node and `k` columns per mode, mode after
//! mode: columns `m*k .. (m+1)*k` are the `k` degrees of freedom of mode `m`.

use faer::{Mat, MatRef};
use rayon::prelude::*;

use crate::{
    error::{TransferError, TransferResult},
    operator::InterpolationOperator,
};

/// Free (`1`) or constrained (`0`) flag for every degree of freedom of every
/// target node.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConditionMask {
    indicator: Mat<f64>,
}

impl BoundaryConditionMask {
    /// Mask from a `(nodes, dofs)` matrix of zeros and ones.
    ///
    /// # Errors
    /// [`TransferError::InvalidParameter`] if any entry is not exactly `0` or `1`.
    pub fn from_indicator(indicator: MatRef<'_, f64>) -> TransferResult<Self> {
        for (dof, col) in indicator.col_iter().enumerate() {
            for (node, &value) in col.iter().enumerate() {
                if value != 0.0 && value != 1.0 {
                    return Err(TransferError::InvalidParameter {
                        name: "boundary condition mask",
                        reason: format!("entry ({node}, {dof}) is {value}, expected 0 or 1"),
                    });
                }
            }
        }

        Ok(Self {
            indicator: indicator.to_owned(),
        })
    }

    /// Mask with every degree of freedom of `num_nodes` nodes free.
    pub fn all_free(num_nodes: usize, dofs_per_node: usize) -> Self {
        Self {
            indicator: Mat::ones(num_nodes, dofs_per_node),
        }
    }

    /// Constrains one degree of freedom of one node.
    ///
    /// # Errors
    /// [`TransferError::InvalidParameter`] if `node` or `dof` is out of range.
    pub fn constrain(&mut self, node: usize, dof: usize) -> TransferResult<()> {
        if node >= self.num_nodes() || dof >= self.dofs_per_node() {
            return Err(TransferError::InvalidParameter {
                name: "constrained degree of freedom",
                reason: format!(
                    "({node}, {dof}) is outside a {}x{} mask",
                    self.num_nodes(),
                    self.dofs_per_node()
                ),
            });
        }
        self.indicator[(node, dof)] = 0.0;
        Ok(())
    }

    /// Whether the degree of freedom receives interpolated values.
    pub fn is_free(&self, node: usize, dof: usize) -> bool {
        self.indicator[(node, dof)] == 1.0
    }

    pub fn num_nodes(&self) -> usize {
        self.indicator.nrows()
    }

    pub fn dofs_per_node(&self) -> usize {
        self.indicator.ncols()
    }

    /// The `(nodes, dofs)` indicator matrix.
    pub fn indicator(&self) -> MatRef<'_, f64> {
        self.indicator.as_ref()
    }
}

/// Transfers `n_modes` mode shapes from the source onto the target points,
/// `Phi_target = H · Phi_source`, then zeroes every constrained degree of
/// freedom of every mode.
///
/// # Errors
/// [`TransferError::ShapeMismatch`] if the mask does not have one row per
/// target point, `modes` does not have `dofs_per_node * n_modes` columns, or
/// `modes` does not have one row per source point.
pub fn transfer_modes(
    operator: &InterpolationOperator,
    modes: MatRef<'_, f64>,
    mask: &BoundaryConditionMask,
    n_modes: usize,
) -> TransferResult<Mat<f64>> {
    let dofs = mask.dofs_per_node();

    if mask.num_nodes() != operator.num_target() {
        return Err(TransferError::ShapeMismatch {
            operation: "transfer_modes",
            expected: format!("mask with {} rows", operator.num_target()),
            found: format!("{} rows", mask.num_nodes()),
        });
    }

    if modes.ncols() != dofs * n_modes {
        return Err(TransferError::ShapeMismatch {
            operation: "transfer_modes",
            expected: format!("{} columns ({n_modes} modes x {dofs} dofs)", dofs * n_modes),
            found: format!("{} columns", modes.ncols()),
        });
    }

    let h = operator.matrix();
    let mut target_modes = if modes.nrows() == h.ncols() {
        h * modes
    } else {
        match operator.source_rows() {
            Some(rows) if modes.nrows() == rows.raw_to_unique.len() => {
                h * &aerostruct_rbf_utils::select_mat_rows(modes, &rows.unique)
            }
            _ => {
                return Err(TransferError::ShapeMismatch {
                    operation: "transfer_modes",
                    expected: format!("{} rows", operator.num_source()),
                    found: format!("{} rows", modes.nrows()),
                })
            }
        }
    };

    // Mask tiled across the modes.
    for mode in 0..n_modes {
        for dof in 0..dofs {
            let flags = mask.indicator().col(dof);
            let mut col = target_modes.col_mut(mode * dofs + dof);
            for (value, &flag) in col.iter_mut().zip(flags.iter()) {
                *value *= flag;
            }
        }
    }

    Ok(target_modes)
}

/// Modal assurance criterion between `reference` (`N` modes) and `modes`
/// (`M` modes), one mode per column:
///
/// <div>
/// $$
/// MAC_{ij} = \frac{(\phi^{ref}_i \cdot \phi_j)^2}{(\phi^{ref}_i \cdot \phi^{ref}_i)(\phi_j \cdot \phi_j)}
/// $$
/// </div>
///
/// Pairs involving a zero vector get `0`.
///
/// # Errors
/// [`TransferError::ShapeMismatch`] if the two matrices have different row counts.
pub fn modal_assurance_criterion(
    reference: MatRef<'_, f64>,
    modes: MatRef<'_, f64>,
) -> TransferResult<Mat<f64>> {
    if reference.nrows() != modes.nrows() {
        return Err(TransferError::ShapeMismatch {
            operation: "modal_assurance_criterion",
            expected: format!("{} rows", reference.nrows()),
            found: format!("{} rows", modes.nrows()),
        });
    }

    let dot = |a: faer::ColRef<'_, f64>, b: faer::ColRef<'_, f64>| -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    };

    let n = reference.ncols();
    let m = modes.ncols();
    let reference_norms: Vec<f64> = reference.col_iter().map(|c| dot(c, c)).collect();

    let columns: Vec<Vec<f64>> = (0..m)
        .into_par_iter()
        .map(|j| {
            let phi = modes.col(j);
            let norm = dot(phi, phi);
            (0..n)
                .map(|i| {
                    let denominator = reference_norms[i] * norm;
                    if denominator == 0.0 {
                        0.0
                    } else {
                        dot(reference.col(i), phi).powi(2) / denominator
                    }
                })
                .collect()
        })
        .collect();

    Ok(Mat::from_fn(n, m, |i, j| columns[j][i]))
}

/// Modes reordered to match a set of reference modes.
#[derive(Debug, Clone)]
pub struct TrackedModes {
    /// `order[i]` is the column of the input modes matched to reference mode `i`.
    pub order: Vec<usize>,

    /// Matched modes, one per reference mode.
    pub modes: Mat<f64>,

    /// Eigenvalues of the matched modes.
    pub eigenvalues: Vec<f64>,

    /// `(N, N)` MAC matrix with columns in matched order.
    pub mac: Mat<f64>,

    /// Trace of `mac`. Equals `N` for a perfect match.
    pub mac_trace: f64,
}

/// Matches every reference mode with the mode of largest MAC value.
///
/// Several reference modes may pick the same mode.
///
/// # Errors
/// [`TransferError::ShapeMismatch`] if the row counts differ, `eigenvalues`
/// does not have one entry per mode, or there are reference modes but no modes.
pub fn track_modes(
    reference: MatRef<'_, f64>,
    modes: MatRef<'_, f64>,
    eigenvalues: &[f64],
) -> TransferResult<TrackedModes> {
    if eigenvalues.len() != modes.ncols() {
        return Err(TransferError::ShapeMismatch {
            operation: "track_modes",
            expected: format!("{} eigenvalues", modes.ncols()),
            found: format!("{} eigenvalues", eigenvalues.len()),
        });
    }
    if modes.ncols() == 0 && reference.ncols() > 0 {
        return Err(TransferError::ShapeMismatch {
            operation: "track_modes",
            expected: "at least one mode".to_string(),
            found: "0 modes".to_string(),
        });
    }

    let mac = modal_assurance_criterion(reference, modes)?;
    let n = reference.ncols();

    let order: Vec<usize> = (0..n)
        .map(|i| {
            let row: Vec<f64> = mac.row(i).iter().copied().collect();
            aerostruct_rbf_utils::argmax(&row)
        })
        .collect();

    let tracked = Mat::from_fn(modes.nrows(), n, |r, i| modes[(r, order[i])]);
    let ordered_mac = Mat::from_fn(n, n, |r, i| mac[(r, order[i])]);
    let mac_trace: f64 = (0..n).map(|i| ordered_mac[(i, i)]).sum();

    Ok(TrackedModes {
        eigenvalues: order.iter().map(|&j| eigenvalues[j]).collect(),
        order,
        modes: tracked,
        mac: ordered_mac,
        mac_trace,
    })
}
