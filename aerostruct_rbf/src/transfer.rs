/////////////////////////////////////////////////////////////////////////////////////////////
//
// Applies an interpolation operator to displacement fields and its transpose to loads.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Displacement and load transfer.
//!
//! Displacements move forwards with `H`, loads move backwards with `Hᵗ`. For
//! any displacement `d` at the source and force `f` at the target,
//! `(H d) · f == d · (Hᵗ f)`, so virtual work is the same on both meshes.

use faer::{Mat, MatRef};

use crate::{
    error::{TransferError, TransferResult},
    operator::InterpolationOperator,
};

/// Transfers a source displacement field onto the target points,
/// `delta_target = H · delta_source`.
///
/// `field` has one row per source point and any number of components. When
/// the operator was built with duplicate removal, a field sized to the raw
/// source cloud is accepted too; only the first occurrence of every repeated
/// point is used.
///
/// # Errors
/// [`TransferError::ShapeMismatch`] if `field` has neither the unique nor the
/// raw number of source rows.
pub fn transfer_displacement(
    operator: &InterpolationOperator,
    field: MatRef<'_, f64>,
) -> TransferResult<Mat<f64>> {
    let h = operator.matrix();

    if field.nrows() == h.ncols() {
        return Ok(h * field);
    }

    match operator.source_rows() {
        Some(rows) if field.nrows() == rows.raw_to_unique.len() => {
            let unique_field = aerostruct_rbf_utils::select_mat_rows(field, &rows.unique);
            Ok(h * &unique_field)
        }
        _ => Err(TransferError::ShapeMismatch {
            operation: "transfer_displacement",
            expected: expected_source_rows(operator),
            found: format!("{} rows", field.nrows()),
        }),
    }
}

/// Transfers a force field at the target points back onto the (unique)
/// source points, `f_source = Hᵗ · f_target`.
///
/// # Errors
/// [`TransferError::ShapeMismatch`] if `force` does not have one row per
/// target point.
pub fn transfer_load(
    operator: &InterpolationOperator,
    force: MatRef<'_, f64>,
) -> TransferResult<Mat<f64>> {
    let h = operator.matrix();

    if force.nrows() != h.nrows() {
        return Err(TransferError::ShapeMismatch {
            operation: "transfer_load",
            expected: format!("{} rows", h.nrows()),
            found: format!("{} rows", force.nrows()),
        });
    }

    Ok(h.transpose() * force)
}

/// Scatters loads on the unique source points back onto the raw source cloud.
///
/// The first occurrence of every repeated point carries the load and its
/// repeats receive zero, so the total force and the virtual work against any
/// raw displacement field with equal values at repeated points are unchanged.
/// Operators built without duplicates return a copy of `loads`.
///
/// # Errors
/// [`TransferError::ShapeMismatch`] if `loads` does not have one row per
/// unique source point.
pub fn expand_to_raw(
    operator: &InterpolationOperator,
    loads: MatRef<'_, f64>,
) -> TransferResult<Mat<f64>> {
    if loads.nrows() != operator.num_source() {
        return Err(TransferError::ShapeMismatch {
            operation: "expand_to_raw",
            expected: format!("{} rows", operator.num_source()),
            found: format!("{} rows", loads.nrows()),
        });
    }

    let Some(rows) = operator.source_rows() else {
        return Ok(loads.to_owned());
    };

    let mut raw = Mat::<f64>::zeros(rows.raw_to_unique.len(), loads.ncols());
    for (unique_row, &raw_row) in rows.unique.iter().enumerate() {
        raw.row_mut(raw_row).copy_from(loads.row(unique_row));
    }
    Ok(raw)
}

/// Virtual work `Σ d_ij f_ij` of a displacement field against a force field.
///
/// # Errors
/// [`TransferError::ShapeMismatch`] if the two fields differ in shape.
pub fn virtual_work(displacement: MatRef<'_, f64>, force: MatRef<'_, f64>) -> TransferResult<f64> {
    if displacement.shape() != force.shape() {
        return Err(TransferError::ShapeMismatch {
            operation: "virtual_work",
            expected: format!("{:?}", displacement.shape()),
            found: format!("{:?}", force.shape()),
        });
    }

    Ok(displacement
        .col_iter()
        .zip(force.col_iter())
        .map(|(d, f)| d.iter().zip(f.iter()).map(|(d, f)| d * f).sum::<f64>())
        .sum())
}

fn expected_source_rows(operator: &InterpolationOperator) -> String {
    match operator.source_rows() {
        Some(rows) => format!(
            "{} (unique) or {} (raw) rows",
            operator.num_source(),
            rows.raw_to_unique.len()
        ),
        None => format!("{} rows", operator.num_source()),
    }
}
