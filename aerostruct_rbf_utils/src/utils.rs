/////////////////////////////////////////////////////////////////////////////////////////////
//
// Supplies biased distances, dense distance/kernel matrices, and point array helpers.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{KernelError, KernelFromParams, KernelParams, RadialKernel};
use faer::{Mat, MatRef, RowRef};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Returns an owned `Mat<f64>` from a subset of row indices.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use aerostruct_rbf_utils::select_mat_rows;
///
/// let matrix = mat![
///     [0.0, 1.0],
///     [1.0, 1.0],
///     [2.0, 2.0],
///     [3.0, 3.0f64],
/// ];
///
/// let sub_matrix = select_mat_rows(matrix.as_ref(), &[0, 2]);
///
/// assert_eq!(sub_matrix, mat![[0.0, 1.0], [2.0, 2.0f64]]);
/// ```
#[inline(always)]
pub fn select_mat_rows(existing_mat: MatRef<'_, f64>, row_indices: &[usize]) -> Mat<f64> {
    Mat::from_fn(row_indices.len(), existing_mat.ncols(), |i, j| {
        *existing_mat.get(row_indices[i], j)
    })
}

/// Result of collapsing repeated rows of a point array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueRows {
    /// Index of the first occurrence of every distinct row, in order of appearance.
    pub unique: Vec<usize>,

    /// For every input row, the position of its distinct row within `unique`.
    pub raw_to_unique: Vec<usize>,
}

impl UniqueRows {
    /// Number of rows that were dropped as repeats.
    pub fn num_duplicates(&self) -> usize {
        self.raw_to_unique.len() - self.unique.len()
    }
}

/// Finds the distinct rows of `points` by exact coordinate equality,
/// keeping first-occurrence order. `-0.0` and `0.0` compare equal.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use aerostruct_rbf_utils::unique_row_indices;
///
/// let points = mat![
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0],
///     [0.0, 0.0, 0.0],
///     [2.0, 0.0, 0.0f64],
/// ];
///
/// let rows = unique_row_indices(points.as_ref());
/// assert_eq!(rows.unique, vec![0, 1, 3]);
/// assert_eq!(rows.raw_to_unique, vec![0, 1, 0, 2]);
/// ```
pub fn unique_row_indices(points: MatRef<'_, f64>) -> UniqueRows {
    let mut seen: HashMap<Vec<u64>, usize> = HashMap::with_capacity(points.nrows());
    let mut unique = Vec::with_capacity(points.nrows());
    let mut raw_to_unique = Vec::with_capacity(points.nrows());

    for (i, row) in points.row_iter().enumerate() {
        let key: Vec<u64> = row
            .iter()
            .map(|&x| {
                let x = if x == 0.0 { 0.0f64 } else { x };
                x.to_bits()
            })
            .collect();

        let next = unique.len();
        let position = *seen.entry(key).or_insert(next);
        if position == next {
            unique.push(i);
        }
        raw_to_unique.push(position);
    }

    UniqueRows {
        unique,
        raw_to_unique,
    }
}

/// Returns the index of the maximum value, or `0` for an empty slice.
/// Ties resolve to the first occurrence.
#[inline(always)]
pub fn argmax(data: &[f64]) -> usize {
    let mut max_index = 0;
    let mut max_value = f64::NEG_INFINITY;

    for (idx, &value) in data.iter().enumerate() {
        if value > max_value {
            max_value = value;
            max_index = idx;
        }
    }

    max_index
}

/// Mean of all entries of a matrix, `0.0` when it is empty.
#[inline]
pub fn mean(values: MatRef<'_, f64>) -> f64 {
    let count = values.nrows() * values.ncols();
    if count == 0 {
        return 0.0;
    }
    let total: f64 = values.col_iter().map(|col| col.sum()).sum();
    total / count as f64
}

/// Computes the axis aligned bounding box (AABB) extents of a matrix of points.
///
/// The result is arranged as `[min_0, min_1, ..., min_n, max_0, max_1, ..., max_n]`.
///
/// # Examples
///
/// ```
/// use faer::mat;
/// use aerostruct_rbf_utils::get_pointarray_extents;
///
/// let points = mat![
///     [1.0, 2.0],
///     [3.0, -1.0],
///     [0.5, 4.0f64]
/// ];
/// let extents = get_pointarray_extents(points.as_ref());
/// assert_eq!(extents, vec![0.5, -1.0, 3.0, 4.0]);
/// ```
pub fn get_pointarray_extents(points: MatRef<'_, f64>) -> Vec<f64> {
    let ncols = points.ncols();
    let mut extents = vec![0.0; 2 * ncols];

    if points.nrows() == 0 {
        return extents;
    }

    for col in 0..ncols {
        extents[col] = *points.get(0, col);
        extents[col + ncols] = *points.get(0, col);
    }

    for row in points.row_iter() {
        for (col, &item) in row.iter().enumerate() {
            if item < extents[col] {
                extents[col] = item;
            }
            if item > extents[col + ncols] {
                extents[col + ncols] = item;
            }
        }
    }

    extents
}

/// Biased Euclidean distance `sqrt(sum_i k_i (t_i - s_i)^2)`.
///
/// Unchecked: the bias is assumed to have one weight per coordinate.
#[inline(always)]
pub fn get_biased_distance(target: RowRef<'_, f64>, source: RowRef<'_, f64>, bias: &[f64]) -> f64 {
    let mut dist = 0.0;
    for ((t, s), k) in target.iter().zip(source.iter()).zip(bias.iter()) {
        let diff = t - s;
        dist += k * diff * diff;
    }
    dist.sqrt()
}

/// Checked biased Euclidean distance between two points.
///
/// Fails with [`KernelError::DimensionMismatch`] when the points have
/// different dimensions or the bias does not have one weight per coordinate.
pub fn biased_distance(
    target: RowRef<'_, f64>,
    source: RowRef<'_, f64>,
    bias: &[f64],
) -> Result<f64, KernelError> {
    check_dimensions(target.ncols(), source.ncols(), bias.len())?;
    Ok(get_biased_distance(target, source, bias))
}

/// Dense `(targets, sources)` matrix of biased distances.
///
/// Columns are assembled in parallel.
pub fn get_distance_matrix(
    target_points: MatRef<'_, f64>,
    source_points: MatRef<'_, f64>,
    bias: &[f64],
) -> Mat<f64> {
    let m = target_points.nrows();
    let n = source_points.nrows();

    let columns: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|j| {
            let source = source_points.row(j);
            (0..m)
                .map(|i| get_biased_distance(target_points.row(i), source, bias))
                .collect()
        })
        .collect();

    Mat::from_fn(m, n, |i, j| columns[j][i])
}

/// Checked version of [`get_distance_matrix`].
pub fn biased_distance_matrix(
    target_points: MatRef<'_, f64>,
    source_points: MatRef<'_, f64>,
    bias: &[f64],
) -> Result<Mat<f64>, KernelError> {
    check_dimensions(target_points.ncols(), source_points.ncols(), bias.len())?;
    Ok(get_distance_matrix(target_points, source_points, bias))
}

fn check_dimensions(target: usize, source: usize, bias: usize) -> Result<(), KernelError> {
    if source != target {
        return Err(KernelError::DimensionMismatch {
            what: "source point",
            expected: target,
            found: source,
        });
    }
    if bias != target {
        return Err(KernelError::DimensionMismatch {
            what: "bias vector",
            expected: target,
            found: bias,
        });
    }
    Ok(())
}

/// Applies a typed kernel elementwise to a distance matrix.
#[inline(always)]
pub fn get_kernel_matrix_typed<K>(distances: MatRef<'_, f64>, kernel_function: &K) -> Mat<f64>
where
    K: RadialKernel,
{
    Mat::from_fn(distances.nrows(), distances.ncols(), |i, j| {
        kernel_function.phi(*distances.get(i, j))
    })
}

// Dispatcher generated from the kernel registry below.
// Assumes each kernel type implements `KernelFromParams::from_params(&KernelParams) -> K`.
macro_rules! for_each_kernel {
    ( registry = [ $( ($V:ident, $name:literal, $Kty:path) ),* $(,)? ] ) => {

        /// Runtime kernel selector built from the kernel registry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum KernelType {
            $( $V, )*
        }

        impl KernelType {
            /// Every named kernel, in registry order.
            pub const ALL: &'static [KernelType] = &[ $( KernelType::$V, )* ];

            /// Canonical lowercase name of the kernel.
            pub fn name(&self) -> &'static str {
                match self {
                    $( KernelType::$V => $name, )*
                }
            }
        }

        /// Builds a dense kernel matrix from distances for the selected [`KernelType`].
        #[inline(always)]
        pub fn get_kernel_matrix_named(
            distances: MatRef<'_, f64>,
            params: &KernelParams,
        ) -> Mat<f64> {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        get_kernel_matrix_typed(distances, &k)
                    }
                ),*
            }
        }

        /// Evaluates the selected kernel function at distance `r`.
        #[inline(always)]
        pub fn kernel_phi(r: f64, params: &KernelParams) -> f64 {
            match params.kernel_type {
                $(
                    KernelType::$V => {
                        let k = <$Kty as KernelFromParams>::from_params(params);
                        k.phi(r)
                    }
                ),*
            }
        }
    };
}

for_each_kernel! {
    registry = [
        (Multiquadric,        "multiquadric",         crate::kernels::MultiquadricKernel),
        (InverseMultiquadric, "inverse_multiquadric", crate::kernels::InverseMultiquadricKernel),
        (Gaussian,            "gaussian",             crate::kernels::GaussianKernel),
        (Linear,              "linear",               crate::kernels::LinearKernel),
        (Cubic,               "cubic",                crate::kernels::CubicKernel),
        (Quintic,             "quintic",              crate::kernels::QuinticKernel),
        (ThinPlate,           "thin_plate",           crate::kernels::ThinPlateKernel),
    ]
}
