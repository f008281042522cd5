/////////////////////////////////////////////////////////////////////////////////////////////
//
// Re-exports kernel utilities, biased distances, and matrix helpers used by aerostruct_rbf.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities for the [`aerostruct_rbf`] crate
//!
//! Holds the kernel library (the seven named radial basis functions plus a
//! slot for user supplied kernels), the biased Euclidean norm, and the dense
//! distance/kernel matrix assembly used by the interpolation operator builder.
//!
//! # Examples
//!
//! ```
//! use aerostruct_rbf_utils::{biased_distance, KernelType, RbfKernel};
//! use faer::mat;
//!
//! let points = mat![
//!     [0.0, 0.0, 0.0],
//!     [3.0, 4.0, 12.0f64],
//! ];
//!
//! // De-emphasise the third axis entirely.
//! let r = biased_distance(points.row(0), points.row(1), &[1.0, 1.0, 0.0]).unwrap();
//! assert_eq!(r, 5.0);
//!
//! let kernel: RbfKernel = "thin-plate".parse().unwrap();
//! assert_eq!(kernel, RbfKernel::Named(KernelType::ThinPlate));
//! ```
mod error;
mod kernel_helpers;
mod rbf_kernels;
mod traits;
mod utils;

/// Implemented kernels for use in the [`aerostruct_rbf`] crate.
pub mod kernels {
    pub use super::rbf_kernels::*;
}

pub use {
    error::KernelError,
    kernel_helpers::{CustomKernel, KernelParams, RbfKernel, ScalarKernel},
    traits::{KernelFromParams, RadialKernel},
    utils::{
        KernelType, argmax, biased_distance, biased_distance_matrix, get_biased_distance,
        get_distance_matrix, get_kernel_matrix_named, get_pointarray_extents, kernel_phi, mean,
        select_mat_rows, unique_row_indices, UniqueRows,
    },
};
