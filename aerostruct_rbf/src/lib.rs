/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for RBF mesh-to-mesh transfer.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Radial Basis Function (RBF) mesh-to-mesh transfer for aero-structural coupling.
//!
//! An aerodynamic surface mesh and a structural mesh rarely share nodes. This
//! crate builds a single dense interpolation operator `H` between the two
//! point clouds, following `1`, and uses it in both directions:
//!
//! - **Displacements** move from the structure to the aerodynamic surface with `H`.
//! - **Loads** move from the aerodynamic surface back to the structure with `Hᵗ`,
//!   which conserves virtual work exactly.
//! - **Mode shapes** are transferred with `H` and then zeroed at constrained
//!   degrees of freedom through a [`BoundaryConditionMask`].
//!
//! The operator is augmented with a linear polynomial, so constant fields,
//! affine fields and rigid body motions are reproduced exactly. Distances use
//! a biased Euclidean norm, letting one axis be stretched or ignored (for
//! example a thin wing box whose through-thickness direction should not
//! influence the transfer).
//!
//! Building `H` costs `O(Ns³)` for `Ns` source points. An [`OperatorCache`]
//! reuses operators across coupling iterations while the geometry is unchanged.
//!
//! # Examples
//!
//! ```
//! use aerostruct_rbf::{
//!     build_interpolation, transfer_displacement, transfer_load, virtual_work,
//!     InterpolationSettings, KernelType,
//! };
//! use faer::{mat, Mat};
//!
//! // Four corners of the unit square and its centre.
//! let source = mat![
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//!     [1.0, 1.0, 0.0f64],
//! ];
//! let target = mat![[0.5, 0.5, 0.0f64]];
//!
//! let settings = InterpolationSettings::builder(KernelType::ThinPlate).build();
//! let operator = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();
//!
//! // The plane z = x + y is reproduced at the centre.
//! let field = Mat::from_fn(4, 1, |i, _| source[(i, 0)] + source[(i, 1)]);
//! let moved = transfer_displacement(&operator, field.as_ref()).unwrap();
//! assert!((moved[(0, 0)] - 1.0).abs() < 1e-8);
//!
//! // A unit load at the centre is shared out without changing the work done.
//! let force = mat![[1.0f64]];
//! let loads = transfer_load(&operator, force.as_ref()).unwrap();
//! let aero_work = virtual_work(moved.as_ref(), force.as_ref()).unwrap();
//! let struct_work = virtual_work(field.as_ref(), loads.as_ref()).unwrap();
//! assert!((aero_work - struct_work).abs() < 1e-12);
//! ```
//!
//! # References
//! 1.  T. C. S. Rendall and C. B. Allen. Unified fluid-structure interpolation and
//!     mesh motion using radial basis functions. Int. J. Numer. Meth. Engng.,
//!     74(10):1519–1559, 2008.
//! 2.  Fasshauer, G., 2007. Meshfree Approximation Methods with Matlab. World Scientific Publishing Co.
pub mod interpolation_settings;

pub mod progress;

mod error;

mod common;

mod polynomials;

mod linalg;

mod operator;

mod transfer;

mod modes;

mod cache;

mod test_fields;

pub use {
    cache::{OperatorCache, OperatorKey, DEFAULT_CACHE_CAPACITY},
    common::{csv_to_point_cloud, generate_random_points, point_cloud_to_csv},
    error::{DataIOError, DataIOResult, TransferError, TransferResult},
    interpolation_settings::{InterpolationSettings, InterpolationSettingsBuilder},
    modes::{
        modal_assurance_criterion, track_modes, transfer_modes, BoundaryConditionMask,
        TrackedModes,
    },
    operator::{
        build_interpolation, BuildSummary, InterpolationOperator, InterpolationOperatorBuilder,
    },
    polynomials::PolynomialBasis,
    test_fields::TestFields,
    transfer::{expand_to_raw, transfer_displacement, transfer_load, virtual_work},
};

pub use aerostruct_rbf_utils::{
    biased_distance, biased_distance_matrix, kernel_phi, CustomKernel, KernelError, KernelParams,
    KernelType, RbfKernel, ScalarKernel,
};
