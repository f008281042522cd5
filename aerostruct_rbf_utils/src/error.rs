/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the error type raised by kernel evaluation and biased distance helpers.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use thiserror::Error;

/// Errors raised while resolving a kernel or evaluating distances.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// The requested kernel name is not part of the kernel library.
    #[error("unknown kernel {name:?}, expected one of: {allowed}")]
    UnknownKernel { name: String, allowed: String },

    /// Point or bias dimensionality disagrees.
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A custom kernel returned a matrix with a different shape to its input.
    #[error(
        "custom kernel {name:?} returned a {}x{} matrix for a {}x{} distance matrix",
        .found.0, .found.1, .expected.0, .expected.1
    )]
    InvalidKernelShape {
        name: String,
        expected: (usize, usize),
        found: (usize, usize),
    },
}
