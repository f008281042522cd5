/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the errors raised by operator construction, field transfer, and persistence.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Error types for building interpolation operators and transferring fields.
use aerostruct_rbf_utils::KernelError;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors raised while building an interpolation operator or applying it.
///
/// All errors are raised at the call that detects them. No partial results
/// are returned and nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    /// Point cloud or bias vector dimensionality is inconsistent.
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// The kernel matrix or its polynomial Schur complement cannot be inverted,
    /// typically because source points coincide.
    #[error("singular interpolation system: {reason}")]
    SingularInterpolationSystem { reason: String },

    /// Unsupported kernel name.
    #[error("unknown kernel {name:?}, expected one of: {allowed}")]
    UnknownKernel { name: String, allowed: String },

    /// A custom kernel broke the shape contract.
    #[error(
        "custom kernel {name:?} returned a {}x{} matrix for a {}x{} distance matrix",
        .found.0, .found.1, .expected.0, .expected.1
    )]
    InvalidKernelShape {
        name: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A field or mask does not have the shape the operator expects.
    #[error("shape mismatch in {operation}: expected {expected}, found {found}")]
    ShapeMismatch {
        operation: &'static str,
        expected: String,
        found: String,
    },

    /// A point cloud has no points.
    #[error("{which} point cloud is empty")]
    EmptyPointCloud { which: &'static str },

    /// A setting is outside its valid range.
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl From<KernelError> for TransferError {
    fn from(value: KernelError) -> Self {
        match value {
            KernelError::UnknownKernel { name, allowed } => {
                TransferError::UnknownKernel { name, allowed }
            }
            KernelError::DimensionMismatch {
                what,
                expected,
                found,
            } => TransferError::DimensionMismatch {
                what,
                expected,
                found,
            },
            KernelError::InvalidKernelShape {
                name,
                expected,
                found,
            } => TransferError::InvalidKernelShape {
                name,
                expected,
                found,
            },
        }
    }
}

pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Errors that can occur when saving or loading operators and point clouds.
#[derive(Debug, Error)]
pub enum DataIOError {
    /// Failed to open, create, or flush a file.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error serializing or parsing JSON.
    #[error("JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Error reading or writing CSV records.
    #[error("CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A CSV cell could not be parsed as a number.
    #[error("{}: row {row}: cannot parse {value:?} as a number", .path.display())]
    Parse {
        path: PathBuf,
        row: usize,
        value: String,
    },

    /// A CSV row has a different number of columns to the first row.
    #[error("{}: row {row} has {found} columns, expected {expected}", .path.display())]
    RaggedRow {
        path: PathBuf,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The JSON `format` field does not match the expected format.
    #[error("unsupported format {found:?} (expected {expected:?}) in {}", .path.display())]
    FormatMismatch {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },

    /// The JSON `version` field does not match the supported version.
    #[error("unsupported version {found} (expected {expected}) in {}", .path.display())]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

pub type DataIOResult<T> = std::result::Result<T, DataIOError>;
