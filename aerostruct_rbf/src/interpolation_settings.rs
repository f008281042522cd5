/////////////////////////////////////////////////////////////////////////////////////////////
//
// Specifies kernel, shape parameter, norm bias, and deduplication options for operators.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Specifies kernel, shape parameter, norm bias, and deduplication options for
//! configuring interpolation operators.
use crate::error::{TransferError, TransferResult};
use aerostruct_rbf_utils::RbfKernel;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Spatial dimension of every point cloud handled by the operator builder.
pub const SPATIAL_DIMENSIONS: usize = 3;

/// Default relative pivot threshold per matrix row for the dense inverses.
pub const DEFAULT_SINGULARITY_TOLERANCE: f64 = f64::EPSILON;

/// A convenience builder for constructing an [`InterpolationSettings`] instance.
///
/// The builder should be called via the [`InterpolationSettings::builder`] method.
///
/// See [`InterpolationSettings`] for details on each field.
#[derive(Debug, Clone)]
pub struct InterpolationSettingsBuilder {
    kernel: RbfKernel,
    epsilon: Option<f64>,
    bias: Vec<f64>,
    deduplicate_source: bool,
    singularity_tolerance: f64,
}

impl InterpolationSettingsBuilder {
    /// Creates a new instance of the [`InterpolationSettingsBuilder`].
    fn new(kernel: RbfKernel) -> Self {
        Self {
            kernel,
            epsilon: None,
            bias: vec![1.0; SPATIAL_DIMENSIONS],
            deduplicate_source: false,
            singularity_tolerance: DEFAULT_SINGULARITY_TOLERANCE,
        }
    }

    /// Sets a fixed shape parameter instead of the mean source distance.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Sets the per-axis weights of the biased norm.
    pub fn bias(mut self, bias: impl Into<Vec<f64>>) -> Self {
        self.bias = bias.into();
        self
    }

    /// Removes repeated source points before building the operator.
    pub fn deduplicate_source(mut self, deduplicate_source: bool) -> Self {
        self.deduplicate_source = deduplicate_source;
        self
    }

    /// Sets the relative pivot threshold used to detect singular systems.
    /// Zero rejects only exactly singular systems.
    pub fn singularity_tolerance(mut self, singularity_tolerance: f64) -> Self {
        self.singularity_tolerance = singularity_tolerance;
        self
    }

    /// Builds and returns an instance of [`InterpolationSettings`].
    pub fn build(self) -> InterpolationSettings {
        InterpolationSettings {
            kernel: self.kernel,
            epsilon: self.epsilon,
            bias: self.bias,
            deduplicate_source: self.deduplicate_source,
            singularity_tolerance: self.singularity_tolerance,
        }
    }
}

/// Settings that, together with the two point clouds, fully determine an
/// interpolation operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationSettings {
    /// The radial basis function. Defaults to multiquadric.
    pub kernel: RbfKernel,

    /// Shape parameter. `None` uses the mean biased distance between source points.
    pub epsilon: Option<f64>,

    /// Per-axis weights of the biased norm. `[1, 1, 1]` is the Euclidean norm.
    pub bias: Vec<f64>,

    /// Whether repeated source points are removed before the build. When
    /// `false`, coincident source points make the system singular.
    pub deduplicate_source: bool,

    /// A dense inverse fails when the ratio of its smallest to largest LU
    /// pivot is at most `n * singularity_tolerance` for an `n x n` matrix.
    pub singularity_tolerance: f64,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        InterpolationSettingsBuilder::new(RbfKernel::default()).build()
    }
}

impl InterpolationSettings {
    /// Returns a new [`InterpolationSettingsBuilder`] for the given kernel.
    ///
    /// Accepts anything convertible into an [`RbfKernel`], e.g. a
    /// [`KernelType`](aerostruct_rbf_utils::KernelType).
    pub fn builder(kernel: impl Into<RbfKernel>) -> InterpolationSettingsBuilder {
        InterpolationSettingsBuilder::new(kernel.into())
    }

    /// Checks the values that do not depend on the point clouds.
    pub(crate) fn validate(&self) -> TransferResult<()> {
        if self.bias.len() != SPATIAL_DIMENSIONS {
            return Err(TransferError::DimensionMismatch {
                what: "bias vector",
                expected: SPATIAL_DIMENSIONS,
                found: self.bias.len(),
            });
        }

        if let Some(k) = self.bias.iter().find(|k| !k.is_finite() || **k < 0.0) {
            return Err(TransferError::InvalidParameter {
                name: "bias",
                reason: format!("weights must be finite and non-negative, found {k}"),
            });
        }

        if let Some(epsilon) = self.epsilon {
            if !epsilon.is_finite() || epsilon <= 0.0 {
                return Err(TransferError::InvalidParameter {
                    name: "epsilon",
                    reason: format!("must be finite and positive, found {epsilon}"),
                });
            }
        }

        if !self.singularity_tolerance.is_finite() || self.singularity_tolerance < 0.0 {
            return Err(TransferError::InvalidParameter {
                name: "singularity_tolerance",
                reason: format!(
                    "must be finite and non-negative, found {}",
                    self.singularity_tolerance
                ),
            });
        }

        Ok(())
    }

    /// Feeds every field into `state`. Floats are hashed by bit pattern and
    /// custom kernels by name and allocation.
    pub(crate) fn fingerprint<H: Hasher>(&self, state: &mut H) {
        match &self.kernel {
            RbfKernel::Named(kernel_type) => {
                0u8.hash(state);
                kernel_type.hash(state);
            }
            RbfKernel::Custom(kernel) => {
                1u8.hash(state);
                kernel.name().hash(state);
                (Arc::as_ptr(kernel) as *const () as usize).hash(state);
            }
        }
        self.epsilon.map(f64::to_bits).hash(state);
        for k in &self.bias {
            k.to_bits().hash(state);
        }
        self.deduplicate_source.hash(state);
        self.singularity_tolerance.to_bits().hash(state);
    }
}
