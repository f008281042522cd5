/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides the kernel selector, kernel parameters, and the custom kernel slot.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{error::KernelError, utils::KernelType};
use faer::{Mat, MatRef};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

/// Parameters needed to instantiate one of the named kernels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KernelParams {
    /// KernelType enum variant to use.
    pub kernel_type: KernelType,

    /// Shape parameter. Only read by the multiquadric, inverse multiquadric
    /// and gaussian kernels.
    pub epsilon: f64,
}

impl KernelParams {
    pub fn new(kernel_type: KernelType, epsilon: f64) -> Self {
        Self {
            kernel_type,
            epsilon,
        }
    }
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Multiquadric
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelType {
    type Err = KernelError;

    /// Parses a kernel name, case-insensitively. `inverse` and
    /// `inverse multiquadric` resolve to `inverse_multiquadric`, and
    /// `thin-plate` to `thin_plate`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let canonical = match lowered.as_str() {
            "inverse" | "inverse multiquadric" => "inverse_multiquadric",
            "thin-plate" => "thin_plate",
            other => other,
        };

        KernelType::ALL
            .iter()
            .find(|k| k.name() == canonical)
            .copied()
            .ok_or_else(|| KernelError::UnknownKernel {
                name: s.to_string(),
                allowed: KernelType::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// A user supplied kernel with a fixed signature.
///
/// The kernel receives the whole matrix of biased distances together with the
/// shape parameter in use, and must return a matrix of the same shape.
pub trait CustomKernel: Send + Sync + fmt::Debug {
    /// Name reported in errors and progress messages.
    fn name(&self) -> &str;

    /// Evaluates the kernel elementwise on `distances`.
    fn evaluate(&self, distances: MatRef<'_, f64>, epsilon: f64) -> Mat<f64>;
}

/// Adapts a scalar function `h(r, epsilon)` into a [`CustomKernel`].
///
/// # Examples
///
/// ```
/// use aerostruct_rbf_utils::{RbfKernel, ScalarKernel};
///
/// fn wendland_c0(r: f64, epsilon: f64) -> f64 {
///     (1.0 - r / epsilon).max(0.0).powi(2)
/// }
///
/// let kernel = RbfKernel::custom(ScalarKernel::new("wendland_c0", wendland_c0));
/// assert_eq!(kernel.to_string(), "wendland_c0");
/// ```
#[derive(Debug, Clone)]
pub struct ScalarKernel {
    name: String,
    function: fn(f64, f64) -> f64,
}

impl ScalarKernel {
    pub fn new(name: impl Into<String>, function: fn(f64, f64) -> f64) -> Self {
        Self {
            name: name.into(),
            function,
        }
    }
}

impl CustomKernel for ScalarKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, distances: MatRef<'_, f64>, epsilon: f64) -> Mat<f64> {
        Mat::from_fn(distances.nrows(), distances.ncols(), |i, j| {
            (self.function)(*distances.get(i, j), epsilon)
        })
    }
}

/// The radial basis function used to build an interpolation operator.
///
/// Either one of the named kernels, or a single custom kernel slot. Custom
/// kernels are skipped during serialization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RbfKernel {
    Named(KernelType),
    #[serde(skip)]
    Custom(Arc<dyn CustomKernel>),
}

impl RbfKernel {
    /// Wraps a custom kernel implementation.
    pub fn custom<K: CustomKernel + 'static>(kernel: K) -> Self {
        RbfKernel::Custom(Arc::new(kernel))
    }

    /// Name of the kernel.
    pub fn name(&self) -> &str {
        match self {
            RbfKernel::Named(k) => k.name(),
            RbfKernel::Custom(k) => k.name(),
        }
    }

    /// Applies the kernel elementwise to a matrix of distances.
    ///
    /// Fails with [`KernelError::InvalidKernelShape`] if a custom kernel does
    /// not preserve the shape of its input.
    pub fn evaluate(
        &self,
        distances: MatRef<'_, f64>,
        epsilon: f64,
    ) -> Result<Mat<f64>, KernelError> {
        match self {
            RbfKernel::Named(kernel_type) => Ok(crate::get_kernel_matrix_named(
                distances,
                &KernelParams::new(*kernel_type, epsilon),
            )),
            RbfKernel::Custom(kernel) => {
                let values = kernel.evaluate(distances, epsilon);
                if values.shape() != distances.shape() {
                    return Err(KernelError::InvalidKernelShape {
                        name: kernel.name().to_string(),
                        expected: distances.shape(),
                        found: values.shape(),
                    });
                }
                Ok(values)
            }
        }
    }
}

impl Default for RbfKernel {
    fn default() -> Self {
        RbfKernel::Named(KernelType::default())
    }
}

impl PartialEq for RbfKernel {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RbfKernel::Named(a), RbfKernel::Named(b)) => a == b,
            (RbfKernel::Custom(a), RbfKernel::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<KernelType> for RbfKernel {
    fn from(kernel_type: KernelType) -> Self {
        RbfKernel::Named(kernel_type)
    }
}

impl FromStr for RbfKernel {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<KernelType>().map(RbfKernel::Named)
    }
}

impl fmt::Display for RbfKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
