/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the concrete radial basis functions of the kernel library.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{KernelFromParams, KernelParams, RadialKernel};

/// Multiquadric kernel with `phi(r) = sqrt((r / epsilon)^2 + 1)`.
#[derive(Clone, Debug, Copy)]
pub struct MultiquadricKernel {
    inv_epsilon: f64,
}

impl MultiquadricKernel {
    pub fn new(epsilon: f64) -> Self {
        Self {
            inv_epsilon: 1.0 / epsilon,
        }
    }
}

impl RadialKernel for MultiquadricKernel {
    #[inline(always)]
    fn phi(&self, r: f64) -> f64 {
        let s = r * self.inv_epsilon;
        (s * s + 1.0).sqrt()
    }
}

impl KernelFromParams for MultiquadricKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        Self::new(p.epsilon)
    }
}

/// Inverse multiquadric kernel with `phi(r) = 1 / sqrt((r / epsilon)^2 + 1)`.
#[derive(Clone, Debug, Copy)]
pub struct InverseMultiquadricKernel {
    inv_epsilon: f64,
}

impl InverseMultiquadricKernel {
    pub fn new(epsilon: f64) -> Self {
        Self {
            inv_epsilon: 1.0 / epsilon,
        }
    }
}

impl RadialKernel for InverseMultiquadricKernel {
    #[inline(always)]
    fn phi(&self, r: f64) -> f64 {
        let s = r * self.inv_epsilon;
        1.0 / (s * s + 1.0).sqrt()
    }
}

impl KernelFromParams for InverseMultiquadricKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        Self::new(p.epsilon)
    }
}

/// Gaussian kernel with `phi(r) = exp(-(r / epsilon)^2)`.
#[derive(Clone, Debug, Copy)]
pub struct GaussianKernel {
    inv_epsilon: f64,
}

impl GaussianKernel {
    pub fn new(epsilon: f64) -> Self {
        Self {
            inv_epsilon: 1.0 / epsilon,
        }
    }
}

impl RadialKernel for GaussianKernel {
    #[inline(always)]
    fn phi(&self, r: f64) -> f64 {
        let s = r * self.inv_epsilon;
        (-(s * s)).exp()
    }
}

impl KernelFromParams for GaussianKernel {
    #[inline(always)]
    fn from_params(p: &KernelParams) -> Self {
        Self::new(p.epsilon)
    }
}

/// Linear kernel with `phi(r) = r`.
#[derive(Clone, Debug, Copy)]
pub struct LinearKernel;

impl RadialKernel for LinearKernel {
    #[inline(always)]
    fn phi(&self, r: f64) -> f64 {
        r
    }
}

impl KernelFromParams for LinearKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        LinearKernel
    }
}

/// Cubic kernel with `phi(r) = r^3`.
#[derive(Clone, Debug, Copy)]
pub struct CubicKernel;

impl RadialKernel for CubicKernel {
    #[inline(always)]
    fn phi(&self, r: f64) -> f64 {
        r.powi(3)
    }
}

impl KernelFromParams for CubicKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        CubicKernel
    }
}

/// Quintic kernel with `phi(r) = r^5`.
#[derive(Clone, Debug, Copy)]
pub struct QuinticKernel;

impl RadialKernel for QuinticKernel {
    #[inline(always)]
    fn phi(&self, r: f64) -> f64 {
        r.powi(5)
    }
}

impl KernelFromParams for QuinticKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        QuinticKernel
    }
}

/// Thin plate spline kernel with `phi(r) = r^2 log r`, taken as zero at `r = 0`.
#[derive(Clone, Debug, Copy)]
pub struct ThinPlateKernel;

impl RadialKernel for ThinPlateKernel {
    #[inline(always)]
    fn phi(&self, r: f64) -> f64 {
        match r.abs() < f64::EPSILON {
            true => 0.0,
            false => r.powi(2) * r.ln(),
        }
    }
}

impl KernelFromParams for ThinPlateKernel {
    #[inline(always)]
    fn from_params(_: &KernelParams) -> Self {
        ThinPlateKernel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-14 * (1.0 + b.abs())
    }

    #[test]
    fn shape_parameter_kernels_match_closed_forms() {
        let eps = 2.0;
        let r = 3.0;
        let s = r / eps;

        assert!(close(MultiquadricKernel::new(eps).phi(r), (s * s + 1.0).sqrt()));
        assert!(close(
            InverseMultiquadricKernel::new(eps).phi(r),
            1.0 / (s * s + 1.0).sqrt()
        ));
        assert!(close(GaussianKernel::new(eps).phi(r), (-(s * s)).exp()));
    }

    #[test]
    fn polyharmonic_kernels_match_closed_forms() {
        let r = 1.5f64;
        assert_eq!(LinearKernel.phi(r), 1.5);
        assert!(close(CubicKernel.phi(r), 3.375));
        assert!(close(QuinticKernel.phi(r), 7.59375));
        assert!(close(ThinPlateKernel.phi(r), 2.25 * r.ln()));
    }

    #[test]
    fn kernels_at_zero_distance() {
        assert_eq!(MultiquadricKernel::new(0.5).phi(0.0), 1.0);
        assert_eq!(InverseMultiquadricKernel::new(0.5).phi(0.0), 1.0);
        assert_eq!(GaussianKernel::new(0.5).phi(0.0), 1.0);
        assert_eq!(LinearKernel.phi(0.0), 0.0);
        assert_eq!(ThinPlateKernel.phi(0.0), 0.0);
        assert!(ThinPlateKernel.phi(0.0).is_finite());
    }
}
