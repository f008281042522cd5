/////////////////////////////////////////////////////////////////////////////////////////////
//
// Builds, stores, and persists the dense RBF interpolation operator H between two point clouds.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # operator
//!
//! Assembles the interpolation matrix `H` of the polynomial augmented RBF
//! formulation with a biased norm. `H` maps a field sampled at the source
//! points onto the target points, and `Hᵗ` maps target forces back onto the
//! source points.
//!
//! # References
//! 1. T. C. S. Rendall and C. B. Allen. Unified fluid-structure interpolation and
//!    mesh motion using radial basis functions. Int. J. Numer. Meth. Engng.,
//!    74(10):1519–1559, 2008.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
    sync::Arc,
    time::Instant,
};

use faer::{concat, Mat, MatRef};
use serde::{Deserialize, Serialize};

use aerostruct_rbf_utils::{self, UniqueRows};

use crate::{
    error::{DataIOError, DataIOResult, TransferError, TransferResult},
    interpolation_settings::{InterpolationSettings, SPATIAL_DIMENSIONS},
    linalg,
    polynomials::PolynomialBasis,
    progress::{emit, ProgressMsg, ProgressSink},
};

/// Convenience builder for constructing an [`InterpolationOperator`].
///
/// The builder should be called via the [`InterpolationOperator::builder`] method.
pub struct InterpolationOperatorBuilder<'a> {
    source_points: MatRef<'a, f64>,
    target_points: MatRef<'a, f64>,
    settings: InterpolationSettings,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl<'a> InterpolationOperatorBuilder<'a> {
    fn new(
        source_points: MatRef<'a, f64>,
        target_points: MatRef<'a, f64>,
        settings: InterpolationSettings,
    ) -> Self {
        Self {
            source_points,
            target_points,
            settings,
            progress_callback: None,
        }
    }

    /// Optional sink for reporting build progress.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Builds the operator.
    ///
    /// # Errors
    /// See [`build_interpolation`].
    pub fn build(self) -> TransferResult<InterpolationOperator> {
        InterpolationOperator::new(
            self.source_points,
            self.target_points,
            self.settings,
            &self.progress_callback,
        )
    }
}

/// How an [`InterpolationOperator`] was assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Settings the operator was built with.
    pub settings: InterpolationSettings,

    /// Shape parameter actually used.
    pub epsilon: f64,

    /// Number of polynomial terms kept in the augmentation block.
    pub polynomial_rank: usize,
}

/// Dense interpolation operator `H` of shape `(targets, unique sources)`.
///
/// `H` depends only on the two point clouds and the [`InterpolationSettings`],
/// never on the fields it is applied to, so it can be built once per mesh
/// configuration and reused (see [`OperatorCache`](crate::OperatorCache)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationOperator {
    h: Mat<f64>,

    summary: Option<BuildSummary>,

    /// Raw to unique source row map, present when duplicates were removed.
    source_rows: Option<UniqueRows>,
}

impl InterpolationOperator {
    /// Creates a new [`InterpolationOperatorBuilder`] for the given point
    /// clouds and settings.
    pub fn builder<'a>(
        source_points: MatRef<'a, f64>,
        target_points: MatRef<'a, f64>,
        settings: InterpolationSettings,
    ) -> InterpolationOperatorBuilder<'a> {
        InterpolationOperatorBuilder::new(source_points, target_points, settings)
    }

    /// Wraps a precomputed `(targets, sources)` matrix, e.g. one produced by
    /// an external dimension reduction step.
    pub fn from_matrix(h: Mat<f64>) -> Self {
        Self {
            h,
            summary: None,
            source_rows: None,
        }
    }

    fn new(
        source_points: MatRef<'_, f64>,
        target_points: MatRef<'_, f64>,
        settings: InterpolationSettings,
        progress_callback: &Option<Arc<dyn ProgressSink>>,
    ) -> TransferResult<Self> {
        let build_start = Instant::now();

        check_point_cloud("source point", source_points)?;
        check_point_cloud("target point", target_points)?;
        settings.validate()?;

        if source_points.nrows() == 0 {
            return Err(TransferError::EmptyPointCloud { which: "source" });
        }
        if target_points.nrows() == 0 {
            return Err(TransferError::EmptyPointCloud { which: "target" });
        }

        let (unique_source, source_rows) = match settings.deduplicate_source {
            true => {
                let rows = aerostruct_rbf_utils::unique_row_indices(source_points);
                if rows.num_duplicates() == 0 {
                    (source_points.to_owned(), None)
                } else {
                    emit(progress_callback, || ProgressMsg::DuplicatesRemoved {
                        num_duplicates: rows.num_duplicates(),
                    });
                    (
                        aerostruct_rbf_utils::select_mat_rows(source_points, &rows.unique),
                        Some(rows),
                    )
                }
            }
            false => (source_points.to_owned(), None),
        };

        let bias = settings.bias.as_slice();

        // Source to source biased distances.
        let rss = aerostruct_rbf_utils::get_distance_matrix(
            unique_source.as_ref(),
            unique_source.as_ref(),
            bias,
        );

        if let Some((i, j)) = first_coincident_pair(rss.as_ref()) {
            let raw = |k: usize| source_rows.as_ref().map_or(k, |rows| rows.unique[k]);
            return Err(TransferError::SingularInterpolationSystem {
                reason: format!(
                    "source points {} and {} coincide under the biased norm",
                    raw(i),
                    raw(j)
                ),
            });
        }

        let epsilon = match settings.epsilon {
            Some(epsilon) => epsilon,
            None => default_epsilon(rss.as_ref()),
        };

        let m = settings.kernel.evaluate(rss.as_ref(), epsilon)?;
        let m_inv = linalg::checked_inverse(
            m.as_ref(),
            settings.singularity_tolerance,
            "kernel matrix M",
        )?;

        let basis = PolynomialBasis::from_source(unique_source.as_ref());
        if basis.rank() < basis.full_rank() {
            emit(progress_callback, || ProgressMsg::ReducedPolynomialBasis {
                rank: basis.rank(),
                full_rank: basis.full_rank(),
            });
        }

        // Pᵗ, one row per source point.
        let p_t = basis.evaluate(unique_source.as_ref());
        let p_m_inv = p_t.transpose() * &m_inv;
        let m_inv_p_t = &m_inv * &p_t;

        let schur = &p_m_inv * &p_t;
        let m_p = linalg::checked_inverse(
            schur.as_ref(),
            settings.singularity_tolerance,
            "polynomial Schur complement P inv(M) Pᵗ",
        )?;

        // Css_inv = [Mp P Minv; Minv - Minv Pᵗ Mp P Minv].
        let css_top = &m_p * &p_m_inv;
        let correction = &m_inv_p_t * &css_top;
        let css_bottom = &m_inv - &correction;
        let css_inv = concat![[&css_top], [&css_bottom]];

        // Aas = [polynomial columns at targets, h(Ras)].
        let ras = aerostruct_rbf_utils::get_distance_matrix(
            target_points,
            unique_source.as_ref(),
            bias,
        );
        let kas = settings.kernel.evaluate(ras.as_ref(), epsilon)?;
        let p_a = basis.evaluate(target_points);
        let aas = concat![[&p_a, &kas]];

        let h = &aas * &css_inv;

        emit(progress_callback, || ProgressMsg::OperatorBuilt {
            num_source: unique_source.nrows(),
            num_target: target_points.nrows(),
            kernel: settings.kernel.name().to_string(),
            epsilon,
            elapsed: build_start.elapsed(),
        });

        Ok(Self {
            h,
            summary: Some(BuildSummary {
                settings,
                epsilon,
                polynomial_rank: basis.rank(),
            }),
            source_rows,
        })
    }

    /// The interpolation matrix `H`.
    pub fn matrix(&self) -> MatRef<'_, f64> {
        self.h.as_ref()
    }

    /// Consumes the operator and returns `H`.
    pub fn into_matrix(self) -> Mat<f64> {
        self.h
    }

    /// Number of target points (rows of `H`).
    pub fn num_target(&self) -> usize {
        self.h.nrows()
    }

    /// Number of unique source points (columns of `H`).
    pub fn num_source(&self) -> usize {
        self.h.ncols()
    }

    /// Number of source points before duplicates were removed.
    pub fn num_raw_source(&self) -> usize {
        self.source_rows
            .as_ref()
            .map_or(self.h.ncols(), |rows| rows.raw_to_unique.len())
    }

    /// Raw to unique source row map, if duplicates were removed.
    pub fn source_rows(&self) -> Option<&UniqueRows> {
        self.source_rows.as_ref()
    }

    /// Build details, or `None` for operators wrapped with [`Self::from_matrix`].
    pub fn summary(&self) -> Option<&BuildSummary> {
        self.summary.as_ref()
    }

    /// Shape parameter used for the build.
    pub fn epsilon(&self) -> Option<f64> {
        self.summary.as_ref().map(|s| s.epsilon)
    }

    /// Save this operator to a **JSON envelope** `{ format, version, operator }`.
    ///
    /// Operators built with a custom kernel cannot be saved.
    ///
    /// ### Errors
    /// - Returns `DataIOError::{Io, Json}` on I/O or serialization failures.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> DataIOResult<()> {
        let path_ref = path.as_ref();

        // Serialize first so a failure does not leave a truncated file behind.
        let env = JsonEnvelopeRef {
            format: JSON_FORMAT_NAME,
            version: JSON_VERSION,
            operator: self,
        };
        let bytes = serde_json::to_vec_pretty(&env).map_err(|e| DataIOError::Json {
            path: path_ref.to_path_buf(),
            source: e,
        })?;

        let io_error = |e: std::io::Error| DataIOError::Io {
            path: path_ref.to_path_buf(),
            source: e,
        };
        let file = File::create(path_ref).map_err(io_error)?;
        let mut w = BufWriter::new(file);
        w.write_all(&bytes).map_err(io_error)?;
        w.flush().map_err(io_error)?;
        Ok(())
    }

    /// Load an operator from a versioned **JSON envelope**, validating format & version.
    ///
    /// ### Errors
    /// - Returns `DataIOError::{Io, Json, FormatMismatch, VersionMismatch}` as appropriate.
    pub fn load<P: AsRef<Path>>(path: P) -> DataIOResult<Self> {
        let path_ref = path.as_ref();

        let file = File::open(path_ref).map_err(|e| DataIOError::Io {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let reader = BufReader::new(file);

        let env: JsonEnvelopeOwned<Self> =
            serde_json::from_reader(reader).map_err(|e| DataIOError::Json {
                path: path_ref.to_path_buf(),
                source: e,
            })?;

        if env.format != JSON_FORMAT_NAME {
            return Err(DataIOError::FormatMismatch {
                path: path_ref.to_path_buf(),
                found: env.format,
                expected: JSON_FORMAT_NAME,
            });
        }

        if env.version != JSON_VERSION {
            return Err(DataIOError::VersionMismatch {
                path: path_ref.to_path_buf(),
                found: env.version,
                expected: JSON_VERSION,
            });
        }

        Ok(env.operator)
    }
}

/// Builds the interpolation operator `H` mapping fields at `source_points`
/// onto `target_points`.
///
/// Both clouds hold one 3D point per row.
///
/// # Errors
/// - [`TransferError::DimensionMismatch`] if a cloud does not have 3 columns
///   or the bias does not have 3 weights.
/// - [`TransferError::InvalidParameter`] for a negative bias weight or a
///   non-positive epsilon or tolerance.
/// - [`TransferError::EmptyPointCloud`] if either cloud has no points.
/// - [`TransferError::SingularInterpolationSystem`] if two source points
///   coincide under the biased norm, or `M` or its Schur complement fails
///   the LU pivot rank test.
/// - [`TransferError::InvalidKernelShape`] if a custom kernel does not
///   preserve the shape of its input.
pub fn build_interpolation(
    source_points: MatRef<'_, f64>,
    target_points: MatRef<'_, f64>,
    settings: &InterpolationSettings,
) -> TransferResult<InterpolationOperator> {
    InterpolationOperator::new(source_points, target_points, settings.clone(), &None)
}

fn check_point_cloud(what: &'static str, points: MatRef<'_, f64>) -> TransferResult<()> {
    if points.ncols() != SPATIAL_DIMENSIONS {
        return Err(TransferError::DimensionMismatch {
            what,
            expected: SPATIAL_DIMENSIONS,
            found: points.ncols(),
        });
    }
    Ok(())
}

/// First pair `(i, j)`, `i < j`, with zero distance.
fn first_coincident_pair(distances: MatRef<'_, f64>) -> Option<(usize, usize)> {
    let n = distances.nrows();
    (0..n).find_map(|i| {
        ((i + 1)..n)
            .find(|&j| distances[(i, j)] == 0.0)
            .map(|j| (i, j))
    })
}

/// Mean of all source to source distances, diagonal included. A single
/// point has no length scale, so `1.0` is used instead.
fn default_epsilon(rss: MatRef<'_, f64>) -> f64 {
    let mean = aerostruct_rbf_utils::mean(rss);
    if mean > 0.0 {
        mean
    } else {
        1.0
    }
}

const JSON_FORMAT_NAME: &str = "aerostruct_rbf.operator.json";
const JSON_VERSION: u32 = 1;

/// Borrowing envelope for SAVE (no clone of the operator).
#[derive(Serialize)]
struct JsonEnvelopeRef<'a, T: ?Sized> {
    format: &'static str,
    version: u32,
    operator: &'a T,
}

/// Owning envelope for LOAD.
#[derive(Deserialize)]
struct JsonEnvelopeOwned<T> {
    format: String,
    version: u32,
    operator: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::tests::RecordingSink;
    use crate::test_fields::TestFields;
    use crate::generate_random_points;
    use aerostruct_rbf_utils::{KernelType, RbfKernel, ScalarKernel};
    use equator::assert;
    use faer::{mat, utils::approx::*};

    fn max_abs_diff(a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> f64 {
        let mut max = 0.0f64;
        for j in 0..a.ncols() {
            for i in 0..a.nrows() {
                max = max.max((a[(i, j)] - b[(i, j)]).abs());
            }
        }
        max
    }

    fn unit_square() -> Mat<f64> {
        mat![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0f64],
        ]
    }

    #[test]
    fn square_scenario_reproduces_plane_for_every_kernel() {
        let source = unit_square();
        let target = mat![[0.5, 0.5, 0.0f64]];
        let field = Mat::from_fn(4, 1, |i, _| source[(i, 0)] + source[(i, 1)]);

        for &kernel_type in KernelType::ALL {
            let settings = InterpolationSettings::builder(kernel_type).build();
            let op = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();
            let value = (op.matrix() * &field)[(0, 0)];
            assert!((value - 1.0).abs() < 1e-8);
        }
    }

    #[test]
    fn constant_and_affine_fields_are_reproduced() {
        let source = generate_random_points(15, 3, Some(11));
        let target = generate_random_points(9, 3, Some(12));

        let kernels = [
            KernelType::Multiquadric,
            KernelType::InverseMultiquadric,
            KernelType::Linear,
            KernelType::Cubic,
        ];

        for kernel_type in kernels {
            let settings = InterpolationSettings::builder(kernel_type).build();
            let op = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();

            let constant = TestFields::constant(&[1.5, -2.0, 0.25]);
            let moved = op.matrix() * constant.evaluate(source.as_ref()).unwrap();
            assert!(max_abs_diff(moved.as_ref(), constant.evaluate(target.as_ref()).unwrap().as_ref()) < 1e-6);

            let affine = TestFields::affine(
                mat![[0.5, -1.0, 2.0], [0.0, 3.0, -0.5], [1.0, 0.25, 0.75f64]],
                &[0.1, 0.2, -0.3],
            )
            .unwrap();
            let moved = op.matrix() * affine.evaluate(source.as_ref()).unwrap();
            assert!(max_abs_diff(moved.as_ref(), affine.evaluate(target.as_ref()).unwrap().as_ref()) < 1e-6);
        }
    }

    #[test]
    fn rigid_rotation_is_exact_under_biased_norm() {
        let source = generate_random_points(12, 3, Some(3));
        let target = generate_random_points(7, 3, Some(4));
        let settings = InterpolationSettings::builder(KernelType::Multiquadric)
            .bias([1.0, 0.2, 1.0])
            .build();
        let op = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();

        let rigid = TestFields::rigid_body(0.3, &[0.0, 0.5, 0.5], &[0.01, -0.02, 0.03]);
        let moved = op.matrix() * rigid.evaluate(source.as_ref()).unwrap();
        assert!(max_abs_diff(moved.as_ref(), rigid.evaluate(target.as_ref()).unwrap().as_ref()) < 1e-6);
    }

    #[test]
    fn operator_has_target_by_source_shape() {
        let source = generate_random_points(10, 3, Some(1));
        let target = generate_random_points(4, 3, Some(2));
        let op = build_interpolation(source.as_ref(), target.as_ref(), &Default::default()).unwrap();
        assert!(op.matrix().shape() == (4, 10));
        assert!(op.num_target() == 4);
        assert!(op.num_source() == 10);
        assert!(op.num_raw_source() == 10);
        assert!(op.summary().unwrap().polynomial_rank == 4);
    }

    #[test]
    fn source_target_identity_interpolates() {
        let source = generate_random_points(10, 3, Some(5));
        let op = build_interpolation(source.as_ref(), source.as_ref(), &Default::default()).unwrap();

        let approx_eq = CwiseMat(ApproxEq::eps() * 1e8);
        assert!(op.matrix() ~ Mat::<f64>::identity(10, 10));
    }

    #[test]
    fn two_dimensional_points_are_rejected() {
        let source = mat![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0f64]];
        let target = mat![[0.5, 0.5, 0.0f64]];
        let err = build_interpolation(source.as_ref(), target.as_ref(), &Default::default())
            .unwrap_err();
        assert!(
            err == TransferError::DimensionMismatch {
                what: "source point",
                expected: 3,
                found: 2
            }
        );

        let err = build_interpolation(target.as_ref(), source.as_ref(), &Default::default())
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::DimensionMismatch {
                what: "target point",
                ..
            }
        ));
    }

    #[test]
    fn bias_of_wrong_length_is_rejected() {
        let settings = InterpolationSettings::builder(KernelType::Multiquadric)
            .bias([1.0, 1.0, 1.0, 1.0])
            .build();
        let source = unit_square();
        let err = build_interpolation(source.as_ref(), source.as_ref(), &settings).unwrap_err();
        assert!(matches!(
            err,
            TransferError::DimensionMismatch {
                what: "bias vector",
                expected: 3,
                found: 4
            }
        ));
    }

    #[test]
    fn coincident_source_points_are_singular() {
        let source = mat![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0f64],
        ];
        let target = mat![[0.5, 0.5, 0.0f64]];
        let err = build_interpolation(source.as_ref(), target.as_ref(), &Default::default())
            .unwrap_err();
        match err {
            TransferError::SingularInterpolationSystem { reason } => {
                assert!(reason.contains("1 and 3"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn zero_bias_weight_can_make_points_coincide() {
        let source = mat![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0f64]];
        let settings = InterpolationSettings::builder(KernelType::Multiquadric)
            .bias([1.0, 0.0, 1.0])
            .build();
        let err = build_interpolation(source.as_ref(), source.as_ref(), &settings).unwrap_err();
        assert!(matches!(err, TransferError::SingularInterpolationSystem { .. }));
    }

    #[test]
    fn empty_clouds_are_rejected() {
        let empty = Mat::<f64>::zeros(0, 3);
        let square = unit_square();
        let err = build_interpolation(empty.as_ref(), square.as_ref(), &Default::default())
            .unwrap_err();
        assert!(err == TransferError::EmptyPointCloud { which: "source" });

        let err = build_interpolation(square.as_ref(), empty.as_ref(), &Default::default())
            .unwrap_err();
        assert!(err == TransferError::EmptyPointCloud { which: "target" });
    }

    #[test]
    fn deduplication_records_row_map_and_reports_it() {
        let source = mat![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0f64],
        ];
        let target = mat![[0.5, 0.5, 0.0f64]];
        let settings = InterpolationSettings::builder(KernelType::Multiquadric)
            .deduplicate_source(true)
            .build();

        let sink = Arc::new(RecordingSink::default());
        let op = InterpolationOperator::builder(source.as_ref(), target.as_ref(), settings)
            .progress_callback(sink.clone())
            .build()
            .unwrap();

        assert!(op.num_source() == 4);
        assert!(op.num_raw_source() == 5);
        let rows = op.source_rows().unwrap();
        assert!(rows.unique == vec![0, 1, 2, 4]);
        assert!(rows.raw_to_unique == vec![0, 1, 2, 1, 3]);

        let messages = sink.messages.lock().unwrap();
        assert!(messages
            .iter()
            .any(|m| matches!(m, ProgressMsg::DuplicatesRemoved { num_duplicates: 1 })));
        assert!(messages
            .iter()
            .any(|m| matches!(m, ProgressMsg::ReducedPolynomialBasis { rank: 3, full_rank: 4 })));
        assert!(messages
            .iter()
            .any(|m| matches!(m, ProgressMsg::OperatorBuilt { num_source: 4, num_target: 1, .. })));
    }

    #[test]
    fn repeated_builds_are_identical() {
        let source = generate_random_points(14, 3, Some(21));
        let target = generate_random_points(6, 3, Some(22));
        let settings = InterpolationSettings::builder(KernelType::Cubic).build();

        let first = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();
        let second = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();

        let approx_eq = CwiseMat(ApproxEq::eps() * 16.0);
        assert!(first.matrix() ~ second.matrix());
        assert!(first.epsilon() == second.epsilon());
    }

    #[test]
    fn default_epsilon_is_mean_source_distance() {
        let source = unit_square();
        let op = build_interpolation(source.as_ref(), source.as_ref(), &Default::default()).unwrap();
        let expected = (8.0 + 4.0 * 2f64.sqrt()) / 16.0;
        assert!((op.epsilon().unwrap() - expected).abs() < 1e-15);

        let settings = InterpolationSettings::builder(KernelType::Gaussian)
            .epsilon(0.7)
            .build();
        let op = build_interpolation(source.as_ref(), source.as_ref(), &settings).unwrap();
        assert!(op.epsilon() == Some(0.7));
    }

    #[test]
    fn single_source_point_transfers_a_constant() {
        let source = mat![[0.2, 0.4, 0.6f64]];
        let target = generate_random_points(3, 3, Some(8));
        let op = build_interpolation(source.as_ref(), target.as_ref(), &Default::default()).unwrap();
        assert!(op.summary().unwrap().polynomial_rank == 1);

        let approx_eq = CwiseMat(ApproxEq::eps() * 128.0);
        assert!(op.matrix() ~ Mat::<f64>::ones(3, 1));
    }

    #[derive(Debug)]
    struct Flattening;

    impl aerostruct_rbf_utils::CustomKernel for Flattening {
        fn name(&self) -> &str {
            "flattening"
        }

        fn evaluate(&self, distances: MatRef<'_, f64>, _: f64) -> Mat<f64> {
            Mat::zeros(distances.nrows(), 1)
        }
    }

    #[test]
    fn custom_kernels_are_used_and_shape_checked() {
        fn cubic(r: f64, _: f64) -> f64 {
            r * r * r
        }
        let source = generate_random_points(10, 3, Some(31));
        let target = generate_random_points(5, 3, Some(32));

        let custom = InterpolationSettings::builder(RbfKernel::custom(ScalarKernel::new("c", cubic)))
            .build();
        let named = InterpolationSettings::builder(KernelType::Cubic).build();
        let a = build_interpolation(source.as_ref(), target.as_ref(), &custom).unwrap();
        let b = build_interpolation(source.as_ref(), target.as_ref(), &named).unwrap();
        assert!(max_abs_diff(a.matrix(), b.matrix()) < 1e-12);

        let broken = InterpolationSettings::builder(RbfKernel::custom(Flattening)).build();
        let err = build_interpolation(source.as_ref(), target.as_ref(), &broken).unwrap_err();
        assert!(
            err == TransferError::InvalidKernelShape {
                name: "flattening".to_string(),
                expected: (10, 10),
                found: (10, 1),
            }
        );
    }

    #[test]
    fn unknown_kernel_names_convert_to_transfer_errors() {
        let err: TransferError = "bessel".parse::<RbfKernel>().unwrap_err().into();
        assert!(matches!(err, TransferError::UnknownKernel { .. }));
    }

    #[test]
    fn wrapped_matrix_has_no_summary() {
        let op = InterpolationOperator::from_matrix(Mat::<f64>::identity(3, 2));
        assert!(op.summary().is_none());
        assert!(op.epsilon().is_none());
        assert!(op.num_source() == 2);
        assert!(op.num_target() == 3);
    }

    #[test]
    fn save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "aerostruct_rbf_{}_operator.json",
            std::process::id()
        ));
        let points = generate_random_points(8, 3, Some(41));
        // Row 8 repeats row 2.
        let source = Mat::from_fn(9, 3, |i, j| points[(if i == 8 { 2 } else { i }, j)]);
        let target = generate_random_points(3, 3, Some(42));
        let settings = InterpolationSettings::builder(KernelType::Linear)
            .bias([1.0, 0.5, 1.0])
            .deduplicate_source(true)
            .build();
        let op = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();

        op.save(&path).unwrap();
        let loaded = InterpolationOperator::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let approx_eq = CwiseMat(ApproxEq::eps() * 4.0);
        assert!(loaded.matrix() ~ op.matrix());

        let (a, b) = (loaded.summary().unwrap(), op.summary().unwrap());
        assert!(a.settings == b.settings);
        assert!(a.polynomial_rank == b.polynomial_rank);
        assert!((a.epsilon - b.epsilon).abs() <= 4.0 * f64::EPSILON * b.epsilon);
        assert!(loaded.source_rows() == op.source_rows());
    }

    #[test]
    fn load_rejects_foreign_envelopes() {
        let path = std::env::temp_dir().join(format!(
            "aerostruct_rbf_{}_foreign.json",
            std::process::id()
        ));
        let op = InterpolationOperator::from_matrix(Mat::<f64>::identity(2, 2));
        op.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace(JSON_FORMAT_NAME, "something_else.json")).unwrap();
        let err = InterpolationOperator::load(&path).unwrap_err();
        assert!(matches!(err, DataIOError::FormatMismatch { .. }));

        std::fs::write(&path, "{ not json").unwrap();
        let err = InterpolationOperator::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, DataIOError::Json { .. }));
    }

    #[test]
    fn custom_kernel_operators_cannot_be_saved() {
        fn linear(r: f64, _: f64) -> f64 {
            r
        }
        let path = std::env::temp_dir().join(format!(
            "aerostruct_rbf_{}_custom.json",
            std::process::id()
        ));
        let source = unit_square();
        let settings =
            InterpolationSettings::builder(RbfKernel::custom(ScalarKernel::new("lin", linear)))
                .build();
        let op = build_interpolation(source.as_ref(), source.as_ref(), &settings).unwrap();
        let err = op.save(&path).unwrap_err();
        assert!(matches!(err, DataIOError::Json { .. }));
        assert!(!path.exists());
    }

    /// Structural grid over a 2 x 10 planform in the z = 0 plane.
    /// Every seventh node is lifted by `noise`.
    fn wing_grid(n_chord: usize, n_span: usize, noise: f64) -> Mat<f64> {
        Mat::from_fn(n_chord * n_span, 3, |i, j| match j {
            0 => (i % n_chord) as f64 * 2.0 / (n_chord - 1) as f64,
            1 => (i / n_chord) as f64 * 10.0 / (n_span - 1) as f64,
            _ => if i % 7 == 3 { noise } else { 0.0 },
        })
    }

    /// Aerodynamic points on skins at `z = +-0.05` over the same planform.
    fn skin_points(n_chord: usize, n_span: usize) -> Mat<f64> {
        let per_skin = n_chord * n_span;
        Mat::from_fn(2 * per_skin, 3, |i, j| {
            let k = i % per_skin;
            match j {
                0 => (k % n_chord) as f64 * 2.0 / (n_chord - 1) as f64,
                1 => (k / n_chord) as f64 * 10.0 / (n_span - 1) as f64,
                _ => if i < per_skin { 0.05 } else { -0.05 },
            }
        })
    }

    fn affine_error(op: &InterpolationOperator, source: MatRef<'_, f64>, target: MatRef<'_, f64>) -> f64 {
        let field = |p: MatRef<'_, f64>| Mat::from_fn(p.nrows(), 1, |i, _| p[(i, 0)] + 2.0 * p[(i, 1)]);
        let moved = op.matrix() * field(source);
        max_abs_diff(moved.as_ref(), field(target).as_ref())
    }

    #[test]
    fn default_settings_handle_hundreds_of_points() {
        let source = generate_random_points(300, 3, Some(1));
        let target = generate_random_points(20, 3, Some(2));
        let op = build_interpolation(source.as_ref(), target.as_ref(), &Default::default()).unwrap();
        assert!(op.num_source() == 300);
        assert!(affine_error(&op, source.as_ref(), target.as_ref()) < 1e-4);

        let source = generate_random_points(400, 3, Some(1));
        let settings = InterpolationSettings::builder(KernelType::ThinPlate).build();
        let op = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();
        assert!(affine_error(&op, source.as_ref(), target.as_ref()) < 1e-8);
    }

    #[test]
    fn wing_grids_build_with_default_tolerance() {
        let source = wing_grid(12, 20, 0.0);
        let target = skin_points(10, 20);
        let settings = InterpolationSettings::builder(KernelType::ThinPlate).build();
        let op = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();
        assert!(op.summary().unwrap().polynomial_rank == 3);
        assert!(affine_error(&op, source.as_ref(), target.as_ref()) < 1e-6);
    }

    #[test]
    fn rounding_noise_on_a_planar_wing_stays_bounded_off_plane() {
        let target = skin_points(8, 12);
        let settings = InterpolationSettings::builder(KernelType::ThinPlate).build();
        let bending = |p: MatRef<'_, f64>| Mat::from_fn(p.nrows(), 1, |i, _| 0.01 * p[(i, 1)] * p[(i, 1)]);

        let flat = wing_grid(5, 6, 0.0);
        let clean = build_interpolation(flat.as_ref(), target.as_ref(), &settings).unwrap();
        let clean_values = clean.matrix() * bending(flat.as_ref());

        for noise in [1e-13, -1e-12, 1e-11] {
            let source = wing_grid(5, 6, noise);
            let op = build_interpolation(source.as_ref(), target.as_ref(), &settings).unwrap();
            assert!(op.summary().unwrap().polynomial_rank == 3);

            let values = op.matrix() * bending(source.as_ref());
            assert!(max_abs_diff(values.as_ref(), clean_values.as_ref()) < 1e-6);
            assert!(max_abs_diff(values.as_ref(), bending(target.as_ref()).as_ref()) < 0.1);
        }
    }

    #[test]
    fn zero_tolerance_still_rejects_exactly_singular_systems() {
        let settings = InterpolationSettings::builder(KernelType::Multiquadric)
            .singularity_tolerance(0.0)
            .build();
        let source = generate_random_points(30, 3, Some(77));
        let target = generate_random_points(5, 3, Some(78));
        assert!(build_interpolation(source.as_ref(), target.as_ref(), &settings).is_ok());

        let doubled = Mat::from_fn(31, 3, |i, j| source[(i.min(29), j)]);
        let err = build_interpolation(doubled.as_ref(), target.as_ref(), &settings).unwrap_err();
        assert!(matches!(err, TransferError::SingularInterpolationSystem { .. }));
    }
}
