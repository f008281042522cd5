/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared helpers for random point generation, CSV I/O, and bounding box scaling.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::error::{DataIOError, DataIOResult};
use csv::{ReaderBuilder, Writer};
use faer::{Mat, MatRef};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::path::Path;

/// Generate a matrix of random points in the unit hypercube.
///
/// # Parameters
/// - `n`: Number of points to generate (rows in the output matrix).
/// - `d`: Number of spatial dimensions per point (columns in the output matrix).
/// - `seed`: Optional random seed.
///   - If `Some(seed)` is provided, the same sequence of points will be generated
///     deterministically across runs and platforms (useful for reproducible tests).
///   - If `None`, the generator is seeded from the operating system's randomness source.
///
/// # Returns
/// A `Mat<f64>` of shape `(n, d)` where each element lies in `[0.0, 1.0)`.
///
/// # Example
/// ```
/// use aerostruct_rbf::generate_random_points;
///
/// // Generate 100 reproducible 3D points
/// let pts = generate_random_points(100, 3, Some(42));
/// assert_eq!(pts.ncols(), 3);
/// assert_eq!(pts, generate_random_points(100, 3, Some(42)));
/// ```
pub fn generate_random_points(n: usize, d: usize, seed: Option<u64>) -> Mat<f64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    Mat::from_fn(n, d, |_, _| rng.random_range(0.0..1.0))
}

/// Load a point cloud (or a field) from a CSV file.
///
/// Every column is read as a coordinate or field component, and every row
/// becomes one row of the returned matrix.
///
/// # Arguments
/// * `file_path` - Path to the CSV file.
/// * `has_headers` - Whether the file has a single header row to skip.
///
/// # Errors
/// Fails with [`DataIOError`] when the file cannot be read, a cell is not a
/// number, or a row has a different number of columns to the first one.
pub fn csv_to_point_cloud(file_path: impl AsRef<Path>, has_headers: bool) -> DataIOResult<Mat<f64>> {
    let path = file_path.as_ref();
    let file = File::open(path).map_err(|source| DataIOError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(file);

    let mut data = Vec::new();
    let mut num_rows = 0;
    let mut num_cols = 0;

    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|source| DataIOError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        if num_rows == 0 {
            num_cols = record.len();
        } else if record.len() != num_cols {
            return Err(DataIOError::RaggedRow {
                path: path.to_path_buf(),
                row: row + 1,
                expected: num_cols,
                found: record.len(),
            });
        }

        for value in record.iter() {
            let parsed: f64 = value.trim().parse().map_err(|_| DataIOError::Parse {
                path: path.to_path_buf(),
                row: row + 1,
                value: value.to_string(),
            })?;
            data.push(parsed);
        }

        num_rows += 1;
    }

    Ok(MatRef::from_row_major_slice(data.as_slice(), num_rows, num_cols).to_owned())
}

/// Write a point cloud (or a field) to a CSV file.
///
/// The first three columns are headed `X, Y, Z`; any further columns are
/// headed `C3, C4, ...`.
///
/// # Errors
/// Fails with [`DataIOError`] if the file cannot be created or written.
pub fn point_cloud_to_csv(points: MatRef<'_, f64>, file_path: impl AsRef<Path>) -> DataIOResult<()> {
    const AXIS_NAMES: [&str; 3] = ["X", "Y", "Z"];

    let path = file_path.as_ref();
    let csv_error = |source| DataIOError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = Writer::from_path(path).map_err(csv_error)?;

    let headers: Vec<String> = (0..points.ncols())
        .map(|j| match AXIS_NAMES.get(j) {
            Some(name) => name.to_string(),
            None => format!("C{j}"),
        })
        .collect();
    wtr.write_record(&headers).map_err(csv_error)?;

    for row in points.row_iter() {
        let record: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        wtr.write_record(&record).map_err(csv_error)?;
    }

    wtr.flush().map_err(|source| DataIOError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Compute translation and scale factors that map points into the cube
/// `[-1, 1]^d` without distorting their shape.
///
/// The translation is the midpoint of each coordinate range. Every axis
/// shares one scale, the largest half range, so an axis with a tiny spread
/// stays tiny after scaling. A cloud with no spread at all gets a scale of `1.0`.
///
/// # Arguments
/// * `point_locations` - Matrix of point coordinates (rows are points).
///
/// # Returns
/// A tuple `(translation, scale)` where each is a per-dimension factor.
pub fn get_isotropic_scaling_factors(point_locations: MatRef<'_, f64>) -> (Vec<f64>, Vec<f64>) {
    let dimensions = point_locations.ncols();
    let extents = aerostruct_rbf_utils::get_pointarray_extents(point_locations);

    let translation_factor: Vec<f64> = (0..dimensions)
        .map(|d| (extents[d + dimensions] + extents[d]) / 2.0)
        .collect();

    let half_range = (0..dimensions)
        .map(|d| (extents[d + dimensions] - extents[d]) / 2.0)
        .fold(0.0f64, f64::max);
    let scale = if half_range > 0.0 { half_range } else { 1.0 };

    (translation_factor, vec![scale; dimensions])
}

/// Apply translation and scaling to map points into a normalized cube.
///
/// For each coordinate `x`, applies `(x - translation_factor[d]) / scale_factor[d]`.
pub fn scale_points(points: &mut Mat<f64>, translation_factor: &[f64], scale_factor: &[f64]) {
    points.row_iter_mut().for_each(|row| {
        row.iter_mut().enumerate().for_each(|(col_idx, element)| {
            *element = (*element - translation_factor[col_idx]) / scale_factor[col_idx];
        });
    });
}
