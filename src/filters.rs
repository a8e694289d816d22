// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Neighbourhood operators over a `Field`: Gaussian blur, Sobel edge
//! magnitude, Laplacian, maximum filter and local rank.
//!
//! All of them replicate edge cells past the boundary (see
//! `Field::at`) and so never read outside the rows they are given.
//! Rows are independent of one another within a pass, so large fields
//! are split into horizontal bands and handed to scoped worker
//! threads; the result doesn't depend on how the bands fall.

use crate::error::TransformError;
use crate::field::Field;
use itertools::iproduct;

/// Below this many cells a pass runs on the calling thread.
const PARALLEL_THRESHOLD: usize = 64 * 1024;

/// Gaussian kernels are cut off at this many standard deviations.
const TRUNCATE: f64 = 4.0;

/// Runs `f` over every output row, in bands across worker threads
/// when the field is large enough to be worth it.
fn par_rows<F>(width: usize, height: usize, f: F) -> Result<Vec<f32>, TransformError>
where
    F: Fn(usize, &mut [f32]) + Sync,
{
    if width == 0 || height == 0 {
        return Err(TransformError::EmptyField);
    }
    let mut out = vec![0.0_f32; width * height];
    let threads = if width * height < PARALLEL_THRESHOLD {
        1
    } else {
        num_cpus::get().max(1).min(height)
    };

    if threads == 1 {
        for (row, cells) in out.chunks_mut(width).enumerate() {
            f(row, cells);
        }
        return Ok(out);
    }

    let rows_per_band = (height + threads - 1) / threads;
    let f = &f;
    crossbeam::scope(|spawner| {
        for (band, rows) in out.chunks_mut(rows_per_band * width).enumerate() {
            spawner.spawn(move |_| {
                for (i, cells) in rows.chunks_mut(width).enumerate() {
                    f(band * rows_per_band + i, cells);
                }
            });
        }
    })
    .map_err(|_| TransformError::WorkerPanicked)?;
    Ok(out)
}

fn build(width: usize, height: usize, data: Vec<f32>) -> Result<Field, TransformError> {
    Field::from_vec(width, height, data).ok_or(TransformError::EmptyField)
}

/// A normalized 1-D Gaussian kernel, centre tap in the middle.
fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Separable Gaussian blur.  A sigma of zero or less returns the
/// field unchanged.
pub fn gaussian_blur(field: &Field, sigma: f64) -> Result<Field, TransformError> {
    if field.is_empty() {
        return Err(TransformError::EmptyField);
    }
    if !(sigma > 0.0) {
        return Ok(field.clone());
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let (w, h) = (field.width(), field.height());

    let horizontal = par_rows(w, h, |row, cells| {
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| weight * field.at(row as isize, col as isize + k as isize - radius))
                .sum();
        }
    })?;
    let horizontal = build(w, h, horizontal)?;

    let vertical = par_rows(w, h, |row, cells| {
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    weight * horizontal.at(row as isize + k as isize - radius, col as isize)
                })
                .sum();
        }
    })?;
    build(w, h, vertical)
}

/// Sobel gradient magnitude, `sqrt(gx² + gy²)`.
pub fn sobel_magnitude(field: &Field) -> Result<Field, TransformError> {
    let (w, h) = (field.width(), field.height());
    let data = par_rows(w, h, |row, cells| {
        let r = row as isize;
        for (col, cell) in cells.iter_mut().enumerate() {
            let c = col as isize;
            let p = |dr: isize, dc: isize| field.at(r + dr, c + dc);
            let gx = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
            let gy = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
            *cell = (gx * gx + gy * gy).sqrt();
        }
    })?;
    build(w, h, data)
}

/// Four-neighbour discrete Laplacian.
pub fn laplacian(field: &Field) -> Result<Field, TransformError> {
    let (w, h) = (field.width(), field.height());
    let data = par_rows(w, h, |row, cells| {
        let r = row as isize;
        for (col, cell) in cells.iter_mut().enumerate() {
            let c = col as isize;
            *cell = field.at(r - 1, c) + field.at(r + 1, c) + field.at(r, c - 1)
                + field.at(r, c + 1)
                - 4.0 * field.at(r, c);
        }
    })?;
    build(w, h, data)
}

/// The largest value in each 3×3 neighbourhood.
pub fn maximum_filter(field: &Field) -> Result<Field, TransformError> {
    let (w, h) = (field.width(), field.height());
    let data = par_rows(w, h, |row, cells| {
        let r = row as isize;
        for (col, cell) in cells.iter_mut().enumerate() {
            let c = col as isize;
            *cell = iproduct!(-1..=1, -1..=1)
                .map(|(dr, dc)| field.at(r + dr, c + dc))
                .fold(std::f32::NEG_INFINITY, f32::max);
        }
    })?;
    build(w, h, data)
}

/// Where each cell falls among its 3×3 neighbourhood, from 0 (below
/// all eight neighbours) to 1 (above all of them).  Ties count half.
pub fn local_rank(field: &Field) -> Result<Field, TransformError> {
    let (w, h) = (field.width(), field.height());
    let data = par_rows(w, h, |row, cells| {
        let r = row as isize;
        for (col, cell) in cells.iter_mut().enumerate() {
            let c = col as isize;
            let centre = field.at(r, c);
            let (mut below, mut equal) = (0u32, 0u32);
            for (dr, dc) in iproduct!(-1..=1, -1..=1) {
                let v = field.at(r + dr, c + dc);
                if v < centre {
                    below += 1;
                } else if v == centre {
                    equal += 1;
                }
            }
            // `equal` always counts the centre itself.
            *cell = (below as f32 + 0.5 * (equal - 1) as f32) / 8.0;
        }
    })?;
    build(w, h, data)
}
