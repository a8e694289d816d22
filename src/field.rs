// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the FieldBuffer, which describes a fixed rectangle of
//! normalized fractal values that is filled in raster order as
//! samples arrive, and the Field, an immutable copy of the part of
//! that rectangle we actually know about.

use crate::error::ConfigError;
use num::clamp;

/// The hard cap on either side of a field.
pub const MAX_DIMENSION: usize = 8192;

/// Describes the width and height of the integral plane.  Both are
/// validated on construction, so a `Dimensions` in hand is always
/// usable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dimensions {
    /// Cells per row.
    pub width: usize,
    /// Rows.
    pub height: usize,
}

impl Dimensions {
    /// Validates and builds a pair of dimensions.
    pub fn new(width: usize, height: usize) -> Result<Dimensions, ConfigError> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ConfigError::InvalidDimensions {
                width,
                height,
                max: MAX_DIMENSION,
            });
        }
        Ok(Dimensions { width, height })
    }

    /// The total number of cells.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Never true for validated dimensions; here to keep `len` company.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A rectangle of scalar values, row-major.  This is what the render
/// stages consume and produce; none of them modify one in place.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Field {
    /// A field of zeroes.
    pub fn new(width: usize, height: usize) -> Field {
        Field {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Wraps an existing row-major buffer.  Returns `None` if the
    /// buffer isn't exactly `width * height` long.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Option<Field> {
        if data.len() != width * height {
            return None;
        }
        Some(Field {
            width,
            height,
            data,
        })
    }

    /// Cells per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the field has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The row-major values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// The value at a row and column.  Panics when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    /// The value at a possibly out-of-bounds coordinate, replicating
    /// the nearest edge cell.  Every neighbourhood operator in the
    /// crate goes through here so they all agree on the boundary.
    #[inline]
    pub fn at(&self, row: isize, col: isize) -> f32 {
        let r = clamp(row, 0, self.height as isize - 1) as usize;
        let c = clamp(col, 0, self.width as isize - 1) as usize;
        self.data[r * self.width + c]
    }

    /// Applies `f` to every cell.
    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Field {
        Field {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combines two fields of the same shape cell by cell.
    pub fn zip_with<F: Fn(f32, f32) -> f32>(&self, other: &Field, f: F) -> Field {
        debug_assert_eq!(self.width, other.width);
        debug_assert_eq!(self.height, other.height);
        Field {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    /// Clamps every cell to [0, 1].
    pub fn clip(&self) -> Field {
        self.map(|v| clamp(v, 0.0, 1.0))
    }

    /// Raises every cell to `exponent`.  Cells are clipped at zero
    /// first so that fractional exponents never see a negative base.
    pub fn powf(&self, exponent: f32) -> Field {
        self.map(|v| v.max(0.0).powf(exponent))
    }

    /// True if no cell holds NaN or infinity.
    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// The fixed-size grid plus the count of cells filled so far.  Cell
/// `n` holds real data if and only if `n < filled`.
#[derive(Debug)]
pub struct FieldBuffer {
    dims: Dimensions,
    cells: Vec<f32>,
    filled: usize,
}

impl FieldBuffer {
    /// An empty buffer of the given size.
    pub fn new(dims: Dimensions) -> FieldBuffer {
        FieldBuffer {
            dims,
            cells: vec![0.0; dims.len()],
            filled: 0,
        }
    }

    /// Reallocates the grid, zeroes it, and forgets everything we knew.
    pub fn reset(&mut self, dims: Dimensions) {
        self.dims = dims;
        self.cells = vec![0.0; dims.len()];
        self.filled = 0;
    }

    /// Forgets everything we knew, keeping the dimensions.
    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut() {
            *cell = 0.0;
        }
        self.filled = 0;
    }

    /// The buffer's dimensions.
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Number of cells holding real data.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Total number of cells.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// True once every cell has been filled.
    pub fn is_complete(&self) -> bool {
        self.filled == self.capacity()
    }

    /// Fraction of cells filled, in [0, 1].
    pub fn progress(&self) -> f64 {
        self.filled as f64 / self.capacity() as f64
    }

    /// Rows that hold at least one known cell.
    pub fn visible_rows(&self) -> usize {
        (self.filled + self.dims.width - 1) / self.dims.width
    }

    /// Copies values into the next free cells in raster order.
    /// Anything past the end of the grid is dropped; returns how many
    /// values were actually stored.
    pub fn ingest<I: IntoIterator<Item = f32>>(&mut self, values: I) -> usize {
        let before = self.filled;
        for value in values {
            if self.filled >= self.cells.len() {
                break;
            }
            self.cells[self.filled] = clamp(value, 0.0, 1.0);
            self.filled += 1;
        }
        self.filled - before
    }

    /// Copies out the visible rows.  When the last visible row is only
    /// partly known, its unknown tail is padded from the row above (or
    /// from the last known cell when there is no row above), so the
    /// copy never exposes cells that were never written.
    pub fn snapshot(&self) -> Field {
        let width = self.dims.width;
        let rows = self.visible_rows();
        let mut data = self.cells[..rows * width].to_vec();
        for offset in self.filled..data.len() {
            data[offset] = if offset >= width {
                data[offset - width]
            } else {
                data[self.filled - 1]
            };
        }
        Field {
            width,
            height: rows,
            data,
        }
    }
}
