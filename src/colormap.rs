// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns a scalar field into an RGB image by table lookup.

use crate::field::Field;
use crate::palette::Palette;
use image::{Rgb, RgbImage};

/// Colours every cell of `field` through `palette`.  The image has
/// exactly the field's shape, so a snapshot of the visible rows
/// produces an image exactly that tall.
pub fn map_field(field: &Field, palette: &Palette) -> RgbImage {
    RgbImage::from_fn(field.width() as u32, field.height() as u32, |x, y| {
        Rgb(palette.lookup(field.get(y as usize, x as usize)))
    })
}
