// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The render pipeline: theme, scalar enhancement, colour lookup,
//! colour enhancement.  A `RenderJob` carries everything the pipeline
//! needs by value, so it can be run on another thread while the
//! buffer it was copied from keeps filling.

use crate::colormap::map_field;
use crate::enhance::{enhance_field, enhance_image};
use crate::field::Field;
use crate::palette::Palette;
use crate::settings::RenderSettings;
use crate::theme;
use image::RgbImage;
use std::sync::Arc;

/// Runs the whole pipeline over a field.
pub fn render(field: &Field, settings: &RenderSettings, palette: &Palette) -> RgbImage {
    let themed = theme::apply(field, settings.theme, settings);
    let adjusted = enhance_field(&themed, settings.theme, settings);
    let image = map_field(&adjusted, palette);
    enhance_image(&image, settings)
}

/// A snapshot plus the settings to draw it with.
#[derive(Clone, Debug)]
pub struct RenderJob {
    /// The visible rows, copied out of the buffer.
    pub snapshot: Field,
    /// Settings in effect when the job was made.
    pub settings: RenderSettings,
    /// The palette those settings name.
    pub palette: Arc<Palette>,
    /// Fraction of the field known, in [0, 1].
    pub progress: f64,
    /// Status line for the host.
    pub status: String,
    /// Increases with every job the orchestrator hands out.
    pub sequence: u64,
}

impl RenderJob {
    /// Draws the snapshot.
    pub fn run(self) -> Frame {
        let image = render(&self.snapshot, &self.settings, &self.palette);
        Frame {
            image,
            progress: self.progress,
            status: self.status,
            sequence: self.sequence,
        }
    }
}

/// A finished image, ready for display.
#[derive(Clone, Debug)]
pub struct Frame {
    /// `width × visible rows` pixels.
    pub image: RgbImage,
    /// Fraction of the field known when the snapshot was taken.
    pub progress: f64,
    /// Status line for the host.
    pub status: String,
    /// The sequence number of the job that produced this frame.
    pub sequence: u64,
}
