// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The two enhancement stages.  The first works on the scalar field
//! after the theme; the second on the RGB image after colour mapping.
//! Neither mutates its input, and neither ever fails outward: on
//! trouble, each returns what it was given.

use crate::error::TransformError;
use crate::field::Field;
use crate::filters::gaussian_blur;
use crate::settings::RenderSettings;
use crate::theme::{Theme, SMOOTHING_SCALE};
use image::{imageops, RgbImage};
use log::debug;
use num::clamp;
use std::panic;

/// Blur radius of the unsharp mask used for focus.
const FOCUS_SIGMA: f64 = 1.0;

/// Blur radius of the degenerate image used for colour sharpening.
const SHARPEN_SIGMA: f32 = 1.0;

/// Rec. 601 luma weights.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// Smoothing, contrast, exposure and focus on the scalar field, each
/// skipped when its knob is neutral and each clipped to [0, 1].
pub fn try_enhance_field(
    field: &Field,
    theme: Theme,
    settings: &RenderSettings,
) -> Result<Field, TransformError> {
    if field.is_empty() {
        return Err(TransformError::EmptyField);
    }

    let mut out = field.clone();
    if !theme.consumes_smoothness() && settings.smoothness > 1.0 {
        out = gaussian_blur(&out, (settings.smoothness - 1.0) * SMOOTHING_SCALE)?;
    }

    if settings.contrast != 1.0 {
        let contrast = settings.contrast as f32;
        out = out.map(|v| 0.5 + (v - 0.5) * contrast).clip();
    }

    if settings.exposure != 1.0 {
        let exposure = settings.exposure as f32;
        out = out.map(|v| v * exposure).clip();
    }

    if settings.focus > 0.0 {
        let k = settings.focus as f32;
        let soft = gaussian_blur(&out, FOCUS_SIGMA)?;
        out = out.zip_with(&soft, |v, s| v + k * (v - s)).clip();
    }

    if !out.all_finite() {
        return Err(TransformError::NonFinite("enhance"));
    }
    Ok(out.clip())
}

/// The scalar stage, passing the field through if it fails.
pub fn enhance_field(field: &Field, theme: Theme, settings: &RenderSettings) -> Field {
    match try_enhance_field(field, theme, settings) {
        Ok(out) => out,
        Err(err) => {
            debug!("field enhancement skipped: {}", err);
            field.clone()
        }
    }
}

fn saturate(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b] = pixel.0;
        let luma = LUMA[0] * r as f32 + LUMA[1] * g as f32 + LUMA[2] * b as f32;
        for channel in pixel.0.iter_mut() {
            let c = luma + factor * (*channel as f32 - luma);
            *channel = clamp(c, 0.0, 255.0).round() as u8;
        }
    }
    out
}

fn sharpen(image: &RgbImage, factor: f32) -> Result<RgbImage, TransformError> {
    let soft = panic::catch_unwind(|| imageops::blur(image, SHARPEN_SIGMA))
        .map_err(|_| TransformError::WorkerPanicked)?;
    let mut out = image.clone();
    for (pixel, soft) in out.pixels_mut().zip(soft.pixels()) {
        for (channel, &s) in pixel.0.iter_mut().zip(soft.0.iter()) {
            let s = s as f32;
            let c = s + factor * (*channel as f32 - s);
            *channel = clamp(c, 0.0, 255.0).round() as u8;
        }
    }
    Ok(out)
}

/// Saturation then sharpening on the colour image.  Both are exact
/// no-ops when their knob is 1.
pub fn try_enhance_image(
    image: &RgbImage,
    settings: &RenderSettings,
) -> Result<RgbImage, TransformError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(TransformError::EmptyField);
    }
    let mut out = image.clone();
    if settings.saturation != 1.0 {
        out = saturate(&out, settings.saturation as f32);
    }
    // Too small to have a meaningful neighbourhood.
    if settings.sharpness != 1.0 && image.width() >= 3 && image.height() >= 3 {
        out = sharpen(&out, settings.sharpness as f32)?;
    }
    Ok(out)
}

/// The colour stage, passing the image through if it fails.
pub fn enhance_image(image: &RgbImage, settings: &RenderSettings) -> RgbImage {
    match try_enhance_image(image, settings) {
        Ok(out) => out,
        Err(err) => {
            debug!("image enhancement skipped: {}", err);
            image.clone()
        }
    }
}
