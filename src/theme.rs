// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Themes are fixed recipes that reshape the scalar field before it
//! is coloured.  Each one is a pure function of the field and the
//! settings: same input, same bits out.
//!
//! If a recipe can't produce a usable field (the field is empty, or
//! something came out NaN) the theme is skipped and the field passed
//! along untouched.

use crate::error::{ConfigError, TransformError};
use crate::field::Field;
use crate::filters::{gaussian_blur, laplacian, local_rank, maximum_filter, sobel_magnitude};
use crate::settings::RenderSettings;
use log::debug;
use std::fmt;
use std::str::FromStr;

/// How far past 1.0 the smoothness knob must go per unit of sigma.
pub const SMOOTHING_SCALE: f64 = 0.5;

/// The closed set of themes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Theme {
    /// Gamma, plus a blur once smoothness exceeds 1.
    Classic,
    /// Heavy blur blended back with the original.
    Smooth,
    /// Edge emphasis and local contrast.
    Dramatic,
    /// A blend of three blur scales.
    Organic,
    /// Laplacian and unsharp sharpening.
    Crystalline,
    /// Soft blur with a local-maximum glow.
    Ethereal,
}

impl Theme {
    /// Every theme, in menu order.
    pub const ALL: [Theme; 6] = [
        Theme::Classic,
        Theme::Smooth,
        Theme::Dramatic,
        Theme::Organic,
        Theme::Crystalline,
        Theme::Ethereal,
    ];

    /// The theme's name as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Theme::Classic => "classic",
            Theme::Smooth => "smooth",
            Theme::Dramatic => "dramatic",
            Theme::Organic => "organic",
            Theme::Crystalline => "crystalline",
            Theme::Ethereal => "ethereal",
        }
    }

    /// Whether the theme applies the smoothness knob itself.  The
    /// post stage only blurs for themes that don't.
    pub fn consumes_smoothness(self) -> bool {
        match self {
            Theme::Classic | Theme::Smooth => true,
            _ => false,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Classic
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .iter()
            .cloned()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownTheme(s.to_string()))
    }
}

/// Runs a theme, reporting why if it couldn't.
pub fn try_apply(
    field: &Field,
    theme: Theme,
    settings: &RenderSettings,
) -> Result<Field, TransformError> {
    if field.is_empty() {
        return Err(TransformError::EmptyField);
    }

    let out = match theme {
        Theme::Classic => {
            let corrected = field.powf(settings.gamma as f32);
            if settings.smoothness > 1.0 {
                gaussian_blur(&corrected, (settings.smoothness - 1.0) * SMOOTHING_SCALE)?
            } else {
                corrected
            }
        }

        Theme::Smooth => {
            let blurred = gaussian_blur(field, settings.smoothness)?;
            blurred
                .zip_with(field, |b, v| 0.7 * b + 0.3 * v)
                .powf(0.9)
        }

        Theme::Dramatic => {
            let weight = settings.edge_weight as f32;
            let edges = sobel_magnitude(field)?;
            let lifted = field.zip_with(&edges, |v, e| v + weight * e).powf(0.6);
            let rank = local_rank(&lifted)?;
            lifted.zip_with(&rank, |v, r| 0.75 * v + 0.25 * r).clip()
        }

        Theme::Organic => {
            let fine = gaussian_blur(field, 0.5)?;
            let coarse = gaussian_blur(field, 2.0)?;
            fine.zip_with(&coarse, |f, c| 0.5 * f + 0.3 * c)
                .zip_with(field, |b, v| b + 0.2 * v)
                .powf(0.85)
        }

        Theme::Crystalline => {
            let lap = laplacian(field)?;
            let blurred = gaussian_blur(field, 1.0)?;
            field
                .zip_with(&lap, |v, l| v - 0.2 * l)
                .zip_with(&field.zip_with(&blurred, |v, b| v - b), |s, d| s + 0.5 * d)
                .clip()
                .powf(0.7)
        }

        Theme::Ethereal => {
            let blurred = gaussian_blur(field, 1.5)?;
            let base = blurred.zip_with(field, |b, v| 0.8 * b + 0.2 * v);
            let glow = maximum_filter(&base)?;
            base.zip_with(&glow, |b, g| b + 0.1 * g).clip().powf(1.1)
        }
    };

    if !out.all_finite() {
        return Err(TransformError::NonFinite(theme.name()));
    }
    Ok(out)
}

/// Runs a theme, handing back a copy of the input if it fails.
pub fn apply(field: &Field, theme: Theme, settings: &RenderSettings) -> Field {
    match try_apply(field, theme, settings) {
        Ok(out) => out,
        Err(err) => {
            debug!("{} theme skipped: {}", theme, err);
            field.clone()
        }
    }
}
