// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Render settings: which theme, which palette, and the scalar knobs
//! that tune the enhancement stages.  Every knob has a documented
//! range; values outside it are refused and the previous value kept.

use crate::error::ConfigError;
use crate::palette::PaletteId;
use crate::theme::Theme;
use std::fmt;
use std::str::FromStr;

/// The scalar knobs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Knob {
    /// Blur strength, shared by the themes that smooth and the post stage.
    Smoothness,
    /// Linear contrast about mid-grey.
    Contrast,
    /// Colour saturation after palette mapping; 1 is neutral.
    Saturation,
    /// Multiplier on the scalar field; 1 is neutral.
    Exposure,
    /// Unsharp-mask strength on the scalar field; 0 is neutral.
    Focus,
    /// Exponent for the `classic` theme.
    Gamma,
    /// Weight of the edge term in the `dramatic` theme.
    EdgeWeight,
    /// Sharpening of the colour image; 1 is neutral.
    Sharpness,
}

impl Knob {
    /// Every knob.
    pub const ALL: [Knob; 8] = [
        Knob::Smoothness,
        Knob::Contrast,
        Knob::Saturation,
        Knob::Exposure,
        Knob::Focus,
        Knob::Gamma,
        Knob::EdgeWeight,
        Knob::Sharpness,
    ];

    /// The knob's name on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Knob::Smoothness => "smoothness",
            Knob::Contrast => "contrast",
            Knob::Saturation => "saturation",
            Knob::Exposure => "exposure",
            Knob::Focus => "focus",
            Knob::Gamma => "gamma",
            Knob::EdgeWeight => "edge-weight",
            Knob::Sharpness => "sharpness",
        }
    }

    /// One line of help text.
    pub fn help(self) -> &'static str {
        match self {
            Knob::Smoothness => "Blur strength",
            Knob::Contrast => "Contrast about mid-grey",
            Knob::Saturation => "Colour saturation (1 = unchanged)",
            Knob::Exposure => "Brightness multiplier (1 = unchanged)",
            Knob::Focus => "Unsharp mask strength (0 = off)",
            Knob::Gamma => "Gamma exponent for the classic theme",
            Knob::EdgeWeight => "Edge emphasis for the dramatic theme",
            Knob::Sharpness => "Colour image sharpening (1 = unchanged)",
        }
    }

    // (lower bound, lower bound excluded, upper bound)
    fn bounds(self) -> (f64, bool, f64) {
        match self {
            Knob::Smoothness => (0.0, false, 10.0),
            Knob::Contrast => (0.0, true, 5.0),
            Knob::Saturation => (0.0, false, 5.0),
            Knob::Exposure => (0.0, true, 5.0),
            Knob::Focus => (0.0, false, 5.0),
            Knob::Gamma => (0.0, true, 5.0),
            Knob::EdgeWeight => (0.0, false, 5.0),
            Knob::Sharpness => (0.0, false, 10.0),
        }
    }

    /// The knob's default value.
    pub fn default_value(self) -> f64 {
        match self {
            Knob::Focus => 0.0,
            Knob::EdgeWeight => 0.3,
            _ => 1.0,
        }
    }

    /// The accepted range in interval notation.
    pub fn range(self) -> String {
        let (low, open, high) = self.bounds();
        format!("{}{}, {}]", if open { "(" } else { "[" }, low, high)
    }

    /// Returns `value` if it's acceptable for this knob.
    pub fn check(self, value: f64) -> Result<f64, ConfigError> {
        let (low, open, high) = self.bounds();
        let above_low = if open { value > low } else { value >= low };
        if above_low && value <= high {
            Ok(value)
        } else {
            Err(ConfigError::KnobOutOfRange {
                knob: self.name(),
                value,
                range: self.range(),
            })
        }
    }
}

impl fmt::Display for Knob {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Knob {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "-");
        Knob::ALL
            .iter()
            .cloned()
            .find(|k| k.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ConfigError::UnknownKnob(s.to_string()))
    }
}

/// Everything that decides how the known part of the field is drawn.
/// Changing any of it re-renders; none of it touches the data.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderSettings {
    /// Scalar transform applied first.
    pub theme: Theme,
    /// Colour table.
    pub palette: PaletteId,
    /// See [`Knob::Smoothness`].
    pub smoothness: f64,
    /// See [`Knob::Contrast`].
    pub contrast: f64,
    /// See [`Knob::Saturation`].
    pub saturation: f64,
    /// See [`Knob::Exposure`].
    pub exposure: f64,
    /// See [`Knob::Focus`].
    pub focus: f64,
    /// See [`Knob::Gamma`].
    pub gamma: f64,
    /// See [`Knob::EdgeWeight`].
    pub edge_weight: f64,
    /// See [`Knob::Sharpness`].
    pub sharpness: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            theme: Theme::default(),
            palette: PaletteId::default(),
            smoothness: Knob::Smoothness.default_value(),
            contrast: Knob::Contrast.default_value(),
            saturation: Knob::Saturation.default_value(),
            exposure: Knob::Exposure.default_value(),
            focus: Knob::Focus.default_value(),
            gamma: Knob::Gamma.default_value(),
            edge_weight: Knob::EdgeWeight.default_value(),
            sharpness: Knob::Sharpness.default_value(),
        }
    }
}

impl RenderSettings {
    /// The current value of a knob.
    pub fn get(&self, knob: Knob) -> f64 {
        match knob {
            Knob::Smoothness => self.smoothness,
            Knob::Contrast => self.contrast,
            Knob::Saturation => self.saturation,
            Knob::Exposure => self.exposure,
            Knob::Focus => self.focus,
            Knob::Gamma => self.gamma,
            Knob::EdgeWeight => self.edge_weight,
            Knob::Sharpness => self.sharpness,
        }
    }

    /// Sets a knob.  On error nothing changes.
    pub fn set(&mut self, knob: Knob, value: f64) -> Result<(), ConfigError> {
        let value = knob.check(value)?;
        let slot = match knob {
            Knob::Smoothness => &mut self.smoothness,
            Knob::Contrast => &mut self.contrast,
            Knob::Saturation => &mut self.saturation,
            Knob::Exposure => &mut self.exposure,
            Knob::Focus => &mut self.focus,
            Knob::Gamma => &mut self.gamma,
            Knob::EdgeWeight => &mut self.edge_weight,
            Knob::Sharpness => &mut self.sharpness,
        };
        *slot = value;
        Ok(())
    }

    /// Builder form of [`RenderSettings::set`].
    pub fn with(mut self, knob: Knob, value: f64) -> Result<Self, ConfigError> {
        self.set(knob, value)?;
        Ok(self)
    }

    /// Checks every knob, since the fields are public.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for knob in Knob::ALL.iter() {
            knob.check(self.get(*knob))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.theme, Theme::Classic);
        assert_eq!(settings.palette, PaletteId::Viridis);
        assert_eq!(settings.edge_weight, 0.3);
    }

    #[test]
    fn open_lower_bounds_reject_zero() {
        assert!(Knob::Contrast.check(0.0).is_err());
        assert!(Knob::Gamma.check(0.0).is_err());
        assert!(Knob::Exposure.check(0.0).is_err());
        assert!(Knob::Focus.check(0.0).is_ok());
        assert!(Knob::Smoothness.check(0.0).is_ok());
    }

    #[test]
    fn nan_is_never_accepted() {
        for knob in Knob::ALL.iter() {
            assert!(knob.check(std::f64::NAN).is_err());
        }
    }

    #[test]
    fn failed_set_keeps_previous_value() {
        let mut settings = RenderSettings::default();
        settings.set(Knob::Contrast, 2.0).unwrap();
        let err = settings.set(Knob::Contrast, -1.0).unwrap_err();
        assert_eq!(settings.contrast, 2.0);
        assert_eq!(format!("{}", err), "contrast = -1 is out of range ((0, 5])");
    }

    #[test]
    fn validate_catches_direct_field_writes() {
        let mut settings = RenderSettings::default();
        settings.gamma = 12.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn knob_names_parse() {
        assert_eq!("edge_weight".parse::<Knob>().unwrap(), Knob::EdgeWeight);
        assert_eq!("Sharpness".parse::<Knob>().unwrap(), Knob::Sharpness);
        assert!("brightness".parse::<Knob>().is_err());
        for knob in Knob::ALL.iter() {
            assert_eq!(knob.name().parse::<Knob>().unwrap(), *knob);
        }
    }
}
