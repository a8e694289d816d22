// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Colour lookup tables.  Each palette is an analytic curve sampled
//! at `size` evenly spaced points between 0 and 1.

use crate::error::ConfigError;
use num::clamp;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default number of entries in a lookup table.
pub const DEFAULT_PALETTE_SIZE: usize = 1024;

/// The closed set of palettes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PaletteId {
    /// Perceptually even blue-green-yellow.
    Viridis,
    /// Phase-shifted sine waves through purple and orange.
    Plasma,
    /// Deep blue into warm pink.
    Cosmic,
    /// Black through red and yellow to white.
    Fire,
    /// Black to white.
    Grayscale,
}

impl PaletteId {
    /// Every palette, in menu order.
    pub const ALL: [PaletteId; 5] = [
        PaletteId::Viridis,
        PaletteId::Plasma,
        PaletteId::Cosmic,
        PaletteId::Fire,
        PaletteId::Grayscale,
    ];

    /// The palette's name as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            PaletteId::Viridis => "viridis",
            PaletteId::Plasma => "plasma",
            PaletteId::Cosmic => "cosmic",
            PaletteId::Fire => "fire",
            PaletteId::Grayscale => "grayscale",
        }
    }

    // Returns unscaled (r, g, b) for a position t in [0, 1].
    fn curve(self, t: f64) -> (f64, f64, f64) {
        match self {
            PaletteId::Viridis => (
                0.267 + 0.973 * t - 0.686 * t * t,
                0.005 + 1.420 * t - 0.680 * t * t,
                0.329 + 0.725 * t - 0.520 * t * t,
            ),
            PaletteId::Plasma => (
                0.05 + 0.5 * (2.0 * PI * t + 0.5).sin(),
                0.3 + 0.7 * (2.0 * PI * t + 1.5).sin(),
                0.8 + 0.2 * (2.0 * PI * t + 2.5).sin(),
            ),
            PaletteId::Cosmic => (
                0.1 + 0.9 * t * t,
                0.2 + 0.8 * (PI * t).sin(),
                0.9 - 0.5 * t,
            ),
            PaletteId::Fire => (
                (4.0 * t).min(1.0),
                (4.0 * t - 1.0).max(0.0),
                (4.0 * t - 3.0).max(0.0),
            ),
            PaletteId::Grayscale => (t, t, t),
        }
    }
}

impl Default for PaletteId {
    fn default() -> Self {
        PaletteId::Viridis
    }
}

impl fmt::Display for PaletteId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaletteId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaletteId::ALL
            .iter()
            .cloned()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownPalette(s.to_string()))
    }
}

fn channel(v: f64) -> u8 {
    clamp(255.0 * v, 0.0, 255.0) as u8
}

/// An immutable table of RGB triples.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    id: PaletteId,
    colors: Vec<[u8; 3]>,
}

impl Palette {
    /// Samples the palette's curve into a table of `size` entries.
    /// Tables smaller than two entries are grown to two.
    pub fn generate(id: PaletteId, size: usize) -> Palette {
        let size = size.max(2);
        let last = (size - 1) as f64;
        let colors = (0..size)
            .map(|i| {
                let (r, g, b) = id.curve(i as f64 / last);
                [channel(r), channel(g), channel(b)]
            })
            .collect();
        Palette { id, colors }
    }

    /// Which palette this is.
    pub fn id(&self) -> PaletteId {
        self.id
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Never true; tables always have at least two entries.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The table index for a value: `round(clip(v, 0, 1) * (N - 1))`.
    /// NaN maps to zero.
    #[inline]
    pub fn index_of(&self, value: f32) -> usize {
        if value.is_nan() {
            return 0;
        }
        let v = clamp(value, 0.0, 1.0);
        (v * (self.colors.len() - 1) as f32).round() as usize
    }

    /// The colour for a value.
    #[inline]
    pub fn lookup(&self, value: f32) -> [u8; 3] {
        self.colors[self.index_of(value)]
    }

    /// The colour at a table index.
    pub fn color(&self, index: usize) -> [u8; 3] {
        self.colors[index]
    }
}

/// Palettes generated so far, keyed by palette and table size.
/// Owned by a session and dropped with it.
#[derive(Debug, Default)]
pub struct PaletteCache {
    tables: HashMap<(PaletteId, usize), Arc<Palette>>,
}

impl PaletteCache {
    /// An empty cache.
    pub fn new() -> PaletteCache {
        PaletteCache::default()
    }

    /// Returns the table, generating it on first use.
    pub fn get(&mut self, id: PaletteId, size: usize) -> Arc<Palette> {
        self.tables
            .entry((id, size))
            .or_insert_with(|| Arc::new(Palette::generate(id, size)))
            .clone()
    }

    /// Number of tables generated so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True before anything has been generated.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
