// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types.  Only `ConfigError` ever reaches a caller; the other
//! two are handled inside the polling and rendering paths, which
//! log them and carry on.

use failure::Fail;
use std::io;

/// A setting, a dimension, or a source declaration that falls
/// outside its documented bounds.  The previous valid configuration
/// stays in effect whenever one of these is returned.
#[derive(Debug, Fail, PartialEq)]
pub enum ConfigError {
    /// Width or height is zero or larger than the hard cap.
    #[fail(display = "dimensions {}x{} must be between 1 and {} per side", width, height, max)]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
        /// The cap on either side.
        max: usize,
    },

    /// A scalar knob was given a value outside its range.
    #[fail(display = "{} = {} is out of range ({})", knob, value, range)]
    KnobOutOfRange {
        /// The knob's name.
        knob: &'static str,
        /// The rejected value.
        value: f64,
        /// Human-readable description of the accepted range.
        range: String,
    },

    /// No knob by that name.
    #[fail(display = "unknown setting '{}'", _0)]
    UnknownKnob(String),

    /// No theme by that name.
    #[fail(display = "unknown theme '{}'", _0)]
    UnknownTheme(String),

    /// No palette by that name.
    #[fail(display = "unknown palette '{}'", _0)]
    UnknownPalette(String),

    /// The declared maximum sample value must be at least one.
    #[fail(display = "declared sample maximum must be at least 1, got {}", _0)]
    InvalidSampleRange(u32),
}

/// Transient trouble reading the data source.  Always retried on the
/// next poll.
#[derive(Debug, Fail)]
pub enum StreamError {
    /// The underlying read failed; the cursor was not advanced.
    #[fail(display = "read failed: {}", _0)]
    Io(#[cause] io::Error),

    /// The source is now shorter than what we already consumed,
    /// which means somebody truncated or replaced it.
    #[fail(display = "source shrank to {} bytes, cursor is at {}", len, cursor)]
    Truncated {
        /// Current length of the source.
        len: u64,
        /// Bytes already consumed.
        cursor: u64,
    },
}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        StreamError::Io(err)
    }
}

/// A numeric stage that could not produce a usable field.  Callers
/// degrade to passing their input through untouched.
#[derive(Debug, Fail, PartialEq)]
pub enum TransformError {
    /// Nothing to transform.
    #[fail(display = "field is empty")]
    EmptyField,

    /// The stage produced NaN or infinity somewhere.
    #[fail(display = "stage '{}' produced a non-finite value", _0)]
    NonFinite(&'static str),

    /// One of the row workers panicked.
    #[fail(display = "a filter worker panicked")]
    WorkerPanicked,
}
