#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Streaming fractal-field renderer
//!
//! Some external process computes a fractal one value at a time and
//! appends each value, as a decimal integer on its own line, to a
//! text file.  We follow that file as it grows, fold each value into
//! a row-major scalar field, and re-render the rows we know about
//! every so often.  A partly-computed fractal is something to look
//! at while the rest of it arrives.
//!
//! Rendering is a pipeline of pure functions over the field: a
//! *theme* (a fixed recipe of blurs, edge detection and tone curves),
//! a scalar enhancement stage, a palette lookup, and a colour
//! enhancement stage.  The same snapshot and settings always produce
//! the same pixels.
//!
//! The `Orchestrator` owns the mutable state and decides when a
//! render is due; `Orchestrator::run` polls on one thread and renders
//! on another, so neither waits on the other.

extern crate crossbeam;
extern crate failure;
extern crate image;
extern crate itertools;
extern crate log;
extern crate num;
extern crate num_cpus;

pub mod colormap;
pub mod enhance;
pub mod error;
pub mod field;
pub mod filters;
pub mod orchestrator;
pub mod palette;
pub mod render;
pub mod session;
pub mod settings;
pub mod stream;
pub mod theme;

pub use error::{ConfigError, StreamError, TransformError};
pub use field::{Dimensions, Field, FieldBuffer};
pub use orchestrator::{Command, Controller, LoopOptions, Orchestrator, State, StopSignal};
pub use palette::{Palette, PaletteCache, PaletteId};
pub use render::{render, Frame, RenderJob};
pub use session::{SessionSummary, SessionTracker};
pub use settings::{Knob, RenderSettings};
pub use stream::{SampleRange, StreamReader};
pub use theme::Theme;
