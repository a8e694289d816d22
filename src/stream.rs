// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reads newline-delimited integers from a file that some other
//! process is still appending to.
//!
//! The reader keeps a byte cursor and only ever looks at what lies
//! past it.  A line is consumed only once its terminating newline has
//! arrived; a half-written line at the end of the file is left where
//! it is and picked up again on the next poll.  Lines that don't
//! parse, or parse to a value outside the declared range, are
//! consumed and counted but otherwise ignored.

use crate::error::{ConfigError, StreamError};
use log::{debug, trace};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// The most we read in one poll.  Keeps each poll bounded no matter
/// how far behind we are.
pub const READ_CHUNK: usize = 64 * 1024;

/// Byte offset into the source up to which everything has been
/// consumed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamCursor(pub u64);

/// A raw integer read from the source.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sample(pub u32);

/// The declared inclusive range of raw sample values, `0..=max`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SampleRange {
    max: u32,
}

impl SampleRange {
    /// A range topping out at `max`, which must be at least 1.
    pub fn new(max: u32) -> Result<SampleRange, ConfigError> {
        if max == 0 {
            return Err(ConfigError::InvalidSampleRange(max));
        }
        Ok(SampleRange { max })
    }

    /// The declared maximum.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Whether a raw value falls inside the range.
    pub fn contains(&self, raw: u32) -> bool {
        raw <= self.max
    }

    /// Scales a sample into [0, 1].
    pub fn normalize(&self, sample: Sample) -> f32 {
        sample.0 as f32 / self.max as f32
    }
}

impl Default for SampleRange {
    fn default() -> Self {
        SampleRange { max: 255 }
    }
}

/// What one read pass produced.
#[derive(Debug, Default, PartialEq)]
pub struct Poll {
    /// Valid samples, in source order.
    pub samples: Vec<Sample>,
    /// Lines consumed but rejected.
    pub skipped: usize,
    /// Where the next read should start.
    pub cursor: StreamCursor,
    /// The read ended inside an over-long line; the next read must
    /// throw bytes away through its newline.
    pub discarding: bool,
}

enum Line {
    Blank,
    Rejected,
    Valid(Sample),
}

fn classify(line: &[u8], range: SampleRange) -> Line {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(_) => return Line::Rejected,
    };
    if text.is_empty() {
        return Line::Blank;
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Line::Rejected;
    }
    match text.parse::<u32>() {
        Ok(raw) if range.contains(raw) => Line::Valid(Sample(raw)),
        _ => Line::Rejected,
    }
}

/// Reads whatever complete lines have been appended to `source` past
/// `cursor`.  On error the cursor in hand stays valid; nothing was
/// consumed.
///
/// A line longer than `READ_CHUNK` is rejected once, and the rest of
/// it is dropped unread: pass the previous poll's `discarding` back in
/// so the next read skips through the newline that ends it.
pub fn read_appended<R: Read + Seek>(
    source: &mut R,
    cursor: StreamCursor,
    range: SampleRange,
    discarding: bool,
) -> Result<Poll, StreamError> {
    let len = source.seek(SeekFrom::End(0))?;
    if len < cursor.0 {
        return Err(StreamError::Truncated {
            len,
            cursor: cursor.0,
        });
    }
    if len == cursor.0 {
        return Ok(Poll {
            cursor,
            discarding,
            ..Poll::default()
        });
    }

    source.seek(SeekFrom::Start(cursor.0))?;
    let available = (len - cursor.0).min(READ_CHUNK as u64);
    let mut chunk = Vec::with_capacity(available as usize);
    source.by_ref().take(READ_CHUNK as u64).read_to_end(&mut chunk)?;

    let start = if discarding {
        match chunk.iter().position(|&b| b == b'\n') {
            Some(newline) => newline + 1,
            None => {
                trace!("dropped {} more bytes of an over-long line", chunk.len());
                return Ok(Poll {
                    cursor: StreamCursor(cursor.0 + chunk.len() as u64),
                    discarding: true,
                    ..Poll::default()
                });
            }
        }
    } else {
        0
    };

    let mut skipped = 0;
    let mut samples = Vec::new();
    let end = match chunk[start..].iter().rposition(|&b| b == b'\n') {
        Some(newline) => start + newline + 1,
        // A whole chunk without a newline can't be a sample.  Count it
        // once and drop the rest of the line as it arrives.
        None if start == 0 && chunk.len() == READ_CHUNK => {
            debug!("discarding a line longer than {} bytes", READ_CHUNK);
            return Ok(Poll {
                samples,
                skipped: 1,
                cursor: StreamCursor(cursor.0 + chunk.len() as u64),
                discarding: true,
            });
        }
        None => start,
    };

    if end > start {
        for line in chunk[start..end].split(|&b| b == b'\n') {
            match classify(line, range) {
                Line::Valid(sample) => samples.push(sample),
                Line::Rejected => skipped += 1,
                Line::Blank => {}
            }
        }
    }

    trace!(
        "consumed {} bytes: {} samples, {} skipped",
        end,
        samples.len(),
        skipped
    );
    Ok(Poll {
        samples,
        skipped,
        cursor: StreamCursor(cursor.0 + end as u64),
        discarding: false,
    })
}

/// A cursor bound to a path on disk.  The file is opened lazily and
/// held between polls; it need not exist yet.
#[derive(Debug)]
pub struct StreamReader {
    path: PathBuf,
    range: SampleRange,
    cursor: StreamCursor,
    file: Option<File>,
    skipped: u64,
    discarding: bool,
}

impl StreamReader {
    /// A reader positioned at the start of `path`.
    pub fn new<P: AsRef<Path>>(path: P, range: SampleRange) -> StreamReader {
        StreamReader {
            path: path.as_ref().to_path_buf(),
            range,
            cursor: StreamCursor::default(),
            file: None,
            skipped: 0,
            discarding: false,
        }
    }

    /// The path being followed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The declared sample range.
    pub fn range(&self) -> SampleRange {
        self.range
    }

    /// How far into the source we've read.
    pub fn cursor(&self) -> StreamCursor {
        self.cursor
    }

    /// Lines rejected since the last rewind.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// True while a file handle is held.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Reads newly appended samples.  A missing source is not an
    /// error; it just hasn't been written yet.
    pub fn poll(&mut self) -> Result<Vec<Sample>, StreamError> {
        if self.file.is_none() {
            match File::open(&self.path) {
                Ok(file) => {
                    debug!("opened {}", self.path.display());
                    self.file = Some(file);
                }
                Err(ref err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            }
        }

        let result = match self.file.as_mut() {
            Some(file) => read_appended(file, self.cursor, self.range, self.discarding),
            None => return Ok(Vec::new()),
        };
        match result {
            Ok(poll) => {
                self.cursor = poll.cursor;
                self.discarding = poll.discarding;
                self.skipped += poll.skipped as u64;
                Ok(poll.samples)
            }
            Err(err) => {
                // Reopen on the next attempt in case the file was replaced.
                self.file = None;
                Err(err)
            }
        }
    }

    /// Goes back to the start of the source.
    pub fn rewind(&mut self) {
        self.cursor = StreamCursor::default();
        self.skipped = 0;
        self.discarding = false;
        self.file = None;
    }

    /// Drops the file handle.  The next poll reopens it.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            debug!("closed {}", self.path.display());
        }
    }
}
