// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Progress bookkeeping for one ingestion session: an append-only
//! log of progress entries, each with elapsed time and a linear
//! estimate of the time remaining.  Crossing a decile flags the entry
//! as a milestone and logs it.

use log::info;
use std::time::{Duration, Instant, SystemTime};

/// One observation of how far along we are.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEntry {
    /// Wall-clock time of the observation.
    pub timestamp: SystemTime,
    /// Fraction complete, in [0, 1].
    pub fraction: f64,
    /// Cells filled.
    pub pixels: usize,
    /// Time since the session started.
    pub elapsed: Duration,
    /// Linear extrapolation of the time left; `None` when nothing
    /// is known yet.
    pub remaining: Option<Duration>,
    /// Whether this entry crossed into a new decile.
    pub milestone: bool,
}

/// Answer to "how is it going?".
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    /// When the session started.
    pub started_at: SystemTime,
    /// Field width.
    pub width: usize,
    /// Field height.
    pub height: usize,
    /// Fraction complete at the last entry.
    pub progress: f64,
    /// Cells filled at the last entry.
    pub pixels: usize,
    /// Total cells in the field.
    pub total: usize,
    /// Time since the session started.
    pub elapsed: Duration,
    /// Estimated time left, if there's enough to go on.
    pub remaining: Option<Duration>,
    /// Cells per second so far.
    pub throughput: f64,
    /// Source lines rejected so far.
    pub skipped: u64,
}

/// Linear estimate of the time left: `elapsed / fraction * (1 - fraction)`.
pub fn estimate_remaining(elapsed: Duration, fraction: f64) -> Option<Duration> {
    if !(fraction > 0.0) {
        return None;
    }
    let fraction = fraction.min(1.0);
    Some(Duration::from_secs_f64(
        elapsed.as_secs_f64() / fraction * (1.0 - fraction),
    ))
}

#[derive(Debug)]
struct Started {
    instant: Instant,
    wall: SystemTime,
    width: usize,
    height: usize,
    total: usize,
}

/// Records progress for the current session.
#[derive(Debug, Default)]
pub struct SessionTracker {
    started: Option<Started>,
    entries: Vec<ProgressEntry>,
    last_decile: usize,
}

impl SessionTracker {
    /// A tracker with no session.
    pub fn new() -> SessionTracker {
        SessionTracker::default()
    }

    /// Starts a fresh session, discarding the previous log.
    pub fn start(&mut self, width: usize, height: usize, total: usize) {
        self.start_at(width, height, total, Instant::now());
    }

    /// [`SessionTracker::start`] with an explicit clock reading.
    pub fn start_at(&mut self, width: usize, height: usize, total: usize, now: Instant) {
        info!("session started: {}x{} ({} cells)", width, height, total);
        self.started = Some(Started {
            instant: now,
            wall: SystemTime::now(),
            width,
            height,
            total,
        });
        self.entries.clear();
        self.last_decile = 0;
    }

    /// Appends a progress entry.  Does nothing without a session.
    pub fn log_progress(&mut self, fraction: f64, pixels: usize) -> Option<&ProgressEntry> {
        self.log_progress_at(fraction, pixels, Instant::now())
    }

    /// [`SessionTracker::log_progress`] with an explicit clock reading.
    pub fn log_progress_at(
        &mut self,
        fraction: f64,
        pixels: usize,
        now: Instant,
    ) -> Option<&ProgressEntry> {
        let elapsed = match self.started {
            Some(ref started) => now.saturating_duration_since(started.instant),
            None => return None,
        };
        let remaining = estimate_remaining(elapsed, fraction);
        let decile = ((fraction * 10.0).floor().max(0.0) as usize).min(10);
        let milestone = decile > self.last_decile;
        if milestone {
            self.last_decile = decile;
            info!(
                "{}% complete: {} cells in {:.1}s",
                decile * 10,
                pixels,
                elapsed.as_secs_f64()
            );
        }
        self.entries.push(ProgressEntry {
            timestamp: SystemTime::now(),
            fraction,
            pixels,
            elapsed,
            remaining,
            milestone,
        });
        self.entries.last()
    }

    /// Every entry logged this session, oldest first.
    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }

    /// Only the milestone entries.
    pub fn milestones(&self) -> impl Iterator<Item = &ProgressEntry> {
        self.entries.iter().filter(|e| e.milestone)
    }

    /// Summarizes the session as of now.
    pub fn summary(&self) -> Option<SessionSummary> {
        self.summary_at(Instant::now())
    }

    /// [`SessionTracker::summary`] with an explicit clock reading.
    pub fn summary_at(&self, now: Instant) -> Option<SessionSummary> {
        let started = self.started.as_ref()?;
        let elapsed = now.saturating_duration_since(started.instant);
        let (progress, pixels) = self
            .entries
            .last()
            .map(|e| (e.fraction, e.pixels))
            .unwrap_or((0.0, 0));
        let secs = elapsed.as_secs_f64();
        Some(SessionSummary {
            started_at: started.wall,
            width: started.width,
            height: started.height,
            progress,
            pixels,
            total: started.total,
            elapsed,
            remaining: estimate_remaining(elapsed, progress),
            throughput: if secs > 0.0 { pixels as f64 / secs } else { 0.0 },
            skipped: 0,
        })
    }
}
