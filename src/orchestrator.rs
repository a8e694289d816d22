// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The Orchestrator owns all mutable state (buffer, cursor, settings,
//! palette cache, progress log) and drives the loop: poll the source,
//! fold new samples into the buffer, and every so often hand out a
//! `RenderJob` holding a copy of the known rows.
//!
//! `run` is the two-activity version of that loop.  Polling happens
//! on the calling thread; jobs go over a channel to a scoped render
//! thread, which skips straight to the newest job if it falls behind,
//! so a slow render never delays the next poll.  Hosts talk to a
//! running loop through a `Controller`.

use crate::error::ConfigError;
use crate::field::{Dimensions, FieldBuffer};
use crate::palette::{PaletteCache, DEFAULT_PALETTE_SIZE};
use crate::render::{Frame, RenderJob};
use crate::session::{SessionSummary, SessionTracker};
use crate::settings::RenderSettings;
use crate::stream::{SampleRange, StreamCursor, StreamReader};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use image::RgbImage;
use log::{debug, error, info, trace, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Minimum spacing between renders.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);

/// How often the loop polls the source.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where the orchestrator is in a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// No source bound.
    Idle,
    /// Following a source; the field isn't full yet.
    Ingesting,
    /// Every cell is known.
    Complete,
}

/// Shared flag telling a running loop to wind down.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// A signal that hasn't been raised.
    pub fn new() -> StopSignal {
        StopSignal::default()
    }

    /// Asks the loop to stop.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether someone asked.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Requests a host can make of a running loop.
#[derive(Clone, Debug)]
pub enum Command {
    /// Follow a different source from its beginning.
    BindSource(PathBuf, SampleRange),
    /// Re-render with new settings.
    ChangeSettings(RenderSettings),
    /// Start over with a field of a different size.
    ResetDimensions(Dimensions),
    /// Start over from the beginning of the same source.
    Refresh,
}

/// The host's handle on a running loop.  Validation happens here, so
/// bad settings are refused to the caller's face rather than
/// somewhere inside the loop.
#[derive(Clone, Debug)]
pub struct Controller {
    commands: Sender<Command>,
    stop: StopSignal,
}

impl Controller {
    /// A controller plus the receiving end to give to `Orchestrator::run`.
    pub fn new(stop: StopSignal) -> (Controller, Receiver<Command>) {
        let (commands, receiver) = channel::unbounded();
        (Controller { commands, stop }, receiver)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("loop has exited; command dropped");
        }
    }

    /// Follow `path` from the start.
    pub fn bind_source<P: AsRef<Path>>(&self, path: P, range: SampleRange) {
        self.send(Command::BindSource(path.as_ref().to_path_buf(), range));
    }

    /// Re-render with `settings`, if they're valid.
    pub fn change_settings(&self, settings: RenderSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.send(Command::ChangeSettings(settings));
        Ok(())
    }

    /// Start over with a `width × height` field, if that's a legal size.
    pub fn reset_dimensions(&self, width: usize, height: usize) -> Result<(), ConfigError> {
        let dims = Dimensions::new(width, height)?;
        self.send(Command::ResetDimensions(dims));
        Ok(())
    }

    /// Start over from the beginning of the same source.
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    /// Asks the loop to stop.
    pub fn stop(&self) {
        self.stop.raise();
    }
}

/// Knobs for `Orchestrator::run`.
#[derive(Copy, Clone, Debug)]
pub struct LoopOptions {
    /// Time between polls.  Also the longest it takes to notice a stop.
    pub poll_interval: Duration,
    /// Return once the field is complete (after its final render).
    pub exit_on_complete: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        LoopOptions {
            poll_interval: DEFAULT_POLL_INTERVAL,
            exit_on_complete: false,
        }
    }
}

/// Drives ingestion and rendering for one field at a time.
#[derive(Debug)]
pub struct Orchestrator {
    state: State,
    buffer: FieldBuffer,
    reader: Option<StreamReader>,
    settings: RenderSettings,
    palettes: PaletteCache,
    tracker: SessionTracker,
    throttle: Duration,
    last_render: Option<Instant>,
    dirty: bool,
    source_failing: bool,
    sequence: u64,
}

impl Orchestrator {
    /// An idle orchestrator with an empty field.
    pub fn new(dims: Dimensions, settings: RenderSettings) -> Result<Orchestrator, ConfigError> {
        settings.validate()?;
        Ok(Orchestrator {
            state: State::Idle,
            buffer: FieldBuffer::new(dims),
            reader: None,
            settings,
            palettes: PaletteCache::new(),
            tracker: SessionTracker::new(),
            throttle: DEFAULT_THROTTLE,
            last_render: None,
            dirty: false,
            source_failing: false,
            sequence: 0,
        })
    }

    /// Sets the minimum spacing between renders.
    pub fn with_throttle(mut self, throttle: Duration) -> Orchestrator {
        self.throttle = throttle;
        self
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Settings in effect.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Field dimensions.
    pub fn dimensions(&self) -> Dimensions {
        self.buffer.dimensions()
    }

    /// Cells filled so far.
    pub fn filled(&self) -> usize {
        self.buffer.filled()
    }

    /// Rows with at least one known cell.
    pub fn visible_rows(&self) -> usize {
        self.buffer.visible_rows()
    }

    /// Fraction of the field known.
    pub fn progress(&self) -> f64 {
        self.buffer.progress()
    }

    /// Source lines rejected since the source was (re)bound.
    pub fn skipped(&self) -> u64 {
        self.reader.as_ref().map_or(0, StreamReader::skipped)
    }

    /// Read position in the bound source.
    pub fn cursor(&self) -> Option<StreamCursor> {
        self.reader.as_ref().map(StreamReader::cursor)
    }

    /// True while a file handle on the source is held.
    pub fn is_source_open(&self) -> bool {
        self.reader.as_ref().map_or(false, StreamReader::is_open)
    }

    /// The progress log for the current session.
    pub fn session(&self) -> &SessionTracker {
        &self.tracker
    }

    /// A human-readable status line.
    pub fn status(&self) -> String {
        let dims = self.buffer.dimensions();
        match self.state {
            State::Idle => "Idle".to_string(),
            State::Complete => "Complete".to_string(),
            State::Ingesting if self.buffer.filled() == 0 => "Waiting for data...".to_string(),
            State::Ingesting => format!(
                "Processing row {}/{}",
                self.buffer.filled() / dims.width + 1,
                dims.height
            ),
        }
    }

    /// Start time, progress, elapsed, estimate and throughput.
    pub fn summary(&self) -> Option<SessionSummary> {
        self.tracker.summary().map(|mut summary| {
            summary.skipped = self.skipped();
            summary
        })
    }

    // Buffer, cursor and progress log all go back to the start
    // together; nothing outside sees them half reset.
    fn restart(&mut self, dims: Option<Dimensions>) {
        match dims {
            Some(dims) => self.buffer.reset(dims),
            None => self.buffer.clear(),
        }
        let dims = self.buffer.dimensions();
        self.last_render = None;
        self.dirty = false;
        self.source_failing = false;
        match self.reader {
            Some(ref mut reader) => {
                reader.rewind();
                self.tracker.start(dims.width, dims.height, dims.len());
                self.state = State::Ingesting;
            }
            None => self.state = State::Idle,
        }
    }

    /// Follows a new source from its beginning.  The source need not
    /// exist yet.
    pub fn bind_source<P: AsRef<Path>>(&mut self, path: P, range: SampleRange) {
        info!("following {} (max {})", path.as_ref().display(), range.max());
        self.reader = Some(StreamReader::new(path, range));
        self.restart(None);
    }

    /// Starts over with a new field size.
    pub fn reset_dimensions(&mut self, width: usize, height: usize) -> Result<(), ConfigError> {
        let dims = Dimensions::new(width, height)?;
        self.resize(dims);
        Ok(())
    }

    fn resize(&mut self, dims: Dimensions) {
        info!("dimensions now {}x{}", dims.width, dims.height);
        self.restart(Some(dims));
    }

    /// Starts over from the beginning of the same source.
    pub fn refresh(&mut self) {
        info!("refreshing");
        self.restart(None);
    }

    /// Swaps in new settings and returns a job re-rendering what we
    /// already know.  On error the old settings stay.
    pub fn change_settings(&mut self, settings: RenderSettings) -> Result<RenderJob, ConfigError> {
        settings.validate()?;
        debug!("settings changed: {:?}", settings);
        self.settings = settings;
        Ok(self.render_job())
    }

    /// Copies out the known rows and wraps them up for rendering.
    pub fn render_job(&mut self) -> RenderJob {
        self.sequence += 1;
        RenderJob {
            snapshot: self.buffer.snapshot(),
            settings: self.settings,
            palette: self.palettes.get(self.settings.palette, DEFAULT_PALETTE_SIZE),
            progress: self.buffer.progress(),
            status: self.status(),
            sequence: self.sequence,
        }
    }

    /// Renders the known rows right now, for saving.
    pub fn export(&mut self) -> RgbImage {
        self.render_job().run().image
    }

    /// One poll.  See [`Orchestrator::tick_at`].
    pub fn tick(&mut self) -> Option<RenderJob> {
        self.tick_at(Instant::now())
    }

    /// Polls the source, ingests what arrived, and returns a job if a
    /// render is due.  A render is due when there's unrendered data
    /// and the throttle interval has passed, or unconditionally when
    /// this tick completed the field.
    pub fn tick_at(&mut self, now: Instant) -> Option<RenderJob> {
        if self.state != State::Ingesting {
            return None;
        }
        let (samples, range) = match self.reader {
            Some(ref mut reader) => match reader.poll() {
                Ok(samples) => {
                    if self.source_failing {
                        info!("{} readable again", reader.path().display());
                        self.source_failing = false;
                    }
                    (samples, reader.range())
                }
                Err(err) => {
                    // Once per outage; the loop retries every poll.
                    if self.source_failing {
                        debug!("{}: {}", reader.path().display(), err);
                    } else {
                        warn!("{}: {}", reader.path().display(), err);
                        self.source_failing = true;
                    }
                    (Vec::new(), reader.range())
                }
            },
            None => return None,
        };

        let accepted = self
            .buffer
            .ingest(samples.into_iter().map(|s| range.normalize(s)));
        if accepted > 0 {
            trace!("ingested {} ({}/{})", accepted, self.buffer.filled(), self.buffer.capacity());
            self.dirty = true;
        }

        if self.buffer.is_complete() {
            self.state = State::Complete;
            if let Some(ref mut reader) = self.reader {
                reader.close();
            }
            info!("field complete");
            return Some(self.emit(now));
        }

        if !self.dirty {
            return None;
        }
        let due = self
            .last_render
            .map_or(true, |last| now.saturating_duration_since(last) >= self.throttle);
        if due {
            Some(self.emit(now))
        } else {
            None
        }
    }

    fn emit(&mut self, now: Instant) -> RenderJob {
        self.last_render = Some(now);
        self.dirty = false;
        self.tracker
            .log_progress_at(self.buffer.progress(), self.buffer.filled(), now);
        self.render_job()
    }

    /// Applies a host command; returns a job if it calls for a render.
    pub fn apply(&mut self, command: Command) -> Option<RenderJob> {
        match command {
            Command::BindSource(path, range) => {
                self.bind_source(path, range);
                None
            }
            Command::ChangeSettings(settings) => match self.change_settings(settings) {
                Ok(job) => Some(job),
                Err(err) => {
                    warn!("ignoring settings: {}", err);
                    None
                }
            },
            Command::ResetDimensions(dims) => {
                self.resize(dims);
                None
            }
            Command::Refresh => {
                self.refresh();
                None
            }
        }
    }

    /// Drops the file handle on the source, if one is held.
    pub fn release(&mut self) {
        if let Some(ref mut reader) = self.reader {
            reader.close();
        }
    }

    /// Polls until `stop` is raised (or, with `exit_on_complete`,
    /// until the field is full), rendering on a second thread and
    /// passing each finished frame to `on_frame`.  Once the stop is
    /// seen, nothing more is polled or rendered and the source handle
    /// is released before returning.
    pub fn run<F>(
        &mut self,
        commands: &Receiver<Command>,
        stop: &StopSignal,
        options: LoopOptions,
        on_frame: F,
    ) where
        F: FnMut(Frame) + Send,
    {
        let (jobs, pending) = channel::unbounded::<RenderJob>();
        let render_stop = stop.clone();
        let mut on_frame = on_frame;

        let outcome = crossbeam::scope(|spawner| {
            spawner.spawn(move |_| {
                while let Ok(mut job) = pending.recv() {
                    while let Ok(newer) = pending.try_recv() {
                        job = newer;
                    }
                    if render_stop.is_raised() {
                        break;
                    }
                    on_frame(job.run());
                }
            });

            'poll: while !stop.is_raised() {
                if let Some(job) = self.tick() {
                    if jobs.send(job).is_err() {
                        break;
                    }
                }
                if options.exit_on_complete && self.state == State::Complete {
                    break;
                }

                match commands.recv_timeout(options.poll_interval) {
                    Ok(command) => {
                        if stop.is_raised() {
                            break 'poll;
                        }
                        if let Some(job) = self.apply(command) {
                            if jobs.send(job).is_err() {
                                break 'poll;
                            }
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => thread::sleep(options.poll_interval),
                }
            }
            drop(jobs);
        });

        if outcome.is_err() {
            error!("render thread panicked");
        }
        self.release();
        debug!("loop stopped: {}", self.status());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Knob;
    use crate::theme::Theme;
    use std::fs::{File, OpenOptions};
    use std::io::Write;
    use std::sync::Mutex;

    fn orchestrator(width: usize, height: usize) -> Orchestrator {
        Orchestrator::new(Dimensions::new(width, height).unwrap(), RenderSettings::default())
            .unwrap()
    }

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn starts_idle() {
        let mut orch = orchestrator(4, 4);
        assert_eq!(orch.state(), State::Idle);
        assert_eq!(orch.status(), "Idle");
        assert!(orch.tick().is_none());
        assert!(orch.summary().is_none());
    }

    #[test]
    fn missing_source_just_waits() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(2, 2);
        orch.bind_source(dir.path().join("later.txt"), SampleRange::default());
        assert_eq!(orch.state(), State::Ingesting);
        assert!(orch.tick().is_none());
        assert_eq!(orch.status(), "Waiting for data...");
    }

    #[test]
    fn skips_bad_lines_and_renders_the_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "10\n20\nabc\n300\n");

        let mut orch = orchestrator(2, 2);
        orch.bind_source(&path, SampleRange::default());
        let job = orch.tick().unwrap();
        assert_eq!(orch.filled(), 2);
        assert_eq!(orch.visible_rows(), 1);
        assert_eq!(orch.skipped(), 2);
        assert_eq!(job.snapshot.height(), 1);
        assert!((job.snapshot.get(0, 0) - 0.039).abs() < 1e-3);
        assert!((job.snapshot.get(0, 1) - 0.078).abs() < 1e-3);
        assert_eq!(job.status, "Processing row 2/2");
    }

    #[test]
    fn renders_are_throttled_but_never_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "1\n2\n");

        let mut orch = orchestrator(4, 4);
        orch.bind_source(&path, SampleRange::default());
        let t0 = Instant::now();
        assert!(orch.tick_at(t0).is_some());

        append(&path, "3\n");
        assert!(orch.tick_at(t0 + Duration::from_millis(10)).is_none());
        assert_eq!(orch.filled(), 3);

        // No new data, but the earlier arrival still needs drawing.
        let job = orch.tick_at(t0 + Duration::from_millis(150)).unwrap();
        assert_eq!(job.progress, 3.0 / 16.0);
        assert!(orch.tick_at(t0 + Duration::from_millis(300)).is_none());
    }

    #[test]
    fn completion_forces_a_final_render() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "0\n64\n");

        let mut orch = orchestrator(2, 2);
        orch.bind_source(&path, SampleRange::default());
        let t0 = Instant::now();
        assert!(orch.tick_at(t0).is_some());

        append(&path, "128\n255\n999\n");
        let job = orch.tick_at(t0 + Duration::from_millis(1)).unwrap();
        assert_eq!(orch.state(), State::Complete);
        assert_eq!(job.status, "Complete");
        assert_eq!(job.progress, 1.0);
        assert_eq!(job.snapshot.height(), 2);
        assert!(!orch.is_source_open());
        assert!(orch.tick_at(t0 + Duration::from_secs(1)).is_none());

        let milestones: Vec<f64> = orch.session().milestones().map(|e| e.fraction).collect();
        assert_eq!(milestones, vec![0.5, 1.0]);
    }

    #[test]
    fn changing_settings_leaves_data_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "5\n50\n100\n150\n200\n");

        let mut orch = orchestrator(3, 3);
        orch.bind_source(&path, SampleRange::default());
        let before = orch.tick().unwrap().snapshot;

        let mut settings = RenderSettings::default();
        settings.theme = Theme::Crystalline;
        let settings = settings.with(Knob::Contrast, 2.5).unwrap();
        let job = orch.change_settings(settings).unwrap();
        assert_eq!(job.snapshot, before);
        assert_eq!(job.settings.theme, Theme::Crystalline);
        assert_eq!(orch.filled(), 5);
        assert_eq!(orch.cursor(), Some(StreamCursor(17)));
    }

    #[test]
    fn invalid_settings_keep_the_old_ones() {
        let mut orch = orchestrator(3, 3);
        let mut bad = RenderSettings::default();
        bad.exposure = 0.0;
        assert!(orch.change_settings(bad).is_err());
        assert_eq!(orch.settings(), &RenderSettings::default());
    }

    #[test]
    fn reset_dimensions_starts_from_the_top() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "1\n2\n3\n4\n5\n6\n");

        let mut orch = orchestrator(2, 2);
        orch.bind_source(&path, SampleRange::default());
        orch.tick();
        assert_eq!(orch.state(), State::Complete);

        orch.reset_dimensions(3, 2).unwrap();
        assert_eq!(orch.filled(), 0);
        assert_eq!(orch.cursor(), Some(StreamCursor(0)));
        assert_eq!(orch.state(), State::Ingesting);

        orch.tick();
        assert_eq!(orch.filled(), 6);
        assert_eq!(orch.state(), State::Complete);
    }

    #[test]
    fn bad_dimensions_are_refused() {
        let mut orch = orchestrator(2, 2);
        assert!(orch.reset_dimensions(0, 5).is_err());
        assert!(orch.reset_dimensions(9000, 5).is_err());
        assert_eq!(orch.dimensions(), Dimensions::new(2, 2).unwrap());
    }

    #[test]
    fn reset_without_source_stays_idle() {
        let mut orch = orchestrator(2, 2);
        orch.reset_dimensions(5, 5).unwrap();
        assert_eq!(orch.state(), State::Idle);
        assert_eq!(orch.export().dimensions(), (5, 0));
    }

    #[test]
    fn truncated_source_is_retried_quietly_until_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "1\n2\n");

        let mut orch = orchestrator(4, 4);
        orch.bind_source(&path, SampleRange::default());
        orch.tick();
        assert_eq!(orch.filled(), 2);

        File::create(&path).unwrap();
        for _ in 0..3 {
            assert!(orch.tick().is_none());
            assert!(orch.source_failing);
        }
        assert_eq!(orch.state(), State::Ingesting);
        assert_eq!(orch.filled(), 2);

        orch.refresh();
        assert!(!orch.source_failing);
        append(&path, "5\n");
        orch.tick();
        assert!(!orch.source_failing);
        assert_eq!(orch.filled(), 1);
    }

    #[test]
    fn refresh_rereads_the_same_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "7\n8\n9\n");

        let mut orch = orchestrator(4, 4);
        orch.bind_source(&path, SampleRange::default());
        orch.tick();
        orch.refresh();
        assert_eq!(orch.filled(), 0);
        orch.tick();
        assert_eq!(orch.filled(), 3);
    }

    #[test]
    fn export_covers_the_known_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "1\n2\n3\n4\n5\n6\n");

        let mut orch = orchestrator(4, 4);
        orch.bind_source(&path, SampleRange::default());
        orch.tick();
        let a = orch.export();
        let b = orch.export();
        assert_eq!(a.dimensions(), (4, 2));
        assert_eq!(a.into_raw(), b.into_raw());
    }

    #[test]
    fn run_stops_before_polling_when_already_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "1\n2\n3\n4\n");

        let mut orch = orchestrator(2, 2);
        orch.bind_source(&path, SampleRange::default());
        let stop = StopSignal::new();
        stop.raise();
        let (_controller, commands) = Controller::new(stop.clone());
        let frames = Mutex::new(Vec::new());
        orch.run(&commands, &stop, LoopOptions::default(), |frame| {
            frames.lock().unwrap().push(frame.sequence)
        });
        assert_eq!(orch.filled(), 0);
        assert!(frames.lock().unwrap().is_empty());
    }

    #[test]
    fn run_delivers_the_final_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        let mut file = File::create(&path).unwrap();
        for i in 0..64 {
            writeln!(file, "{}", i * 4).unwrap();
        }
        drop(file);

        let mut orch = orchestrator(8, 8);
        orch.bind_source(&path, SampleRange::default());
        let stop = StopSignal::new();
        let (_controller, commands) = Controller::new(stop.clone());
        let frames = Mutex::new(Vec::new());
        let options = LoopOptions {
            poll_interval: Duration::from_millis(5),
            exit_on_complete: true,
        };
        orch.run(&commands, &stop, options, |frame| {
            frames.lock().unwrap().push(frame)
        });

        let frames = frames.into_inner().unwrap();
        let last = frames.last().unwrap();
        assert_eq!(last.progress, 1.0);
        assert_eq!(last.status, "Complete");
        assert_eq!(last.image.dimensions(), (8, 8));
        assert!(!orch.is_source_open());
    }

    #[test]
    fn stop_is_seen_within_a_poll_and_releases_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "1\n2\n");

        let mut orch = orchestrator(16, 16);
        orch.bind_source(&path, SampleRange::default());
        let stop = StopSignal::new();
        let (controller, commands) = Controller::new(stop.clone());

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            controller.stop();
        });
        let started = Instant::now();
        orch.run(&commands, &stop, LoopOptions {
            poll_interval: Duration::from_millis(10),
            exit_on_complete: false,
        }, |_| {});
        stopper.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(orch.filled(), 2);
        assert!(!orch.is_source_open());
    }

    #[test]
    fn controller_validates_before_sending() {
        let stop = StopSignal::new();
        let (controller, commands) = Controller::new(stop);
        let mut bad = RenderSettings::default();
        bad.gamma = -1.0;
        assert!(controller.change_settings(bad).is_err());
        assert!(controller.reset_dimensions(0, 0).is_err());
        assert!(commands.try_recv().is_err());

        controller.refresh();
        match commands.try_recv() {
            Ok(Command::Refresh) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn commands_reach_a_running_loop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.txt");
        append(&path, "1\n2\n3\n4\n5\n6\n7\n8\n9\n");

        let mut orch = orchestrator(2, 2);
        let stop = StopSignal::new();
        let (controller, commands) = Controller::new(stop.clone());
        controller.reset_dimensions(3, 3).unwrap();
        controller.bind_source(&path, SampleRange::default());

        orch.run(&commands, &stop, LoopOptions {
            poll_interval: Duration::from_millis(5),
            exit_on_complete: true,
        }, |_| {});
        assert_eq!(orch.dimensions(), Dimensions::new(3, 3).unwrap());
        assert_eq!(orch.filled(), 9);
    }
}
