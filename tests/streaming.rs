// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate fracstream;
extern crate rand;
extern crate tempfile;

use fracstream::{
    Controller, Dimensions, Knob, LoopOptions, Orchestrator, PaletteId, RenderSettings,
    SampleRange, State, StopSignal, Theme,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

fn append_lines(path: &Path, lines: &[String]) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
}

// Writes `count` samples in chunks, with the odd junk line ahead of a
// sample, the way a slow producer would.
fn producer(path: PathBuf, count: usize, seed: u64) -> thread::JoinHandle<usize> {
    thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut written = 0;
        let mut junk = 0;
        while written < count {
            let chunk = (rng.gen::<f32>() * 40.0) as usize + 1;
            let mut lines = Vec::new();
            for _ in 0..chunk.min(count - written) {
                if rng.gen::<f32>() < 0.05 {
                    lines.push("nan".to_string());
                    junk += 1;
                }
                lines.push(format!("{}", (rng.gen::<f32>() * 255.0) as u32));
                written += 1;
            }
            append_lines(&path, &lines);
            thread::sleep(Duration::from_millis(3));
        }
        junk
    })
}

#[test]
fn follows_a_growing_file_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pixels.txt");
    let dims = Dimensions::new(24, 16).unwrap();

    let mut orch = Orchestrator::new(dims, RenderSettings::default())
        .unwrap()
        .with_throttle(Duration::from_millis(10));
    orch.bind_source(&path, SampleRange::default());

    let writer = producer(path.clone(), dims.len(), 7);
    let stop = StopSignal::new();
    let (_controller, commands) = Controller::new(stop.clone());
    let frames = Mutex::new(Vec::new());
    orch.run(
        &commands,
        &stop,
        LoopOptions {
            poll_interval: Duration::from_millis(2),
            exit_on_complete: true,
        },
        |frame| frames.lock().unwrap().push(frame),
    );
    let junk = writer.join().unwrap();

    assert_eq!(orch.state(), State::Complete);
    assert_eq!(orch.filled(), dims.len());
    assert_eq!(orch.skipped(), junk as u64);
    assert!(!orch.is_source_open());

    let frames = frames.into_inner().unwrap();
    let last = frames.last().unwrap();
    assert_eq!(last.status, "Complete");
    assert_eq!(last.image.dimensions(), (24, 16));
    for pair in frames.windows(2) {
        assert!(pair[0].sequence < pair[1].sequence);
        assert!(pair[0].progress <= pair[1].progress);
        assert!(pair[0].image.height() <= pair[1].image.height());
    }
}

#[test]
fn settings_change_mid_stream_keeps_the_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pixels.txt");
    let lines: Vec<String> = (0..40).map(|i| (i * 5).to_string()).collect();
    append_lines(&path, &lines);

    let mut orch = Orchestrator::new(Dimensions::new(10, 10).unwrap(), RenderSettings::default())
        .unwrap();
    orch.bind_source(&path, SampleRange::default());
    let stop = StopSignal::new();
    let (controller, commands) = Controller::new(stop.clone());

    let mut settings = RenderSettings::default();
    settings.theme = Theme::Ethereal;
    settings.palette = PaletteId::Cosmic;
    let settings = settings.with(Knob::Gamma, 0.7).unwrap();

    let host = thread::spawn(move || {
        thread::sleep(Duration::from_millis(40));
        controller.change_settings(settings).unwrap();
        thread::sleep(Duration::from_millis(40));
        controller.stop();
    });
    let frames = Mutex::new(Vec::new());
    orch.run(
        &commands,
        &stop,
        LoopOptions {
            poll_interval: Duration::from_millis(5),
            exit_on_complete: false,
        },
        |frame| frames.lock().unwrap().push(frame),
    );
    host.join().unwrap();

    assert_eq!(orch.settings().theme, Theme::Ethereal);
    assert_eq!(orch.settings().palette, PaletteId::Cosmic);
    assert_eq!(orch.filled(), 40);
    assert_eq!(orch.state(), State::Ingesting);
    assert!(!orch.is_source_open());

    let frames = frames.into_inner().unwrap();
    assert!(!frames.is_empty());
    for frame in &frames {
        assert_eq!(frame.image.dimensions(), (10, 4));
    }
}

#[test]
fn export_is_repeatable_for_every_theme_and_palette() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pixels.txt");
    let mut rng = StdRng::seed_from_u64(99);
    let lines: Vec<String> = (0..150)
        .map(|_| ((rng.gen::<f32>() * 1000.0) as u32).to_string())
        .collect();
    append_lines(&path, &lines);

    for theme in Theme::ALL.iter() {
        for palette in PaletteId::ALL.iter() {
            let mut settings = RenderSettings::default();
            settings.theme = *theme;
            settings.palette = *palette;
            let mut orch = Orchestrator::new(Dimensions::new(16, 16).unwrap(), settings).unwrap();
            orch.bind_source(&path, SampleRange::new(1000).unwrap());
            orch.tick();
            let a = orch.export();
            let b = orch.export();
            assert_eq!(a.dimensions(), (16, 10));
            assert_eq!(a.into_raw(), b.into_raw());
        }
    }
}
