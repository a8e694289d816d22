// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate ctrlc;
extern crate env_logger;
extern crate failure;
extern crate fracstream;
extern crate image;
extern crate log;

use clap::{App, Arg, ArgMatches};
use failure::{err_msg, Error};
use fracstream::{
    Controller, Dimensions, Knob, LoopOptions, Orchestrator, PaletteId, RenderSettings,
    SampleRange, StopSignal, Theme,
};
use image::png::PNGEncoder;
use image::{ColorType, RgbImage};
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_name<T>(s: &str) -> Result<(), String>
where
    T: FromStr,
    T::Err: ToString,
{
    T::from_str(s).map(|_| ()).map_err(|e| e.to_string())
}

fn validate_knob(knob: Knob, s: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(v) => knob.check(v).map(|_| ()).map_err(|e| e.to_string()),
        Err(_) => Err(format!("Could not parse {}", knob)),
    }
}

const SOURCE: &str = "source";
const SIZE: &str = "size";
const MAX: &str = "max";
const THEME: &str = "theme";
const PALETTE: &str = "palette";
const THROTTLE: &str = "throttle-ms";
const POLL: &str = "poll-ms";
const TIMEOUT: &str = "timeout";
const FOLLOW: &str = "follow";
const OUTPUT: &str = "output";
const QUIET: &str = "quiet";

fn args<'a>() -> ArgMatches<'a> {
    let app = App::new("fracstream")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Follows a growing file of fractal samples and renders it as it arrives")
        .arg(
            Arg::with_name(SOURCE)
                .required(true)
                .index(1)
                .help("Text file of samples, one integer per line"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("256x256")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse field size"))
                .help("Width and height of the field"),
        )
        .arg(
            Arg::with_name(MAX)
                .long(MAX)
                .short("m")
                .takes_value(true)
                .default_value("255")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        u32::max_value(),
                        "Could not parse sample maximum",
                        "Sample maximum must be at least 1",
                    )
                })
                .help("Largest sample value the source will write"),
        )
        .arg(
            Arg::with_name(THEME)
                .long(THEME)
                .short("t")
                .takes_value(true)
                .default_value("classic")
                .validator(|s| validate_name::<Theme>(&s))
                .help("classic, smooth, dramatic, organic, crystalline or ethereal"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .long(PALETTE)
                .short("p")
                .takes_value(true)
                .default_value("viridis")
                .validator(|s| validate_name::<PaletteId>(&s))
                .help("viridis, plasma, cosmic, fire or grayscale"),
        )
        .arg(
            Arg::with_name(THROTTLE)
                .long(THROTTLE)
                .takes_value(true)
                .default_value("100")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        60_000,
                        "Could not parse throttle",
                        "Throttle must be between 0 and 60000 ms",
                    )
                })
                .help("Minimum time between renders, in milliseconds"),
        )
        .arg(
            Arg::with_name(POLL)
                .long(POLL)
                .takes_value(true)
                .default_value("50")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        60_000,
                        "Could not parse poll interval",
                        "Poll interval must be between 1 and 60000 ms",
                    )
                })
                .help("Time between polls of the source, in milliseconds"),
        )
        .arg(
            Arg::with_name(TIMEOUT)
                .long(TIMEOUT)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        u64::max_value(),
                        "Could not parse timeout",
                        "Timeout must be at least one second",
                    )
                })
                .help("Give up after this many seconds"),
        )
        .arg(
            Arg::with_name(FOLLOW)
                .long(FOLLOW)
                .short("f")
                .help("Keep running after the field is complete, until interrupted"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("PNG to write on exit [default: fractal_<palette>_<timestamp>.png beside the source]"),
        )
        .arg(
            Arg::with_name(QUIET)
                .long(QUIET)
                .short("q")
                .help("Don't print progress"),
        );

    Knob::ALL
        .iter()
        .fold(app, |app, &knob| {
            app.arg(
                Arg::with_name(knob.name())
                    .long(knob.name())
                    .takes_value(true)
                    .validator(move |s| validate_knob(knob, &s))
                    .help(knob.help()),
            )
        })
        .get_matches()
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

/// UTC, as `YYYYmmdd_HHMMSS`.
fn timestamp(now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let rem = secs % 86_400;
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        year,
        month,
        day,
        rem / 3600,
        rem % 3600 / 60,
        rem % 60
    )
}

fn default_output(source: &Path, palette: PaletteId) -> PathBuf {
    let name = format!("fractal_{}_{}.png", palette, timestamp(SystemTime::now()));
    match source.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

fn write_image(outfile: &Path, image: &RgbImage) -> Result<(), Error> {
    let output = File::create(outfile)?;
    let (width, height) = image.dimensions();
    PNGEncoder::new(output).encode(image, width, height, ColorType::RGB(8))?;
    Ok(())
}

fn run() -> Result<(), Error> {
    let matches = args();
    let quiet = matches.is_present(QUIET);

    let source = PathBuf::from(matches.value_of(SOURCE).unwrap_or_default());
    let (width, height) = parse_pair::<usize>(matches.value_of(SIZE).unwrap_or_default(), 'x')
        .ok_or_else(|| err_msg("Could not parse field size"))?;
    let dims = Dimensions::new(width, height)?;
    let range = SampleRange::new(u32::from_str(matches.value_of(MAX).unwrap_or("255"))?)?;

    let mut settings = RenderSettings::default();
    settings.theme = Theme::from_str(matches.value_of(THEME).unwrap_or("classic"))?;
    settings.palette = PaletteId::from_str(matches.value_of(PALETTE).unwrap_or("viridis"))?;
    for &knob in Knob::ALL.iter() {
        if let Some(value) = matches.value_of(knob.name()) {
            settings.set(knob, f64::from_str(value)?)?;
        }
    }

    let throttle = u64::from_str(matches.value_of(THROTTLE).unwrap_or("100"))?;
    let poll = u64::from_str(matches.value_of(POLL).unwrap_or("50"))?;
    let options = LoopOptions {
        poll_interval: Duration::from_millis(poll),
        exit_on_complete: !matches.is_present(FOLLOW),
    };

    let mut orchestrator =
        Orchestrator::new(dims, settings)?.with_throttle(Duration::from_millis(throttle));
    orchestrator.bind_source(&source, range);

    let stop = StopSignal::new();
    let (controller, commands) = Controller::new(stop.clone());
    let interrupt = controller.clone();
    ctrlc::set_handler(move || interrupt.stop())?;

    if let Some(secs) = matches.value_of(TIMEOUT) {
        let secs = u64::from_str(secs)?;
        let timer = controller.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            info!("timed out after {}s", secs);
            timer.stop();
        });
    }

    orchestrator.run(&commands, &stop, options, move |frame| {
        if !quiet {
            println!("{} ({:.1}%)", frame.status, frame.progress * 100.0);
        }
    });

    let image = orchestrator.export();
    if image.height() == 0 {
        eprintln!("No data arrived from {}; nothing to save", source.display());
    } else {
        let output = match matches.value_of(OUTPUT) {
            Some(path) => PathBuf::from(path),
            None => default_output(&source, settings.palette),
        };
        write_image(&output, &image)?;
        if !quiet {
            println!("Saved {}", output.display());
        }
    }

    match orchestrator.summary() {
        Some(ref summary) if !quiet => println!(
            "{}x{}: {}/{} cells ({:.1}%) in {:.1}s, {:.0} cells/s, {} lines skipped",
            summary.width,
            summary.height,
            summary.pixels,
            summary.total,
            summary.progress * 100.0,
            summary.elapsed.as_secs_f64(),
            summary.throughput,
            summary.skipped
        ),
        _ => {}
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        eprintln!("fracstream: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_parse_or_dont() {
        assert_eq!(parse_pair::<usize>("640x480", 'x'), Some((640, 480)));
        assert_eq!(parse_pair::<usize>("640x", 'x'), None);
        assert_eq!(parse_pair::<usize>("640", 'x'), None);
    }

    #[test]
    fn knob_validation_uses_documented_ranges() {
        assert!(validate_knob(Knob::Contrast, "2.5").is_ok());
        assert!(validate_knob(Knob::Contrast, "0").is_err());
        assert!(validate_knob(Knob::Gamma, "lots").is_err());
    }

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(11_016), (2000, 2, 29));
        assert_eq!(civil_from_days(19_000), (2022, 1, 8));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn timestamps_are_sortable() {
        let t = UNIX_EPOCH + Duration::from_secs(19_000 * 86_400 + 3_723);
        assert_eq!(timestamp(t), "20220108_010203");
    }

    #[test]
    fn output_is_png_whatever_the_extension() {
        let dir = tempfile::tempdir().unwrap();
        let picture = RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8 * 80, y as u8 * 120, 7]));
        for name in &["plain", "picture.jpg"] {
            let path = dir.path().join(name);
            write_image(&path, &picture).unwrap();
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
            let back = image::load_from_memory(&bytes).unwrap().to_rgb();
            assert_eq!(back.into_raw(), picture.clone().into_raw());
        }
    }

    #[test]
    fn default_output_sits_beside_the_source() {
        let out = default_output(Path::new("/tmp/run/pixels.txt"), PaletteId::Fire);
        assert_eq!(out.parent(), Some(Path::new("/tmp/run")));
        let name = out.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("fractal_fire_"));
        assert!(name.ends_with(".png"));
    }
}
