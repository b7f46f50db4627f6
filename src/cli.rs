use std::path::PathBuf;

use clap::Parser;

use crate::detectors::DetectionMode;
use crate::error::SliceError;
use crate::filters::{FilterStep, filter_chain, validate_cutoff};
use crate::segmenter::{Destination, Fade};

/// Export formats the encoder can write.
const EXPORT_FORMATS: &[&str] = &["wav"];

#[derive(Parser, Debug)]
#[command(version, about = "audio slicer tool", long_about = None)]
pub struct Cli {
    /// Set threshold for transient detection
    #[arg(short, long, default_value_t = 2.0)]
    pub threshold: f64,

    /// Treat beginning of file as transient
    #[arg(short = 'i', long)]
    pub keep_intro: bool,

    /// Write audio slices to directory (implies -d)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Write audio slices to directory named after file
    #[arg(short = 'd', long)]
    pub to_dir: bool,

    /// Format of sliced audio clips
    #[arg(short, long, default_value = "wav")]
    pub format: String,

    /// Slice every EVERY seconds instead of at transients
    #[arg(short, long, allow_negative_numbers = true)]
    pub every: Option<f64>,

    /// Only export the first N slices
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub max_slices: Option<i64>,

    /// Fade every slice out (first half only when combined with --fade-in)
    #[arg(long)]
    pub fade_out: bool,

    /// Fade every slice in (second half only when combined with --fade-out)
    #[arg(long)]
    pub fade_in: bool,

    /// Ignore transients quieter than DB below the loudest part of the file
    #[arg(long, value_name = "DB", default_value_t = 20.0)]
    pub db_floor: f64,

    /// Disable the decibel floor
    #[arg(long)]
    pub no_db_floor: bool,

    /// Find transients while applying lowpass filter at freq
    #[arg(long, value_name = "HZ", allow_negative_numbers = true)]
    pub lpf: Option<i64>,

    /// Find transients while applying highpass filter at freq
    #[arg(long, value_name = "HZ", allow_negative_numbers = true)]
    pub hpf: Option<i64>,

    /// Find transients while applying bandpass filter at freq
    #[arg(long, value_name = "HZ", allow_negative_numbers = true)]
    pub bpf: Option<i64>,

    /// Write a JSON report of all slices to FILE
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Print every cut and slice
    #[arg(long)]
    pub debug: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Audio files to slice
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub files: Vec<PathBuf>,
    pub detection: DetectionMode,
    pub keep_intro: bool,
    pub filters: Vec<FilterStep>,
    pub destination: Destination,
    pub format: String,
    pub max_slices: Option<usize>,
    pub fade: Fade,
    pub json: Option<PathBuf>,
    pub no_progress: bool,
}

impl Cli {
    /// Checks every flag and input path before any audio is touched.
    pub fn settings(&self) -> Result<Settings, SliceError> {
        let lpf = validate_cutoff("--lpf", self.lpf)?;
        let hpf = validate_cutoff("--hpf", self.hpf)?;
        let bpf = validate_cutoff("--bpf", self.bpf)?;

        let max_slices = match self.max_slices {
            None => None,
            Some(n) if n > 0 => Some(n as usize),
            Some(n) => return Err(SliceError::InvalidSliceLimit(n)),
        };

        let detection = match self.every {
            Some(seconds) => DetectionMode::interval(seconds)?,
            None => DetectionMode::Transient {
                threshold: self.threshold,
                db_floor: (!self.no_db_floor).then_some(self.db_floor),
            },
        };

        let format = self.format.trim_start_matches('.').to_ascii_lowercase();
        if !EXPORT_FORMATS.contains(&format.as_str()) {
            return Err(SliceError::UnsupportedFormat(format));
        }

        if let Some(missing) = self.files.iter().find(|file| !file.exists()) {
            return Err(SliceError::InputNotFound(missing.clone()));
        }

        let destination = match (&self.output, self.to_dir) {
            (Some(dir), _) => Destination::Directory(dir.clone()),
            (None, true) => Destination::PerFile,
            (None, false) => Destination::Alongside,
        };

        Ok(Settings {
            files: self.files.clone(),
            detection,
            keep_intro: self.keep_intro,
            filters: filter_chain(lpf, hpf, bpf),
            destination,
            format,
            max_slices,
            fade: Fade::from_flags(self.fade_in, self.fade_out),
            json: self.json.clone(),
            no_progress: self.no_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("slicewave").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let input = tempfile::NamedTempFile::new().unwrap();
        let path = input.path().to_str().unwrap();
        let settings = parse(&[path]).settings().unwrap();

        assert_eq!(
            settings.detection,
            DetectionMode::Transient {
                threshold: 2.0,
                db_floor: Some(20.0)
            }
        );
        assert!(!settings.keep_intro);
        assert!(settings.filters.is_empty());
        assert_eq!(settings.destination, Destination::Alongside);
        assert_eq!(settings.format, "wav");
        assert_eq!(settings.max_slices, None);
        assert_eq!(settings.fade, Fade::None);
    }

    #[test]
    fn full_flag_set() {
        let input = tempfile::NamedTempFile::new().unwrap();
        let path = input.path().to_str().unwrap();
        let cli = parse(&[
            "-t", "3.5", "-i", "-o", "out", "-d", "-f", "WAV", "-m", "4", "--fade-in",
            "--fade-out", "--no-db-floor", "--lpf", "8000", "--bpf", "500", path,
        ]);
        let settings = cli.settings().unwrap();

        assert_eq!(
            settings.detection,
            DetectionMode::Transient {
                threshold: 3.5,
                db_floor: None
            }
        );
        assert!(settings.keep_intro);
        assert_eq!(settings.destination, Destination::Directory(PathBuf::from("out")));
        assert_eq!(settings.format, "wav");
        assert_eq!(settings.max_slices, Some(4));
        assert_eq!(settings.fade, Fade::Both);
        assert_eq!(
            settings.filters,
            vec![
                FilterStep::LowPass(8_000),
                FilterStep::LowPass(500),
                FilterStep::HighPass(500),
            ]
        );
    }

    #[test]
    fn every_selects_interval_mode() {
        let input = tempfile::NamedTempFile::new().unwrap();
        let path = input.path().to_str().unwrap();
        let settings = parse(&["-e", "1.5", "-d", path]).settings().unwrap();
        assert_eq!(settings.detection, DetectionMode::Interval { every: 1_500 });
        assert_eq!(settings.destination, Destination::PerFile);
    }

    #[test]
    fn non_positive_slice_limit_is_rejected_before_files_are_checked() {
        for limit in ["0", "-3"] {
            let err = parse(&["-m", limit, "does-not-exist.wav"]).settings().unwrap_err();
            assert!(matches!(err, SliceError::InvalidSliceLimit(_)), "{err}");
        }
    }

    #[test]
    fn out_of_range_filter_names_the_flag() {
        let err = parse(&["--hpf", "25000", "x.wav"]).settings().unwrap_err();
        assert_eq!(err.to_string(), "--hpf argument must be between 0 and 20000 (got 25000)");

        let err = parse(&["--lpf", "-5", "x.wav"]).settings().unwrap_err();
        assert!(matches!(
            err,
            SliceError::InvalidFilterParameter { flag: "--lpf", value: -5 }
        ));
    }

    #[test]
    fn bad_interval_is_rejected() {
        for every in ["0", "-2", "0.0004"] {
            let err = parse(&["-e", every, "x.wav"]).settings().unwrap_err();
            assert!(matches!(err, SliceError::InvalidInterval(_)), "{err}");
        }
    }

    #[test]
    fn unknown_export_format_is_rejected() {
        let err = parse(&["-f", "ogg", "x.wav"]).settings().unwrap_err();
        assert!(matches!(err, SliceError::UnsupportedFormat(ref f) if f == "ogg"));
    }

    #[test]
    fn missing_input_is_reported() {
        let present = tempfile::NamedTempFile::new().unwrap();
        let path = present.path().to_str().unwrap();
        let err = parse(&[path, "no/such/file.wav"]).settings().unwrap_err();
        assert!(matches!(err, SliceError::InputNotFound(ref p) if p == &PathBuf::from("no/such/file.wav")));
        assert_eq!(err.to_string(), "file 'no/such/file.wav' does not exist");
    }

    #[test]
    fn files_are_required() {
        assert!(Cli::try_parse_from(["slicewave"]).is_err());
    }
}
