use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

static QUIET: AtomicBool = AtomicBool::new(false);
static DEBUG: AtomicBool = AtomicBool::new(false);

pub fn set_verbosity(quiet: bool, debug: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
    DEBUG.store(debug, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn is_debug() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// Informational line, silenced by `--quiet`.
#[macro_export]
macro_rules! output {
    ($($arg:tt)*) => {
        if !$crate::output::is_quiet() {
            println!($($arg)*);
        }
    };
}

/// Trace line, only printed with `--debug`.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if $crate::output::is_debug() {
            println!($($arg)*);
        }
    };
}

pub fn fmt_unit(unit: usize, digits: usize) -> String {
    format!("{:0width$}", unit, width = digits)
}

pub fn unit_to_time(unit: usize, units_per_second: u64) -> String {
    let seconds = unit as f64 / units_per_second as f64;
    let hours = (seconds / 3600.0).floor();
    let minutes = ((seconds % 3600.0) / 60.0).floor();
    let secs = seconds % 60.0;
    format!("{:02.0}:{:02.0}:{:06.3}", hours, minutes, secs)
}

#[derive(Debug)]
pub struct Output {
    pub progress_bar: Option<ProgressBar>,
}

impl Output {
    pub fn new(no_progress: bool, num_units: u64) -> Self {
        let progress_bar = if no_progress || is_quiet() {
            None
        } else {
            Some(ProgressBar::new(num_units))
        };

        if let Some(pb) = &progress_bar {
            if let Ok(style) = ProgressStyle::with_template(
                "[{elapsed_precise}] [{wide_bar:.yellow/green}] {percent_precise}% ({pos}/{len}) {msg}",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
        }

        Self { progress_bar }
    }

    pub fn hidden() -> Self {
        Self { progress_bar: None }
    }

    pub fn inc(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
        }
    }

    /// Shows the running cut count next to the bar, e.g. `transients: 12`.
    pub fn set_count(&self, label: &str, count: usize) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("{label}: {count}"));
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.finish();
        }
    }
}
