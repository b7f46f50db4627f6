use crate::audio::UNITS_PER_SECOND;
use crate::debug;
use crate::error::SliceError;
use crate::output::{Output, fmt_unit, unit_to_time};

pub mod interval;
pub mod transient;

pub use interval::IntervalDetector;
pub use transient::TransientDetector;

/// Decides, unit by unit, whether a loudness unit starts a new slice.
pub trait Detector {
    /// First unit index handed to [`Detector::analyse`].
    fn first_unit(&self) -> usize;
    fn analyse(&mut self, index: usize, signal: &[f64]) -> bool;
    /// Name used in progress output, e.g. `transients`.
    fn label(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetectionMode {
    Interval { every: usize },
    Transient { threshold: f64, db_floor: Option<f64> },
}

impl DetectionMode {
    /// Fixed-interval mode from a duration in seconds.
    pub fn interval(seconds: f64) -> Result<Self, SliceError> {
        let every = (seconds * 1000.0).floor();
        if !seconds.is_finite() || every < 1.0 {
            return Err(SliceError::InvalidInterval(seconds));
        }
        Ok(DetectionMode::Interval {
            every: every as usize,
        })
    }

    pub fn detector(&self, signal: &[f64]) -> Box<dyn Detector> {
        match *self {
            DetectionMode::Interval { every } => Box::new(IntervalDetector::new(every)),
            DetectionMode::Transient {
                threshold,
                db_floor,
            } => Box::new(TransientDetector::new(threshold, db_floor, signal)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectionMode::Interval { .. } => "interval",
            DetectionMode::Transient { .. } => "transient",
        }
    }
}

/// Strictly increasing unit indices at which the source is cut.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CutPoints(Vec<usize>);

impl CutPoints {
    /// Appends `index` if it lies after the last cut; returns whether it was kept.
    pub fn push(&mut self, index: usize) -> bool {
        match self.0.last() {
            Some(&last) if index <= last => false,
            _ => {
                self.0.push(index);
                true
            }
        }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of slices the cuts delimit.
    pub fn slices(&self) -> usize {
        self.0.len().saturating_sub(1)
    }
}

/// Scans `signal` with `detector`. Index 0 leads when `keep_intro` is set and
/// the last unit always closes the sequence.
pub fn cut_points(
    signal: &[f64],
    detector: &mut dyn Detector,
    keep_intro: bool,
    progress: &Output,
) -> CutPoints {
    let mut cuts = CutPoints::default();
    let Some(last) = signal.len().checked_sub(1) else {
        return cuts;
    };

    if keep_intro {
        cuts.push(0);
    }

    let digits = signal.len().to_string().len();
    for index in detector.first_unit()..signal.len() {
        progress.inc();
        if detector.analyse(index, signal) && cuts.push(index) {
            progress.set_count(detector.label(), cuts.len());
            debug!(
                "[{}] CUT          : {:.3} @ {}",
                fmt_unit(index, digits),
                signal[index],
                unit_to_time(index, UNITS_PER_SECOND)
            );
        }
    }

    cuts.push(last);
    cuts
}
