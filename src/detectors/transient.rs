use super::Detector;
use crate::states::DetectionState;

/// Guards the ratio against a zero baseline.
const EPSILON: f64 = 1e-9;

/// Minimum unit-to-unit rise; slow swells stay below it.
const MIN_DERIVATIVE: f64 = 0.01;

/// Offset keeping the decibel conversion finite for silent units.
const DB_EPSILON: f64 = 1e-12;

/// Adaptive onset detector.
///
/// A unit is a transient when its loudness exceeds `threshold` times the
/// running baseline, rises over the previous unit, optionally lies within
/// `db_floor` dB of the loudest unit of the signal, and no transient fired
/// during the preceding cooldown.
#[derive(Debug, Clone)]
pub struct TransientDetector {
    threshold: f64,
    floor_db: Option<f64>,
    peak: f64,
    state: DetectionState,
}

impl TransientDetector {
    pub fn new(threshold: f64, db_floor: Option<f64>, signal: &[f64]) -> Self {
        let peak = signal.iter().copied().fold(0.0, f64::max);
        Self {
            threshold,
            floor_db: db_floor.map(|db| -db.abs()),
            peak,
            state: DetectionState::new(signal.first().copied().unwrap_or(0.0)),
        }
    }

    /// Loudness of a unit in dB relative to the signal peak.
    fn relative_db(&self, loudness: f64) -> f64 {
        20.0 * (loudness / self.peak + DB_EPSILON).log10()
    }

    fn above_floor(&self, loudness: f64) -> bool {
        match self.floor_db {
            None => true,
            Some(_) if self.peak <= 0.0 => false,
            Some(floor) => self.relative_db(loudness) >= floor,
        }
    }
}

impl Detector for TransientDetector {
    fn first_unit(&self) -> usize {
        1
    }

    fn analyse(&mut self, index: usize, signal: &[f64]) -> bool {
        let loudness = signal[index];
        self.state.observe(loudness);

        if !self.state.ready() {
            self.state.tick();
            return false;
        }

        let ratio = loudness / (self.state.baseline + EPSILON);
        let deriv = loudness - signal[index - 1];
        if ratio > self.threshold && deriv > MIN_DERIVATIVE && self.above_floor(loudness) {
            self.state.arm();
            return true;
        }

        false
    }

    fn label(&self) -> &'static str {
        "transients"
    }
}
