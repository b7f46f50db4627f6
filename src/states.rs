/// Weight of the previous baseline in the moving average.
pub const SMOOTHING: f64 = 0.95;

/// Units during which no new transient may fire after a detection.
pub const COOLDOWN_UNITS: usize = 10;

/// Running state of the adaptive detector, one per file.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionState {
    pub baseline: f64,
    pub cooldown: usize,
}

impl DetectionState {
    pub fn new(initial: f64) -> Self {
        Self {
            baseline: initial,
            cooldown: 0,
        }
    }

    pub fn observe(&mut self, loudness: f64) {
        self.baseline = SMOOTHING * self.baseline + (1.0 - SMOOTHING) * loudness;
    }

    pub fn ready(&self) -> bool {
        self.cooldown == 0
    }

    pub fn arm(&mut self) {
        self.cooldown = COOLDOWN_UNITS;
    }

    pub fn tick(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }
}
