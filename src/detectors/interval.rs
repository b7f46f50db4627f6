use super::Detector;

/// Cuts every `every` units, starting at unit 0.
#[derive(Debug, Clone)]
pub struct IntervalDetector {
    every: usize,
}

impl IntervalDetector {
    pub fn new(every: usize) -> Self {
        debug_assert!(every > 0, "interval must be at least one unit");
        Self { every }
    }
}

impl Detector for IntervalDetector {
    fn first_unit(&self) -> usize {
        0
    }

    fn analyse(&mut self, index: usize, _signal: &[f64]) -> bool {
        index % self.every == 0
    }

    fn label(&self) -> &'static str {
        "divisions"
    }
}
