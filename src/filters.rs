use std::borrow::Cow;
use std::f64::consts::TAU;

use crate::audio::Audio;
use crate::error::SliceError;

pub const MAX_CUTOFF: i64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStep {
    LowPass(u32),
    HighPass(u32),
}

pub fn validate_cutoff(flag: &'static str, value: Option<i64>) -> Result<Option<u32>, SliceError> {
    match value {
        None => Ok(None),
        Some(hz) if (0..=MAX_CUTOFF).contains(&hz) => Ok(Some(hz as u32)),
        Some(hz) => Err(SliceError::InvalidFilterParameter { flag, value: hz }),
    }
}

/// Orders the requested filters: low-pass, high-pass, then band-pass as a
/// low-pass followed by a high-pass at the same cutoff.
pub fn filter_chain(lpf: Option<u32>, hpf: Option<u32>, bpf: Option<u32>) -> Vec<FilterStep> {
    let mut steps = Vec::new();
    if let Some(hz) = lpf {
        steps.push(FilterStep::LowPass(hz));
    }
    if let Some(hz) = hpf {
        steps.push(FilterStep::HighPass(hz));
    }
    if let Some(hz) = bpf {
        steps.push(FilterStep::LowPass(hz));
        steps.push(FilterStep::HighPass(hz));
    }
    steps
}

/// Produces the signal used for detection. `audio` itself is left untouched
/// so slices are always cut from the unfiltered source.
pub fn condition<'a>(audio: &'a Audio, steps: &[FilterStep]) -> Cow<'a, Audio> {
    if steps.is_empty() {
        return Cow::Borrowed(audio);
    }

    let mut working = audio.clone();
    for step in steps {
        step.apply(&mut working);
    }
    Cow::Owned(working)
}

impl FilterStep {
    pub fn apply(&self, audio: &mut Audio) {
        match *self {
            FilterStep::LowPass(hz) => low_pass(audio, hz),
            FilterStep::HighPass(hz) => high_pass(audio, hz),
        }
    }
}

fn omega(cutoff: u32, sample_rate: u32) -> f64 {
    TAU * cutoff as f64 / sample_rate.max(1) as f64
}

fn low_pass(audio: &mut Audio, cutoff: u32) {
    let w = omega(cutoff, audio.sample_rate);
    let alpha = w / (1.0 + w);
    let channels = audio.channels.max(1) as usize;

    for channel in 0..channels {
        let mut prev: Option<f64> = None;
        for sample in audio.samples.iter_mut().skip(channel).step_by(channels) {
            let x = *sample as f64;
            let y = match prev {
                None => x,
                Some(last) => last + alpha * (x - last),
            };
            *sample = y as f32;
            prev = Some(y);
        }
    }
}

fn high_pass(audio: &mut Audio, cutoff: u32) {
    let w = omega(cutoff, audio.sample_rate);
    let alpha = 1.0 / (1.0 + w);
    let channels = audio.channels.max(1) as usize;

    for channel in 0..channels {
        let mut prev: Option<(f64, f64)> = None;
        for sample in audio.samples.iter_mut().skip(channel).step_by(channels) {
            let x = *sample as f64;
            let y = match prev {
                None => x,
                Some((last_x, last_y)) => alpha * (last_y + x - last_x),
            };
            *sample = y as f32;
            prev = Some((x, y));
        }
    }
}
