use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::audio::{Audio, UNITS_PER_SECOND};
use crate::debug;
use crate::detectors::CutPoints;
use crate::error::SliceError;

/// One slice of the source, `[start, end)` in loudness units, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

/// Pairs adjacent cuts into segments, keeping only the first `max_slices`.
pub fn plan(cuts: &CutPoints, max_slices: Option<usize>) -> Vec<Segment> {
    cuts.as_slice()
        .windows(2)
        .enumerate()
        .map(|(i, pair)| Segment {
            index: i + 1,
            start: pair[0],
            end: pair[1],
        })
        .take(max_slices.unwrap_or(usize::MAX))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fade {
    #[default]
    None,
    In,
    Out,
    /// Fade out over the first half, fade in over the second half.
    Both,
}

impl Fade {
    pub fn from_flags(fade_in: bool, fade_out: bool) -> Self {
        match (fade_in, fade_out) {
            (true, true) => Fade::Both,
            (true, false) => Fade::In,
            (false, true) => Fade::Out,
            (false, false) => Fade::None,
        }
    }
}

pub fn apply_fade(clip: &mut Audio, fade: Fade) {
    let frames = clip.frames();
    match fade {
        Fade::None => {}
        Fade::In => ramp(clip, 0, frames, 0.0, 1.0),
        Fade::Out => ramp(clip, 0, frames, 1.0, 0.0),
        Fade::Both => {
            let half = frames / 2;
            ramp(clip, 0, half, 1.0, 0.0);
            ramp(clip, half, frames, 0.0, 1.0);
        }
    }
}

fn ramp(clip: &mut Audio, start: usize, end: usize, from: f32, to: f32) {
    let len = end.saturating_sub(start);
    if len == 0 {
        return;
    }
    let channels = clip.channels.max(1) as usize;
    let frames = clip.samples[start * channels..end * channels].chunks_mut(channels);
    for (step, frame) in frames.enumerate() {
        let gain = from + (to - from) * step as f32 / len as f32;
        for sample in frame {
            *sample *= gain;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Alongside,
    PerFile,
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct OutputLayout {
    directory: Option<PathBuf>,
    base: PathBuf,
    format: String,
}

impl OutputLayout {
    pub fn new(destination: &Destination, input: &Path, format: &str) -> Self {
        let stem = input.with_extension("");
        let directory = match destination {
            Destination::Alongside => None,
            Destination::PerFile => Some(stem.clone()),
            Destination::Directory(dir) => Some(dir.clone()),
        };
        let base = match &directory {
            Some(dir) => dir.join(stem.file_name().unwrap_or(input.as_os_str())),
            None => stem,
        };

        Self {
            directory,
            base,
            format: format.to_string(),
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn prepare(&self) -> Result<(), SliceError> {
        if let Some(dir) = &self.directory {
            if !dir.exists() {
                fs::create_dir(dir)?;
            }
        }
        Ok(())
    }

    pub fn slice_path(&self, index: usize) -> PathBuf {
        let mut name = OsString::from(self.base.as_os_str());
        name.push(format!("_{}.{}", index, self.format));
        PathBuf::from(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SliceRecord {
    pub index: usize,
    pub path: String,
    pub start: f32,
    pub end: f32,
    pub duration: f32,
    #[serde(rename = "startUnit")]
    pub start_unit: usize,
    #[serde(rename = "endUnit")]
    pub end_unit: usize,
    pub lufs: Option<f64>,
}

fn unit_to_secs(unit: usize) -> f32 {
    unit as f32 / UNITS_PER_SECOND as f32
}

/// Cuts, fades and writes every segment of `original`, stopping at the
/// first failure. With `measure` set each slice also gets its integrated
/// loudness.
pub fn export(
    original: &Audio,
    segments: &[Segment],
    layout: &OutputLayout,
    fade: Fade,
    measure: bool,
) -> Result<Vec<SliceRecord>, SliceError> {
    layout.prepare()?;

    let mut records = Vec::with_capacity(segments.len());
    for segment in segments {
        let mut clip = original.slice(segment.start, segment.end);
        apply_fade(&mut clip, fade);

        let path = layout.slice_path(segment.index);
        clip.export(&path)?;
        debug!(
            "[{}] SLICE        : {} -> {} ({})",
            segment.index,
            segment.start,
            segment.end,
            path.display()
        );

        let lufs = if measure { clip.integrated_lufs()? } else { None };
        records.push(SliceRecord {
            index: segment.index,
            path: path.display().to_string(),
            start: unit_to_secs(segment.start),
            end: unit_to_secs(segment.end),
            duration: unit_to_secs(segment.end - segment.start),
            start_unit: segment.start,
            end_unit: segment.end,
            lufs,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cuts(indices: &[usize]) -> CutPoints {
        let mut cuts = CutPoints::default();
        for &i in indices {
            cuts.push(i);
        }
        cuts
    }

    fn constant(value: f32, units: usize) -> Audio {
        Audio::new(vec![value; units * 8], 1, 8_000)
    }

    #[test]
    fn plan_pairs_adjacent_cuts() {
        let segments = plan(&cuts(&[0, 100, 250, 999]), None);
        assert_eq!(
            segments,
            vec![
                Segment { index: 1, start: 0, end: 100 },
                Segment { index: 2, start: 100, end: 250 },
                Segment { index: 3, start: 250, end: 999 },
            ]
        );
        assert!(plan(&cuts(&[999]), None).is_empty());
        assert!(plan(&CutPoints::default(), None).is_empty());
    }

    #[test]
    fn plan_keeps_earliest_slices_up_to_limit() {
        let segments = plan(&cuts(&[0, 10, 20, 30, 40, 50]), Some(2));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], Segment { index: 1, start: 0, end: 10 });
        assert_eq!(segments[1], Segment { index: 2, start: 10, end: 20 });

        assert_eq!(plan(&cuts(&[0, 10, 20]), Some(5)).len(), 2);
    }

    #[test]
    fn fade_flags_select_mode() {
        assert_eq!(Fade::from_flags(false, false), Fade::None);
        assert_eq!(Fade::from_flags(true, false), Fade::In);
        assert_eq!(Fade::from_flags(false, true), Fade::Out);
        assert_eq!(Fade::from_flags(true, true), Fade::Both);
    }

    #[test]
    fn fade_out_spans_whole_clip() {
        let mut clip = constant(1.0, 100);
        apply_fade(&mut clip, Fade::Out);
        let last = clip.samples.len() - 1;
        assert_eq!(clip.samples[0], 1.0);
        assert!((clip.samples[last / 2] - 0.5).abs() < 0.01);
        assert!(clip.samples[last] < 0.01);
    }

    #[test]
    fn fade_in_spans_whole_clip() {
        let mut clip = constant(1.0, 100);
        apply_fade(&mut clip, Fade::In);
        let last = clip.samples.len() - 1;
        assert_eq!(clip.samples[0], 0.0);
        assert!(clip.samples[last] > 0.99);
    }

    #[test]
    fn combined_fade_dips_at_midpoint() {
        let mut clip = constant(0.5, 100);
        apply_fade(&mut clip, Fade::Both);
        let frames = clip.frames();
        assert_eq!(clip.samples[0], 0.5);
        assert_eq!(clip.samples[frames / 2], 0.0);
        assert!(clip.samples[frames - 1] > 0.49);
        assert!((clip.samples[frames / 4] - 0.25).abs() < 0.01);
        assert!((clip.samples[3 * frames / 4] - 0.25).abs() < 0.01);
    }

    #[test]
    fn fade_applies_to_every_channel() {
        let mut clip = Audio::new(vec![1.0; 16], 2, 8_000);
        apply_fade(&mut clip, Fade::Out);
        for frame in clip.samples.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert_eq!(clip.samples[2], 1.0 - 1.0 / 8.0);
    }

    #[test]
    fn fade_on_empty_clip_is_noop() {
        let mut clip = Audio::new(Vec::new(), 1, 8_000);
        apply_fade(&mut clip, Fade::Both);
        assert!(clip.samples.is_empty());
    }

    #[test]
    fn layout_alongside_input() {
        let layout = OutputLayout::new(&Destination::Alongside, Path::new("takes/drums.wav"), "wav");
        assert_eq!(layout.directory(), None);
        assert_eq!(layout.slice_path(3), PathBuf::from("takes/drums_3.wav"));
    }

    #[test]
    fn layout_per_file_directory() {
        let layout = OutputLayout::new(&Destination::PerFile, Path::new("takes/drums.wav"), "wav");
        assert_eq!(layout.directory(), Some(Path::new("takes/drums")));
        assert_eq!(layout.slice_path(1), PathBuf::from("takes/drums/drums_1.wav"));
    }

    #[test]
    fn layout_explicit_directory() {
        let destination = Destination::Directory(PathBuf::from("out"));
        let layout = OutputLayout::new(&destination, Path::new("takes/drums.v2.wav"), "wav");
        assert_eq!(layout.directory(), Some(Path::new("out")));
        assert_eq!(layout.slice_path(12), PathBuf::from("out/drums.v2_12.wav"));
    }

    #[test]
    fn export_writes_numbered_slices() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("slices");
        let destination = Destination::Directory(target.clone());
        let layout = OutputLayout::new(&destination, Path::new("loop.wav"), "wav");

        let original = constant(0.3, 1_000);
        let segments = plan(&cuts(&[0, 200, 450, 999]), Some(2));
        let records = export(&original, &segments, &layout, Fade::None, false).unwrap();

        assert_eq!(records.len(), 2);
        assert!(target.join("loop_1.wav").exists());
        assert!(target.join("loop_2.wav").exists());
        assert!(!target.join("loop_3.wav").exists());

        let second = Audio::open(&target.join("loop_2.wav")).unwrap();
        assert_eq!(second.units(), 250);
        assert_eq!(records[1].start_unit, 200);
        assert_eq!(records[1].end_unit, 450);
        assert!((records[1].duration - 0.25).abs() < 1e-6);
        assert_eq!(records[1].lufs, None);
    }

    #[test]
    fn export_round_trip_keeps_segment_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("take.wav");
        let layout = OutputLayout::new(&Destination::Alongside, &input, "wav");

        let original = Audio::new(vec![0.2; 2 * 44_100], 2, 44_100);
        let cut_list = cuts(&[0, 333, 777, 999]);
        let segments = plan(&cut_list, None);
        export(&original, &segments, &layout, Fade::Both, false).unwrap();

        for segment in &segments {
            let clip = Audio::open(&layout.slice_path(segment.index)).unwrap();
            let expected = segment.end - segment.start;
            assert!(clip.units().abs_diff(expected) <= 1, "{segment:?}");
        }
    }

    #[test]
    fn export_fails_when_directory_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let destination = Destination::Directory(dir.path().join("missing/nested"));
        let layout = OutputLayout::new(&destination, Path::new("loop.wav"), "wav");
        let segments = plan(&cuts(&[0, 10]), None);

        let err = export(&constant(0.1, 20), &segments, &layout, Fade::None, false).unwrap_err();
        assert!(matches!(err, SliceError::Io(_)));
    }
}
