use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use ebur128::{EbuR128, Mode};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::SampleFormat as CodecSampleFormat;
use wavers::{Samples, Wav, WavType};

use crate::error::SliceError;

/// One loudness unit is one millisecond of audio.
pub const UNITS_PER_SECOND: u64 = 1000;

/// RMS values are reported on a 16-bit full scale so that the absolute
/// derivative guard of the detector keeps its meaning across bit depths.
const FULL_SCALE: f64 = i16::MAX as f64;

pub type LoudnessSignal = Vec<f64>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SampleFormat {
    #[default]
    Pcm16,
    Pcm32,
    Float32,
    Float64,
}

impl SampleFormat {
    fn from_wav_type(wav_type: WavType) -> Self {
        match wav_type {
            WavType::Pcm16 | WavType::EPcm16 => SampleFormat::Pcm16,
            // no 24-bit writer, widen instead of truncating
            WavType::Pcm24 | WavType::EPcm24 | WavType::Pcm32 | WavType::EPcm32 => {
                SampleFormat::Pcm32
            }
            WavType::Float32 | WavType::EFloat32 => SampleFormat::Float32,
            WavType::Float64 | WavType::EFloat64 => SampleFormat::Float64,
        }
    }

    fn from_codec(sample_format: Option<CodecSampleFormat>, bits: Option<u32>) -> Self {
        match (sample_format, bits) {
            (Some(CodecSampleFormat::F64), _) => SampleFormat::Float64,
            (Some(CodecSampleFormat::F32), _) => SampleFormat::Float32,
            (_, Some(bits)) if bits <= 16 => SampleFormat::Pcm16,
            (_, Some(_)) => SampleFormat::Pcm32,
            // lossy codecs carry no bit depth
            (_, None) => SampleFormat::Float32,
        }
    }
}

/// Decoded audio, interleaved and normalised so that full scale is 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct Audio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub format: SampleFormat,
}

impl Audio {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            format: SampleFormat::default(),
        }
    }

    pub fn with_format(mut self, format: SampleFormat) -> Self {
        self.format = format;
        self
    }

    /// WAV goes through wavers, every other extension through symphonia.
    pub fn open(path: &Path) -> Result<Self, SliceError> {
        let audio = if format_of(path) == "wav" {
            Self::open_wav(path)?
        } else {
            Self::decode(path)?
        };

        if audio.sample_rate == 0 || audio.channels == 0 {
            return Err(SliceError::InvalidAudio(format!(
                "{}: {} Hz, {} channels",
                path.display(),
                audio.sample_rate,
                audio.channels
            )));
        }
        Ok(audio)
    }

    fn open_wav(path: &Path) -> Result<Self, SliceError> {
        let mut wav: Wav<f32> = Wav::from_path(path)?;
        let (_, spec) = wav.wav_spec();
        let sample_rate = u32::try_from(spec.fmt_chunk.sample_rate).unwrap_or(0);
        let channels = wav.n_channels();
        let format = SampleFormat::from_wav_type(wav.encoding());

        let samples = wav.read()?.to_vec();
        Ok(Self::new(samples, channels, sample_rate).with_format(format))
    }

    fn decode(path: &Path) -> Result<Self, SliceError> {
        let source = MediaSourceStream::new(Box::new(File::open(path)?), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SliceError::InvalidAudio(format!("{}: no audio track", path.display())))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let mut decoder =
            symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;
        let mut sample_rate = params.sample_rate.unwrap_or(0);
        let mut channels = params.channels.map_or(0, |layout| layout.count() as u16);
        let mut samples = Vec::new();

        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count() as u16;
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buffer.samples());
                }
                // a corrupt packet is skipped, the rest of the stream is still usable
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        let format = SampleFormat::from_codec(params.sample_format, params.bits_per_sample);
        Ok(Self::new(samples, channels, sample_rate).with_format(format))
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn units(&self) -> usize {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64 * UNITS_PER_SECOND / self.sample_rate as u64) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    fn unit_to_frame(&self, unit: usize) -> usize {
        let frame = unit as u64 * self.sample_rate as u64 / UNITS_PER_SECOND;
        (frame as usize).min(self.frames())
    }

    pub fn loudness(&self) -> LoudnessSignal {
        let channels = self.channels as usize;
        (0..self.units())
            .map(|unit| {
                let start = self.unit_to_frame(unit) * channels;
                let end = self.unit_to_frame(unit + 1) * channels;
                rms(&self.samples[start..end]) * FULL_SCALE
            })
            .collect()
    }

    pub fn slice(&self, start: usize, end: usize) -> Audio {
        let channels = self.channels as usize;
        let first = self.unit_to_frame(start);
        let last = self.unit_to_frame(end).max(first);
        Audio::new(
            self.samples[first * channels..last * channels].to_vec(),
            self.channels,
            self.sample_rate,
        )
        .with_format(self.format)
    }

    pub fn export(&self, path: &Path) -> Result<(), SliceError> {
        let sample_rate = self.sample_rate as i32;
        let samples = Samples::<f32>::from(self.samples.as_slice());
        match self.format {
            SampleFormat::Pcm16 => {
                wavers::write(path, &samples.convert::<i16>(), sample_rate, self.channels)?
            }
            SampleFormat::Pcm32 => {
                wavers::write(path, &samples.convert::<i32>(), sample_rate, self.channels)?
            }
            SampleFormat::Float32 => wavers::write(path, &samples, sample_rate, self.channels)?,
            SampleFormat::Float64 => {
                wavers::write(path, &samples.convert::<f64>(), sample_rate, self.channels)?
            }
        }
        Ok(())
    }

    /// EBU R128 integrated loudness, `None` when the clip is too short or
    /// silent to be gated.
    pub fn integrated_lufs(&self) -> Result<Option<f64>, SliceError> {
        let mut meter = EbuR128::new(self.channels.into(), self.sample_rate, Mode::I)?;
        meter.add_frames_f32(&self.samples)?;
        let lufs = meter.loudness_global()?;
        Ok(lufs.is_finite().then_some(lufs))
    }
}

pub fn format_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_sq / samples.len() as f64).sqrt()
}
