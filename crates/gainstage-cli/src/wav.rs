//! WAV input/output and the sample conversions the host side needs.

use anyhow::{bail, Context, Result};
use gainstage_engine::{AudioFormat, SampleFormat};
use std::path::Path;

/// Samples as stored in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// Signed integers right-aligned to `bits`.
    Int { data: Vec<i32>, bits: u16 },
    Float(Vec<f32>),
}

#[derive(Debug, Clone)]
pub struct WavData {
    pub spec: hound::WavSpec,
    pub samples: Samples,
}

impl WavData {
    pub fn read(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => Samples::Float(
                reader
                    .into_samples::<f32>()
                    .collect::<Result<_, _>>()
                    .context("failed to decode float samples")?,
            ),
            hound::SampleFormat::Int => Samples::Int {
                data: reader
                    .into_samples::<i32>()
                    .collect::<Result<_, _>>()
                    .context("failed to decode integer samples")?,
                bits: spec.bits_per_sample,
            },
        };
        log::info!(
            "read {}: {} ch @ {} Hz, {} bit {:?}",
            path.display(),
            spec.channels,
            spec.sample_rate,
            spec.bits_per_sample,
            spec.sample_format
        );
        Ok(Self { spec, samples })
    }

    /// Stream format the file is presented to the pipeline in.
    pub fn format(&self) -> Result<AudioFormat> {
        let sample = match (&self.samples, self.spec.bits_per_sample) {
            (Samples::Float(_), 32) => SampleFormat::Float,
            (Samples::Int { .. }, 8) => SampleFormat::U8,
            (Samples::Int { .. }, 16) => SampleFormat::S16,
            (Samples::Int { .. }, 24 | 32) => SampleFormat::S32,
            (_, bits) => bail!("unsupported WAV sample width: {bits} bits"),
        };
        Ok(AudioFormat::interleaved(
            sample,
            self.spec.channels,
            self.spec.sample_rate,
        ))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = hound::WavWriter::create(path, self.spec)
            .with_context(|| format!("failed to create {}", path.display()))?;
        match &self.samples {
            Samples::Int { data, .. } => {
                for &s in data {
                    writer.write_sample(s)?;
                }
            }
            Samples::Float(data) => {
                for &s in data {
                    writer.write_sample(s)?;
                }
            }
        }
        writer.finalize()?;
        Ok(())
    }
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Int { data, .. } => data.len(),
            Samples::Float(data) => data.len(),
        }
    }

    /// 16-bit view: wider samples are truncated, narrower ones widened.
    pub fn to_i16(&self) -> Vec<i16> {
        match self {
            Samples::Int { data, bits } => data
                .iter()
                .map(|&s| {
                    if *bits >= 16 {
                        (s >> (bits - 16)) as i16
                    } else {
                        (s << (16 - bits)) as i16
                    }
                })
                .collect(),
            Samples::Float(data) => data
                .iter()
                .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
                .collect(),
        }
    }

    /// Float view in [-1, 1).
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            Samples::Int { data, bits } => {
                let scale = 1.0 / (1u64 << (bits - 1)) as f32;
                data.iter().map(|&s| s as f32 * scale).collect()
            }
            Samples::Float(data) => data.clone(),
        }
    }
}

pub fn s16_spec(channels: u16, sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

pub fn float_spec(channels: u16, sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_map_to_sixteen_bits() {
        let s24 = Samples::Int { data: vec![0x7f_ffff, -0x80_0000, 256], bits: 24 };
        assert_eq!(s24.to_i16(), vec![i16::MAX, i16::MIN, 1]);

        let s8 = Samples::Int { data: vec![127, -128, 1], bits: 8 };
        assert_eq!(s8.to_i16(), vec![127 << 8, i16::MIN, 256]);

        let s16 = Samples::Int { data: vec![-5, 5], bits: 16 };
        assert_eq!(s16.to_i16(), vec![-5, 5]);
    }

    #[test]
    fn float_conversion_is_normalized() {
        let s16 = Samples::Int { data: vec![-32768, 16384], bits: 16 };
        assert_eq!(s16.to_f32(), vec![-1.0, 0.5]);

        let f = Samples::Float(vec![2.0, -0.5]);
        assert_eq!(f.to_i16(), vec![32767, -16384]);
        assert_eq!(f.to_f32(), vec![2.0, -0.5]);
    }

    #[test]
    fn file_round_trip_and_format() {
        let dir = std::env::temp_dir().join(format!("gainstage-wav-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tone.wav");

        let wav = WavData {
            spec: s16_spec(2, 22050),
            samples: Samples::Int { data: vec![1, -1, 300, -300], bits: 16 },
        };
        wav.write(&path).unwrap();
        let back = WavData::read(&path).unwrap();
        assert_eq!(back.samples, wav.samples);
        assert_eq!(
            back.format().unwrap(),
            AudioFormat::interleaved(SampleFormat::S16, 2, 22050)
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
