//! Stream formats and the choice of internal sample representation.

use crate::error::{Error, Result};

/// Per-sample encoding of the stream handed to the stage by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    Float,
    Double,
}

impl SampleFormat {
    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::Float | SampleFormat::Double)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample: SampleFormat,
    pub planar: bool,
    pub channels: u16,
    pub rate: u32,
}

impl AudioFormat {
    pub fn interleaved(sample: SampleFormat, channels: u16, rate: u32) -> Self {
        Self { sample, planar: false, channels, rate }
    }

    pub fn planar(sample: SampleFormat, channels: u16, rate: u32) -> Self {
        Self { sample, planar: true, channels, rate }
    }
}

/// Numeric representation the stage scales samples in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Signed 16-bit, scaled with an 8-bit fractional integer gain.
    Fixed16,
    /// 32-bit float, nominal range [-1, 1].
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalFormat {
    pub repr: Representation,
    pub planar: bool,
    pub channels: u16,
    pub rate: u32,
}

impl InternalFormat {
    /// One plane per channel when planar, a single interleaved plane otherwise.
    pub fn num_planes(&self) -> usize {
        if self.planar {
            self.channels as usize
        } else {
            1
        }
    }

    /// Values stored per sample frame in each plane.
    pub fn samples_per_frame(&self) -> usize {
        if self.planar {
            1
        } else {
            self.channels as usize
        }
    }

    /// The same format expressed as a host stream format.
    pub fn as_audio_format(&self) -> AudioFormat {
        let sample = match self.repr {
            Representation::Fixed16 => SampleFormat::S16,
            Representation::Float => SampleFormat::Float,
        };
        AudioFormat {
            sample,
            planar: self.planar,
            channels: self.channels,
            rate: self.rate,
        }
    }
}

/// Pick the representation for `input`. Only the numeric representation
/// changes; channel count, rate and planar/interleaved layout carry over.
pub fn negotiate(input: &AudioFormat, fast: bool) -> Result<InternalFormat> {
    if input.channels == 0 {
        return Err(Error::UnsupportedFormat("stream has no channels".into()));
    }
    let repr = if fast && !input.sample.is_float() {
        Representation::Fixed16
    } else {
        Representation::Float
    };
    Ok(InternalFormat {
        repr,
        planar: input.planar,
        channels: input.channels,
        rate: input.rate,
    })
}
