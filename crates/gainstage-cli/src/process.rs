//! Offline rendering of a decoded WAV through the volume stage.

use crate::wav::{float_spec, s16_spec, Samples, WavData};
use anyhow::{bail, Result};
use gainstage_engine::{
    AudioFrame, Chain, InternalFormat, Plane, ReplayGainData, Representation, SampleFormat,
    VolumeFilter, VolumeOptions,
};

pub struct Render {
    pub output: WavData,
    pub detached: bool,
}

/// Run `input` through a volume stage in blocks of `block` sample frames.
pub fn render(
    input: &WavData,
    opts: &VolumeOptions,
    volume: f32,
    replaygain: Option<ReplayGainData>,
    block: usize,
) -> Result<Render> {
    if block == 0 {
        bail!("block size must be at least one sample frame");
    }
    let mut stage = VolumeFilter::new(opts);
    stage.set_volume(volume);

    let mut chain = Chain::new();
    chain.push(Box::new(stage));
    let wanted = chain.reinit(input.format()?, replaygain)?;

    if chain.is_empty() {
        log::info!("stage detached, copying samples through");
        return Ok(Render {
            output: input.clone(),
            detached: true,
        });
    }

    let format = InternalFormat {
        repr: match wanted.sample {
            SampleFormat::S16 => Representation::Fixed16,
            _ => Representation::Float,
        },
        planar: wanted.planar,
        channels: wanted.channels,
        rate: wanted.rate,
    };
    let step = block * format.samples_per_frame();
    let (channels, rate) = (format.channels, format.rate);

    let output = match format.repr {
        Representation::Fixed16 => {
            let source = input.samples.to_i16();
            let mut out = Vec::with_capacity(source.len());
            for chunk in source.chunks(step) {
                let frame = chain.process(AudioFrame::from_s16(format, chunk.to_vec())?)?;
                for plane in frame.planes() {
                    out.extend_from_slice(plane.as_s16().unwrap_or_default());
                }
            }
            WavData {
                spec: s16_spec(channels, rate),
                samples: Samples::Int {
                    data: out.into_iter().map(i32::from).collect(),
                    bits: 16,
                },
            }
        }
        Representation::Float => {
            let source = input.samples.to_f32();
            let mut out = Vec::with_capacity(source.len());
            for chunk in source.chunks(step) {
                let frame = chain.process(AudioFrame::from_f32(format, chunk.to_vec())?)?;
                for plane in frame.into_planes() {
                    if let Plane::Float(data) = plane {
                        out.extend_from_slice(&data);
                    }
                }
            }
            WavData {
                spec: float_spec(channels, rate),
                samples: Samples::Float(out),
            }
        }
    };
    Ok(Render {
        output,
        detached: false,
    })
}
