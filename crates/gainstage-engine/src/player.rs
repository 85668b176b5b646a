//! Plays a decoded buffer through a volume stage on an output device.

use crate::devices::pick_output;
use crate::dsp::filter::{Control, ControlReply};
use crate::dsp::gain::ReplayGainData;
use crate::format::{AudioFormat, SampleFormat};
use crate::render::BlockRenderer;
use crate::shared::SharedFilter;
use crate::volume::VolumeFilter;
use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Scratch size, in samples, reserved before the stream starts.
const BLOCK_CAPACITY: usize = 16 * 1024;

#[derive(Debug, Clone, Default)]
pub struct PlayerConfig {
    /// Match output device by substring (case-insensitive).
    pub output_name: Option<String>,
    pub replaygain: Option<ReplayGainData>,
}

pub struct Player {
    _stream: cpal::Stream,
    filter: SharedFilter<VolumeFilter>,
    input: AudioFormat,
    replaygain: Option<ReplayGainData>,
    position: Arc<AtomicUsize>,
    total: usize,
    detached: Arc<AtomicBool>,
}

impl Player {
    /// Start playing interleaved float `samples`. The output device is opened
    /// with the source's channel count and rate; no resampling or channel
    /// mapping is done.
    pub fn start(
        cfg: &PlayerConfig,
        samples: Vec<f32>,
        channels: u16,
        rate: u32,
        filter: SharedFilter<VolumeFilter>,
    ) -> Result<Self> {
        if channels == 0 {
            bail!("source has no channels");
        }
        let host = cpal::default_host();
        let dev = pick_output(&host, cfg.output_name.as_deref())?
            .context("No output device matched (and no default available)")?;
        let dev_cfg = dev.default_output_config().context("No default output config")?;
        if dev_cfg.sample_format() != cpal::SampleFormat::F32 {
            return Err(anyhow!("Unsupported output format: {:?}", dev_cfg.sample_format()));
        }

        let mut out_cfg = dev_cfg.config();
        out_cfg.channels = channels;
        out_cfg.sample_rate = cpal::SampleRate(rate);

        let input = AudioFormat::interleaved(SampleFormat::Float, channels, rate);
        let detached = Arc::new(AtomicBool::new(reinit(&filter, input, cfg.replaygain)?));
        let mut renderer = BlockRenderer::new(filter.clone(), BLOCK_CAPACITY)
            .context("volume stage cannot render float blocks")?;

        // Whole sample frames only.
        let mut samples = samples;
        samples.truncate(samples.len() - samples.len() % channels as usize);
        let total = samples.len();
        let position = Arc::new(AtomicUsize::new(0));

        let stream = dev.build_output_stream::<f32, _, _>(
            &out_cfg,
            {
                let position = Arc::clone(&position);
                let detached = Arc::clone(&detached);
                move |out: &mut [f32], _| {
                    let start = position.load(Ordering::Relaxed);
                    let end = (start + out.len()).min(samples.len());
                    let n = end - start;
                    if n > 0 {
                        let chunk = &samples[start..end];
                        if detached.load(Ordering::Relaxed) {
                            out[..n].copy_from_slice(chunk);
                        } else {
                            renderer.render(chunk, &mut out[..n]);
                        }
                    }
                    out[n..].fill(0.0);
                    position.store(end, Ordering::Relaxed);
                }
            },
            move |err| log::error!("output stream error: {err}"),
            None,
        )?;
        stream.play().context("Failed to play output stream")?;

        Ok(Self {
            _stream: stream,
            filter,
            input,
            replaygain: cfg.replaygain,
            position,
            total,
            detached,
        })
    }

    /// Change the user volume. A detached stage is reinitialized so the new
    /// volume is heard; it stays out only if the result is neutral again.
    pub fn set_volume(&self, vol: f32) -> Result<()> {
        self.filter.control(Control::SetVolume(vol))?;
        if self.is_detached() {
            let neutral = reinit(&self.filter, self.input, self.replaygain)?;
            self.detached.store(neutral, Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.position.load(Ordering::Relaxed) >= self.total
    }

    /// Playback position in seconds.
    pub fn elapsed(&self) -> f64 {
        let frames = self.position.load(Ordering::Relaxed) / self.input.channels as usize;
        frames as f64 / self.input.rate as f64
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Relaxed)
    }
}

/// Reinitialize the stage for `input`; true when it asked to be dropped.
fn reinit(
    filter: &SharedFilter<VolumeFilter>,
    input: AudioFormat,
    replaygain: Option<ReplayGainData>,
) -> Result<bool> {
    let reply = filter.control(Control::Reinit { format: input, replaygain })?;
    let detached = reply == ControlReply::Detach;
    if detached {
        log::info!("volume stage is neutral, playing without it");
    }
    Ok(detached)
}
