//! Real-time rendering of interleaved float blocks through a shared stage.

use crate::dsp::scale::scale_f32;
use crate::error::{Error, Result};
use crate::format::{InternalFormat, Representation};
use crate::frame::{AudioFrame, Plane};
use crate::shared::SharedFilter;
use crate::volume::VolumeFilter;
use std::sync::Arc;

/// Owns the scratch plane an audio callback hands to the stage. Once the
/// scratch has grown to the callback's block size, rendering neither
/// allocates nor waits on the control thread.
pub struct BlockRenderer {
    filter: SharedFilter<VolumeFilter>,
    format: InternalFormat,
    scratch: Vec<Plane>,
    /// Gain and clip mode seen on the last locked block.
    gain: f32,
    soft: bool,
}

impl BlockRenderer {
    /// `capacity` is the largest block, in samples, the caller expects.
    pub fn new(filter: SharedFilter<VolumeFilter>, capacity: usize) -> Result<Self> {
        let (format, gain, soft) = {
            let stage = filter.lock();
            let format = *stage.format().ok_or(Error::NotConfigured)?;
            (format, stage.effective_gain(), stage.state().soft_clip)
        };
        if format.repr != Representation::Float || format.planar {
            return Err(Error::UnsupportedFormat(format!(
                "block rendering needs interleaved float, stage negotiated {format:?}"
            )));
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity).map_err(|_| Error::OutOfMemory {
            bytes: capacity * std::mem::size_of::<f32>(),
        })?;
        Ok(Self {
            filter,
            format,
            scratch: vec![Plane::Float(Arc::new(buf))],
            gain,
            soft,
        })
    }

    /// Scale `input` into `out` (same length, whole sample frames). A block
    /// the stage rejects comes out silent.
    pub fn render(&mut self, input: &[f32], out: &mut [f32]) {
        debug_assert_eq!(input.len(), out.len());
        let Some(stage) = self.filter.try_lock() else {
            // control thread is busy with the stage
            out.copy_from_slice(input);
            scale_f32(out, self.gain, self.soft);
            return;
        };
        self.gain = stage.effective_gain();
        self.soft = stage.state().soft_clip;

        let mut planes = std::mem::take(&mut self.scratch);
        let filled = match planes.as_mut_slice() {
            [Plane::Float(data)] => match Arc::get_mut(data) {
                Some(buf) => {
                    buf.clear();
                    buf.extend_from_slice(input);
                    true
                }
                None => false,
            },
            _ => false,
        };
        if !filled {
            planes = vec![Plane::Float(Arc::new(input.to_vec()))];
        }

        match AudioFrame::new(self.format, planes).and_then(|f| stage.process(f)) {
            Ok(frame) => {
                let planes = frame.into_planes();
                match planes.first().and_then(Plane::as_f32) {
                    Some(data) if data.len() == out.len() => out.copy_from_slice(data),
                    _ => out.fill(0.0),
                }
                self.scratch = planes;
            }
            Err(e) => {
                log::error!("dropping block: {e}");
                out.fill(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::filter::Control;
    use crate::format::{AudioFormat, SampleFormat};
    use gainstage_opts::VolumeOptions;

    fn shared(opts: &str, input: AudioFormat) -> SharedFilter<VolumeFilter> {
        let f = SharedFilter::new(VolumeFilter::new(&VolumeOptions::parse(opts).unwrap()));
        f.control(Control::Reinit { format: input, replaygain: None }).unwrap();
        f
    }

    fn scratch_ptr(r: &BlockRenderer) -> *const f32 {
        r.scratch[0].as_f32().unwrap().as_ptr()
    }

    #[test]
    fn steady_state_reuses_the_scratch_plane() {
        let f = shared("volumedb=-6.0206", AudioFormat::interleaved(SampleFormat::Float, 2, 48000));
        let mut r = BlockRenderer::new(f, 8).unwrap();
        let before = scratch_ptr(&r);

        let mut out = [0.0f32; 4];
        r.render(&[0.5, -0.5, 0.25, 1.0], &mut out);
        assert!((out[0] - 0.25).abs() < 1e-4);
        assert!((out[3] - 0.5).abs() < 1e-4);
        r.render(&[0.1, 0.2], &mut out[..2]);
        assert!((out[1] - 0.1).abs() < 1e-4);
        assert_eq!(scratch_ptr(&r), before);
    }

    #[test]
    fn volume_changes_apply_to_the_next_block() {
        let f = shared("", AudioFormat::interleaved(SampleFormat::Float, 1, 48000));
        let mut r = BlockRenderer::new(f.clone(), 4).unwrap();
        let mut out = [0.0f32; 2];
        r.render(&[0.5, -0.5], &mut out);
        assert_eq!(out, [0.5, -0.5]);

        f.control(Control::SetVolume(0.5)).unwrap();
        r.render(&[0.5, -0.5], &mut out);
        assert_eq!(out, [0.0625, -0.0625]);
    }

    #[test]
    fn busy_stage_falls_back_to_last_gain() {
        let f = shared("volumedb=-6.0206", AudioFormat::interleaved(SampleFormat::Float, 1, 48000));
        let mut r = BlockRenderer::new(f.clone(), 4).unwrap();
        let mut out = [0.0f32; 2];
        r.render(&[0.5, 0.5], &mut out);

        let held = f.lock();
        r.render(&[0.8, -0.8], &mut out);
        drop(held);
        assert!((out[0] - 0.4).abs() < 1e-4);
        assert!((out[1] + 0.4).abs() < 1e-4);
    }

    #[test]
    fn needs_a_configured_interleaved_float_stage() {
        let f = SharedFilter::new(VolumeFilter::new(&VolumeOptions::default()));
        assert_eq!(BlockRenderer::new(f, 4).err(), Some(Error::NotConfigured));

        let f = shared("s16", AudioFormat::interleaved(SampleFormat::S16, 2, 48000));
        assert!(matches!(BlockRenderer::new(f, 4), Err(Error::UnsupportedFormat(_))));
    }
}
