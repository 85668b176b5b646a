use crate::dsp::filter::{Control, ControlReply, Filter};
use crate::dsp::gain::ReplayGainData;
use crate::error::Result;
use crate::format::AudioFormat;
use crate::frame::AudioFrame;

/// A serial chain of filters. Owns the filters; neutral ones are dropped
/// when they ask to detach.
#[derive(Default)]
pub struct Chain {
    filters: Vec<Box<dyn Filter>>,
}

impl Chain {
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    pub fn push(&mut self, fx: Box<dyn Filter>) {
        self.filters.push(fx);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|fx| fx.name()).collect()
    }

    /// Reinitialize every stage for `input`. Each stage sees the format the
    /// previous one emits. Returns the format frames must be handed in.
    pub fn reinit(
        &mut self,
        input: AudioFormat,
        replaygain: Option<ReplayGainData>,
    ) -> Result<AudioFormat> {
        let mut format = input;
        let mut first: Option<AudioFormat> = None;
        let mut kept: Vec<Box<dyn Filter>> = Vec::with_capacity(self.filters.len());
        let mut pending = std::mem::take(&mut self.filters).into_iter();

        while let Some(mut fx) = pending.next() {
            let reply = match fx.control(Control::Reinit { format, replaygain }) {
                Ok(reply) => reply,
                Err(e) => {
                    kept.push(fx);
                    kept.extend(pending);
                    self.filters = kept;
                    return Err(e);
                }
            };
            if reply == ControlReply::Detach {
                log::info!("detaching neutral stage `{}`", fx.name());
                continue;
            }
            let out = fx.output_format().unwrap_or(format);
            let wanted = AudioFormat { sample: out.sample, ..format };
            if first.is_none() {
                first = Some(wanted);
            }
            format = out;
            kept.push(fx);
        }
        self.filters = kept;
        Ok(first.unwrap_or(input))
    }

    pub fn set_volume(&mut self, vol: f32) -> Result<()> {
        for fx in self.filters.iter_mut() {
            fx.control(Control::SetVolume(vol))?;
        }
        Ok(())
    }

    /// Volume reported by the first stage that knows about volume.
    pub fn volume(&mut self) -> Result<Option<f32>> {
        for fx in self.filters.iter_mut() {
            if let ControlReply::Volume(v) = fx.control(Control::GetVolume)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    /// Run one frame through every stage.
    pub fn process(&mut self, frame: AudioFrame) -> Result<AudioFrame> {
        self.filters
            .iter_mut()
            .try_fold(frame, |frame, fx| fx.filter_frame(frame))
    }
}
