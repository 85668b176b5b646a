//! The volume stage: state, control handling and per-frame scaling.

use crate::dsp::filter::{Control, ControlReply, Filter};
use crate::dsp::gain::{FilterState, ReplayGainData};
use crate::dsp::scale::process_plane;
use crate::error::{Error, Result};
use crate::format::{negotiate, AudioFormat, InternalFormat};
use crate::frame::AudioFrame;
use gainstage_opts::VolumeOptions;

/// Outcome of a reinit: the format frames must arrive in, and whether the
/// stage is neutral enough to be dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Negotiation {
    pub format: InternalFormat,
    pub detach: bool,
}

#[derive(Debug, Clone)]
pub struct VolumeFilter {
    state: FilterState,
    format: Option<InternalFormat>,
}

impl VolumeFilter {
    pub fn new(opts: &VolumeOptions) -> Self {
        Self {
            state: FilterState::new(opts),
            format: None,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Negotiated format, if the stage has been initialized.
    pub fn format(&self) -> Option<&InternalFormat> {
        self.format.as_ref()
    }

    pub fn reinit(
        &mut self,
        input: &AudioFormat,
        replaygain: Option<&ReplayGainData>,
    ) -> Result<Negotiation> {
        let format = negotiate(input, self.state.fast)?;
        log::debug!("negotiated {:?} for input {:?}", format, input);
        self.state.update_replay_gain(replaygain);
        self.format = Some(format);
        Ok(Negotiation {
            format,
            detach: self.state.should_detach(),
        })
    }

    pub fn set_volume(&mut self, vol: f32) {
        self.state.set_volume(vol);
    }

    pub fn volume(&self) -> f32 {
        self.state.user_volume
    }

    pub fn effective_gain(&self) -> f32 {
        self.state.effective_gain()
    }

    /// Scale every plane of `frame`. Shape is never changed.
    pub fn process(&self, mut frame: AudioFrame) -> Result<AudioFrame> {
        let format = self.format.ok_or(Error::NotConfigured)?;
        if frame.format().repr != format.repr {
            return Err(Error::FormatMismatch {
                expected: format.repr,
                found: frame.format().repr,
            });
        }
        let gain = self.state.effective_gain();
        for plane in frame.planes_mut() {
            process_plane(plane, gain, format.repr, self.state.soft_clip)?;
        }
        Ok(frame)
    }
}

impl Filter for VolumeFilter {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn control(&mut self, cmd: Control) -> Result<ControlReply> {
        match cmd {
            Control::Reinit { format, replaygain } => {
                let negotiated = self.reinit(&format, replaygain.as_ref())?;
                Ok(if negotiated.detach {
                    ControlReply::Detach
                } else {
                    ControlReply::Ok
                })
            }
            Control::SetVolume(vol) => {
                self.set_volume(vol);
                Ok(ControlReply::Ok)
            }
            Control::GetVolume => Ok(ControlReply::Volume(self.volume())),
            _ => Ok(ControlReply::Unknown),
        }
    }

    fn filter_frame(&mut self, frame: AudioFrame) -> Result<AudioFrame> {
        self.process(frame)
    }

    fn output_format(&self) -> Option<AudioFormat> {
        self.format.map(|f| f.as_audio_format())
    }
}
