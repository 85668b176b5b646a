use super::gain::ReplayGainData;
use crate::error::Result;
use crate::format::AudioFormat;
use crate::frame::AudioFrame;

/// Control events a pipeline sends to its stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    /// The input format or stream metadata changed.
    Reinit {
        format: AudioFormat,
        replaygain: Option<ReplayGainData>,
    },
    SetVolume(f32),
    GetVolume,
    SetPanBalance(f32),
    SetPlaybackSpeed(f64),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlReply {
    Ok,
    /// The stage is neutral and may be removed from the pipeline.
    Detach,
    Volume(f32),
    /// The stage does not handle this control. Not an error.
    Unknown,
}

/// A pipeline stage.
/// - `control` and `filter_frame` are serialized by the host.
/// - `filter_frame` preserves frame shape.
pub trait Filter: Send {
    fn name(&self) -> &'static str;
    fn control(&mut self, cmd: Control) -> Result<ControlReply>;
    fn filter_frame(&mut self, frame: AudioFrame) -> Result<AudioFrame>;
    /// Format of emitted frames, once initialized.
    fn output_format(&self) -> Option<AudioFormat> {
        None
    }
}
