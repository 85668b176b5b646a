//! Gain stage for an audio pipeline.
//!
//! [`VolumeFilter`] folds a user volume, a static dB level, replaygain
//! metadata and a fallback level into one scalar, scales each frame in
//! 16-bit fixed point or float, and tells the host when it can be dropped.

#[cfg(feature = "device")]
pub mod devices;
pub mod dsp;
pub mod error;
pub mod format;
pub mod frame;
pub mod graph;
#[cfg(feature = "device")]
pub mod player;
pub mod render;
pub mod shared;
pub mod volume;

pub use dsp::filter::{Control, ControlReply, Filter};
pub use dsp::gain::{db_to_gain, FilterState, ReplayGainData};
pub use error::{Error, Result};
pub use format::{negotiate, AudioFormat, InternalFormat, Representation, SampleFormat};
pub use frame::{AudioFrame, Plane};
pub use graph::Chain;
pub use render::BlockRenderer;
pub use shared::SharedFilter;
pub use volume::{Negotiation, VolumeFilter};

pub use gainstage_opts::{OptionsError, ReplayGainMode, VolumeOptions};
