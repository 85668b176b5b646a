use crate::format::Representation;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// A shared plane could not be copied for writing. The plane is untouched.
    #[error("out of memory copying a {bytes}-byte plane for writing")]
    OutOfMemory { bytes: usize },
    #[error("frame received before the stage was initialized")]
    NotConfigured,
    #[error("frame holds {found:?} samples but the stage negotiated {expected:?}")]
    FormatMismatch {
        expected: Representation,
        found: Representation,
    },
    #[error("malformed frame: {0}")]
    FrameShape(String),
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
}
