//! Host-owned sample storage with copy-on-write planes.

use crate::error::{Error, Result};
use crate::format::{InternalFormat, Representation};
use std::sync::Arc;

/// One plane of samples. Storage may be shared with other frames; writers
/// go through [`Plane::make_writable_s16`] / [`Plane::make_writable_f32`].
#[derive(Debug, Clone, PartialEq)]
pub enum Plane {
    S16(Arc<Vec<i16>>),
    Float(Arc<Vec<f32>>),
}

impl Plane {
    pub fn repr(&self) -> Representation {
        match self {
            Plane::S16(_) => Representation::Fixed16,
            Plane::Float(_) => Representation::Float,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Plane::S16(data) => data.len(),
            Plane::Float(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when no other frame holds this storage.
    pub fn is_exclusive(&self) -> bool {
        match self {
            Plane::S16(data) => Arc::strong_count(data) == 1 && Arc::weak_count(data) == 0,
            Plane::Float(data) => Arc::strong_count(data) == 1 && Arc::weak_count(data) == 0,
        }
    }

    pub fn as_s16(&self) -> Option<&[i16]> {
        match self {
            Plane::S16(data) => Some(data.as_slice()),
            Plane::Float(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Plane::Float(data) => Some(data.as_slice()),
            Plane::S16(_) => None,
        }
    }

    pub fn make_writable_s16(&mut self) -> Result<&mut [i16]> {
        match self {
            Plane::S16(data) => make_writable(data),
            other => Err(Error::FormatMismatch {
                expected: Representation::Fixed16,
                found: other.repr(),
            }),
        }
    }

    pub fn make_writable_f32(&mut self) -> Result<&mut [f32]> {
        match self {
            Plane::Float(data) => make_writable(data),
            other => Err(Error::FormatMismatch {
                expected: Representation::Float,
                found: other.repr(),
            }),
        }
    }
}

/// Mutable access to `data`, cloning it first if the storage is shared.
/// On allocation failure `data` is left as it was.
fn make_writable<T: Copy>(data: &mut Arc<Vec<T>>) -> Result<&mut [T]> {
    if Arc::get_mut(data).is_none() {
        let copy = try_copy(data.as_slice())?;
        log::trace!("copying shared plane of {} samples before write", copy.len());
        *data = Arc::new(copy);
    }
    let bytes = data.len() * std::mem::size_of::<T>();
    Arc::get_mut(data)
        .map(Vec::as_mut_slice)
        .ok_or(Error::OutOfMemory { bytes })
}

fn try_copy<T: Copy>(src: &[T]) -> Result<Vec<T>> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(src.len()).map_err(|_| Error::OutOfMemory {
        bytes: std::mem::size_of_val(src),
    })?;
    copy.extend_from_slice(src);
    Ok(copy)
}

/// A block of audio: `samples` sample frames spread over one or more planes.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    format: InternalFormat,
    samples: usize,
    planes: Vec<Plane>,
}

impl AudioFrame {
    /// Build a frame from already-split planes, checking them against `format`.
    pub fn new(format: InternalFormat, planes: Vec<Plane>) -> Result<Self> {
        if format.channels == 0 {
            return Err(Error::FrameShape("format has no channels".into()));
        }
        if planes.len() != format.num_planes() {
            return Err(Error::FrameShape(format!(
                "expected {} planes, got {}",
                format.num_planes(),
                planes.len()
            )));
        }
        let len = planes.first().map(Plane::len).unwrap_or(0);
        let spf = format.samples_per_frame();
        if len % spf != 0 {
            return Err(Error::FrameShape(format!(
                "plane length {len} is not a multiple of {spf} channels"
            )));
        }
        for plane in &planes {
            if plane.len() != len {
                return Err(Error::FrameShape(format!(
                    "planes differ in length ({} vs {len})",
                    plane.len()
                )));
            }
            if plane.repr() != format.repr {
                return Err(Error::FormatMismatch {
                    expected: format.repr,
                    found: plane.repr(),
                });
            }
        }
        Ok(Self {
            format,
            samples: len / spf,
            planes,
        })
    }

    /// Interleaved 16-bit data in a single plane.
    pub fn from_s16(format: InternalFormat, data: Vec<i16>) -> Result<Self> {
        Self::new(format, vec![Plane::S16(Arc::new(data))])
    }

    /// Interleaved float data in a single plane.
    pub fn from_f32(format: InternalFormat, data: Vec<f32>) -> Result<Self> {
        Self::new(format, vec![Plane::Float(Arc::new(data))])
    }

    pub fn format(&self) -> &InternalFormat {
        &self.format
    }

    /// Sample frames per plane.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// (plane count, values per plane)
    pub fn shape(&self) -> (usize, usize) {
        (
            self.planes.len(),
            self.samples * self.format.samples_per_frame(),
        )
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut [Plane] {
        &mut self.planes
    }

    pub fn into_planes(self) -> Vec<Plane> {
        self.planes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(repr: Representation, planar: bool) -> InternalFormat {
        InternalFormat { repr, planar, channels: 2, rate: 48000 }
    }

    #[test]
    fn interleaved_frame_counts_sample_frames() {
        let frame = AudioFrame::from_f32(stereo(Representation::Float, false), vec![0.0; 8]).unwrap();
        assert_eq!(frame.samples(), 4);
        assert_eq!(frame.shape(), (1, 8));
    }

    #[test]
    fn planar_frame_needs_one_plane_per_channel() {
        let fmt = stereo(Representation::Fixed16, true);
        let planes = vec![Plane::S16(Arc::new(vec![1, 2, 3]))];
        assert!(matches!(AudioFrame::new(fmt, planes), Err(Error::FrameShape(_))));

        let planes = vec![
            Plane::S16(Arc::new(vec![1, 2, 3])),
            Plane::S16(Arc::new(vec![4, 5])),
        ];
        assert!(matches!(AudioFrame::new(fmt, planes), Err(Error::FrameShape(_))));

        let planes = vec![
            Plane::S16(Arc::new(vec![1, 2, 3])),
            Plane::S16(Arc::new(vec![4, 5, 6])),
        ];
        let frame = AudioFrame::new(fmt, planes).unwrap();
        assert_eq!(frame.shape(), (2, 3));
        assert_eq!(frame.samples(), 3);
    }

    #[test]
    fn rejects_partial_interleaved_frames_and_wrong_repr() {
        let err = AudioFrame::from_s16(stereo(Representation::Fixed16, false), vec![0; 3]);
        assert!(matches!(err, Err(Error::FrameShape(_))));
        let err = AudioFrame::from_s16(stereo(Representation::Float, false), vec![0; 4]);
        assert!(matches!(err, Err(Error::FormatMismatch { .. })));
    }

    #[test]
    fn writing_a_shared_plane_copies_it() {
        let shared = Arc::new(vec![1.0f32, 2.0]);
        let mut plane = Plane::Float(Arc::clone(&shared));
        assert!(!plane.is_exclusive());

        plane.make_writable_f32().unwrap()[0] = 9.0;

        assert_eq!(shared.as_slice(), &[1.0, 2.0]);
        assert_eq!(plane.as_f32().unwrap(), &[9.0, 2.0]);
        assert!(plane.is_exclusive());
    }

    #[test]
    fn writing_an_exclusive_plane_keeps_its_storage() {
        let mut plane = Plane::S16(Arc::new(vec![7, 8]));
        let before = plane.as_s16().unwrap().as_ptr();
        plane.make_writable_s16().unwrap()[1] = 0;
        assert_eq!(plane.as_s16().unwrap().as_ptr(), before);
        assert_eq!(plane.as_s16().unwrap(), &[7, 0]);
    }

    #[test]
    fn writable_access_checks_representation() {
        let mut plane = Plane::S16(Arc::new(vec![0]));
        assert_eq!(
            plane.make_writable_f32().unwrap_err(),
            Error::FormatMismatch {
                expected: Representation::Float,
                found: Representation::Fixed16,
            }
        );
    }
}
