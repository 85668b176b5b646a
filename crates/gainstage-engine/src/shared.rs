use crate::dsp::filter::{Control, ControlReply, Filter};
use crate::error::Result;
use crate::frame::AudioFrame;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable handle to one stage, shared between a control thread and an
/// audio thread. Every call holds the lock for its whole duration, so a
/// control event never lands in the middle of a frame.
pub struct SharedFilter<F: Filter> {
    inner: Arc<Mutex<F>>,
}

impl<F: Filter> Clone for SharedFilter<F> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<F: Filter> SharedFilter<F> {
    pub fn new(filter: F) -> Self {
        Self { inner: Arc::new(Mutex::new(filter)) }
    }

    pub fn control(&self, cmd: Control) -> Result<ControlReply> {
        self.inner.lock().control(cmd)
    }

    pub fn filter_frame(&self, frame: AudioFrame) -> Result<AudioFrame> {
        self.inner.lock().filter_frame(frame)
    }

    /// Direct access for inspection.
    pub fn lock(&self) -> MutexGuard<'_, F> {
        self.inner.lock()
    }

    /// Non-blocking access for real-time callers; `None` while another
    /// thread holds the stage.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, F>> {
        self.inner.try_lock()
    }
}
