//! HIP streams as execution queues.

use crate::error::Result;
use crate::queue::{Queue, StreamHandle};

use super::ffi::{self, check_hip};
use super::set_device;

/// Owned `hipStream_t`, destroyed on drop.
#[derive(Debug)]
pub struct HipStream {
    stream: ffi::HipStream,
    device: usize,
}

// SAFETY: HIP streams may be used from any host thread.
unsafe impl Send for HipStream {}
unsafe impl Sync for HipStream {}

impl HipStream {
    pub fn new(device: usize) -> Result<Self> {
        let api = ffi::hip_api()?;
        set_device(device)?;
        let mut stream: ffi::HipStream = std::ptr::null_mut();
        check_hip(unsafe { (api.stream_create)(&mut stream) }, "hipStreamCreate")?;
        Ok(Self { stream, device })
    }

    /// Block the host until all work enqueued on this stream has finished.
    pub fn synchronize(&self) -> Result<()> {
        let api = ffi::hip_api()?;
        check_hip(unsafe { (api.stream_synchronize)(self.stream) }, "hipStreamSynchronize")
    }

    pub fn device(&self) -> usize {
        self.device
    }
}

impl Queue for HipStream {
    fn stream(&self) -> StreamHandle {
        StreamHandle::from_ptr(self.stream)
    }
}

impl Drop for HipStream {
    fn drop(&mut self) {
        if let Ok(api) = ffi::hip_api() {
            unsafe { (api.stream_destroy)(self.stream) };
        }
    }
}
