//! Streams of work for the device to perform.
//!
//! In CUDA, most work is performed asynchronously. Even tasks such as memory copying can be
//! scheduled by the host and performed when ready. Scheduling this work is done using a Stream.
//! Each task in a stream is performed in the order it was scheduled, and tasks within a stream
//! cannot overlap. The host can wait for all work scheduled in a stream to be completed.

use super::device::DeviceInner;
use crate::error::{CudaResult, ToResult};
use crate::stream::CommandQueue;
use cuda_driver_sys::{self as cuda, CUstream};
use std::mem;
use std::ptr;
use std::sync::Arc;

bitflags! {
    /// Bit flags for configuring a CUDA Stream.
    pub struct StreamFlags: u32 {
        /// No flags set.
        const DEFAULT = 0x00;

        /// This stream does not synchronize with the NULL stream.
        ///
        /// All work within a single stream is ordered and asynchronous regardless of whether
        /// this flag is set. Work on other streams may not run concurrently with work on the
        /// legacy NULL stream unless this flag is set.
        const NON_BLOCKING = 0x01;
    }
}

/// A stream of work for the device to perform.
///
/// See the module-level documentation for more information.
#[derive(Debug)]
pub struct Stream {
    inner: CUstream,
}

impl Stream {
    /// Create a new stream with the given flags and optional priority.
    ///
    /// Lower numbers represent greater priorities. If priority is set outside the range the
    /// device supports, it will be clamped to the nearest valid value.
    pub fn new(flags: StreamFlags, priority: Option<i32>) -> CudaResult<Stream> {
        unsafe {
            let mut stream = Stream {
                inner: ptr::null_mut(),
            };
            cuda::cuStreamCreateWithPriority(
                &mut stream.inner as *mut CUstream,
                flags.bits(),
                priority.unwrap_or(0),
            )
            .to_result()?;
            Ok(stream)
        }
    }

    /// Wait until the device has completed all operations scheduled for this stream.
    pub fn synchronize(&self) -> CudaResult<()> {
        unsafe { cuda::cuStreamSynchronize(self.inner).to_result() }
    }

    /// Raw handle, for passing to kernel launches.
    pub fn as_inner(&self) -> CUstream {
        self.inner
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if self.inner.is_null() {
            return;
        }

        unsafe {
            let inner = mem::replace(&mut self.inner, ptr::null_mut());
            if let Err(e) = cuda::cuStreamDestroy_v2(inner).to_result() {
                log::warn!("failed to destroy CUDA stream: {}", e);
            }
        }
    }
}

/// A shared handle onto a [`Stream`](struct.Stream.html), used as the command queue of CUDA
/// matrices.
///
/// The queue keeps the device context alive, so the stream is always destroyed before its
/// context.
#[derive(Clone, Debug)]
pub struct Queue {
    stream: Arc<Stream>,
    device: Arc<DeviceInner>,
}

impl Queue {
    pub(crate) fn new(stream: Stream, device: Arc<DeviceInner>) -> Self {
        Queue {
            stream: Arc::new(stream),
            device,
        }
    }

    /// The underlying stream.
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Returns true if `self` and `other` are handles onto the same stream.
    pub fn same_queue(&self, other: &Queue) -> bool {
        Arc::ptr_eq(&self.stream, &other.stream)
    }
}

impl CommandQueue for Queue {
    fn synchronize(&self) -> CudaResult<()> {
        self.stream.synchronize()
    }

    fn shared_memory(&self) -> bool {
        self.device.integrated
    }
}
