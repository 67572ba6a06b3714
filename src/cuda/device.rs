use super::stream::{Queue, Stream, StreamFlags};
use crate::device::Device;
use crate::error::{CudaResult, ToResult};
use cuda_driver_sys::{self as cuda, CUcontext, CUdevice, CUdevice_attribute};
use std::os::raw::{c_int, c_uint};
use std::ptr;
use std::sync::Arc;

bitflags! {
    /// Bit flags for initializing the CUDA context of a device.
    pub struct ContextFlags: c_uint {
        /// Instead of spinning or yielding, let the driver choose based on the number of
        /// contexts and processors.
        const SCHED_AUTO = 0x00;

        /// Actively spin while waiting for results from the device.
        const SCHED_SPIN = 0x01;

        /// Yield the thread while waiting for results from the device.
        const SCHED_YIELD = 0x02;

        /// Block the thread on a synchronization primitive while waiting for the device.
        const SCHED_BLOCKING_SYNC = 0x04;

        /// Support mapped page-locked allocations. Required for matrices whose device half
        /// aliases host memory.
        const MAP_HOST = 0x08;

        /// Do not reduce local memory after resizing it for a kernel.
        const LMEM_RESIZE_TO_MAX = 0x10;
    }
}

#[derive(Debug)]
pub(crate) struct DeviceInner {
    pub(crate) ordinal: CUdevice,
    pub(crate) integrated: bool,
    context: CUcontext,
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        if self.context.is_null() {
            return;
        }
        unsafe {
            if let Err(e) = cuda::cuCtxDestroy_v2(self.context).to_result() {
                log::warn!("failed to destroy CUDA context of device {}: {}", self.ordinal, e);
            }
        }
    }
}

/// A CUDA device together with the context and default stream matrices are allocated in.
///
/// The context is made current on the creating thread. Allocations must happen on a thread
/// where it is current.
#[derive(Debug)]
pub struct CudaDevice {
    queue: Queue,
    inner: Arc<DeviceInner>,
}

impl CudaDevice {
    /// Initialize the driver, create a context on device `ordinal` and a non-blocking default
    /// stream.
    ///
    /// # Errors:
    ///
    /// Returns any error raised by the driver, e.g. `NoDevice` or `InvalidDevice`.
    pub fn new(ordinal: u32, flags: ContextFlags) -> CudaResult<Self> {
        unsafe {
            cuda::cuInit(0).to_result()?;

            let mut device: CUdevice = 0;
            cuda::cuDeviceGet(&mut device as *mut CUdevice, ordinal as c_int).to_result()?;

            let mut integrated: c_int = 0;
            cuda::cuDeviceGetAttribute(
                &mut integrated as *mut c_int,
                CUdevice_attribute::CU_DEVICE_ATTRIBUTE_INTEGRATED,
                device,
            )
            .to_result()?;

            let mut context: CUcontext = ptr::null_mut();
            cuda::cuCtxCreate_v2(&mut context as *mut CUcontext, flags.bits(), device)
                .to_result()?;

            let inner = Arc::new(DeviceInner {
                ordinal: device,
                // Aliasing host buffers needs them mapped into the device address space.
                integrated: integrated != 0 && flags.contains(ContextFlags::MAP_HOST),
                context,
            });
            let stream = Stream::new(StreamFlags::NON_BLOCKING, None)?;
            Ok(CudaDevice {
                queue: Queue::new(stream, inner.clone()),
                inner,
            })
        }
    }

    /// Create another stream on this device, independent of the default one.
    pub fn create_queue(&self, flags: StreamFlags, priority: Option<i32>) -> CudaResult<Queue> {
        Ok(Queue::new(Stream::new(flags, priority)?, self.inner.clone()))
    }

    /// The device ordinal.
    pub fn ordinal(&self) -> i32 {
        self.inner.ordinal
    }
}

impl Device for CudaDevice {
    type Queue = Queue;

    fn shared_memory(&self) -> bool {
        self.inner.integrated
    }

    fn default_queue(&self) -> CudaResult<Queue> {
        Ok(self.queue.clone())
    }
}
