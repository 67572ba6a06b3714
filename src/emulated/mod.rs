//! An accelerator emulated in host memory.
//!
//! The emulated backend behaves like a real device as far as a matrix can tell: allocations are
//! accounted against configurable memory limits, page-locked memory may be unavailable, work
//! submitted to a queue runs asynchronously on a worker thread, and the device may be configured
//! to share physical memory with the host. This makes it useful both for running code on
//! machines without an accelerator and for exercising allocation policies (including allocation
//! failures) in tests.
//!
//! # Examples:
//!
//! ```
//! use dualmat::emulated::{Emulated, EmulatedDevice};
//! use dualmat::prelude::*;
//!
//! let device = EmulatedDevice::builder().shared_memory(true).build().unwrap();
//! let mut matrix: DualMatrix<f32, f32, Emulated> = DualMatrix::new();
//! matrix
//!     .alloc(
//!         4,
//!         8,
//!         QueueSource::device(&device),
//!         HostMemOption::RwOptimized,
//!         DeviceMemOption::ReadWrite,
//!     )
//!     .unwrap();
//! assert!(matrix.is_view());
//! assert_eq!(0, device.device_bytes_in_use());
//! ```

mod buffer;
mod queue;

pub use self::buffer::*;
pub use self::queue::*;

use crate::device::{Backend, Device};
use crate::error::{CudaError, CudaResult};
use crate::memory::DeviceCopy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Backend marker for matrices living on an [`EmulatedDevice`](struct.EmulatedDevice.html).
#[derive(Clone, Copy, Debug)]
pub enum Emulated {}

impl Backend for Emulated {
    type Device = EmulatedDevice;
    type Queue = EmulatedQueue;
    type Host<T: DeviceCopy + 'static> = HostBuffer<T>;
    type Dev<T: DeviceCopy + 'static> = EmulatedBuffer<T>;
}

#[derive(Debug)]
struct Pool {
    limit: Option<usize>,
    used: AtomicUsize,
}

impl Pool {
    fn new(limit: Option<usize>) -> Self {
        Pool {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    fn reserve(&self, bytes: usize) -> CudaResult<()> {
        let limit = self.limit;
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                let total = used.checked_add(bytes)?;
                match limit {
                    Some(limit) if total > limit => None,
                    _ => Some(total),
                }
            })
            .map(|_| ())
            .map_err(|_| CudaError::OutOfMemory)
    }

    fn release(&self, bytes: usize) {
        let _ = self.used.fetch_sub(bytes, Ordering::SeqCst);
    }

    fn in_use(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }
}

/// State shared by an emulated device and every queue and storage created from it.
#[derive(Debug)]
pub(crate) struct Platform {
    shared_memory: bool,
    pinned_memory: bool,
    map_pageable_memory: bool,
    host: Pool,
    device: Pool,
}

/// An emulated accelerator.
///
/// Cloning yields another handle onto the same device, sharing its default queue and memory
/// accounting.
#[derive(Clone, Debug)]
pub struct EmulatedDevice {
    platform: Arc<Platform>,
    queue: EmulatedQueue,
}

impl EmulatedDevice {
    /// Create a discrete (non-shared-memory) device with pinned memory support and no memory
    /// limits.
    pub fn new() -> CudaResult<Self> {
        EmulatedDevice::builder().build()
    }

    /// Start configuring a device.
    pub fn builder() -> EmulatedDeviceBuilder {
        EmulatedDeviceBuilder::default()
    }

    /// Create a new queue on this device, independent of the default queue.
    pub fn create_queue(&self) -> CudaResult<EmulatedQueue> {
        EmulatedQueue::spawn(self.platform.clone())
    }

    /// Returns true if page-locked host allocations are available.
    pub fn supports_pinned_memory(&self) -> bool {
        self.platform.pinned_memory
    }

    /// Bytes of host memory currently allocated through this device.
    pub fn host_bytes_in_use(&self) -> usize {
        self.platform.host.in_use()
    }

    /// Bytes of device memory currently allocated on this device. Views are not counted.
    pub fn device_bytes_in_use(&self) -> usize {
        self.platform.device.in_use()
    }
}

impl Device for EmulatedDevice {
    type Queue = EmulatedQueue;

    fn shared_memory(&self) -> bool {
        self.platform.shared_memory
    }

    fn default_queue(&self) -> CudaResult<EmulatedQueue> {
        Ok(self.queue.clone())
    }
}

/// Configuration for an [`EmulatedDevice`](struct.EmulatedDevice.html).
#[derive(Clone, Debug)]
pub struct EmulatedDeviceBuilder {
    shared_memory: bool,
    pinned_memory: bool,
    map_pageable_memory: bool,
    host_memory_limit: Option<usize>,
    device_memory_limit: Option<usize>,
}

impl Default for EmulatedDeviceBuilder {
    fn default() -> Self {
        EmulatedDeviceBuilder {
            shared_memory: false,
            pinned_memory: true,
            map_pageable_memory: true,
            host_memory_limit: None,
            device_memory_limit: None,
        }
    }
}

impl EmulatedDeviceBuilder {
    /// Whether the device shares physical memory with the host. Defaults to `false`.
    pub fn shared_memory(mut self, shared: bool) -> Self {
        self.shared_memory = shared;
        self
    }

    /// Whether page-locked host memory can be allocated. Defaults to `true`.
    pub fn pinned_memory(mut self, pinned: bool) -> Self {
        self.pinned_memory = pinned;
        self
    }

    /// Whether the device can address pageable (`NotPinned`) host memory. Defaults to `true`.
    ///
    /// When `false`, only pinned host buffers can be aliased by the device; a shared-memory
    /// device then allocates the device half of a pageable matrix independently.
    pub fn map_pageable_memory(mut self, mapped: bool) -> Self {
        self.map_pageable_memory = mapped;
        self
    }

    /// Maximum number of bytes of host memory allocated at once.
    pub fn host_memory_limit(mut self, bytes: usize) -> Self {
        self.host_memory_limit = Some(bytes);
        self
    }

    /// Maximum number of bytes of device memory allocated at once.
    pub fn device_memory_limit(mut self, bytes: usize) -> Self {
        self.device_memory_limit = Some(bytes);
        self
    }

    /// Create the device and start its default queue.
    ///
    /// # Errors:
    ///
    /// Returns `UnknownError` if the queue's worker thread cannot be started.
    pub fn build(self) -> CudaResult<EmulatedDevice> {
        let platform = Arc::new(Platform {
            shared_memory: self.shared_memory,
            pinned_memory: self.pinned_memory,
            map_pageable_memory: self.map_pageable_memory,
            host: Pool::new(self.host_memory_limit),
            device: Pool::new(self.device_memory_limit),
        });
        let queue = EmulatedQueue::spawn(platform.clone())?;
        Ok(EmulatedDevice { platform, queue })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_rejects_allocations_over_limit() {
        let pool = Pool::new(Some(64));
        pool.reserve(48).unwrap();
        assert_eq!(Err(CudaError::OutOfMemory), pool.reserve(17));
        pool.reserve(16).unwrap();
        pool.release(64);
        assert_eq!(0, pool.in_use());
    }

    #[test]
    fn unlimited_pool_only_fails_on_overflow() {
        let pool = Pool::new(None);
        pool.reserve(usize::max_value()).unwrap();
        assert_eq!(Err(CudaError::OutOfMemory), pool.reserve(1));
    }

    #[test]
    fn builder_defaults_to_discrete_device() {
        let device = EmulatedDevice::new().unwrap();
        assert!(!device.shared_memory());
        assert!(device.supports_pinned_memory());
        assert_eq!(0, device.host_bytes_in_use());
    }
}
