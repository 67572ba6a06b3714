//! Devices and the backends that bundle a device with its storage types.

use crate::error::CudaResult;
use crate::memory::{DeviceCopy, DeviceStorage, HostStorage};
use crate::stream::CommandQueue;

/// An accelerator that matrices can be allocated against.
pub trait Device {
    /// The command queue type used by this device.
    type Queue: CommandQueue;

    /// Returns true if host and device share one physical memory, so that device allocations
    /// can alias host buffers instead of copying them.
    fn shared_memory(&self) -> bool;

    /// Return the default command queue of this device.
    fn default_queue(&self) -> CudaResult<Self::Queue>;
}

/// A family of device, queue and storage types which work together.
///
/// A `DualMatrix<H, D, B>` stores its host half in `B::Host<H>` and its device half in
/// `B::Dev<D>`, and takes its queue from a `B::Device` or any object carrying a `B::Queue`.
pub trait Backend: Sized + 'static {
    /// The device type.
    type Device: Device<Queue = Self::Queue>;
    /// The command queue type shared by every storage of this backend.
    type Queue: CommandQueue;
    /// Host-side storage for elements of type `T`.
    type Host<T: DeviceCopy + 'static>: HostStorage<T, Queue = Self::Queue>;
    /// Device-side storage for elements of type `T`.
    type Dev<T: DeviceCopy + 'static>: DeviceStorage<T, Queue = Self::Queue>;
}
