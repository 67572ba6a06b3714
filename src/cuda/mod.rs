//! Matrices on CUDA devices, through the CUDA driver API.
//!
//! Available with the `cuda` cargo feature. The host half is a
//! [`LockedMatrix`](struct.LockedMatrix.html), which is page-locked and mapped into the device
//! address space unless `HostMemOption::NotPinned` is requested. The device half is a
//! [`DeviceMatrix`](struct.DeviceMatrix.html). On integrated GPUs, which share physical memory
//! with the CPU, a `DeviceMatrix` of the host's element type is a view over the mapped host
//! buffer rather than an allocation of its own.
//!
//! ```no_run
//! use dualmat::cuda::{ContextFlags, Cuda, CudaDevice};
//! use dualmat::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = CudaDevice::new(0, ContextFlags::MAP_HOST | ContextFlags::SCHED_AUTO)?;
//! let mut forces: DualMatrix<f64, f32, Cuda> = DualMatrix::new();
//! forces.alloc(
//!     1,
//!     1024,
//!     QueueSource::device(&device),
//!     HostMemOption::WriteOptimized,
//!     DeviceMemOption::ReadOnly,
//! )?;
//! forces.zero();
//! forces.update_device()?;
//! forces.sync()?;
//! # Ok(())
//! # }
//! ```

mod device;
mod device_matrix;
mod locked;
mod stream;

pub use self::device::*;
pub use self::device_matrix::*;
pub use self::locked::*;
pub use self::stream::*;

use crate::device::Backend;
use crate::memory::DeviceCopy;

/// Backend marker for matrices living on a CUDA device.
#[derive(Clone, Copy, Debug)]
pub enum Cuda {}

impl Backend for Cuda {
    type Device = CudaDevice;
    type Queue = Queue;
    type Host<T: DeviceCopy + 'static> = LockedMatrix<T>;
    type Dev<T: DeviceCopy + 'static> = DeviceMatrix<T>;
}
