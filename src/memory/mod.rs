//! Host and device storage for matrices.
//!
//! A dual-memory matrix is made of two storages: one in host memory, which the CPU reads and
//! writes directly, and one in device-addressable memory, which kernels read and write. This
//! module defines the interfaces of both halves together with the options controlling how they
//! are allocated.
//!
//! # Host Memory
//!
//! Host storage is either ordinary pageable memory or page-locked ("pinned") memory. When data
//! is copied from pageable memory to the device, the driver first copies it into a page-locked
//! staging region and only then starts a DMA transfer. Page-locked memory skips that step and
//! can be mapped into the device address space. Since the operating system cannot page it out,
//! excessive use of it slows down the whole system; pinning is selected per matrix through
//! [`HostMemOption`](enum.HostMemOption.html).
//!
//! # Device Memory
//!
//! On a discrete accelerator device memory cannot be accessed from the host, and data moves
//! between the halves by explicit copies. On a platform where host and device share one
//! physical memory, a device storage of the same element type can instead be a view over the
//! host buffer: nothing is allocated, nothing needs copying, and releasing the view frees
//! nothing.
//!
//! # Element Types
//!
//! Elements must implement [`DeviceCopy`](trait.DeviceCopy.html). The host and device halves
//! may use different element types (for instance `f64` and `f32`); they are converted with
//! [`CastTo`](trait.CastTo.html) when copying.

mod cast;
mod options;
pub(crate) mod raw;
mod storage;

pub use self::cast::*;
pub use self::options::*;
pub use self::storage::*;
pub use dualmat_core::{same_representation, DataType, DeviceCopy, DevicePointer};
