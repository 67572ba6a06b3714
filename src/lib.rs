//! Matrices kept in host and device memory at the same time.
//!
//! Numeric kernels running on an accelerator usually need every matrix twice: once in host
//! memory, where the CPU fills and inspects it, and once in memory the device can address. A
//! [`DualMatrix`](matrix/struct.DualMatrix.html) is a single handle to both copies. It keeps
//! them the same shape, zeroes and releases them together, and copies between them on demand.
//!
//! On platforms where the device shares physical memory with the host (integrated GPUs, CPU
//! devices), a matrix whose host and device element types are the same does not allocate device
//! memory at all: the device half is a view over the host buffer.
//!
//! # Backends
//!
//! The storages behind a matrix are chosen by a [`Backend`](device/trait.Backend.html):
//!
//! * [`emulated::Emulated`](emulated/enum.Emulated.html) runs everything in host memory, with
//!   configurable memory limits and shared-memory behavior. It needs no accelerator.
//! * `cuda::Cuda` (feature `cuda`) uses the CUDA driver API.
//!
//! # Element Types
//!
//! Elements must implement [`DeviceCopy`](memory/trait.DeviceCopy.html), which can be derived
//! for structs of `DeviceCopy` fields. The derive refers to `dualmat_core`, so crates using it
//! must depend on `dualmat_core` as well:
//!
//! ```
//! #[macro_use]
//! extern crate dualmat;
//! extern crate dualmat_core;
//!
//! use dualmat::emulated::{Emulated, EmulatedDevice};
//! use dualmat::prelude::*;
//!
//! #[derive(Clone, Copy, DeviceCopy)]
//! #[repr(C)]
//! struct Atom {
//!     position: [f32; 3],
//!     charge: f32,
//! }
//!
//! fn main() {
//!     let device = EmulatedDevice::builder().shared_memory(true).build().unwrap();
//!     let mut atoms: DualMatrix<Atom, Atom, Emulated> = DualMatrix::new();
//!     atoms
//!         .alloc(
//!             1,
//!             64,
//!             QueueSource::device(&device),
//!             HostMemOption::RwOptimized,
//!             DeviceMemOption::ReadWrite,
//!         )
//!         .unwrap();
//!     atoms[0].charge = -1.0;
//!     assert!(atoms.is_view());
//! }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    unused_import_braces,
    unused_results,
    unused_qualifications
)]
#![allow(unknown_lints)]

#[macro_use]
extern crate bitflags;
#[allow(unused_imports)]
#[macro_use]
extern crate dualmat_derive;
#[doc(hidden)]
pub use dualmat_derive::*;

pub mod device;
pub mod emulated;
pub mod error;
pub mod matrix;
pub mod memory;
pub mod prelude;
pub mod stream;

#[cfg(feature = "cuda")]
pub mod cuda;

mod derive_compile_fail;
