//! This module re-exports a number of commonly-used types for working with dualmat.
//!
//! This allows the user to `use dualmat::prelude::*;` and have the most commonly-used types
//! available quickly.

pub use crate::device::{Backend, Device};
pub use crate::error::{CudaError, CudaResult};
pub use crate::matrix::{DualMatrix, Placement};
pub use crate::memory::{
    DeviceCopy, DeviceMemOption, DeviceStorage, HostMemOption, HostStorage,
};
pub use crate::stream::{CommandQueue, HasCommandQueue, QueueSource};
