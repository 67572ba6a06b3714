//! Types for error handling
//!
//! # Error handling in dualmat
//!
//! Allocation failures are never panics. Every fallible operation returns a `CudaResult`, and
//! an error raised by a storage (host or device) is handed back to the caller unchanged so the
//! caller can decide whether to retry, for instance falling back from pinned to pageable memory.
//!
//! Releasing memory happens in `Drop`, where errors cannot be returned; driver failures there
//! are logged as warnings.

use std::error::Error;
use std::fmt;
use std::result::Result;

#[cfg(feature = "cuda")]
use cuda_driver_sys::cudaError_enum;

/// Error enum which represents all the potential errors returned by dualmat and its storages.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CudaError {
    // Errors reported by a storage or the driver
    InvalidValue,
    OutOfMemory,
    NotInitialized,
    Deinitialized,
    NoDevice,
    InvalidDevice,
    InvalidContext,
    InvalidHandle,
    NotSupported,
    HostMemoryAlreadyRegistered,
    LaunchFailed,
    IllegalAddress,
    UnknownError,

    // dualmat errors
    InvalidMemoryAllocation,
    AlreadyAllocated,
    NotAllocated,

    #[doc(hidden)]
    __Nonexhaustive,
}

impl fmt::Display for CudaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CudaError::InvalidValue => write!(f, "Invalid value"),
            CudaError::OutOfMemory => write!(f, "Out of memory"),
            CudaError::NotInitialized => write!(f, "Driver not initialized"),
            CudaError::Deinitialized => write!(f, "Driver is shutting down"),
            CudaError::NoDevice => write!(f, "No capable device detected"),
            CudaError::InvalidDevice => write!(f, "Invalid device ordinal"),
            CudaError::InvalidContext => write!(f, "Invalid or missing context"),
            CudaError::InvalidHandle => write!(f, "Invalid handle or no command queue available"),
            CudaError::NotSupported => write!(f, "Operation not supported on this device"),
            CudaError::HostMemoryAlreadyRegistered => write!(f, "Host memory already registered"),
            CudaError::LaunchFailed => write!(f, "Launch failed"),
            CudaError::IllegalAddress => write!(f, "Illegal memory access"),
            CudaError::UnknownError => write!(f, "Unknown error"),
            CudaError::InvalidMemoryAllocation => write!(f, "Invalid memory allocation size"),
            CudaError::AlreadyAllocated => {
                write!(f, "Matrix is already allocated; clear it before allocating again")
            }
            CudaError::NotAllocated => write!(f, "Matrix is not allocated on both sides"),
            CudaError::__Nonexhaustive => write!(f, "__Nonexhaustive"),
        }
    }
}

impl Error for CudaError {}

/// Result type for most dualmat functions.
pub type CudaResult<T> = Result<T, CudaError>;


#[cfg(feature = "cuda")]
pub(crate) trait ToResult {
    fn to_result(self) -> CudaResult<()>;
}

#[cfg(feature = "cuda")]
impl ToResult for cudaError_enum {
    fn to_result(self) -> CudaResult<()> {
        match self {
            cudaError_enum::CUDA_SUCCESS => Ok(()),
            cudaError_enum::CUDA_ERROR_INVALID_VALUE => Err(CudaError::InvalidValue),
            cudaError_enum::CUDA_ERROR_OUT_OF_MEMORY => Err(CudaError::OutOfMemory),
            cudaError_enum::CUDA_ERROR_NOT_INITIALIZED => Err(CudaError::NotInitialized),
            cudaError_enum::CUDA_ERROR_DEINITIALIZED => Err(CudaError::Deinitialized),
            cudaError_enum::CUDA_ERROR_NO_DEVICE => Err(CudaError::NoDevice),
            cudaError_enum::CUDA_ERROR_INVALID_DEVICE => Err(CudaError::InvalidDevice),
            cudaError_enum::CUDA_ERROR_INVALID_CONTEXT => Err(CudaError::InvalidContext),
            cudaError_enum::CUDA_ERROR_INVALID_HANDLE => Err(CudaError::InvalidHandle),
            cudaError_enum::CUDA_ERROR_NOT_SUPPORTED => Err(CudaError::NotSupported),
            cudaError_enum::CUDA_ERROR_HOST_MEMORY_ALREADY_REGISTERED => {
                Err(CudaError::HostMemoryAlreadyRegistered)
            }
            cudaError_enum::CUDA_ERROR_LAUNCH_FAILED => Err(CudaError::LaunchFailed),
            cudaError_enum::CUDA_ERROR_ILLEGAL_ADDRESS => Err(CudaError::IllegalAddress),
            _ => Err(CudaError::UnknownError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_without_debug_noise() {
        assert_eq!("Out of memory", CudaError::OutOfMemory.to_string());
        assert!(CudaError::AlreadyAllocated.to_string().contains("clear"));
    }

    #[test]
    fn errors_box_as_std_error() {
        let boxed: Box<dyn Error> = Box::new(CudaError::NotSupported);
        assert_eq!("Operation not supported on this device", boxed.to_string());
    }
}
