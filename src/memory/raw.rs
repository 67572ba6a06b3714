//! Pageable host allocations shared by the backends.

use crate::error::{CudaError, CudaResult};
use std::alloc::{self, Layout};
use std::mem;
use std::ptr::NonNull;

pub(crate) fn element_count(rows: usize, cols: usize) -> CudaResult<usize> {
    rows.checked_mul(cols)
        .ok_or(CudaError::InvalidMemoryAllocation)
}

pub(crate) fn byte_size<T>(count: usize) -> CudaResult<usize> {
    count
        .checked_mul(mem::size_of::<T>())
        .ok_or(CudaError::InvalidMemoryAllocation)
}

// Zero-initialized so the host can hand out slices before anything was written.
pub(crate) fn allocate_zeroed<T>(count: usize) -> CudaResult<*mut T> {
    let layout = Layout::array::<T>(count).map_err(|_| CudaError::InvalidMemoryAllocation)?;
    if layout.size() == 0 {
        return Ok(NonNull::dangling().as_ptr());
    }
    let ptr = unsafe { alloc::alloc_zeroed(layout) } as *mut T;
    if ptr.is_null() {
        Err(CudaError::OutOfMemory)
    } else {
        Ok(ptr)
    }
}

pub(crate) unsafe fn deallocate<T>(ptr: *mut T, count: usize) {
    if let Ok(layout) = Layout::array::<T>(count) {
        if layout.size() > 0 {
            alloc::dealloc(ptr as *mut u8, layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_layouts_are_rejected() {
        assert_eq!(
            Err(CudaError::InvalidMemoryAllocation),
            element_count(usize::max_value(), 2)
        );
        assert_eq!(
            Err(CudaError::InvalidMemoryAllocation),
            byte_size::<u64>(usize::max_value() / 2)
        );
    }

    #[test]
    fn zero_sized_allocations_are_dangling() {
        let ptr = allocate_zeroed::<f32>(0).unwrap();
        assert!(!ptr.is_null());
        unsafe { deallocate(ptr, 0) };
    }

    #[test]
    fn allocations_are_zeroed() {
        let ptr = allocate_zeroed::<u32>(8).unwrap();
        let values = unsafe { std::slice::from_raw_parts(ptr, 8) };
        assert!(values.iter().all(|&x| x == 0));
        unsafe { deallocate(ptr, 8) };
    }
}
