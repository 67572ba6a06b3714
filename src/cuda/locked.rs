use super::stream::Queue;
use crate::error::{CudaResult, ToResult};
use crate::memory::raw::{allocate_zeroed, byte_size, deallocate, element_count};
use crate::memory::{DeviceCopy, DevicePointer, HostAllocFlags, HostMemOption, HostStorage};
use crate::stream::HasCommandQueue;
use cuda_driver_sys::{self as cuda, CUdeviceptr};
use log::warn;
use std::mem;
use std::os::raw::c_void;
use std::ptr::{self, NonNull};
use std::slice;

/// Host half of a CUDA matrix.
///
/// ## Page-locked Memory
///
/// When transferring data to a CUDA device, the driver must first copy the data to a special
/// memory page which is locked to physical memory. Once complete, it can initiate a DMA transfer
/// to copy the data from physical memory to device memory. Allocating the matrix directly in
/// page-locked memory skips the first step, and lets the device address the matrix without any
/// copy at all.
///
/// The downside is that using excessive amounts of page-locked memory can degrade system
/// performance by reducing the amount of physical memory available to the system for paging.
/// `HostMemOption::NotPinned` allocates ordinary pageable memory instead.
#[derive(Debug)]
pub struct LockedMatrix<T: DeviceCopy> {
    buf: *mut T,
    mapped: DevicePointer<T>,
    rows: usize,
    cols: usize,
    option: Option<HostMemOption>,
    queue: Option<Queue>,
}

impl<T: DeviceCopy> Default for LockedMatrix<T> {
    fn default() -> Self {
        LockedMatrix {
            buf: NonNull::dangling().as_ptr(),
            mapped: DevicePointer::null(),
            rows: 0,
            cols: 0,
            option: None,
            queue: None,
        }
    }
}

impl<T: DeviceCopy> LockedMatrix<T> {
    fn uses_driver_memory(&self) -> bool {
        match self.option {
            Some(option) => option.is_pinned() && self.rows * self.cols * mem::size_of::<T>() > 0,
            None => false,
        }
    }
}

unsafe fn alloc_locked<T>(
    bytes: usize,
    flags: HostAllocFlags,
) -> CudaResult<(*mut T, DevicePointer<T>)> {
    let mut host: *mut c_void = ptr::null_mut();
    cuda::cuMemHostAlloc(&mut host as *mut *mut c_void, bytes, flags.bits()).to_result()?;

    let mut mapped: CUdeviceptr = 0;
    if flags.contains(HostAllocFlags::DEVICEMAP) {
        let result = cuda::cuMemHostGetDevicePointer_v2(&mut mapped as *mut CUdeviceptr, host, 0);
        if let Err(e) = result.to_result() {
            let _ = cuda::cuMemFreeHost(host);
            return Err(e);
        }
    }
    ptr::write_bytes(host as *mut u8, 0, bytes);
    Ok((host as *mut T, DevicePointer::wrap(mapped as *mut T)))
}

impl<T: DeviceCopy> HostStorage<T> for LockedMatrix<T> {
    type Queue = Queue;

    fn alloc(
        &mut self,
        rows: usize,
        cols: usize,
        queue: Queue,
        option: HostMemOption,
    ) -> CudaResult<()> {
        self.clear();
        let count = element_count(rows, cols)?;
        let bytes = byte_size::<T>(count)?;

        let (buf, mapped) = if option.is_pinned() && bytes > 0 {
            unsafe { alloc_locked::<T>(bytes, option.alloc_flags())? }
        } else {
            // Pageable memory is not mapped into the device address space.
            (allocate_zeroed::<T>(count)?, DevicePointer::null())
        };

        self.buf = buf;
        self.mapped = mapped;
        self.rows = rows;
        self.cols = cols;
        self.option = Some(option);
        self.queue = Some(queue);
        Ok(())
    }

    fn clear(&mut self) {
        if self.option.is_some() {
            if self.uses_driver_memory() {
                unsafe {
                    if let Err(e) = cuda::cuMemFreeHost(self.buf as *mut c_void).to_result() {
                        warn!("failed to free page-locked memory: {}", e);
                    }
                }
            } else {
                unsafe { deallocate(self.buf, self.rows * self.cols) };
            }
        }
        self.buf = NonNull::dangling().as_ptr();
        self.mapped = DevicePointer::null();
        self.rows = 0;
        self.cols = 0;
        self.option = None;
        self.queue = None;
    }

    fn zero(&mut self) {
        unsafe { ptr::write_bytes(self.buf, 0, self.numel()) }
    }

    fn zero_first(&mut self, n: usize) {
        debug_assert!(n <= self.numel());
        unsafe { ptr::write_bytes(self.buf, 0, n) }
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn mem_option(&self) -> Option<HostMemOption> {
        self.option
    }

    fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.buf, self.numel()) }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.buf, self.numel()) }
    }

    fn as_ptr(&self) -> *const T {
        self.buf
    }

    fn as_mut_ptr(&mut self) -> *mut T {
        self.buf
    }

    fn device_view(&self) -> DevicePointer<T> {
        self.mapped
    }

    fn cq(&self) -> Option<&Queue> {
        self.queue.as_ref()
    }
}

impl<T: DeviceCopy> HasCommandQueue<Queue> for LockedMatrix<T> {
    fn command_queue(&self) -> Option<&Queue> {
        self.queue.as_ref()
    }
}

impl<T: DeviceCopy> Drop for LockedMatrix<T> {
    fn drop(&mut self) {
        self.clear();
    }
}
