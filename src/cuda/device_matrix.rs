use super::stream::Queue;
use crate::error::{CudaError, CudaResult, ToResult};
use crate::memory::raw::{byte_size, element_count};
use crate::memory::{DeviceCopy, DeviceMemOption, DevicePointer, DeviceStorage};
use crate::stream::HasCommandQueue;
use cuda_driver_sys::{self as cuda, CUdeviceptr};
use log::warn;
use std::mem;
use std::os::raw::c_void;

/// Device half of a CUDA matrix: either an allocation in device memory or a view over mapped
/// host memory.
///
/// Device memory cannot be read from the host directly; use `copy_to_host`.
#[derive(Debug)]
pub struct DeviceMatrix<T: DeviceCopy> {
    buf: DevicePointer<T>,
    rows: usize,
    cols: usize,
    owned: bool,
    option: Option<DeviceMemOption>,
    queue: Option<Queue>,
}

impl<T: DeviceCopy> Default for DeviceMatrix<T> {
    fn default() -> Self {
        DeviceMatrix {
            buf: DevicePointer::null(),
            rows: 0,
            cols: 0,
            owned: false,
            option: None,
            queue: None,
        }
    }
}

impl<T: DeviceCopy> DeviceMatrix<T> {
    /// The access hint the memory was allocated with. `None` for views and unallocated
    /// matrices.
    pub fn mem_option(&self) -> Option<DeviceMemOption> {
        self.option
    }

    fn raw(&self) -> CUdeviceptr {
        self.buf.as_raw() as CUdeviceptr
    }

    fn bytes(&self, count: usize) -> usize {
        count * mem::size_of::<T>()
    }

    fn memset_zero(&mut self, count: usize) {
        let bytes = self.bytes(count);
        if bytes == 0 {
            return;
        }
        unsafe {
            if let Err(e) = cuda::cuMemsetD8_v2(self.raw(), 0, bytes).to_result() {
                warn!("failed to zero {} bytes of device memory: {}", bytes, e);
            }
        }
    }
}

impl<T: DeviceCopy> DeviceStorage<T> for DeviceMatrix<T> {
    type Queue = Queue;

    fn alloc(
        &mut self,
        rows: usize,
        cols: usize,
        queue: Queue,
        option: DeviceMemOption,
    ) -> CudaResult<()> {
        self.clear();
        let count = element_count(rows, cols)?;
        let bytes = byte_size::<T>(count)?;

        let mut ptr: CUdeviceptr = 0;
        if bytes > 0 {
            unsafe {
                cuda::cuMemAlloc_v2(&mut ptr as *mut CUdeviceptr, bytes).to_result()?;
                if let Err(e) = cuda::cuMemsetD8_v2(ptr, 0, bytes).to_result() {
                    let _ = cuda::cuMemFree_v2(ptr);
                    return Err(e);
                }
            }
        }

        self.buf = unsafe { DevicePointer::wrap(ptr as *mut T) };
        self.rows = rows;
        self.cols = cols;
        self.owned = true;
        self.option = Some(option);
        self.queue = Some(queue);
        Ok(())
    }

    unsafe fn view(&mut self, ptr: DevicePointer<T>, rows: usize, cols: usize, queue: Queue) {
        self.clear();
        self.buf = ptr;
        self.rows = rows;
        self.cols = cols;
        self.owned = false;
        self.queue = Some(queue);
    }

    fn clear(&mut self) {
        if self.owned && !self.buf.is_null() {
            unsafe {
                if let Err(e) = cuda::cuMemFree_v2(self.raw()).to_result() {
                    warn!("failed to free device memory: {}", e);
                }
            }
        }
        self.buf = DevicePointer::null();
        self.rows = 0;
        self.cols = 0;
        self.owned = false;
        self.option = None;
        self.queue = None;
    }

    fn zero(&mut self) {
        let count = self.numel();
        self.memset_zero(count);
    }

    fn zero_first(&mut self, n: usize) {
        debug_assert!(n <= self.numel());
        self.memset_zero(n);
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn is_view(&self) -> bool {
        self.queue.is_some() && !self.owned
    }

    fn as_device_ptr(&self) -> DevicePointer<T> {
        self.buf
    }

    fn cq(&self) -> Option<&Queue> {
        self.queue.as_ref()
    }

    fn copy_from_host(&mut self, src: &[T]) -> CudaResult<()> {
        if src.len() != self.numel() {
            return Err(CudaError::InvalidValue);
        }
        let bytes = self.bytes(src.len());
        if bytes == 0 {
            return Ok(());
        }
        unsafe {
            cuda::cuMemcpyHtoD_v2(self.raw(), src.as_ptr() as *const c_void, bytes).to_result()
        }
    }

    fn copy_to_host(&self, dst: &mut [T]) -> CudaResult<()> {
        if dst.len() != self.numel() {
            return Err(CudaError::InvalidValue);
        }
        let bytes = self.bytes(dst.len());
        if bytes == 0 {
            return Ok(());
        }
        unsafe {
            cuda::cuMemcpyDtoH_v2(dst.as_mut_ptr() as *mut c_void, self.raw(), bytes).to_result()
        }
    }
}

impl<T: DeviceCopy> HasCommandQueue<Queue> for DeviceMatrix<T> {
    fn command_queue(&self) -> Option<&Queue> {
        self.queue.as_ref()
    }
}

impl<T: DeviceCopy> Drop for DeviceMatrix<T> {
    fn drop(&mut self) {
        self.clear();
    }
}
