use super::EmulatedQueue;
use crate::error::{CudaError, CudaResult};
use crate::memory::raw::{allocate_zeroed, byte_size, deallocate, element_count};
use crate::memory::{
    DeviceCopy, DeviceMemOption, DevicePointer, DeviceStorage, HostMemOption, HostStorage,
};
use crate::stream::HasCommandQueue;
use log::trace;
use std::ptr::{self, NonNull};
use std::slice;

/// Host storage of an emulated device.
///
/// Pinned options are accepted only if the device supports page-locked memory; otherwise the
/// memory is identical for every option.
#[derive(Debug)]
pub struct HostBuffer<T: DeviceCopy> {
    buf: *mut T,
    rows: usize,
    cols: usize,
    option: Option<HostMemOption>,
    queue: Option<EmulatedQueue>,
}

impl<T: DeviceCopy> Default for HostBuffer<T> {
    fn default() -> Self {
        HostBuffer {
            buf: NonNull::dangling().as_ptr(),
            rows: 0,
            cols: 0,
            option: None,
            queue: None,
        }
    }
}

impl<T: DeviceCopy> HostStorage<T> for HostBuffer<T> {
    type Queue = EmulatedQueue;

    fn alloc(
        &mut self,
        rows: usize,
        cols: usize,
        queue: EmulatedQueue,
        option: HostMemOption,
    ) -> CudaResult<()> {
        self.clear();
        if option.is_pinned() && !queue.platform().pinned_memory {
            return Err(CudaError::NotSupported);
        }
        let count = element_count(rows, cols)?;
        let bytes = byte_size::<T>(count)?;
        queue.platform().host.reserve(bytes)?;
        let buf = match allocate_zeroed::<T>(count) {
            Ok(buf) => buf,
            Err(e) => {
                queue.platform().host.release(bytes);
                return Err(e);
            }
        };
        trace!("allocated {} bytes of emulated host memory ({:?})", bytes, option);

        self.buf = buf;
        self.rows = rows;
        self.cols = cols;
        self.option = Some(option);
        self.queue = Some(queue);
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(queue) = self.queue.take() {
            let count = self.rows * self.cols;
            unsafe { deallocate(self.buf, count) };
            if let Ok(bytes) = byte_size::<T>(count) {
                queue.platform().host.release(bytes);
            }
        }
        self.buf = NonNull::dangling().as_ptr();
        self.rows = 0;
        self.cols = 0;
        self.option = None;
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
        match (&self.queue, self.option) {
            (Some(queue), Some(HostMemOption::NotPinned))
                if !queue.platform().map_pageable_memory =>
            {
                DevicePointer::null()
            }
            // The emulated device addresses host memory directly.
            (Some(_), Some(_)) => unsafe { DevicePointer::wrap(self.buf) },
            _ => DevicePointer::null(),
        }
    }

    fn cq(&self) -> Option<&EmulatedQueue> {
        self.queue.as_ref()
    }
}

impl<T: DeviceCopy> HasCommandQueue<EmulatedQueue> for HostBuffer<T> {
    fn command_queue(&self) -> Option<&EmulatedQueue> {
        self.queue.as_ref()
    }
}

impl<T: DeviceCopy> Drop for HostBuffer<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Device storage of an emulated device.
///
/// Emulated device memory lives in host RAM, so unlike real device memory it can be inspected
/// with [`as_slice`](#method.as_slice).
#[derive(Debug)]
pub struct EmulatedBuffer<T: DeviceCopy> {
    buf: DevicePointer<T>,
    rows: usize,
    cols: usize,
    owned: bool,
    option: Option<DeviceMemOption>,
    queue: Option<EmulatedQueue>,
}

impl<T: DeviceCopy> Default for EmulatedBuffer<T> {
    fn default() -> Self {
        EmulatedBuffer {
            buf: unsafe { DevicePointer::wrap(NonNull::dangling().as_ptr()) },
            rows: 0,
            cols: 0,
            owned: false,
            option: None,
            queue: None,
        }
    }
}

impl<T: DeviceCopy> EmulatedBuffer<T> {
    /// The access hint the memory was allocated with. `None` for views and unallocated buffers.
    pub fn mem_option(&self) -> Option<DeviceMemOption> {
        self.option
    }

    /// Read the device memory from the host.
    ///
    /// Any work writing to this buffer must have been synchronized first.
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.buf.as_raw(), self.numel()) }
    }

    fn check_len(&self, len: usize) -> CudaResult<()> {
        if len == self.numel() {
            Ok(())
        } else {
            Err(CudaError::InvalidValue)
        }
    }
}

impl<T: DeviceCopy> DeviceStorage<T> for EmulatedBuffer<T> {
    type Queue = EmulatedQueue;

    fn alloc(
        &mut self,
        rows: usize,
        cols: usize,
        queue: EmulatedQueue,
        option: DeviceMemOption,
    ) -> CudaResult<()> {
        self.clear();
        let count = element_count(rows, cols)?;
        let bytes = byte_size::<T>(count)?;
        queue.platform().device.reserve(bytes)?;
        let buf = match allocate_zeroed::<T>(count) {
            Ok(buf) => buf,
            Err(e) => {
                queue.platform().device.release(bytes);
                return Err(e);
            }
        };
        trace!("allocated {} bytes of emulated device memory ({:?})", bytes, option);

        self.buf = unsafe { DevicePointer::wrap(buf) };
        self.rows = rows;
        self.cols = cols;
        self.owned = true;
        self.option = Some(option);
        self.queue = Some(queue);
        Ok(())
    }

    unsafe fn view(
        &mut self,
        ptr: DevicePointer<T>,
        rows: usize,
        cols: usize,
        queue: EmulatedQueue,
    ) {
        self.clear();
        self.buf = ptr;
        self.rows = rows;
        self.cols = cols;
        self.owned = false;
        self.queue = Some(queue);
    }

    fn clear(&mut self) {
        if let Some(queue) = self.queue.take() {
            if self.owned {
                let count = self.rows * self.cols;
                unsafe { deallocate(self.buf.as_raw_mut(), count) };
                if let Ok(bytes) = byte_size::<T>(count) {
                    queue.platform().device.release(bytes);
                }
            }
        }
        self.buf = unsafe { DevicePointer::wrap(NonNull::dangling().as_ptr()) };
        self.rows = 0;
        self.cols = 0;
        self.owned = false;
        self.option = None;
    }

    fn zero(&mut self) {
        unsafe { ptr::write_bytes(self.buf.as_raw_mut(), 0, self.numel()) }
    }

    fn zero_first(&mut self, n: usize) {
        debug_assert!(n <= self.numel());
        unsafe { ptr::write_bytes(self.buf.as_raw_mut(), 0, n) }
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

    fn cq(&self) -> Option<&EmulatedQueue> {
        self.queue.as_ref()
    }

    fn copy_from_host(&mut self, src: &[T]) -> CudaResult<()> {
        self.check_len(src.len())?;
        unsafe { ptr::copy(src.as_ptr(), self.buf.as_raw_mut(), src.len()) };
        Ok(())
    }

    fn copy_to_host(&self, dst: &mut [T]) -> CudaResult<()> {
        self.check_len(dst.len())?;
        unsafe { ptr::copy(self.buf.as_raw(), dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }
}

impl<T: DeviceCopy> HasCommandQueue<EmulatedQueue> for EmulatedBuffer<T> {
    fn command_queue(&self) -> Option<&EmulatedQueue> {
        self.queue.as_ref()
    }
}

impl<T: DeviceCopy> Drop for EmulatedBuffer<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::super::EmulatedDevice;
    use super::*;
    use crate::device::Device;

    fn queue(device: &EmulatedDevice) -> EmulatedQueue {
        device.default_queue().unwrap()
    }

    #[test]
    fn host_buffer_accounts_memory() {
        let device = EmulatedDevice::new().unwrap();
        let mut host = HostBuffer::<f64>::default();
        host.alloc(3, 5, queue(&device), HostMemOption::NotPinned).unwrap();
        assert_eq!(15 * 8, device.host_bytes_in_use());
        assert!(host.as_slice().iter().all(|&x| x == 0.0));
        host.clear();
        assert_eq!(0, device.host_bytes_in_use());
        assert!(!host.is_allocated());
    }

    #[test]
    fn pinned_memory_can_be_unsupported() {
        let device = EmulatedDevice::builder().pinned_memory(false).build().unwrap();
        let mut host = HostBuffer::<u32>::default();
        assert_eq!(
            Err(CudaError::NotSupported),
            host.alloc(2, 2, queue(&device), HostMemOption::WriteOptimized)
        );
        assert!(!host.is_allocated());
        host.alloc(2, 2, queue(&device), HostMemOption::NotPinned).unwrap();
        assert_eq!(4, host.numel());
    }

    #[test]
    fn zero_first_stops_at_n() {
        let device = EmulatedDevice::new().unwrap();
        let mut host = HostBuffer::<i32>::default();
        host.alloc(1, 4, queue(&device), HostMemOption::RwOptimized).unwrap();
        host.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
        host.zero_first(2);
        assert_eq!(&[0, 0, 3, 4], host.as_slice());
    }

    #[test]
    fn view_frees_nothing() {
        let device = EmulatedDevice::new().unwrap();
        let mut host = HostBuffer::<u8>::default();
        host.alloc(1, 16, queue(&device), HostMemOption::RwOptimized).unwrap();
        let mut view = EmulatedBuffer::<u8>::default();
        unsafe { view.view(host.device_view(), 1, 16, queue(&device)) };
        assert!(view.is_view());
        assert_eq!(0, device.device_bytes_in_use());
        host.as_mut_slice()[3] = 9;
        assert_eq!(9, view.as_slice()[3]);
        view.clear();
        assert!(!view.is_view());
        assert_eq!(16, device.host_bytes_in_use());
        assert_eq!(9, host.as_slice()[3]);
    }

    #[test]
    fn unmapped_pageable_memory_has_no_device_view() {
        let device = EmulatedDevice::builder()
            .map_pageable_memory(false)
            .build()
            .unwrap();
        let mut host = HostBuffer::<u8>::default();
        assert!(host.device_view().is_null());
        host.alloc(1, 4, queue(&device), HostMemOption::NotPinned).unwrap();
        assert!(host.device_view().is_null());
        host.alloc(1, 4, queue(&device), HostMemOption::RwOptimized).unwrap();
        assert_eq!(host.as_ptr(), host.device_view().as_raw());
    }

    #[test]
    fn device_limit_reports_out_of_memory() {
        let device = EmulatedDevice::builder()
            .device_memory_limit(100)
            .build().unwrap();
        let mut buffer = EmulatedBuffer::<f32>::default();
        assert_eq!(
            Err(CudaError::OutOfMemory),
            buffer.alloc(5, 6, queue(&device), DeviceMemOption::ReadOnly)
        );
        assert_eq!(0, buffer.numel());
        buffer.alloc(5, 5, queue(&device), DeviceMemOption::ReadOnly).unwrap();
        assert_eq!(Some(DeviceMemOption::ReadOnly), buffer.mem_option());
        assert_eq!(100, device.device_bytes_in_use());
    }

    #[test]
    fn copies_check_length() {
        let device = EmulatedDevice::new().unwrap();
        let mut buffer = EmulatedBuffer::<u16>::default();
        buffer.alloc(2, 2, queue(&device), DeviceMemOption::ReadWrite).unwrap();
        assert_eq!(Err(CudaError::InvalidValue), buffer.copy_from_host(&[1, 2, 3]));
        buffer.copy_from_host(&[1, 2, 3, 4]).unwrap();
        let mut back = [0u16; 4];
        buffer.copy_to_host(&mut back).unwrap();
        assert_eq!([1, 2, 3, 4], back);
    }
}
