use crate::error::CudaResult;
use crate::memory::{DeviceCopy, DeviceMemOption, DevicePointer, HostMemOption};
use crate::stream::CommandQueue;

/// Row-major storage for a matrix in host memory.
///
/// A freshly created (`Default`) storage holds no memory. `alloc` acquires memory for
/// `rows * cols` elements and associates the storage with a command queue; `clear` releases it
/// again. Dropping a storage releases its memory.
pub trait HostStorage<T: DeviceCopy>: Default {
    /// The command queue type this storage is associated with.
    type Queue: CommandQueue;

    /// Allocate zero-initialized memory for `rows * cols` elements.
    ///
    /// # Errors:
    ///
    /// Returns `OutOfMemory` if the memory cannot be acquired, `NotSupported` if `option` asks
    /// for page-locked memory the platform cannot provide, or `InvalidMemoryAllocation` if the
    /// size in bytes overflows. The storage is left unallocated on error.
    fn alloc(
        &mut self,
        rows: usize,
        cols: usize,
        queue: Self::Queue,
        option: HostMemOption,
    ) -> CudaResult<()>;

    /// Release the memory and reset the extents to zero. Does nothing if unallocated.
    fn clear(&mut self);

    /// Set every element to zero.
    fn zero(&mut self);

    /// Set the first `n` elements to zero. `n` must not exceed `numel()`.
    fn zero_first(&mut self, n: usize);

    /// Number of rows.
    fn rows(&self) -> usize;

    /// Number of columns.
    fn cols(&self) -> usize;

    /// Number of elements.
    fn numel(&self) -> usize {
        self.rows() * self.cols()
    }

    /// The option the memory was allocated with, or `None` if unallocated.
    fn mem_option(&self) -> Option<HostMemOption>;

    /// Returns true if `alloc` succeeded and `clear` has not been called since.
    fn is_allocated(&self) -> bool {
        self.mem_option().is_some()
    }

    /// The elements, row after row.
    fn as_slice(&self) -> &[T];

    /// The elements, row after row.
    fn as_mut_slice(&mut self) -> &mut [T];

    /// Raw pointer to the first element.
    fn as_ptr(&self) -> *const T;

    /// Raw mutable pointer to the first element.
    fn as_mut_ptr(&mut self) -> *mut T;

    /// The address under which the device sees this buffer, or a null pointer if the device
    /// cannot address it (unallocated, or pageable memory that is not mapped). Only meaningful
    /// when the device shares physical memory with the host.
    fn device_view(&self) -> DevicePointer<T>;

    /// The command queue this storage was allocated with.
    fn cq(&self) -> Option<&Self::Queue>;

    /// Block until all work on the associated queue has completed. Returns immediately if the
    /// storage is unallocated.
    fn sync(&self) -> CudaResult<()> {
        match self.cq() {
            Some(queue) => queue.synchronize(),
            None => Ok(()),
        }
    }
}

/// Row-major storage for a matrix in device-addressable memory.
///
/// Device storage either owns an allocation or is a view over memory it does not own. A view is
/// never freed by the storage: `clear` and `Drop` simply forget it.
pub trait DeviceStorage<T: DeviceCopy>: Default {
    /// The command queue type this storage is associated with.
    type Queue: CommandQueue;

    /// Allocate zero-initialized device memory for `rows * cols` elements.
    ///
    /// # Errors:
    ///
    /// Returns `OutOfMemory` if the memory cannot be acquired, `NotSupported` if `option` is not
    /// supported, or `InvalidMemoryAllocation` if the size in bytes overflows. The storage is
    /// left unallocated on error.
    fn alloc(
        &mut self,
        rows: usize,
        cols: usize,
        queue: Self::Queue,
        option: DeviceMemOption,
    ) -> CudaResult<()>;

    /// Make this storage a view over `rows * cols` elements starting at `ptr`. No memory is
    /// allocated, so this cannot fail.
    ///
    /// # Safety
    ///
    /// `ptr` must address at least `rows * cols` elements of device-visible memory which stays
    /// valid until this storage is cleared or dropped.
    unsafe fn view(
        &mut self,
        ptr: DevicePointer<T>,
        rows: usize,
        cols: usize,
        queue: Self::Queue,
    );

    /// Free owned memory, or forget the viewed memory, and reset the extents to zero. Does
    /// nothing if unallocated.
    fn clear(&mut self);

    /// Set every element to zero.
    fn zero(&mut self);

    /// Set the first `n` elements to zero. `n` must not exceed `numel()`.
    fn zero_first(&mut self, n: usize);

    /// Number of rows.
    fn rows(&self) -> usize;

    /// Number of columns.
    fn cols(&self) -> usize;

    /// Number of elements.
    fn numel(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Returns true if this storage views memory it does not own.
    fn is_view(&self) -> bool;

    /// Pointer to the first element, in the device address space.
    fn as_device_ptr(&self) -> DevicePointer<T>;

    /// The command queue this storage was allocated with.
    fn cq(&self) -> Option<&Self::Queue>;

    /// Copy `src` from host memory into this storage. `src` must have exactly `numel()`
    /// elements.
    ///
    /// # Errors:
    ///
    /// Returns `InvalidValue` if the lengths differ, or any error raised by the copy.
    fn copy_from_host(&mut self, src: &[T]) -> CudaResult<()>;

    /// Copy this storage into `dst` in host memory. `dst` must have exactly `numel()` elements.
    ///
    /// # Errors:
    ///
    /// Returns `InvalidValue` if the lengths differ, or any error raised by the copy.
    fn copy_to_host(&self, dst: &mut [T]) -> CudaResult<()>;
}
