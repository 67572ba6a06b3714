//! A matrix with storage on both sides of the host/device boundary.
//!
//! [`DualMatrix`](struct.DualMatrix.html) pairs a host storage with a device storage of the
//! same shape, so numeric code can hold one handle for "the same logical matrix" on the CPU and
//! on the accelerator. How the device half is obtained depends on the platform:
//!
//! * On a discrete accelerator, or whenever the host and device element types differ, the
//!   device half is allocated independently and the halves are synchronized by explicit copies
//!   ([`update_device`](struct.DualMatrix.html#method.update_device) and
//!   [`update_host`](struct.DualMatrix.html#method.update_host)).
//! * On a platform where host and device share physical memory and both halves use the same
//!   element type, the device half is a view over the host buffer. Nothing is allocated on the
//!   device and writes on one side are visible on the other without copying.
//!
//! The decision is made once, in `alloc`, and remembered as the matrix's
//! [`Placement`](enum.Placement.html).

use crate::device::Backend;
use crate::error::{CudaError, CudaResult};
use crate::memory::{
    same_representation, CastTo, DataType, DeviceCopy, DeviceMemOption, DevicePointer,
    DeviceStorage, HostMemOption, HostStorage, MemoryKind,
};
use crate::stream::{HasCommandQueue, QueueSource};
use log::{debug, warn};
use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};
use std::slice;

/// How the device half of an allocated matrix relates to the host half.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// The device half owns its own allocation.
    Independent,
    /// The device half is a view over the host buffer and owns nothing.
    Aliased,
}

/// A row-major matrix stored in host memory (elements of type `H`) and device memory (elements
/// of type `D`) at the same time.
///
/// The host storage is authoritative for the extents; the device storage always mirrors them.
///
/// # Lifecycle
///
/// A matrix starts unallocated. [`alloc`](#method.alloc) allocates the host half, then either
/// allocates the device half or makes it a view over the host buffer. [`clear`](#method.clear)
/// releases both halves and returns the matrix to the unallocated state. Dropping the matrix
/// releases whatever it holds.
///
/// # Preconditions
///
/// Element access and zeroing assume a fully allocated matrix. On an unallocated matrix they see
/// (and zero) no elements. After a failed device allocation the host half is still allocated,
/// so they act on its `numel()` host elements while the device half holds nothing. Either case
/// is almost certainly a bug in the caller. Element accesses made after device work has been
/// enqueued must be preceded by [`sync`](#method.sync).
///
/// # Examples:
///
/// ```
/// use dualmat::emulated::{Emulated, EmulatedDevice};
/// use dualmat::prelude::*;
///
/// let device = EmulatedDevice::new().unwrap();
/// let mut positions: DualMatrix<f64, f32, Emulated> = DualMatrix::new();
/// positions
///     .alloc(
///         1,
///         3,
///         QueueSource::device(&device),
///         HostMemOption::RwOptimized,
///         DeviceMemOption::ReadOnly,
///     )
///     .unwrap();
///
/// positions[2] = 0.5;
/// positions.update_device().unwrap();
/// assert_eq!(Some(Placement::Independent), positions.placement());
/// assert_eq!(3, positions.numel());
/// ```
pub struct DualMatrix<H, D, B>
where
    H: DeviceCopy + 'static,
    D: DeviceCopy + 'static,
    B: Backend,
{
    // Declared before `host` so that a view is dropped before the buffer it views.
    device: B::Dev<D>,
    host: B::Host<H>,
    placement: Option<Placement>,
}

impl<H, D, B> DualMatrix<H, D, B>
where
    H: DeviceCopy + 'static,
    D: DeviceCopy + 'static,
    B: Backend,
{
    /// Identifier of the host element type.
    pub const DATA_TYPE: DataType = H::DATA_TYPE;
    /// Where the primary copy of the data lives. Elements are accessed through the host half.
    pub const MEM_TYPE: MemoryKind = MemoryKind::Host;
    /// Rows are never padded.
    pub const PADDED: bool = false;
    /// Elements are stored row after row.
    pub const ROW_MAJOR: bool = true;
    /// This is a matrix, not a vector.
    pub const VECTOR: bool = false;

    /// Create an unallocated matrix.
    pub fn new() -> Self {
        DualMatrix {
            device: Default::default(),
            host: Default::default(),
            placement: None,
        }
    }

    /// Create a matrix and allocate it with [`alloc`](#method.alloc).
    ///
    /// # Errors:
    ///
    /// Returns the error `alloc` returned; anything already allocated is released.
    pub fn with_size(
        rows: usize,
        cols: usize,
        source: QueueSource<B>,
        host_option: HostMemOption,
        device_option: DeviceMemOption,
    ) -> CudaResult<Self> {
        let mut matrix = DualMatrix::new();
        matrix.alloc(rows, cols, source, host_option, device_option)?;
        Ok(matrix)
    }

    /// Allocate `rows * cols` elements on the host and make the device half match.
    ///
    /// The host half is allocated first, with `host_option`, on the queue taken from `source`.
    /// Then, if `H` and `D` are the same type, the device shares physical memory with the
    /// host and the host buffer is addressable by the device (see
    /// [`HostStorage::device_view`](../memory/trait.HostStorage.html#tymethod.device_view)),
    /// the device half becomes a view over the host buffer. Otherwise the device half is
    /// allocated independently with `device_option`. Zero-sized matrices are valid.
    ///
    /// # Errors:
    ///
    /// * `AlreadyAllocated` if the matrix (or its host half) is allocated. Nothing is changed.
    /// * Any error resolving `source` (e.g. `InvalidHandle` for an unallocated object). The
    ///   matrix stays unallocated.
    /// * Any host allocation error, unchanged. The matrix stays unallocated.
    /// * Any device allocation error, unchanged. The host half stays allocated and the device
    ///   half unallocated; `clear` releases the host half.
    pub fn alloc(
        &mut self,
        rows: usize,
        cols: usize,
        source: QueueSource<B>,
        host_option: HostMemOption,
        device_option: DeviceMemOption,
    ) -> CudaResult<()> {
        if self.placement.is_some() || self.host.is_allocated() {
            return Err(CudaError::AlreadyAllocated);
        }
        let queue = source.resolve()?;
        let shared_memory = source.shared_memory(&queue);

        if let Err(e) = self.host.alloc(rows, cols, queue.clone(), host_option) {
            warn!(
                "host allocation of {}x{} failed with {:?}: {}",
                rows, cols, host_option, e
            );
            return Err(e);
        }

        if same_representation::<H, D>() && shared_memory {
            // H and D are the same type, so the cast only changes the name of the type.
            let view = unsafe { self.host.device_view().cast::<D>() };
            if view.is_null() {
                debug!(
                    "{}x{} matrix: {:?} host memory is not device-addressable",
                    rows, cols, host_option
                );
            } else {
                unsafe {
                    self.device
                        .view(view, self.host.rows(), self.host.cols(), queue);
                }
                self.placement = Some(Placement::Aliased);
                debug!("{}x{} matrix: device half aliases host memory", rows, cols);
                return Ok(());
            }
        }

        match self.device.alloc(rows, cols, queue, device_option) {
            Ok(()) => {
                self.placement = Some(Placement::Independent);
                debug!("{}x{} matrix: device half allocated independently", rows, cols);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "device allocation of {}x{} failed with {:?}: {}",
                    rows, cols, device_option, e
                );
                Err(e)
            }
        }
    }

    /// Release both halves and reset the extents to zero.
    ///
    /// Safe to call on an unallocated or half-allocated matrix, and any number of times.
    pub fn clear(&mut self) {
        if self.placement.is_some() || self.host.is_allocated() {
            debug!(
                "releasing {}x{} matrix ({:?})",
                self.rows(),
                self.cols(),
                self.placement
            );
        }
        // A view is forgotten rather than freed; the storage knows which it holds.
        self.device.clear();
        self.host.clear();
        self.placement = None;
    }

    /// Set every element to zero on both sides.
    ///
    /// When the device half aliases the host buffer the memory is simply zeroed twice.
    pub fn zero(&mut self) {
        self.host.zero();
        self.device.zero();
    }

    /// Set the first `n` elements to zero on both sides, leaving the rest untouched.
    ///
    /// `n` must not exceed [`numel`](#method.numel). This is only checked in debug builds.
    pub fn zero_first(&mut self, n: usize) {
        debug_assert!(n <= self.numel(), "zero_first({}) past {} elements", n, self.numel());
        self.host.zero_first(n);
        self.device.zero_first(n);
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.host.numel()
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.host.rows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.host.cols()
    }

    /// How the device half was obtained, or `None` if it is not allocated.
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// Returns true if the device half is a view over the host buffer.
    pub fn is_view(&self) -> bool {
        self.placement == Some(Placement::Aliased)
    }

    /// Returns a reference to element `i`, or `None` if `i` is out of bounds.
    pub fn get(&self, i: usize) -> Option<&H> {
        self.host.as_slice().get(i)
    }

    /// Returns a mutable reference to element `i`, or `None` if `i` is out of bounds.
    pub fn get_mut(&mut self, i: usize) -> Option<&mut H> {
        self.host.as_mut_slice().get_mut(i)
    }

    /// Returns a reference to the element at `(row, col)`, or `None` if either is out of
    /// bounds.
    pub fn get2(&self, row: usize, col: usize) -> Option<&H> {
        if row < self.rows() && col < self.cols() {
            self.get(row * self.cols() + col)
        } else {
            None
        }
    }

    /// Returns a mutable reference to the element at `(row, col)`, or `None` if either is out
    /// of bounds.
    pub fn get2_mut(&mut self, row: usize, col: usize) -> Option<&mut H> {
        if row < self.rows() && col < self.cols() {
            let cols = self.cols();
            self.get_mut(row * cols + col)
        } else {
            None
        }
    }

    fn flat_offset(&self, row: usize, col: usize) -> usize {
        match row.checked_mul(self.cols()).and_then(|r| r.checked_add(col)) {
            Some(i) if i < self.numel() => i,
            _ => panic!(
                "index ({}, {}) out of range for {}x{} matrix",
                row,
                col,
                self.rows(),
                self.cols()
            ),
        }
    }

    /// Returns a reference to element `i` without bounds checking.
    ///
    /// # Safety
    ///
    /// `i` must be less than `numel()`.
    pub unsafe fn get_unchecked(&self, i: usize) -> &H {
        &*self.host.as_ptr().add(i)
    }

    /// Returns a mutable reference to element `i` without bounds checking.
    ///
    /// # Safety
    ///
    /// `i` must be less than `numel()`.
    pub unsafe fn get_unchecked_mut(&mut self, i: usize) -> &mut H {
        &mut *self.host.as_mut_ptr().add(i)
    }

    /// The host elements, row after row.
    pub fn as_slice(&self) -> &[H] {
        self.host.as_slice()
    }

    /// The host elements, row after row.
    pub fn as_mut_slice(&mut self) -> &mut [H] {
        self.host.as_mut_slice()
    }

    /// Raw pointer to the first host element.
    pub fn as_ptr(&self) -> *const H {
        self.host.as_ptr()
    }

    /// Raw mutable pointer to the first host element.
    pub fn as_mut_ptr(&mut self) -> *mut H {
        self.host.as_mut_ptr()
    }

    /// Pointer to the first device element, suitable for passing to a kernel.
    pub fn as_device_ptr(&self) -> DevicePointer<D> {
        self.device.as_device_ptr()
    }

    /// The host half.
    pub fn host(&self) -> &B::Host<H> {
        &self.host
    }

    /// The device half.
    pub fn device(&self) -> &B::Dev<D> {
        &self.device
    }

    /// The default command queue of this matrix, used for copies and by `sync`. `None` if
    /// unallocated.
    pub fn cq(&self) -> Option<&B::Queue> {
        self.host.cq()
    }

    /// Block until all work enqueued on this matrix's queue has completed.
    ///
    /// Returns immediately if the matrix is unallocated.
    pub fn sync(&self) -> CudaResult<()> {
        self.host.sync()
    }

    /// Copy the host half to the device half, converting each element to `D`.
    ///
    /// Does nothing when the device half aliases the host buffer.
    ///
    /// # Errors:
    ///
    /// Returns `NotAllocated` if the device half is not allocated, or any error raised by the
    /// copy.
    pub fn update_device(&mut self) -> CudaResult<()>
    where
        H: Copy + CastTo<D>,
    {
        match self.placement {
            None => Err(CudaError::NotAllocated),
            Some(Placement::Aliased) => Ok(()),
            Some(Placement::Independent) if same_representation::<H, D>() => {
                let host = self.host.as_slice();
                // H and D are the same type.
                let src = unsafe { slice::from_raw_parts(host.as_ptr() as *const D, host.len()) };
                self.device.copy_from_host(src)
            }
            Some(Placement::Independent) => {
                let staged: Vec<D> = self
                    .host
                    .as_slice()
                    .iter()
                    .map(|&x| x.cast_to())
                    .collect();
                self.device.copy_from_host(&staged)
            }
        }
    }

    /// Copy the device half to the host half, converting each element to `H`.
    ///
    /// Does nothing when the device half aliases the host buffer. Work writing to the device
    /// half must have been synchronized first.
    ///
    /// # Errors:
    ///
    /// Returns `NotAllocated` if the device half is not allocated, or any error raised by the
    /// copy.
    pub fn update_host(&mut self) -> CudaResult<()>
    where
        D: Copy + CastTo<H>,
    {
        match self.placement {
            None => Err(CudaError::NotAllocated),
            Some(Placement::Aliased) => Ok(()),
            Some(Placement::Independent) if same_representation::<H, D>() => {
                let host = self.host.as_mut_slice();
                // H and D are the same type.
                let dst = unsafe {
                    slice::from_raw_parts_mut(host.as_mut_ptr() as *mut D, host.len())
                };
                self.device.copy_to_host(dst)
            }
            Some(Placement::Independent) => {
                let n = self.numel();
                // Zero is a valid value of every DeviceCopy type.
                let mut staged: Vec<D> = (0..n).map(|_| unsafe { mem::zeroed() }).collect();
                self.device.copy_to_host(&mut staged)?;
                for (dst, &src) in self.host.as_mut_slice().iter_mut().zip(staged.iter()) {
                    *dst = src.cast_to();
                }
                Ok(())
            }
        }
    }
}

impl<H, D, B> Default for DualMatrix<H, D, B>
where
    H: DeviceCopy + 'static,
    D: DeviceCopy + 'static,
    B: Backend,
{
    fn default() -> Self {
        DualMatrix::new()
    }
}

impl<H, D, B> HasCommandQueue<B::Queue> for DualMatrix<H, D, B>
where
    H: DeviceCopy + 'static,
    D: DeviceCopy + 'static,
    B: Backend,
{
    fn command_queue(&self) -> Option<&B::Queue> {
        self.host.cq()
    }
}

impl<H, D, B> Index<usize> for DualMatrix<H, D, B>
where
    H: DeviceCopy + 'static,
    D: DeviceCopy + 'static,
    B: Backend,
{
    type Output = H;

    fn index(&self, i: usize) -> &H {
        &self.host.as_slice()[i]
    }
}

impl<H, D, B> IndexMut<usize> for DualMatrix<H, D, B>
where
    H: DeviceCopy + 'static,
    D: DeviceCopy + 'static,
    B: Backend,
{
    fn index_mut(&mut self, i: usize) -> &mut H {
        &mut self.host.as_mut_slice()[i]
    }
}

/// 2-D access. The offset is `row * cols + col`; only the resulting flat offset is checked, so
/// a column past `cols()` silently addresses the next row. Panics if the offset overflows or is
/// past `numel()`.
impl<H, D, B> Index<(usize, usize)> for DualMatrix<H, D, B>
where
    H: DeviceCopy + 'static,
    D: DeviceCopy + 'static,
    B: Backend,
{
    type Output = H;

    fn index(&self, (row, col): (usize, usize)) -> &H {
        let i = self.flat_offset(row, col);
        &self.host.as_slice()[i]
    }
}

impl<H, D, B> IndexMut<(usize, usize)> for DualMatrix<H, D, B>
where
    H: DeviceCopy + 'static,
    D: DeviceCopy + 'static,
    B: Backend,
{
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut H {
        let i = self.flat_offset(row, col);
        &mut self.host.as_mut_slice()[i]
    }
}

impl<H, D, B> fmt::Debug for DualMatrix<H, D, B>
where
    H: DeviceCopy + 'static,
    D: DeviceCopy + 'static,
    B: Backend,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DualMatrix")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("host_option", &self.host.mem_option())
            .field("placement", &self.placement)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulated::{Emulated, EmulatedDevice};

    type Matrix<H, D> = DualMatrix<H, D, Emulated>;

    fn alloc<H, D>(
        matrix: &mut Matrix<H, D>,
        device: &EmulatedDevice,
        rows: usize,
        cols: usize,
    ) -> CudaResult<()>
    where
        H: DeviceCopy + 'static,
        D: DeviceCopy + 'static,
    {
        matrix.alloc(
            rows,
            cols,
            QueueSource::device(device),
            HostMemOption::RwOptimized,
            DeviceMemOption::ReadWrite,
        )
    }

    #[test]
    fn static_traits() {
        assert_eq!(DataType::Float64, Matrix::<f64, f32>::DATA_TYPE);
        assert_eq!(MemoryKind::Host, Matrix::<f64, f32>::MEM_TYPE);
        assert!(Matrix::<u8, u8>::ROW_MAJOR);
        assert!(!Matrix::<u8, u8>::PADDED);
        assert!(!Matrix::<u8, u8>::VECTOR);
    }

    #[test]
    fn realloc_is_rejected() {
        let device = EmulatedDevice::new().unwrap();
        let mut matrix = Matrix::<f32, f32>::new();
        alloc(&mut matrix, &device, 2, 2).unwrap();
        assert_eq!(Err(CudaError::AlreadyAllocated), alloc(&mut matrix, &device, 3, 3));
        assert_eq!(4, matrix.numel());
        matrix.clear();
        alloc(&mut matrix, &device, 3, 3).unwrap();
        assert_eq!(9, matrix.numel());
    }

    #[test]
    fn checked_access_bounds() {
        let device = EmulatedDevice::new().unwrap();
        let mut matrix = Matrix::<i32, i32>::new();
        alloc(&mut matrix, &device, 2, 3).unwrap();
        *matrix.get2_mut(1, 2).unwrap() = 7;
        assert_eq!(Some(&7), matrix.get(5));
        assert_eq!(None, matrix.get(6));
        assert_eq!(None, matrix.get2(2, 0));
        assert_eq!(None, matrix.get2(0, 3));
        assert_eq!(7, unsafe { *matrix.get_unchecked(5) });
    }

    #[test]
    fn two_dimensional_index_uses_cols_as_stride() {
        let device = EmulatedDevice::new().unwrap();
        let mut matrix = Matrix::<u32, u32>::new();
        alloc(&mut matrix, &device, 3, 4).unwrap();
        matrix[(2, 1)] = 11;
        assert_eq!(11, matrix[9]);
        // Only the flat offset is checked.
        assert_eq!(11, matrix[(1, 5)]);
    }

    #[test]
    #[should_panic(expected = "out of range for 3x4 matrix")]
    fn two_dimensional_index_overflow_panics() {
        let device = EmulatedDevice::new().unwrap();
        let mut matrix = Matrix::<u32, u32>::new();
        alloc(&mut matrix, &device, 3, 4).unwrap();
        let _value: u32 = matrix[(usize::max_value() / 2, 3)];
    }

    #[test]
    #[should_panic(expected = "index (3, 0) out of range")]
    fn two_dimensional_index_past_end_panics() {
        let device = EmulatedDevice::new().unwrap();
        let mut matrix = Matrix::<u32, u32>::new();
        alloc(&mut matrix, &device, 3, 4).unwrap();
        matrix[(3, 0)] = 1;
    }

    #[test]
    fn same_type_updates_copy_directly() {
        let device = EmulatedDevice::new().unwrap();
        let mut matrix = Matrix::<u16, u16>::new();
        alloc(&mut matrix, &device, 2, 2).unwrap();
        assert_eq!(Some(Placement::Independent), matrix.placement());
        matrix.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
        matrix.update_device().unwrap();
        assert_eq!(&[1, 2, 3, 4], matrix.device().as_slice());

        matrix.as_mut_slice().copy_from_slice(&[9, 9, 9, 9]);
        matrix.update_host().unwrap();
        assert_eq!(&[1, 2, 3, 4], matrix.as_slice());
    }

    #[test]
    fn debug_shows_placement() {
        let device = EmulatedDevice::builder().shared_memory(true).build().unwrap();
        let mut matrix = Matrix::<f32, f32>::new();
        alloc(&mut matrix, &device, 1, 1).unwrap();
        let text = format!("{:?}", matrix);
        assert!(text.contains("Aliased"), "{}", text);
    }
}
