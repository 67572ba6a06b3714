use crate::memory::DeviceCopy;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ptr;

/// A pointer to device-addressable memory.
///
/// On a discrete accelerator this points at memory the CPU cannot dereference. When the device
/// aliases a host buffer it holds the device-visible address of that buffer, which may or may not
/// equal the host address depending on the platform. Either way, a `DevicePointer` must never be
/// dereferenced on the host.
#[repr(transparent)]
pub struct DevicePointer<T>(*mut T);

unsafe impl<T> DeviceCopy for DevicePointer<T> {}

impl<T> DevicePointer<T> {
    /// Returns a null device pointer.
    ///
    /// # Examples:
    ///
    /// ```
    /// use dualmat_core::DevicePointer;
    /// let ptr: DevicePointer<u64> = DevicePointer::null();
    /// assert!(ptr.is_null());
    /// ```
    pub fn null() -> Self {
        DevicePointer(ptr::null_mut())
    }

    /// Wrap the given raw pointer in a DevicePointer.
    ///
    /// # Safety
    ///
    /// The given pointer must be null or address memory that the device can access for as long
    /// as the returned value is used.
    pub unsafe fn wrap(ptr: *mut T) -> Self {
        DevicePointer(ptr)
    }

    /// Returns the contained pointer as a raw pointer. The returned pointer must not be
    /// dereferenced on the host.
    pub fn as_raw(&self) -> *const T {
        self.0
    }

    /// Returns the contained pointer as a mutable raw pointer. The returned pointer must not be
    /// dereferenced on the host.
    pub fn as_raw_mut(&mut self) -> *mut T {
        self.0
    }

    /// Returns true if the pointer is null.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Calculates the offset from a device pointer, in units of `T`.
    ///
    /// # Safety
    ///
    /// Both the starting and resulting pointer must be in bounds or one element past the end of
    /// the same allocation, and the offset in bytes cannot overflow an `isize`.
    pub unsafe fn offset(self, count: isize) -> Self {
        DevicePointer(self.0.offset(count))
    }

    /// Reinterprets the pointer as pointing to elements of type `U`.
    ///
    /// # Safety
    ///
    /// `U` must have the same representation as `T`; in practice they must be the same type.
    pub unsafe fn cast<U>(self) -> DevicePointer<U> {
        DevicePointer(self.0 as *mut U)
    }
}

impl<T> Clone for DevicePointer<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DevicePointer<T> {}

impl<T> PartialEq for DevicePointer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<T> Eq for DevicePointer<T> {}

impl<T> Hash for DevicePointer<T> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.0.hash(state)
    }
}

impl<T> fmt::Debug for DevicePointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DevicePointer").field(&self.0).finish()
    }
}

impl<T> fmt::Pointer for DevicePointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_keeps_address() {
        let mut value = 7u32;
        let ptr = unsafe { DevicePointer::wrap(&mut value as *mut u32) };
        let cast: DevicePointer<i32> = unsafe { ptr.cast() };
        assert_eq!(ptr.as_raw() as usize, cast.as_raw() as usize);
        assert!(!cast.is_null());
    }

    #[test]
    fn offset_counts_elements() {
        let mut values = [0u64; 4];
        let ptr = unsafe { DevicePointer::wrap(values.as_mut_ptr()) };
        let third = unsafe { ptr.offset(2) };
        assert_eq!(
            ptr.as_raw() as usize + 2 * core::mem::size_of::<u64>(),
            third.as_raw() as usize
        );
    }
}
