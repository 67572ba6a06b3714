mod pointer;
pub use self::pointer::*;

use core::any::TypeId;
use core::marker::PhantomData;
use core::num::Wrapping;

/// Identifies the representation of a matrix element.
///
/// Kernels and copy routines use this to pick a specialized path for the common numeric types.
/// Types without a dedicated identifier (including everything produced by
/// `#[derive(DeviceCopy)]`) report `Custom`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DataType {
    /// `f64`
    Float64,
    /// `f32`
    Float32,
    /// `i64` (and `isize` on 64-bit targets)
    Int64,
    /// `i32`
    Int32,
    /// `i16`
    Int16,
    /// `i8`
    Int8,
    /// `u64` (and `usize` on 64-bit targets)
    UInt64,
    /// `u32`
    UInt32,
    /// `u16`
    UInt16,
    /// `u8`
    UInt8,
    /// `bool`
    Bool,
    /// `char`
    Char,
    /// Any other type.
    Custom,
}

/// Marker trait for types which can be stored in a dual host/device matrix.
///
/// A type is `DeviceCopy` if its value can be duplicated simply by copying bits, if it does not
/// contain a reference to memory which is not accessible to the device, and if the all-zero bit
/// pattern is a valid value of the type. The last requirement exists because matrices are
/// zeroed byte-wise on both the host and the device.
///
/// ## How can I implement DeviceCopy?
///
/// The simplest way is `#[derive(DeviceCopy)]` from dualmat, which checks that every field of
/// a struct or union is itself `DeviceCopy`. Enums cannot be derived since their discriminant
/// may have no zero value.
///
/// You can also implement `DeviceCopy` unsafely:
///
/// ```
/// use dualmat_core::DeviceCopy;
///
/// #[derive(Clone, Copy)]
/// #[repr(C)]
/// struct Position([f32; 4]);
///
/// unsafe impl DeviceCopy for Position {}
/// ```
///
/// ## When can't my type be `DeviceCopy`?
///
/// Any type holding a reference, a box or another owning pointer. Any type implementing `Drop`.
/// Types with a niche such as `NonZeroU32`, `Option<&T>` or most enums, since zeroing them
/// produces an invalid value.
pub unsafe trait DeviceCopy {
    /// Representation identifier reported by matrices holding this type.
    const DATA_TYPE: DataType = DataType::Custom;
}

macro_rules! impl_device_copy {
    ($($t:ty => $id:ident),* $(,)*) => {
        $(
            unsafe impl DeviceCopy for $t {
                const DATA_TYPE: DataType = DataType::$id;
            }
        )*
    }
}

impl_device_copy!(
    f64 => Float64,
    f32 => Float32,
    i64 => Int64,
    i32 => Int32,
    i16 => Int16,
    i8 => Int8,
    u64 => UInt64,
    u32 => UInt32,
    u16 => UInt16,
    u8 => UInt8,
    bool => Bool,
    char => Char,
);

#[cfg(target_pointer_width = "64")]
impl_device_copy!(usize => UInt64, isize => Int64);
#[cfg(target_pointer_width = "32")]
impl_device_copy!(usize => UInt32, isize => Int32);

unsafe impl DeviceCopy for u128 {}
unsafe impl DeviceCopy for i128 {}
unsafe impl DeviceCopy for () {}
unsafe impl<T: ?Sized> DeviceCopy for PhantomData<T> {}
unsafe impl<T: DeviceCopy> DeviceCopy for Wrapping<T> {}

macro_rules! impl_device_copy_array {
    ($($n:expr)*) => {
        $(
            unsafe impl<T: DeviceCopy> DeviceCopy for [T; $n] {}
        )*
    }
}

impl_device_copy_array! {
    1 2 3 4 5 6 7 8 9 10
    11 12 13 14 15 16 17 18 19 20
    21 22 23 24 25 26 27 28 29 30
    31 32
}

macro_rules! impl_device_copy_tuple {
    ($(($($name:ident),+))*) => {
        $(
            unsafe impl<$($name: DeviceCopy),+> DeviceCopy for ($($name,)+) {}
        )*
    }
}

impl_device_copy_tuple! {
    (A)
    (A, B)
    (A, B, C)
    (A, B, C, D)
    (A, B, C, D, E)
    (A, B, C, D, E, F)
    (A, B, C, D, E, F, G)
    (A, B, C, D, E, F, G, H)
}

/// Returns true if `H` and `D` are the same type, meaning a buffer of one can be read as a
/// buffer of the other without conversion.
///
/// # Examples:
///
/// ```
/// use dualmat_core::same_representation;
///
/// assert!(same_representation::<f32, f32>());
/// assert!(!same_representation::<f64, f32>());
/// ```
pub fn same_representation<H: 'static, D: 'static>() -> bool {
    TypeId::of::<H>() == TypeId::of::<D>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_data_types() {
        assert_eq!(DataType::Float64, <f64 as DeviceCopy>::DATA_TYPE);
        assert_eq!(DataType::Float32, <f32 as DeviceCopy>::DATA_TYPE);
        assert_eq!(DataType::UInt8, <u8 as DeviceCopy>::DATA_TYPE);
        assert_eq!(DataType::Custom, <[f32; 4] as DeviceCopy>::DATA_TYPE);
        assert_eq!(DataType::Custom, <(i32, i32) as DeviceCopy>::DATA_TYPE);
    }

    #[test]
    fn same_representation_is_type_identity() {
        assert!(same_representation::<u32, u32>());
        assert!(same_representation::<[f32; 4], [f32; 4]>());
        assert!(!same_representation::<u32, i32>());
        assert!(!same_representation::<[f32; 4], [f32; 3]>());
    }
}
