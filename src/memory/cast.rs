/// Conversion of a host element into a device element (or back) when a matrix keeps different
/// precisions on each side, for instance `f64` on the host and `f32` on the device.
///
/// Implemented for every pair of numeric primitives with the semantics of an `as` cast.
pub trait CastTo<D> {
    /// Convert `self` into a `D`.
    fn cast_to(self) -> D;
}

macro_rules! impl_cast_to {
    (@each $src:ident; $($dst:ident)*) => {
        $(
            impl CastTo<$dst> for $src {
                #[inline]
                fn cast_to(self) -> $dst {
                    self as $dst
                }
            }
        )*
    };
    ($($src:ident)*) => {
        $(
            impl_cast_to!(@each $src; f64 f32 i64 i32 i16 i8 u64 u32 u16 u8 isize usize);
        )*
    };
}

impl_cast_to!(f64 f32 i64 i32 i16 i8 u64 u32 u16 u8 isize usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_float_cast() {
        let x: f32 = 1.5f64.cast_to();
        assert_eq!(1.5f32, x);
    }

    #[test]
    fn float_to_int_truncates() {
        let x: i32 = 2.9f64.cast_to();
        assert_eq!(2, x);
    }
}
