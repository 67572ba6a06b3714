//! This module is a dummy module. It contains doctests that should fail to compile. It's used for
//! testing the DeviceCopy custom-derive macro and should not contain any actual code.
//!
//! ```compile_fail
//! #[macro_use]
//! extern crate dualmat;
//! extern crate dualmat_core;
//!
//! #[derive(Clone, DeviceCopy)]
//! struct ShouldFailTuple(Vec<u64>);
//! # fn main() {}
//! ```
//!
//! ```compile_fail
//! #[macro_use]
//! extern crate dualmat;
//! extern crate dualmat_core;
//!
//! #[derive(Clone, DeviceCopy)]
//! struct ShouldFailStruct {
//!     v: Box<f32>,
//! }
//! # fn main() {}
//! ```
//!
//! ```compile_fail
//! #[macro_use]
//! extern crate dualmat;
//! extern crate dualmat_core;
//!
//! #[derive(Clone, DeviceCopy)]
//! enum ShouldFailEnum {
//!     A,
//!     B,
//! }
//! # fn main() {}
//! ```
//!
//! ```compile_fail
//! #[macro_use]
//! extern crate dualmat;
//! extern crate dualmat_core;
//!
//! #[derive(Copy, Clone, DeviceCopy)]
//! union ShouldFailUnion {
//!     u: *const u64,
//!     o: *const i64,
//! }
//! # fn main() {}
//! ```
//!
//! ```compile_fail
//! #[macro_use]
//! extern crate dualmat;
//! extern crate dualmat_core;
//!
//! #[derive(Clone, Copy, DeviceCopy)]
//! struct ShouldFailNiche(std::num::NonZeroU32);
//! # fn main() {}
//! ```
