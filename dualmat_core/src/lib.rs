//! dualmat-core is the minimal subset of dualmat which describes the elements stored in a
//! matrix and the pointers used to address device memory.
//!
//! It has no dependencies and is `no_std` so that it can be shared with device-side crates.
//! See dualmat for full documentation.

#![no_std]
#![warn(
    missing_docs,
    missing_debug_implementations,
    unused_import_braces,
    unused_results,
    unused_qualifications
)]
#![allow(unknown_lints)]

mod memory;
pub use crate::memory::*;
