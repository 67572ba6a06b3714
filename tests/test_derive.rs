#![allow(dead_code)]

#[macro_use]
extern crate dualmat;
extern crate dualmat_core;

use dualmat::emulated::{Emulated, EmulatedDevice};
use dualmat::memory::DataType;
use dualmat::prelude::*;
use std::marker::PhantomData;

#[derive(Clone, Copy, DeviceCopy)]
struct ZeroSizedStruct;

#[derive(Clone, Copy, DeviceCopy)]
struct TupleStruct(u64, u64);

#[derive(Clone, Copy, DeviceCopy)]
#[repr(C)]
struct Float4 {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

#[derive(Clone, Copy, DeviceCopy)]
struct ContainerStruct {
    a: Float4,
    b: TupleStruct,
}

#[derive(Clone, Copy, DeviceCopy)]
struct GenericStruct<T> {
    value: T,
    marker: PhantomData<T>,
}

#[derive(Copy, Clone, DeviceCopy)]
#[repr(C)]
union TestUnion {
    u: u64,
    i: i64,
}

#[test]
fn test_hidden_functions() {
    __verify_ZeroSizedStruct_can_implement_DeviceCopy(&ZeroSizedStruct);
    __verify_TupleStruct_can_implement_DeviceCopy(&TupleStruct(0, 0));
    __verify_Float4_can_implement_DeviceCopy(&Float4 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 0.0,
    });
    __verify_ContainerStruct_can_implement_DeviceCopy(&ContainerStruct {
        a: Float4 {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 0.0,
        },
        b: TupleStruct(0, 0),
    });
    __verify_GenericStruct_can_implement_DeviceCopy(&GenericStruct {
        value: 0u64,
        marker: PhantomData,
    });
    __verify_TestUnion_can_implement_DeviceCopy(&TestUnion { u: 0u64 });
}

#[test]
fn derived_types_report_custom_data_type() {
    assert_eq!(DataType::Custom, <Float4 as DeviceCopy>::DATA_TYPE);
    assert_eq!(DataType::Custom, DualMatrix::<Float4, Float4, Emulated>::DATA_TYPE);
}

#[test]
fn derived_types_alias_on_shared_memory() {
    let device = EmulatedDevice::builder().shared_memory(true).build().unwrap();
    let mut matrix: DualMatrix<Float4, Float4, Emulated> = DualMatrix::new();
    matrix
        .alloc(
            1,
            16,
            QueueSource::device(&device),
            HostMemOption::RwOptimized,
            DeviceMemOption::ReadWrite,
        )
        .unwrap();
    matrix[3].w = 1.0;
    assert!(matrix.is_view());
    assert_eq!(1.0, matrix.device().as_slice()[3].w);
    matrix.zero();
    assert_eq!(0.0, matrix[3].w);
}

#[test]
fn structurally_equal_types_are_not_aliased() {
    #[derive(Clone, Copy, DeviceCopy)]
    #[repr(C)]
    struct OtherFloat4 {
        x: f32,
        y: f32,
        z: f32,
        w: f32,
    }

    let device = EmulatedDevice::builder().shared_memory(true).build().unwrap();
    let mut matrix: DualMatrix<Float4, OtherFloat4, Emulated> = DualMatrix::new();
    matrix
        .alloc(
            1,
            2,
            QueueSource::device(&device),
            HostMemOption::RwOptimized,
            DeviceMemOption::ReadWrite,
        )
        .unwrap();
    assert_eq!(Some(Placement::Independent), matrix.placement());
}
