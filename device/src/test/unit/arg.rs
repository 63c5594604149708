use std::sync::Arc;

use kiln_dtype::{ArgType, HasArgType};
use test_case::test_case;

use crate::{DevicePtr, Error, KernelArg, check_args};

const AXPY: &[ArgType] = &[ArgType::Int32, ArgType::Float64, ArgType::Ptr, ArgType::Ptr];

fn axpy_args() -> Vec<KernelArg> {
    vec![KernelArg::I32(128), KernelArg::F64(2.5), DevicePtr(0x1000).into(), DevicePtr(0x2000).into()]
}

#[test]
fn test_matching_args_pass() {
    check_args("axpy", AXPY, &axpy_args()).unwrap();
}

#[test]
fn test_empty_signature() {
    check_args("noop", &[], &[]).unwrap();
}

#[test]
fn test_count_mismatch() {
    let mut args = axpy_args();
    args.pop();

    let err = check_args("axpy", AXPY, &args).unwrap_err();
    assert!(matches!(err, Error::ArgCount { expected: 4, actual: 3, .. }), "{err}");
    assert!(err.is_launch());
    assert!(!err.is_compilation());
}

#[test]
fn test_type_mismatch_reports_index() {
    let mut args = axpy_args();
    args[1] = KernelArg::F32(2.5);

    let err = check_args("axpy", AXPY, &args).unwrap_err();
    match err {
        Error::ArgMismatch { index, expected, actual, .. } => {
            assert_eq!(index, 1);
            assert_eq!(expected, ArgType::Float64);
            assert_eq!(actual, ArgType::Float32);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unbound_symbol_is_launch_error() {
    let mut args = axpy_args();
    args[2] = KernelArg::symbol("x");

    let err = check_args("axpy", AXPY, &args).unwrap_err();
    assert!(matches!(&err, Error::UnresolvedArg { index: 2, key, .. } if key == "x"), "{err}");
    assert!(err.is_launch());
}

#[test]
fn test_u64_accepted_for_pointer() {
    let mut args = axpy_args();
    args[3] = KernelArg::U64(0x2000);
    check_args("axpy", AXPY, &args).unwrap();
}

#[test_case(KernelArg::from(1i32), i32::ARG_TYPE; "i32")]
#[test_case(KernelArg::from(1u32), u32::ARG_TYPE; "u32")]
#[test_case(KernelArg::from(1i64), i64::ARG_TYPE; "i64")]
#[test_case(KernelArg::from(1u64), u64::ARG_TYPE; "u64")]
#[test_case(KernelArg::from(1.0f32), f32::ARG_TYPE; "f32")]
#[test_case(KernelArg::from(1.0f64), f64::ARG_TYPE; "f64")]
#[test_case(KernelArg::from(DevicePtr::NULL), ArgType::Ptr; "ptr")]
fn test_arg_type_of_value(arg: KernelArg, expected: ArgType) {
    assert_eq!(arg.arg_type(), Some(expected));
}

#[test]
fn test_symbol_has_no_type_or_slot() {
    let arg = KernelArg::Symbol(Arc::from("dt"));
    assert!(arg.is_symbol());
    assert_eq!(arg.arg_type(), None);
    assert_eq!(arg.to_slot(), None);
    assert_eq!(arg.to_string(), "\"dt\"");
}

#[test]
fn test_slot_holds_native_bytes() {
    let slot = KernelArg::I32(-7).to_slot().unwrap().to_ne_bytes();
    assert_eq!(i32::from_ne_bytes(slot[..4].try_into().unwrap()), -7);
    assert_eq!(&slot[4..], &[0; 4]);

    let slot = KernelArg::F64(0.125).to_slot().unwrap();
    assert_eq!(f64::from_ne_bytes(slot.to_ne_bytes()), 0.125);

    assert_eq!(KernelArg::Ptr(DevicePtr(0xdead_beef)).to_slot(), Some(0xdead_beef));
}
