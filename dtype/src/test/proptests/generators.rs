use crate::*;
use proptest::prelude::*;
use strum::VariantArray;

pub fn scalar_dtype() -> impl Strategy<Value = ScalarDType> {
    prop::sample::select(ScalarDType::VARIANTS)
}

pub fn arg_type() -> impl Strategy<Value = ArgType> {
    prop_oneof![scalar_dtype().prop_map(ArgType::Scalar), Just(ArgType::Ptr)]
}

/// Ordered parameter lists as they appear in kernel signatures.
pub fn arg_types(max_len: usize) -> impl Strategy<Value = Vec<ArgType>> {
    prop::collection::vec(arg_type(), 0..=max_len)
}
