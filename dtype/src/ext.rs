use super::*;

pub trait HasArgType {
    const ARG_TYPE: ArgType;
}

macro_rules! impl_arg_type_ext {
    ($($ty:ty => $arg:expr),* $(,)?) => {
        $(impl HasArgType for $ty { const ARG_TYPE: ArgType = $arg; })*
    };
}

impl_arg_type_ext! {
    i32 => ArgType::Int32, u32 => ArgType::UInt32,
    i64 => ArgType::Int64, u64 => ArgType::UInt64,
    f32 => ArgType::Float32, f64 => ArgType::Float64,
}
