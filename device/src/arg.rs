//! Launch-time argument values.
//!
//! A launch receives an ordered slice of [`KernelArg`]s. Each value is checked
//! against the function's [`ArgType`] list before any backend call, so count and
//! type mismatches surface as launch errors on the host.

use std::sync::Arc;

use kiln_dtype::{ArgType, HasArgType, ScalarDType};
use snafu::ensure;

use crate::error::{ArgCountSnafu, ArgMismatchSnafu, Result, UnresolvedArgSnafu};

/// Raw device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePtr(pub u64);

impl DevicePtr {
    pub const NULL: Self = Self(0);

    pub fn addr(self) -> u64 {
        self.0
    }
}

/// A single value passed to a device function.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelArg {
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Ptr(DevicePtr),
    /// Placeholder key that was not bound for this launch.
    Symbol(Arc<str>),
}

impl KernelArg {
    pub fn symbol(key: impl Into<Arc<str>>) -> Self {
        Self::Symbol(key.into())
    }

    /// Parameter type of this value, `None` for an unbound symbol.
    pub fn arg_type(&self) -> Option<ArgType> {
        self.typed().ok()
    }

    fn typed(&self) -> std::result::Result<ArgType, &Arc<str>> {
        Ok(match self {
            Self::I32(_) => i32::ARG_TYPE,
            Self::U32(_) => u32::ARG_TYPE,
            Self::I64(_) => i64::ARG_TYPE,
            Self::U64(_) => u64::ARG_TYPE,
            Self::F32(_) => f32::ARG_TYPE,
            Self::F64(_) => f64::ARG_TYPE,
            Self::Ptr(_) => ArgType::Ptr,
            Self::Symbol(key) => return Err(key),
        })
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    /// Native-endian bytes of the value packed into an 8-byte parameter slot.
    ///
    /// Narrow values occupy the leading bytes; the rest is zero.
    pub fn to_slot(&self) -> Option<u64> {
        let mut slot = [0u8; 8];
        match self {
            Self::I32(v) => slot[..4].copy_from_slice(&v.to_ne_bytes()),
            Self::U32(v) => slot[..4].copy_from_slice(&v.to_ne_bytes()),
            Self::F32(v) => slot[..4].copy_from_slice(&v.to_ne_bytes()),
            Self::I64(v) => slot.copy_from_slice(&v.to_ne_bytes()),
            Self::U64(v) => slot.copy_from_slice(&v.to_ne_bytes()),
            Self::F64(v) => slot.copy_from_slice(&v.to_ne_bytes()),
            Self::Ptr(p) => slot.copy_from_slice(&p.0.to_ne_bytes()),
            Self::Symbol(_) => return None,
        }
        Some(u64::from_ne_bytes(slot))
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for KernelArg {
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        })*
    };
}

impl_from_scalar! {
    i32 => I32, u32 => U32, i64 => I64, u64 => U64, f32 => F32, f64 => F64,
}

impl From<DevicePtr> for KernelArg {
    fn from(ptr: DevicePtr) -> Self {
        Self::Ptr(ptr)
    }
}

impl std::fmt::Display for KernelArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Ptr(p) => write!(f, "{:#x}", p.0),
            Self::Symbol(key) => write!(f, "\"{key}\""),
        }
    }
}

/// Check launch values against a function's parameter list.
///
/// Fails on count mismatch, on an unbound symbol, or on a value whose type
/// differs from the declared parameter. Pointer parameters also accept `U64`,
/// which is how raw addresses are commonly handed over.
pub fn check_args(kernel: &str, expected: &[ArgType], args: &[KernelArg]) -> Result<()> {
    ensure!(
        expected.len() == args.len(),
        ArgCountSnafu { kernel, expected: expected.len(), actual: args.len() }
    );

    for (index, (want, arg)) in expected.iter().zip(args).enumerate() {
        let got = arg.typed().or_else(|key| UnresolvedArgSnafu { kernel, index, key: &**key }.fail())?;
        let compatible = got == *want || (want.is_ptr() && got == ArgType::Scalar(ScalarDType::UInt64));
        ensure!(compatible, ArgMismatchSnafu { kernel, index, expected: *want, actual: got });
    }

    Ok(())
}
