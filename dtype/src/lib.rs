//! Argument type descriptors for device kernels.
//!
//! A kernel's parameter list is described by an ordered list of [`ArgType`]s.
//! The list is part of the kernel signature: the device compiler needs it to bind
//! parameters, and the launcher uses it to check and marshal launch values.

pub mod ext;


pub use ext::HasArgType;

/// Scalar parameter types accepted by pointwise kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::VariantArray, strum::Display)]
pub enum ScalarDType {
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

/// Type of a single kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArgType {
    /// Scalar passed by value.
    Scalar(ScalarDType),
    /// Device pointer (pointer-sized integer on the host side).
    Ptr,
}

impl ScalarDType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int32 | Self::UInt32 | Self::Int64 | Self::UInt64)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn c_style(&self) -> &'static str {
        match self {
            Self::Int32 => "int",
            Self::UInt32 => "unsigned int",
            Self::Int64 => "long long",
            Self::UInt64 => "unsigned long long",
            Self::Float32 => "float",
            Self::Float64 => "double",
        }
    }
}

impl ArgType {
    /// Size of the marshalled parameter in bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Scalar(s) => s.bytes(),
            Self::Ptr => 8,
        }
    }

    pub const fn is_ptr(&self) -> bool {
        matches!(self, Self::Ptr)
    }

    pub fn c_style(&self) -> String {
        match self {
            Self::Scalar(s) => s.c_style().to_string(),
            Self::Ptr => "void*".to_string(),
        }
    }
}

impl From<ScalarDType> for ArgType {
    fn from(scalar: ScalarDType) -> Self {
        Self::Scalar(scalar)
    }
}

impl std::fmt::Display for ArgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Ptr => f.write_str("Ptr"),
        }
    }
}

// Shorthands used when spelling out kernel signatures.
#[allow(non_upper_case_globals)]
impl ArgType {
    pub const Int32: Self = Self::Scalar(ScalarDType::Int32);
    pub const UInt32: Self = Self::Scalar(ScalarDType::UInt32);
    pub const Int64: Self = Self::Scalar(ScalarDType::Int64);
    pub const UInt64: Self = Self::Scalar(ScalarDType::UInt64);
    pub const Float32: Self = Self::Scalar(ScalarDType::Float32);
    pub const Float64: Self = Self::Scalar(ScalarDType::Float64);
}
