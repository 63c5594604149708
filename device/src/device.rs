//! Device compiler and function abstractions.
//!
//! Three traits model the device toolchain:
//! - **Compiler**: kernel source text -> loaded [`Module`]
//! - **Module**: entry point name + argument types -> [`Function`]
//! - **Function**: asynchronous launch on a stream
//!
//! Backends (HIP, CUDA) implement all three; tests implement them with mocks.
//!
//! # Example
//!
//! ```ignore
//! let module = compiler.compile("axpy", &source)?;
//! let function = module.function("axpy", &[ArgType::Int32, ArgType::Ptr, ArgType::Ptr])?;
//! function.exec_async(&geometry, queue.stream(), &args)?;
//! ```

use std::sync::Arc;

use kiln_dtype::ArgType;

use crate::arg::KernelArg;
use crate::error::Result;
use crate::queue::{LaunchGeometry, StreamHandle};

/// A compiler that turns kernel source into a loaded module.
pub trait Compiler: Send + Sync {
    /// Compile `src` and load the result on the device.
    ///
    /// `name` is used for diagnostics only. Rejected source fails with
    /// [`Error::Compilation`](crate::Error::Compilation) carrying the compiler log.
    fn compile(&self, name: &str, src: &str) -> Result<Box<dyn Module>>;

    /// Backend name for logging.
    fn backend(&self) -> &str;
}

/// A compiled module holding one or more entry points.
pub trait Module: Send + Sync {
    /// Resolve an entry point with the given parameter list.
    ///
    /// The returned function keeps whatever it needs from the module alive.
    /// Missing symbols fail with [`Error::Symbol`](crate::Error::Symbol).
    fn function(&self, name: &str, arg_types: &[ArgType]) -> Result<Arc<dyn Function>>;
}

/// A compiled, launchable device function.
///
/// Functions are immutable after creation and may be shared across threads and
/// kernel objects.
pub trait Function: Send + Sync + std::fmt::Debug {
    /// Enqueue one launch on `stream` and return without waiting for the device.
    ///
    /// Argument count and types are checked on the host before enqueueing;
    /// mismatches fail with a launch error.
    fn exec_async(&self, geometry: &LaunchGeometry, stream: StreamHandle, args: &[KernelArg]) -> Result<()>;

    /// Entry point name.
    fn name(&self) -> &str;

    /// Declared parameter list.
    fn arg_types(&self) -> &[ArgType];
}
