//! Device-side abstractions for kernel provisioning.
//!
//! - [`device`]: compiler, module and function traits
//! - [`queue`]: execution queues, stream handles and launch geometry
//! - [`arg`]: launch-time argument values and signature checking
//! - [`hip`]: HIP backend (feature `hip`, on by default)
//! - [`cuda`]: CUDA backend via cudarc (feature `cuda`)

pub mod arg;
pub mod device;
pub mod error;
pub mod queue;

#[cfg(feature = "cuda")]
pub mod cuda;
#[cfg(feature = "hip")]
pub mod hip;

#[cfg(test)]
pub mod test;

pub use arg::{DevicePtr, KernelArg, check_args};
pub use device::{Compiler, Function, Module};
pub use error::{Error, Result};
pub use queue::{DefaultQueue, Dim3, LaunchGeometry, Queue, StreamHandle};

pub use kiln_dtype::{ArgType, ScalarDType};
