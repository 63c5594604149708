//! Kernel provisioning for GPU backends.
//!
//! Turns kernel source text into launchable device functions and wraps them as
//! pointwise kernels with launch geometry derived from the problem shape.
//!
//! # Building
//!
//! [`KernelProvider::build`] compiles a kernel at most once per
//! `(name, source, argument types)` signature and memoizes the result in a
//! [`KernelCache`]. Failed builds are never cached.
//!
//! # Pointwise kernels
//!
//! [`PointwiseKernelProvider::instantiate`] binds a function to a 1-D or 2-D
//! problem shape and an argument list whose slots are either fixed values or
//! named placeholders. [`PointwiseKernel::run_with`] fills the placeholders from
//! per-call bindings and enqueues the launch without waiting for it.

pub mod config;
pub mod error;
pub mod kernel_cache;
pub mod pointwise;
pub mod provider;


pub use config::PointwiseConfig;
pub use error::*;
pub use kernel_cache::{KernelCache, KernelSignature};
pub use pointwise::{ArgSlot, Bindings, Dims, Managed, PointwiseKernel, PointwiseKernelProvider};
pub use provider::KernelProvider;

pub use kiln_device::{ArgType, DevicePtr, Dim3, KernelArg, LaunchGeometry, Queue, ScalarDType, StreamHandle};
