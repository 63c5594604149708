//! Pointwise kernels: launch geometry from the problem shape plus late-bound arguments.
//!
//! A [`PointwiseKernel`] is created once per kernel and problem shape and then run
//! every stage or timestep. Its argument list mixes values fixed at construction
//! with named placeholders filled in from per-call bindings:
//!
//! ```ignore
//! let kernel = pointwise.instantiate(
//!     Dims::D2(nrow, ncol),
//!     function,
//!     vec![ArgSlot::bound(ncol as i32), ArgSlot::placeholder("t"), ArgSlot::bound(u_ptr)],
//!     vec![Box::new(u_buffer)],
//! );
//!
//! for step in 0..nsteps {
//!     kernel.run_with(&queue, &Bindings::from([("t".to_string(), KernelArg::F64(t))]))?;
//! }
//! ```
//!
//! Kernels without placeholders precompute their argument list, so each run
//! hands the same slice to the device without resolving anything.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use kiln_device::{Compiler, Function, KernelArg, LaunchGeometry, Queue};
use kiln_dtype::ArgType;
use smallvec::SmallVec;
use snafu::ResultExt;

use crate::config::PointwiseConfig;
use crate::error::{DeviceSnafu, Error, InvalidDimsSnafu, Result};
use crate::provider::KernelProvider;

/// Per-call values for placeholder slots, keyed by placeholder name.
pub type Bindings = HashMap<String, KernelArg>;

/// A resource whose lifetime must cover every launch of a kernel.
pub type Managed = Box<dyn Any + Send + Sync>;

/// Logical problem shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dims {
    D1(usize),
    /// `(rows, cols)`; `cols` is the fast dimension.
    D2(usize, usize),
}

impl Dims {
    pub fn rank(&self) -> usize {
        match self {
            Self::D1(_) => 1,
            Self::D2(..) => 2,
        }
    }

    /// Fast (last) extent; the grid is sized from this alone.
    pub fn outer(&self) -> usize {
        match *self {
            Self::D1(n) => n,
            Self::D2(_, cols) => cols,
        }
    }
}

impl From<usize> for Dims {
    fn from(n: usize) -> Self {
        Self::D1(n)
    }
}

impl From<[usize; 1]> for Dims {
    fn from([n]: [usize; 1]) -> Self {
        Self::D1(n)
    }
}

impl From<(usize, usize)> for Dims {
    fn from((rows, cols): (usize, usize)) -> Self {
        Self::D2(rows, cols)
    }
}

impl From<[usize; 2]> for Dims {
    fn from([rows, cols]: [usize; 2]) -> Self {
        Self::D2(rows, cols)
    }
}

impl TryFrom<&[usize]> for Dims {
    type Error = Error;

    fn try_from(dims: &[usize]) -> Result<Self> {
        match *dims {
            [n] => Ok(Self::D1(n)),
            [rows, cols] => Ok(Self::D2(rows, cols)),
            _ => InvalidDimsSnafu { rank: dims.len() }.fail(),
        }
    }
}

/// One position in a kernel's argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSlot {
    /// Value fixed at construction, passed unchanged on every launch.
    Bound(KernelArg),
    /// Named value looked up in the bindings of each run.
    Placeholder(Arc<str>),
}

impl ArgSlot {
    pub fn bound(value: impl Into<KernelArg>) -> Self {
        Self::Bound(value.into())
    }

    pub fn placeholder(key: impl Into<Arc<str>>) -> Self {
        Self::Placeholder(key.into())
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// Value for this slot under `bindings`.
    ///
    /// A placeholder missing from `bindings` resolves to itself as a
    /// [`KernelArg::Symbol`]; the device layer rejects it if it reaches a launch.
    pub fn resolve(&self, bindings: &Bindings) -> KernelArg {
        match self {
            Self::Bound(value) => value.clone(),
            Self::Placeholder(key) => match bindings.get(&**key) {
                Some(value) => value.clone(),
                None => KernelArg::Symbol(Arc::clone(key)),
            },
        }
    }
}

impl From<KernelArg> for ArgSlot {
    fn from(value: KernelArg) -> Self {
        Self::Bound(value)
    }
}

/// Launchable pointwise kernel.
pub struct PointwiseKernel {
    function: Arc<dyn Function>,
    geometry: LaunchGeometry,
    slots: Vec<ArgSlot>,
    /// Argument list when no slot is a placeholder.
    bound: Option<Vec<KernelArg>>,
    _managed: Vec<Managed>,
}

impl std::fmt::Debug for PointwiseKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointwiseKernel")
            .field("function", &self.function.name())
            .field("geometry", &self.geometry)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl PointwiseKernel {
    /// Launch on `queue` with no per-call bindings.
    pub fn run(&self, queue: &dyn Queue) -> Result<()> {
        self.run_with(queue, &Bindings::new())
    }

    /// Resolve placeholders from `bindings` and launch asynchronously on `queue`.
    ///
    /// Returns once the launch is enqueued. Keys that match no placeholder are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Launch errors from the device runtime, including argument count or type
    /// mismatches and placeholders left unbound.
    pub fn run_with(&self, queue: &dyn Queue, bindings: &Bindings) -> Result<()> {
        match &self.bound {
            Some(args) => self.launch(queue, args),
            None => self.launch(queue, &self.resolve_slots(bindings)),
        }
    }

    fn launch(&self, queue: &dyn Queue, args: &[KernelArg]) -> Result<()> {
        let stream = queue.stream();
        tracing::trace!(
            kernel.name = %self.function.name(),
            grid = %self.geometry.grid,
            block = %self.geometry.block,
            stream = stream.raw(),
            "launching pointwise kernel"
        );
        self.function.exec_async(&self.geometry, stream, args).context(DeviceSnafu)
    }

    /// Argument list a run with `bindings` would launch with.
    pub fn resolve(&self, bindings: &Bindings) -> Vec<KernelArg> {
        match &self.bound {
            Some(args) => args.clone(),
            None => self.resolve_slots(bindings).into_vec(),
        }
    }

    fn resolve_slots(&self, bindings: &Bindings) -> SmallVec<[KernelArg; 8]> {
        self.slots.iter().map(|slot| slot.resolve(bindings)).collect()
    }

    pub fn has_placeholders(&self) -> bool {
        self.bound.is_none()
    }

    pub fn geometry(&self) -> &LaunchGeometry {
        &self.geometry
    }

    pub fn args(&self) -> &[ArgSlot] {
        &self.slots
    }

    pub fn function(&self) -> &Arc<dyn Function> {
        &self.function
    }
}

/// Builds compiled functions and wraps them as [`PointwiseKernel`]s.
#[derive(Debug)]
pub struct PointwiseKernelProvider {
    provider: KernelProvider,
    config: PointwiseConfig,
}

impl PointwiseKernelProvider {
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        Self::with_config(compiler, PointwiseConfig::default())
    }

    pub fn with_config(compiler: Arc<dyn Compiler>, config: PointwiseConfig) -> Self {
        Self { provider: KernelProvider::new(compiler), config }
    }

    /// Block presets; kernel generators must render with the same values.
    pub fn config(&self) -> &PointwiseConfig {
        &self.config
    }

    pub fn provider(&self) -> &KernelProvider {
        &self.provider
    }

    /// See [`KernelProvider::build`].
    pub fn build(&self, name: &str, source: &str, arg_types: &[ArgType]) -> Result<Arc<dyn Function>> {
        self.provider.build(name, source, arg_types)
    }

    /// Wrap `function` for a problem of shape `dims`.
    ///
    /// The block is the preset for the rank of `dims`; the grid covers the fast
    /// extent `dims[-1]` along `x` and is 1 elsewhere. `managed` is owned by the
    /// returned kernel and dropped with it.
    pub fn instantiate(
        &self,
        dims: impl Into<Dims>,
        function: Arc<dyn Function>,
        args: Vec<ArgSlot>,
        managed: Vec<Managed>,
    ) -> PointwiseKernel {
        let dims = dims.into();
        let block = self.config.block_for(&dims);
        let geometry = LaunchGeometry::covering(block, dims.outer(), 1);

        let bound = if args.iter().any(ArgSlot::is_placeholder) {
            None
        } else {
            Some(args.iter().map(|slot| slot.resolve(&Bindings::new())).collect())
        };

        tracing::debug!(
            kernel.name = %function.name(),
            rank = dims.rank(),
            grid = %geometry.grid,
            block = %geometry.block,
            placeholders = bound.is_none(),
            "instantiated pointwise kernel"
        );

        PointwiseKernel { function, geometry, slots: args, bound, _managed: managed }
    }

    /// Build (or reuse) the function for `name` and instantiate it for `dims`.
    ///
    /// # Errors
    ///
    /// Compilation and symbol errors from [`build`](Self::build).
    pub fn kernel(
        &self,
        name: &str,
        source: &str,
        arg_types: &[ArgType],
        dims: impl Into<Dims>,
        args: Vec<ArgSlot>,
        managed: Vec<Managed>,
    ) -> Result<PointwiseKernel> {
        let function = self.build(name, source, arg_types)?;
        Ok(self.instantiate(dims, function, args, managed))
    }
}
