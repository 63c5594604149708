//! CUDA backend on top of `cudarc`: NVRTC compilation, module loading and
//! asynchronous launch on CUDA streams.
//!
//! Launches identify their stream by [`StreamHandle`]; streams created through
//! [`CudaQueue::new`] are registered with the compiler so functions can find the
//! `CudaStream` behind a handle. The default handle maps to the context's default
//! stream.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use cudarc::driver::{CudaContext, CudaFunction as RawFunction, CudaModule, CudaStream, LaunchConfig, PushKernelArg};
use cudarc::nvrtc::CompileOptions;
use kiln_dtype::ArgType;
use parking_lot::Mutex;
use snafu::ResultExt;

use crate::arg::{KernelArg, check_args};
use crate::device::{Compiler, Function, Module};
use crate::error::{CompilationSnafu, CudaSnafu, LaunchSnafu, Result, SymbolSnafu};
use crate::queue::{LaunchGeometry, Queue, StreamHandle};

type StreamRegistry = Arc<Mutex<HashMap<usize, Weak<CudaStream>>>>;

/// NVRTC-based compiler bound to one CUDA context.
#[derive(Clone)]
pub struct CudaCompiler {
    context: Arc<CudaContext>,
    options: Vec<String>,
    streams: StreamRegistry,
}

impl std::fmt::Debug for CudaCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaCompiler").field("ordinal", &self.context.ordinal()).field("options", &self.options).finish()
    }
}

impl CudaCompiler {
    pub fn new(ordinal: usize) -> Result<Self> {
        Self::with_options(ordinal, Vec::new())
    }

    pub fn with_options(ordinal: usize, options: Vec<String>) -> Result<Self> {
        let context = CudaContext::new(ordinal).context(CudaSnafu)?;
        Ok(Self { context, options, streams: Arc::default() })
    }

    pub fn context(&self) -> &Arc<CudaContext> {
        &self.context
    }
}

impl Compiler for CudaCompiler {
    fn compile(&self, name: &str, src: &str) -> Result<Box<dyn Module>> {
        let opts = CompileOptions { options: self.options.clone(), ..Default::default() };
        let ptx = cudarc::nvrtc::compile_ptx_with_opts(src, opts).map_err(|e| {
            tracing::warn!(kernel.name = %name, "NVRTC compilation failed");
            CompilationSnafu { kernel: name, log: format!("{e:?}") }.build()
        })?;
        let module = self
            .context
            .load_module(ptx)
            .map_err(|e| CompilationSnafu { kernel: name, log: e.to_string() }.build())?;

        tracing::debug!(kernel.name = %name, "CUDA module loaded");
        Ok(Box::new(CudaModuleHandle { module, context: Arc::clone(&self.context), streams: Arc::clone(&self.streams) }))
    }

    fn backend(&self) -> &str {
        "CUDA"
    }
}

struct CudaModuleHandle {
    module: Arc<CudaModule>,
    context: Arc<CudaContext>,
    streams: StreamRegistry,
}

impl Module for CudaModuleHandle {
    fn function(&self, name: &str, arg_types: &[ArgType]) -> Result<Arc<dyn Function>> {
        let func = self
            .module
            .load_function(name)
            .map_err(|e| SymbolSnafu { kernel: name, reason: e.to_string() }.build())?;
        Ok(Arc::new(CudaFunction {
            func,
            _module: Arc::clone(&self.module),
            context: Arc::clone(&self.context),
            streams: Arc::clone(&self.streams),
            name: name.to_string(),
            arg_types: arg_types.to_vec(),
        }))
    }
}

/// Launchable CUDA kernel.
pub struct CudaFunction {
    func: RawFunction,
    _module: Arc<CudaModule>,
    context: Arc<CudaContext>,
    streams: StreamRegistry,
    name: String,
    arg_types: Vec<ArgType>,
}

impl std::fmt::Debug for CudaFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaFunction").field("name", &self.name).field("arg_types", &self.arg_types).finish()
    }
}

impl CudaFunction {
    fn stream_for(&self, handle: StreamHandle) -> Result<Arc<CudaStream>> {
        if handle.is_default() {
            return Ok(self.context.default_stream());
        }
        self.streams.lock().get(&handle.raw()).and_then(Weak::upgrade).ok_or_else(|| {
            LaunchSnafu { kernel: self.name.as_str(), reason: format!("unknown stream {:#x}", handle.raw()) }.build()
        })
    }
}

impl Function for CudaFunction {
    fn exec_async(&self, geometry: &LaunchGeometry, stream: StreamHandle, args: &[KernelArg]) -> Result<()> {
        check_args(&self.name, &self.arg_types, args)?;
        let cu_stream = self.stream_for(stream)?;

        let cfg = LaunchConfig {
            grid_dim: geometry.grid.as_tuple(),
            block_dim: geometry.block.as_tuple(),
            shared_mem_bytes: 0,
        };
        tracing::trace!(kernel.name = %self.name, grid = %geometry.grid, block = %geometry.block, "CUDA launch");

        let mut builder = cu_stream.launch_builder(&self.func);
        for arg in args {
            match arg {
                KernelArg::I32(v) => {
                    builder.arg(v);
                }
                KernelArg::U32(v) => {
                    builder.arg(v);
                }
                KernelArg::I64(v) => {
                    builder.arg(v);
                }
                KernelArg::U64(v) => {
                    builder.arg(v);
                }
                KernelArg::F32(v) => {
                    builder.arg(v);
                }
                KernelArg::F64(v) => {
                    builder.arg(v);
                }
                KernelArg::Ptr(p) => {
                    builder.arg(&p.0);
                }
                // Rejected by `check_args`.
                KernelArg::Symbol(_) => {}
            }
        }

        // SAFETY: argument count and types were checked against the declared signature.
        unsafe { builder.launch(cfg) }
            .map_err(|e| LaunchSnafu { kernel: self.name.as_str(), reason: e.to_string() }.build())?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn arg_types(&self) -> &[ArgType] {
        &self.arg_types
    }
}

/// A CUDA stream usable as an execution queue.
pub struct CudaQueue {
    stream: Arc<CudaStream>,
}

impl std::fmt::Debug for CudaQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaQueue").field("stream", &(self.stream.cu_stream() as usize)).finish()
    }
}

impl CudaQueue {
    /// Create a new stream on the compiler's context and register it for launches.
    pub fn new(compiler: &CudaCompiler) -> Result<Self> {
        let stream = compiler.context.new_stream().context(CudaSnafu)?;
        let mut streams = compiler.streams.lock();
        streams.retain(|_, weak| weak.strong_count() > 0);
        streams.insert(stream.cu_stream() as usize, Arc::downgrade(&stream));
        Ok(Self { stream })
    }

    pub fn synchronize(&self) -> Result<()> {
        self.stream.synchronize().context(CudaSnafu)
    }
}

impl Queue for CudaQueue {
    fn stream(&self) -> StreamHandle {
        StreamHandle::from_raw(self.stream.cu_stream() as usize)
    }
}
