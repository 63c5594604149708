//! Kernel builder: source text -> cached device function.

use std::sync::Arc;

use kiln_device::{Compiler, Function};
use kiln_dtype::ArgType;
use snafu::ResultExt;

use crate::error::{DeviceSnafu, Result};
use crate::kernel_cache::{KernelCache, KernelSignature};

/// Compiles kernels with a device compiler and memoizes them by signature.
pub struct KernelProvider {
    compiler: Arc<dyn Compiler>,
    cache: KernelCache,
}

impl std::fmt::Debug for KernelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelProvider").field("backend", &self.compiler.backend()).field("cache", &self.cache).finish()
    }
}

impl KernelProvider {
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        Self { compiler, cache: KernelCache::new() }
    }

    /// Compile `source` and resolve `name` with `arg_types`, or reuse an earlier build.
    ///
    /// At most one compilation happens per distinct `(name, source, arg_types)`
    /// for the lifetime of this provider.
    ///
    /// # Errors
    ///
    /// Compilation errors (rejected source) and symbol errors (entry point not in
    /// the module). Nothing is cached for a failed build.
    pub fn build(&self, name: &str, source: &str, arg_types: &[ArgType]) -> Result<Arc<dyn Function>> {
        let signature = KernelSignature::new(name, source, arg_types);
        self.cache.get_or_try_insert_with(signature, |sig| self.compile(sig))
    }

    fn compile(&self, sig: &KernelSignature) -> Result<Arc<dyn Function>> {
        tracing::debug!(kernel.name = %sig.name(), backend = %self.compiler.backend(), "compiling kernel");

        let function = self
            .compiler
            .compile(sig.name(), sig.source())
            .and_then(|module| module.function(sig.name(), sig.arg_types()))
            .inspect_err(|e| tracing::warn!(kernel.name = %sig.name(), error = %e, "kernel build failed"))
            .context(DeviceSnafu)?;
        Ok(function)
    }

    pub fn compiler(&self) -> &Arc<dyn Compiler> {
        &self.compiler
    }

    pub fn cache(&self) -> &KernelCache {
        &self.cache
    }

    /// Number of distinct kernels compiled so far.
    pub fn cached_kernels(&self) -> usize {
        self.cache.len()
    }
}
