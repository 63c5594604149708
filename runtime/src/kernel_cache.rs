//! Compile-once kernel cache.
//!
//! Maps a [`KernelSignature`] (entry point name, source text, argument types) to
//! the compiled device function. Two requests with equal signatures share one
//! compilation; a signature that differs in any component is compiled separately.
//!
//! # Thread Safety
//!
//! The map is guarded by a `parking_lot::Mutex` that stays locked while a miss is
//! being compiled, so concurrent requests for the same signature still compile
//! exactly once. Compilation happens at solver setup, not per timestep, so the
//! serialization is not on a hot path.
//!
//! # Lifetime
//!
//! Entries live as long as the cache. There is no eviction: the set of kernels in
//! a solver run is fixed at setup time.

use std::collections::HashMap;
use std::sync::Arc;

use kiln_device::Function;
use kiln_dtype::ArgType;
use parking_lot::Mutex;

/// Identity of a compiled kernel. Equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelSignature {
    name: String,
    source: String,
    arg_types: Vec<ArgType>,
}

impl KernelSignature {
    pub fn new(name: impl Into<String>, source: impl Into<String>, arg_types: impl Into<Vec<ArgType>>) -> Self {
        Self { name: name.into(), source: source.into(), arg_types: arg_types.into() }
    }

    /// Entry point name inside the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn arg_types(&self) -> &[ArgType] {
        &self.arg_types
    }
}

/// Per-provider cache of compiled functions.
#[derive(Default)]
pub struct KernelCache {
    kernels: Mutex<HashMap<KernelSignature, Arc<dyn Function>>>,
}

impl std::fmt::Debug for KernelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelCache").field("len", &self.len()).finish()
    }
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the function for `signature`, compiling it on a miss.
    ///
    /// `compile` runs at most once per signature. If it fails the error is
    /// returned and nothing is stored, so a later call with the same signature
    /// compiles again.
    ///
    /// # Errors
    ///
    /// Whatever `compile` returns.
    pub fn get_or_try_insert_with<F, E>(&self, signature: KernelSignature, compile: F) -> Result<Arc<dyn Function>, E>
    where
        F: FnOnce(&KernelSignature) -> Result<Arc<dyn Function>, E>,
    {
        let mut kernels = self.kernels.lock();

        // Fast path: kernel already compiled
        if let Some(function) = kernels.get(&signature) {
            tracing::debug!(kernel.name = %signature.name, "kernel cache hit");
            return Ok(Arc::clone(function));
        }

        tracing::debug!(kernel.name = %signature.name, kernel.args = signature.arg_types.len(), "kernel cache miss");
        let function = compile(&signature)?;
        kernels.insert(signature, Arc::clone(&function));
        Ok(function)
    }

    /// Look up a compiled function without compiling.
    pub fn get(&self, signature: &KernelSignature) -> Option<Arc<dyn Function>> {
        self.kernels.lock().get(signature).cloned()
    }

    pub fn contains(&self, signature: &KernelSignature) -> bool {
        self.kernels.lock().contains_key(signature)
    }

    /// Number of compiled kernels.
    pub fn len(&self) -> usize {
        self.kernels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached function.
    ///
    /// Kernel objects that already hold a function keep it alive.
    pub fn clear(&self) {
        self.kernels.lock().clear();
    }
}
