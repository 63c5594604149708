use kiln_dtype::ArgType;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The device compiler rejected the kernel source.
    #[snafu(display("compilation of kernel '{kernel}' failed: {log}"))]
    Compilation { kernel: String, log: String },

    /// Entry point or argument binding not found in an otherwise valid module.
    #[snafu(display("symbol error for kernel '{kernel}': {reason}"))]
    Symbol { kernel: String, reason: String },

    /// Device runtime rejected a launch.
    #[snafu(display("launch of kernel '{kernel}' failed: {reason}"))]
    Launch { kernel: String, reason: String },

    #[snafu(display("kernel '{kernel}' expects {expected} arguments, got {actual}"))]
    ArgCount { kernel: String, expected: usize, actual: usize },

    #[snafu(display("kernel '{kernel}' argument {index}: expected {expected}, got {actual}"))]
    ArgMismatch { kernel: String, index: usize, expected: ArgType, actual: ArgType },

    /// A placeholder reached the launch without a binding.
    #[snafu(display("kernel '{kernel}' argument {index}: placeholder '{key}' was never bound"))]
    UnresolvedArg { kernel: String, index: usize, key: String },

    #[snafu(display("{backend} runtime not available"))]
    NotAvailable { backend: &'static str },

    #[snafu(display("HIP error {code} in {call}"))]
    Hip { code: i32, call: String },

    #[cfg(feature = "cuda")]
    #[snafu(display("CUDA error: {source}"))]
    Cuda { source: cudarc::driver::DriverError },
}

impl Error {
    /// Compile-side failure: nothing gets cached for the signature.
    pub fn is_compilation(&self) -> bool {
        matches!(self, Self::Compilation { .. } | Self::Symbol { .. })
    }

    /// Launch-side failure reported at the `run` call site.
    pub fn is_launch(&self) -> bool {
        matches!(self, Self::Launch { .. } | Self::ArgCount { .. } | Self::ArgMismatch { .. } | Self::UnresolvedArg { .. })
    }
}
