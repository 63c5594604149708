//! Error types for kernel provisioning.

use snafu::Snafu;

/// Result type for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the builder and the pointwise launcher.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Compilation, symbol or launch failure from the device layer.
    #[snafu(display("{source}"))]
    Device { source: kiln_device::Error },

    /// Problem shape with a rank other than 1 or 2.
    #[snafu(display("pointwise kernels take 1-D or 2-D shapes, got rank {rank}"))]
    InvalidDims { rank: usize },

    /// Malformed block-size string.
    #[snafu(display("invalid block size '{value}': expected three positive integers 'x,y,z'"))]
    InvalidBlock { value: String },
}

impl Error {
    /// The underlying device error, if any.
    pub fn device_error(&self) -> Option<&kiln_device::Error> {
        match self {
            Self::Device { source } => Some(source),
            _ => None,
        }
    }

    pub fn is_compilation(&self) -> bool {
        self.device_error().is_some_and(kiln_device::Error::is_compilation)
    }

    pub fn is_launch(&self) -> bool {
        self.device_error().is_some_and(kiln_device::Error::is_launch)
    }
}

impl From<kiln_device::Error> for Error {
    fn from(source: kiln_device::Error) -> Self {
        Self::Device { source }
    }
}
