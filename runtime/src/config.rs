//! Launch configuration for pointwise kernels.
//!
//! Provides typed configuration with a bon builder and environment variable
//! fallbacks. The same block sizes must be used by the kernel generator (which
//! bakes them into the kernel body) and by the launcher, so both read them from
//! one [`PointwiseConfig`].

use bon::bon;
use kiln_device::Dim3;
use snafu::ensure;

use crate::error::{InvalidBlockSnafu, Result};
use crate::pointwise::Dims;

/// Environment variable overriding the 1-D block preset, e.g. `128,1,1`.
pub const BLOCK_1D_ENV: &str = "KILN_BLOCK_1D";
/// Environment variable overriding the 2-D block preset, e.g. `32,8,1`.
pub const BLOCK_2D_ENV: &str = "KILN_BLOCK_2D";

/// Block-size presets, one per problem rank.
///
/// Every block extent is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointwiseConfig {
    block1d: Dim3,
    block2d: Dim3,
}

impl PointwiseConfig {
    pub const DEFAULT_BLOCK_1D: Dim3 = Dim3::new(64, 1, 1);
    pub const DEFAULT_BLOCK_2D: Dim3 = Dim3::new(64, 4, 1);

    /// Block for 1-D problems.
    pub fn block1d(&self) -> Dim3 {
        self.block1d
    }

    /// Block for 2-D problems.
    pub fn block2d(&self) -> Dim3 {
        self.block2d
    }

    /// Block preset for a problem shape.
    pub fn block_for(&self, dims: &Dims) -> Dim3 {
        match dims {
            Dims::D1(_) => self.block1d,
            Dims::D2(..) => self.block2d,
        }
    }

    /// Configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `KILN_BLOCK_1D=x,y,z` - 1-D block preset (default: `64,1,1`)
    /// * `KILN_BLOCK_2D=x,y,z` - 2-D block preset (default: `64,4,1`)
    ///
    /// Malformed values are logged and replaced by the default.
    pub fn from_env() -> Self {
        Self {
            block1d: block_from_env(BLOCK_1D_ENV, Self::DEFAULT_BLOCK_1D),
            block2d: block_from_env(BLOCK_2D_ENV, Self::DEFAULT_BLOCK_2D),
        }
    }

    /// Parse a block size written as `x,y,z`.
    pub fn parse_block(value: &str) -> Result<Dim3> {
        let parts: Vec<u32> = value
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| InvalidBlockSnafu { value }.build())?;

        match *parts.as_slice() {
            [x, y, z] => validate_block(Dim3::new(x, y, z)),
            _ => InvalidBlockSnafu { value }.fail(),
        }
    }
}

#[bon]
impl PointwiseConfig {
    /// Create a configuration with builder pattern.
    ///
    /// # Errors
    ///
    /// [`InvalidBlock`](crate::Error::InvalidBlock) if any block extent is zero.
    #[builder]
    pub fn new(
        #[builder(default = PointwiseConfig::DEFAULT_BLOCK_1D)] block1d: Dim3,
        #[builder(default = PointwiseConfig::DEFAULT_BLOCK_2D)] block2d: Dim3,
    ) -> Result<Self> {
        Ok(Self { block1d: validate_block(block1d)?, block2d: validate_block(block2d)? })
    }
}

impl Default for PointwiseConfig {
    fn default() -> Self {
        Self { block1d: Self::DEFAULT_BLOCK_1D, block2d: Self::DEFAULT_BLOCK_2D }
    }
}

fn validate_block(block: Dim3) -> Result<Dim3> {
    ensure!(block.x > 0 && block.y > 0 && block.z > 0, InvalidBlockSnafu { value: block.to_string() });
    Ok(block)
}

fn block_from_env(var: &str, default: Dim3) -> Dim3 {
    let Ok(raw) = std::env::var(var) else { return default };
    match PointwiseConfig::parse_block(&raw) {
        Ok(block) => block,
        Err(e) => {
            tracing::warn!(env = var, error = %e, "ignoring block size override");
            default
        }
    }
}
