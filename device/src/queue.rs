//! Execution queue abstraction and launch geometry.
//!
//! A queue is an in-order device work stream. Work enqueued on one queue runs in
//! submission order; work on different queues is unordered unless the caller
//! synchronizes explicitly. This crate only needs the queue's stream handle: every
//! launch goes through [`Function::exec_async`](crate::device::Function::exec_async)
//! with that handle and returns without waiting for the device.
//!
//! # Geometry
//!
//! ```ignore
//! let block = Dim3::new(64, 1, 1);
//! let geometry = LaunchGeometry::covering(block, 100, 1);
//! assert_eq!(geometry.grid, Dim3::new(2, 1, 1));
//! ```

use std::ffi::c_void;

/// Three-dimensional launch extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dim3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Dim3 {
    pub const ONE: Self = Self { x: 1, y: 1, z: 1 };

    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total number of threads (or blocks) described by this extent.
    pub const fn volume(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    pub const fn as_tuple(&self) -> (u32, u32, u32) {
        (self.x, self.y, self.z)
    }
}

impl From<(u32, u32, u32)> for Dim3 {
    fn from((x, y, z): (u32, u32, u32)) -> Self {
        Self { x, y, z }
    }
}

impl From<[u32; 3]> for Dim3 {
    fn from([x, y, z]: [u32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Dim3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Grid and block extents of one kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchGeometry {
    pub grid: Dim3,
    pub block: Dim3,
}

impl LaunchGeometry {
    pub const fn new(grid: Dim3, block: Dim3) -> Self {
        Self { grid, block }
    }

    /// Smallest grid of `block`-sized groups covering `nrow × ncol` elements.
    ///
    /// `grid.x = ceil(nrow / block.x)`, `grid.y = ceil(ncol / block.y)`, `grid.z = 1`.
    /// An empty extent yields an empty grid in that dimension. `block` extents
    /// must be non-zero; a grid wider than `u32::MAX` blocks saturates.
    pub fn covering(block: Dim3, nrow: usize, ncol: usize) -> Self {
        let grid = Dim3::new(blocks_for(nrow, block.x), blocks_for(ncol, block.y), 1);
        Self { grid, block }
    }

    /// Number of threads launched along `x`.
    pub const fn threads_x(&self) -> u64 {
        self.grid.x as u64 * self.block.x as u64
    }

    /// Number of threads launched along `y`.
    pub const fn threads_y(&self) -> u64 {
        self.grid.y as u64 * self.block.y as u64
    }
}

fn blocks_for(extent: usize, block: u32) -> u32 {
    let block = block.max(1) as usize;
    u32::try_from(extent.div_ceil(block)).unwrap_or(u32::MAX)
}

/// Opaque handle of an in-order device stream.
///
/// The null handle is the backend's default stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(usize);

impl StreamHandle {
    pub const DEFAULT: Self = Self(0);

    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr as usize)
    }

    pub const fn raw(self) -> usize {
        self.0
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub const fn is_default(self) -> bool {
        self.0 == 0
    }
}

impl Default for StreamHandle {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// In-order execution queue that kernels are launched on.
pub trait Queue: Sync + std::fmt::Debug {
    /// Stream identifying this queue's execution context.
    fn stream(&self) -> StreamHandle;
}

/// Queue bound to the backend's default stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultQueue;

impl Queue for DefaultQueue {
    fn stream(&self) -> StreamHandle {
        StreamHandle::DEFAULT
    }
}
