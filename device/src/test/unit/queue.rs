use test_case::test_case;

use crate::{DefaultQueue, Dim3, LaunchGeometry, Queue, StreamHandle};

#[test_case(100, (2, 1, 1); "partial block")]
#[test_case(128, (2, 1, 1); "exact multiple")]
#[test_case(64, (1, 1, 1); "single block")]
#[test_case(65, (2, 1, 1); "one past")]
#[test_case(1, (1, 1, 1); "single element")]
#[test_case(0, (0, 1, 1); "empty")]
fn test_covering_1d(n: usize, grid: (u32, u32, u32)) {
    let geometry = LaunchGeometry::covering(Dim3::new(64, 1, 1), n, 1);
    assert_eq!(geometry.grid, Dim3::from(grid));
    assert_eq!(geometry.block, Dim3::new(64, 1, 1));
}

#[test]
fn test_covering_2d_rounds_both_axes() {
    let geometry = LaunchGeometry::covering(Dim3::new(64, 4, 1), 130, 9);
    assert_eq!(geometry.grid, Dim3::new(3, 3, 1));
    assert!(geometry.threads_x() >= 130);
    assert!(geometry.threads_y() >= 9);
}

#[test]
fn test_covering_single_column_in_2d_block() {
    // A 4-row block over one column still needs exactly one block along y.
    let geometry = LaunchGeometry::covering(Dim3::new(64, 4, 1), 256, 1);
    assert_eq!(geometry.grid, Dim3::new(4, 1, 1));
}

#[test]
fn test_dim3_volume_and_display() {
    let dim = Dim3::new(64, 4, 2);
    assert_eq!(dim.volume(), 512);
    assert_eq!(dim.to_string(), "(64, 4, 2)");
    assert_eq!(Dim3::from([1, 2, 3]).as_tuple(), (1, 2, 3));
}

#[test]
fn test_stream_handle_roundtrip() {
    let handle = StreamHandle::from_raw(0x7f00);
    assert_eq!(StreamHandle::from_ptr(handle.as_ptr()), handle);
    assert!(!handle.is_default());
    assert!(StreamHandle::default().is_default());
    assert_eq!(DefaultQueue.stream(), StreamHandle::DEFAULT);
}
