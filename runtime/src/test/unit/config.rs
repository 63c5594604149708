use kiln_device::Dim3;
use test_case::test_case;

use crate::config::{BLOCK_1D_ENV, BLOCK_2D_ENV};
use crate::{Dims, Error, PointwiseConfig};

#[test]
fn test_default_presets() {
    let config = PointwiseConfig::default();
    assert_eq!(config.block1d(), Dim3::new(64, 1, 1));
    assert_eq!(config.block2d(), Dim3::new(64, 4, 1));
    assert_eq!(PointwiseConfig::builder().build().unwrap(), config);
}

#[test]
fn test_block_for_rank() {
    let config = PointwiseConfig::builder().block2d(Dim3::new(32, 8, 1)).build().unwrap();
    assert_eq!(config.block_for(&Dims::D1(10)), Dim3::new(64, 1, 1));
    assert_eq!(config.block_for(&Dims::D2(10, 10)), Dim3::new(32, 8, 1));
}

#[test_case("128,1,1" => Dim3::new(128, 1, 1); "plain")]
#[test_case(" 32, 8 ,1 " => Dim3::new(32, 8, 1); "whitespace")]
fn test_parse_block(value: &str) -> Dim3 {
    PointwiseConfig::parse_block(value).unwrap()
}

#[test_case(""; "empty")]
#[test_case("64,1"; "two components")]
#[test_case("64,1,1,1"; "four components")]
#[test_case("64,0,1"; "zero component")]
#[test_case("64,-1,1"; "negative component")]
#[test_case("a,b,c"; "not numbers")]
fn test_parse_block_rejects(value: &str) {
    let err = PointwiseConfig::parse_block(value).unwrap_err();
    assert!(matches!(err, Error::InvalidBlock { .. }), "{err}");
}

#[test_case(Dim3::new(0, 1, 1), PointwiseConfig::DEFAULT_BLOCK_2D; "zero 1-D x")]
#[test_case(PointwiseConfig::DEFAULT_BLOCK_1D, Dim3::new(64, 0, 1); "zero 2-D y")]
#[test_case(PointwiseConfig::DEFAULT_BLOCK_1D, Dim3::new(64, 4, 0); "zero 2-D z")]
fn test_builder_rejects_zero_block(block1d: Dim3, block2d: Dim3) {
    let err = PointwiseConfig::builder().block1d(block1d).block2d(block2d).build().unwrap_err();
    assert!(matches!(err, Error::InvalidBlock { .. }), "{err}");
}

#[test]
fn test_from_env() {
    // SAFETY: no other test reads or writes these variables.
    unsafe {
        std::env::set_var(BLOCK_1D_ENV, "256,1,1");
        std::env::set_var(BLOCK_2D_ENV, "not a block");
    }
    let config = PointwiseConfig::from_env();
    unsafe {
        std::env::remove_var(BLOCK_1D_ENV);
        std::env::remove_var(BLOCK_2D_ENV);
    }

    assert_eq!(config.block1d(), Dim3::new(256, 1, 1));
    // Malformed override falls back to the default.
    assert_eq!(config.block2d(), PointwiseConfig::DEFAULT_BLOCK_2D);
}
