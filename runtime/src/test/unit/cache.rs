use std::sync::Arc;
use std::time::Duration;

use kiln_dtype::ArgType;

use crate::test::mock::{MockCompiler, REJECT_MARKER, source_for};
use crate::{KernelProvider, KernelSignature};

const AXPY: &[ArgType] = &[ArgType::Int32, ArgType::Float64, ArgType::Ptr, ArgType::Ptr];

fn provider() -> (Arc<MockCompiler>, KernelProvider) {
    let compiler = Arc::new(MockCompiler::default());
    let provider = KernelProvider::new(compiler.clone());
    (compiler, provider)
}

#[test]
fn test_build_compiles_once_per_signature() {
    let (compiler, provider) = provider();
    let src = source_for("axpy");

    let first = provider.build("axpy", &src, AXPY).unwrap();
    let second = provider.build("axpy", &src, AXPY).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(compiler.compiles(), 1);
    assert_eq!(provider.cached_kernels(), 1);
    assert_eq!(first.name(), "axpy");
    assert_eq!(first.arg_types(), AXPY);
}

#[test]
fn test_different_arg_types_compile_separately() {
    let (compiler, provider) = provider();
    let src = source_for("axpy");

    let f64_ver = provider.build("axpy", &src, AXPY).unwrap();
    let f32_ver = provider.build("axpy", &src, &[ArgType::Int32, ArgType::Float32, ArgType::Ptr, ArgType::Ptr]).unwrap();

    assert!(!Arc::ptr_eq(&f64_ver, &f32_ver));
    assert_eq!(compiler.compiles(), 2);
}

#[test]
fn test_different_source_compiles_separately() {
    let (compiler, provider) = provider();

    provider.build("axpy", &source_for("axpy"), AXPY).unwrap();
    provider.build("axpy", &format!("// variant\n{}", source_for("axpy")), AXPY).unwrap();

    assert_eq!(compiler.compiles(), 2);
    assert_eq!(provider.cached_kernels(), 2);
}

#[test]
fn test_different_name_compiles_separately() {
    let (compiler, provider) = provider();
    let src = format!("{}\n{}", source_for("axpy"), source_for("axpby"));

    let axpy = provider.build("axpy", &src, AXPY).unwrap();
    let axpby = provider.build("axpby", &src, AXPY).unwrap();

    assert_eq!(axpy.name(), "axpy");
    assert_eq!(axpby.name(), "axpby");
    assert_eq!(compiler.compiles(), 2);
}

#[test]
fn test_compilation_failure_is_not_cached() {
    let (compiler, provider) = provider();
    let src = format!("{REJECT_MARKER}\n{}", source_for("axpy"));

    let err = provider.build("axpy", &src, AXPY).unwrap_err();
    assert!(err.is_compilation(), "{err}");
    assert!(matches!(err.device_error(), Some(kiln_device::Error::Compilation { .. })));
    assert_eq!(provider.cached_kernels(), 0);

    // Same signature is attempted again rather than served from the cache.
    provider.build("axpy", &src, AXPY).unwrap_err();
    assert_eq!(compiler.compiles(), 2);
}

#[test]
fn test_corrected_source_compiles_once_after_failure() {
    let (compiler, provider) = provider();
    let broken = format!("{REJECT_MARKER}\n{}", source_for("axpy"));
    let fixed = source_for("axpy");

    let err = provider.build("axpy", &broken, AXPY).unwrap_err();
    assert!(err.is_compilation(), "{err}");

    let first = provider.build("axpy", &fixed, AXPY).unwrap();
    let second = provider.build("axpy", &fixed, AXPY).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    // One rejected attempt plus one real compile.
    assert_eq!(compiler.compiles(), 2);
    assert_eq!(provider.cached_kernels(), 1);
}

#[test]
fn test_missing_entry_point_is_symbol_error() {
    let (_compiler, provider) = provider();

    let err = provider.build("missing", &source_for("axpy"), AXPY).unwrap_err();
    assert!(matches!(err.device_error(), Some(kiln_device::Error::Symbol { .. })), "{err}");
    assert!(err.is_compilation());
    assert!(!err.is_launch());
    assert_eq!(provider.cached_kernels(), 0);
}

#[test]
fn test_failure_does_not_disturb_cached_entries() {
    let (compiler, provider) = provider();
    let good = provider.build("axpy", &source_for("axpy"), AXPY).unwrap();

    provider.build("axpy", REJECT_MARKER, AXPY).unwrap_err();

    let again = provider.build("axpy", &source_for("axpy"), AXPY).unwrap();
    assert!(Arc::ptr_eq(&good, &again));
    assert_eq!(compiler.compiles(), 2);
}

#[test]
fn test_concurrent_builds_compile_once() {
    let compiler = Arc::new(MockCompiler::slow(Duration::from_millis(20)));
    let provider = KernelProvider::new(compiler.clone());
    let src = source_for("axpy");

    let functions: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|| provider.build("axpy", &src, AXPY).unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(compiler.compiles(), 1);
    assert!(functions.iter().all(|f| Arc::ptr_eq(f, &functions[0])));
}

#[test]
fn test_cache_lookup_and_clear() {
    let (compiler, provider) = provider();
    let src = source_for("axpy");
    let sig = KernelSignature::new("axpy", src.as_str(), AXPY);

    assert!(provider.cache().is_empty());
    assert!(provider.cache().get(&sig).is_none());

    let function = provider.build("axpy", &src, AXPY).unwrap();
    assert!(provider.cache().contains(&sig));
    assert!(Arc::ptr_eq(&provider.cache().get(&sig).unwrap(), &function));

    provider.cache().clear();
    assert!(provider.cache().is_empty());
    // Handles obtained before the clear stay usable.
    assert_eq!(function.name(), "axpy");

    provider.build("axpy", &src, AXPY).unwrap();
    assert_eq!(compiler.compiles(), 2);
}

#[test]
fn test_signature_equality_is_structural() {
    let a = KernelSignature::new("k", "src", AXPY);
    let b = KernelSignature::new(String::from("k"), String::from("src"), AXPY.to_vec());
    assert_eq!(a, b);
    assert_ne!(a, KernelSignature::new("k", "src", &AXPY[..3]));
    assert_eq!(b.arg_types(), AXPY);
}
