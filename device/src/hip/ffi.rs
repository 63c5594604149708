//! Runtime-loaded HIP and hiprtc entry points.
//!
//! Libraries are opened with `dlopen` on first use, so the crate builds and runs
//! on machines without ROCm; the backend then reports itself as unavailable.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::sync::OnceLock;

use libloading::Library;

use crate::error::{HipSnafu, NotAvailableSnafu, Result};

pub type HipError = c_int;
pub const HIP_SUCCESS: HipError = 0;

pub type HiprtcResult = c_int;
pub const HIPRTC_SUCCESS: HiprtcResult = 0;

pub type HipModule = *mut c_void;
pub type HipFunction = *mut c_void;
pub type HipStream = *mut c_void;
pub type HiprtcProgram = *mut c_void;

type FnHipInit = unsafe extern "C" fn(c_uint) -> HipError;
type FnHipGetDeviceCount = unsafe extern "C" fn(*mut c_int) -> HipError;
type FnHipSetDevice = unsafe extern "C" fn(c_int) -> HipError;
type FnHipStreamCreate = unsafe extern "C" fn(*mut HipStream) -> HipError;
type FnHipStreamDestroy = unsafe extern "C" fn(HipStream) -> HipError;
type FnHipStreamSynchronize = unsafe extern "C" fn(HipStream) -> HipError;
type FnHipModuleLoadData = unsafe extern "C" fn(*mut HipModule, *const c_void) -> HipError;
type FnHipModuleUnload = unsafe extern "C" fn(HipModule) -> HipError;
type FnHipModuleGetFunction = unsafe extern "C" fn(*mut HipFunction, HipModule, *const c_char) -> HipError;
type FnHipModuleLaunchKernel = unsafe extern "C" fn(
    HipFunction,
    c_uint, c_uint, c_uint, // grid
    c_uint, c_uint, c_uint, // block
    c_uint,                 // dynamic shared memory
    HipStream,
    *mut *mut c_void, // kernel params
    *mut *mut c_void, // extra
) -> HipError;

type FnHiprtcCreateProgram = unsafe extern "C" fn(
    *mut HiprtcProgram,
    *const c_char, // source
    *const c_char, // name
    c_int,
    *const *const c_char,
    *const *const c_char,
) -> HiprtcResult;
type FnHiprtcCompileProgram = unsafe extern "C" fn(HiprtcProgram, c_int, *const *const c_char) -> HiprtcResult;
type FnHiprtcGetCodeSize = unsafe extern "C" fn(HiprtcProgram, *mut usize) -> HiprtcResult;
type FnHiprtcGetCode = unsafe extern "C" fn(HiprtcProgram, *mut c_char) -> HiprtcResult;
type FnHiprtcGetProgramLogSize = unsafe extern "C" fn(HiprtcProgram, *mut usize) -> HiprtcResult;
type FnHiprtcGetProgramLog = unsafe extern "C" fn(HiprtcProgram, *mut c_char) -> HiprtcResult;
type FnHiprtcDestroyProgram = unsafe extern "C" fn(*mut HiprtcProgram) -> HiprtcResult;

pub struct HipApi {
    _lib: Library,
    pub init: FnHipInit,
    pub get_device_count: FnHipGetDeviceCount,
    pub set_device: FnHipSetDevice,
    pub stream_create: FnHipStreamCreate,
    pub stream_destroy: FnHipStreamDestroy,
    pub stream_synchronize: FnHipStreamSynchronize,
    pub module_load_data: FnHipModuleLoadData,
    pub module_unload: FnHipModuleUnload,
    pub module_get_function: FnHipModuleGetFunction,
    pub module_launch_kernel: FnHipModuleLaunchKernel,
}

pub struct HiprtcApi {
    _lib: Library,
    pub create_program: FnHiprtcCreateProgram,
    pub compile_program: FnHiprtcCompileProgram,
    pub get_code_size: FnHiprtcGetCodeSize,
    pub get_code: FnHiprtcGetCode,
    pub get_program_log_size: FnHiprtcGetProgramLogSize,
    pub get_program_log: FnHiprtcGetProgramLog,
    pub destroy_program: FnHiprtcDestroyProgram,
}

// SAFETY: plain function pointers into process-global libraries; the HIP
// runtime synchronizes internally.
unsafe impl Send for HipApi {}
unsafe impl Sync for HipApi {}
unsafe impl Send for HiprtcApi {}
unsafe impl Sync for HiprtcApi {}

static HIP_API: OnceLock<Option<HipApi>> = OnceLock::new();
static HIPRTC_API: OnceLock<Option<HiprtcApi>> = OnceLock::new();

const HIP_LIBRARIES: &[&str] = &["libamdhip64.so", "libamdhip64.so.6"];
const HIPRTC_LIBRARIES: &[&str] = &["libhiprtc.so", "libhiprtc.so.6"];

fn open_first(names: &[&str]) -> Option<Library> {
    names.iter().find_map(|name| {
        // SAFETY: loading a system library; its initializers are trusted.
        match unsafe { Library::new(name) } {
            Ok(lib) => {
                tracing::debug!(library = %name, "loaded HIP library");
                Some(lib)
            }
            Err(e) => {
                tracing::trace!(library = %name, error = %e, "HIP library not found");
                None
            }
        }
    })
}

impl HipApi {
    fn try_load() -> Option<Self> {
        let lib = open_first(HIP_LIBRARIES)?;
        // SAFETY: symbol types match the HIP runtime headers.
        unsafe {
            Some(Self {
                init: *lib.get::<FnHipInit>(b"hipInit\0").ok()?,
                get_device_count: *lib.get::<FnHipGetDeviceCount>(b"hipGetDeviceCount\0").ok()?,
                set_device: *lib.get::<FnHipSetDevice>(b"hipSetDevice\0").ok()?,
                stream_create: *lib.get::<FnHipStreamCreate>(b"hipStreamCreate\0").ok()?,
                stream_destroy: *lib.get::<FnHipStreamDestroy>(b"hipStreamDestroy\0").ok()?,
                stream_synchronize: *lib.get::<FnHipStreamSynchronize>(b"hipStreamSynchronize\0").ok()?,
                module_load_data: *lib.get::<FnHipModuleLoadData>(b"hipModuleLoadData\0").ok()?,
                module_unload: *lib.get::<FnHipModuleUnload>(b"hipModuleUnload\0").ok()?,
                module_get_function: *lib.get::<FnHipModuleGetFunction>(b"hipModuleGetFunction\0").ok()?,
                module_launch_kernel: *lib.get::<FnHipModuleLaunchKernel>(b"hipModuleLaunchKernel\0").ok()?,
                _lib: lib,
            })
        }
    }
}

impl HiprtcApi {
    fn try_load() -> Option<Self> {
        let lib = open_first(HIPRTC_LIBRARIES)?;
        // SAFETY: symbol types match the hiprtc headers.
        unsafe {
            Some(Self {
                create_program: *lib.get::<FnHiprtcCreateProgram>(b"hiprtcCreateProgram\0").ok()?,
                compile_program: *lib.get::<FnHiprtcCompileProgram>(b"hiprtcCompileProgram\0").ok()?,
                get_code_size: *lib.get::<FnHiprtcGetCodeSize>(b"hiprtcGetCodeSize\0").ok()?,
                get_code: *lib.get::<FnHiprtcGetCode>(b"hiprtcGetCode\0").ok()?,
                get_program_log_size: *lib.get::<FnHiprtcGetProgramLogSize>(b"hiprtcGetProgramLogSize\0").ok()?,
                get_program_log: *lib.get::<FnHiprtcGetProgramLog>(b"hiprtcGetProgramLog\0").ok()?,
                destroy_program: *lib.get::<FnHiprtcDestroyProgram>(b"hiprtcDestroyProgram\0").ok()?,
                _lib: lib,
            })
        }
    }
}

pub fn hip_api() -> Result<&'static HipApi> {
    HIP_API.get_or_init(HipApi::try_load).as_ref().ok_or_else(|| NotAvailableSnafu { backend: "HIP" }.build())
}

pub fn hiprtc_api() -> Result<&'static HiprtcApi> {
    HIPRTC_API.get_or_init(HiprtcApi::try_load).as_ref().ok_or_else(|| NotAvailableSnafu { backend: "hiprtc" }.build())
}

pub fn check_hip(code: HipError, call: &str) -> Result<()> {
    if code == HIP_SUCCESS { Ok(()) } else { HipSnafu { code, call }.fail() }
}
