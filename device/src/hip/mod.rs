//! HIP backend: hiprtc compilation, module loading and asynchronous launch.
//!
//! All HIP calls go through function pointers loaded at runtime (see [`ffi`]),
//! so there is no build-time ROCm dependency. Kernel source is compiled with
//! hiprtc, loaded with `hipModuleLoadData` and launched with
//! `hipModuleLaunchKernel` on the caller's stream without synchronizing.

pub mod ffi;
pub mod stream;

use std::ffi::{CString, c_char, c_uint, c_void};
use std::sync::Arc;

use kiln_dtype::ArgType;
use smallvec::SmallVec;

use crate::arg::{KernelArg, check_args};
use crate::device::{Compiler, Function, Module};
use crate::error::{CompilationSnafu, LaunchSnafu, Result, SymbolSnafu};
use crate::queue::{LaunchGeometry, StreamHandle};

pub use stream::HipStream;

use ffi::{HIP_SUCCESS, HIPRTC_SUCCESS, check_hip};

/// Environment variable with extra hiprtc flags (whitespace separated).
pub const HIPRTC_OPTIONS_ENV: &str = "KILN_HIPRTC_OPTIONS";

/// Initialize the HIP runtime and make `device` current.
pub fn init_device(device: usize) -> Result<()> {
    let api = ffi::hip_api()?;
    check_hip(unsafe { (api.init)(0) }, "hipInit")?;
    set_device(device)
}

pub fn set_device(device: usize) -> Result<()> {
    let api = ffi::hip_api()?;
    check_hip(unsafe { (api.set_device)(device as i32) }, "hipSetDevice")
}

/// HIP runtime loadable and at least one device present.
pub fn is_hip_available() -> bool {
    device_count() > 0
}

pub fn device_count() -> usize {
    let Ok(api) = ffi::hip_api() else { return 0 };
    if unsafe { (api.init)(0) } != HIP_SUCCESS {
        return 0;
    }
    let mut count = 0;
    if unsafe { (api.get_device_count)(&mut count) } != HIP_SUCCESS {
        return 0;
    }
    count.max(0) as usize
}

/// hiprtc-based compiler for one device.
#[derive(Debug, Clone)]
pub struct HipCompiler {
    device: usize,
    options: Vec<String>,
}

impl HipCompiler {
    pub fn new(device: usize) -> Result<Self> {
        Self::with_options(device, Vec::new())
    }

    pub fn with_options(device: usize, options: Vec<String>) -> Result<Self> {
        init_device(device)?;
        Ok(Self { device, options })
    }

    /// Compiler whose flags come from `KILN_HIPRTC_OPTIONS`.
    pub fn from_env(device: usize) -> Result<Self> {
        let options = std::env::var(HIPRTC_OPTIONS_ENV)
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Self::with_options(device, options)
    }

    pub fn device(&self) -> usize {
        self.device
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    fn compile_code(&self, name: &str, src: &str) -> Result<Vec<u8>> {
        let rtc = ffi::hiprtc_api()?;

        let c_src = CString::new(src).map_err(|_| CompilationSnafu { kernel: name, log: "source contains a NUL byte" }.build())?;
        let c_name = CString::new(name).map_err(|_| CompilationSnafu { kernel: name, log: "name contains a NUL byte" }.build())?;
        let c_opts = self
            .options
            .iter()
            .map(|opt| CString::new(opt.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| CompilationSnafu { kernel: name, log: "option contains a NUL byte" }.build())?;
        let opt_ptrs: Vec<*const c_char> = c_opts.iter().map(|opt| opt.as_ptr()).collect();

        let mut prog: ffi::HiprtcProgram = std::ptr::null_mut();
        let code = unsafe {
            (rtc.create_program)(&mut prog, c_src.as_ptr(), c_name.as_ptr(), 0, std::ptr::null(), std::ptr::null())
        };
        if code != HIPRTC_SUCCESS {
            return CompilationSnafu { kernel: name, log: format!("hiprtcCreateProgram returned {code}") }.fail();
        }

        let compiled = unsafe { (rtc.compile_program)(prog, opt_ptrs.len() as i32, opt_ptrs.as_ptr()) };
        if compiled != HIPRTC_SUCCESS {
            let log = program_log(rtc, prog);
            unsafe { (rtc.destroy_program)(&mut prog) };
            return CompilationSnafu { kernel: name, log }.fail();
        }

        let mut size = 0usize;
        let mut code = Vec::new();
        let status = unsafe { (rtc.get_code_size)(prog, &mut size) };
        if status == HIPRTC_SUCCESS {
            code.resize(size, 0u8);
            let status = unsafe { (rtc.get_code)(prog, code.as_mut_ptr() as *mut c_char) };
            if status != HIPRTC_SUCCESS {
                code.clear();
            }
        }
        unsafe { (rtc.destroy_program)(&mut prog) };

        if code.is_empty() {
            return CompilationSnafu { kernel: name, log: "hiprtc produced no code object" }.fail();
        }
        Ok(code)
    }
}

fn program_log(rtc: &ffi::HiprtcApi, prog: ffi::HiprtcProgram) -> String {
    let mut size = 0usize;
    if unsafe { (rtc.get_program_log_size)(prog, &mut size) } != HIPRTC_SUCCESS || size == 0 {
        return "hiprtc compilation failed (no log)".to_string();
    }
    let mut buf = vec![0u8; size];
    let _ = unsafe { (rtc.get_program_log)(prog, buf.as_mut_ptr() as *mut c_char) };
    String::from_utf8_lossy(&buf).trim_end_matches('\0').to_string()
}

impl Compiler for HipCompiler {
    fn compile(&self, name: &str, src: &str) -> Result<Box<dyn Module>> {
        let hip = ffi::hip_api()?;
        set_device(self.device)?;

        let code = self.compile_code(name, src).inspect_err(|e| {
            tracing::warn!(kernel.name = %name, error = %e, "hiprtc compilation failed");
        })?;

        let mut module: ffi::HipModule = std::ptr::null_mut();
        let status = unsafe { (hip.module_load_data)(&mut module, code.as_ptr() as *const c_void) };
        if status != HIP_SUCCESS {
            return CompilationSnafu { kernel: name, log: format!("hipModuleLoadData returned {status}") }.fail();
        }

        tracing::debug!(kernel.name = %name, device = self.device, code.bytes = code.len(), "HIP module loaded");
        Ok(Box::new(HipModule { handle: Arc::new(ModuleHandle(module)), device: self.device }))
    }

    fn backend(&self) -> &str {
        "HIP"
    }
}

/// Owned `hipModule_t`, unloaded on drop.
#[derive(Debug)]
struct ModuleHandle(ffi::HipModule);

// SAFETY: loaded modules are process-global and immutable.
unsafe impl Send for ModuleHandle {}
unsafe impl Sync for ModuleHandle {}

impl Drop for ModuleHandle {
    fn drop(&mut self) {
        if let Ok(api) = ffi::hip_api() {
            unsafe { (api.module_unload)(self.0) };
        }
    }
}

/// Loaded HIP module.
#[derive(Debug)]
pub struct HipModule {
    handle: Arc<ModuleHandle>,
    device: usize,
}

impl Module for HipModule {
    fn function(&self, name: &str, arg_types: &[ArgType]) -> Result<Arc<dyn Function>> {
        let hip = ffi::hip_api()?;
        let c_name = CString::new(name).map_err(|_| SymbolSnafu { kernel: name, reason: "name contains a NUL byte" }.build())?;

        let mut func: ffi::HipFunction = std::ptr::null_mut();
        let status = unsafe { (hip.module_get_function)(&mut func, self.handle.0, c_name.as_ptr()) };
        if status != HIP_SUCCESS || func.is_null() {
            return SymbolSnafu { kernel: name, reason: format!("hipModuleGetFunction returned {status}") }.fail();
        }

        Ok(Arc::new(HipFunction {
            func,
            _module: Arc::clone(&self.handle),
            device: self.device,
            name: name.to_string(),
            arg_types: arg_types.to_vec(),
        }))
    }
}

/// Launchable HIP kernel; keeps its module loaded.
#[derive(Debug)]
pub struct HipFunction {
    func: ffi::HipFunction,
    _module: Arc<ModuleHandle>,
    device: usize,
    name: String,
    arg_types: Vec<ArgType>,
}

// SAFETY: function handles are immutable once resolved and the module outlives them.
unsafe impl Send for HipFunction {}
unsafe impl Sync for HipFunction {}

impl Function for HipFunction {
    fn exec_async(&self, geometry: &LaunchGeometry, stream: StreamHandle, args: &[KernelArg]) -> Result<()> {
        check_args(&self.name, &self.arg_types, args)?;
        let hip = ffi::hip_api()?;

        // Each value sits in its own 8-byte slot; the kernel reads the leading bytes.
        let mut slots: SmallVec<[u64; 16]> = args.iter().filter_map(KernelArg::to_slot).collect();
        let mut params: SmallVec<[*mut c_void; 16]> =
            slots.iter_mut().map(|slot| slot as *mut u64 as *mut c_void).collect();

        set_device(self.device)?;
        let LaunchGeometry { grid, block } = *geometry;
        tracing::trace!(kernel.name = %self.name, %grid, %block, stream = stream.raw(), "HIP launch");

        let status = unsafe {
            (hip.module_launch_kernel)(
                self.func,
                grid.x as c_uint,
                grid.y as c_uint,
                grid.z as c_uint,
                block.x as c_uint,
                block.y as c_uint,
                block.z as c_uint,
                0,
                stream.as_ptr(),
                params.as_mut_ptr(),
                std::ptr::null_mut(),
            )
        };
        if status != HIP_SUCCESS {
            return LaunchSnafu { kernel: self.name.as_str(), reason: format!("hipModuleLaunchKernel returned {status}") }
                .fail();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn arg_types(&self) -> &[ArgType] {
        &self.arg_types
    }
}
