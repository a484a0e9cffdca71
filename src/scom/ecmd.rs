//! eCMD access through a C client shim.
//!
//! The eCMD API itself is C++, so this backend expects a shim library
//! (`libecmd_c.so` unless configured otherwise) exporting three C symbols:
//!
//! ```c
//! uint32_t ecmd_load_dll(const char *dll_path, const char *versions);
//! uint32_t ecmd_get_scom(const struct chip_target *target, uint64_t addr,
//!                        uint64_t *data);
//! uint32_t ecmd_put_scom_under_mask(const struct chip_target *target,
//!                                   uint64_t addr, uint64_t data, uint64_t mask);
//! ```
//!
//! `chip_target` has the layout of [`ChipTarget`]. Each call returns the eCMD
//! status code, 0 on success.

#![allow(unsafe_code)]

use std::{
    ffi::{c_char, c_void, CStr, CString},
    os::unix::ffi::OsStrExt,
    path::Path,
    ptr::NonNull,
    sync::Arc,
};

use bitvec::prelude::*;
use log::debug;

use crate::{
    chip::ChipId,
    config::Config,
    error::{Result, ScomError},
};

use super::ScomAdaptor;

const SCOM_WIDTH: u32 = 64;

type LoadDllFn = unsafe extern "C" fn(*const c_char, *const c_char) -> u32;
type GetScomFn = unsafe extern "C" fn(*const ChipTarget, u64, *mut u64) -> u32;
type PutScomUnderMaskFn = unsafe extern "C" fn(*const ChipTarget, u64, u64, u64) -> u32;

/// Chip coordinates handed to the vendor library.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipTarget {
    pub chip_type: [u8; 8],
    pub cage: u32,
    pub node: u32,
    pub slot: u32,
    pub pos: u32,
    pub core: u32,
}

impl ChipTarget {
    /// A processor ("pu") target at position `chip`, all other coordinates 0.
    pub fn processor(chip: ChipId) -> Self {
        Self {
            chip_type: *b"pu\0\0\0\0\0\0",
            cage: 0,
            node: 0,
            slot: 0,
            pos: chip.into_inner(),
            core: 0,
        }
    }
}

/// The two vendor entry points used for register access.
///
/// Both return the vendor status code, 0 on success.
pub trait EcmdOps {
    fn get_scom(&self, target: &ChipTarget, addr: u64, data: &mut u64) -> u32;

    fn put_scom_under_mask(&self, target: &ChipTarget, addr: u64, data: u64, mask: u64) -> u32;
}

impl<T: EcmdOps + ?Sized> EcmdOps for Arc<T> {
    fn get_scom(&self, target: &ChipTarget, addr: u64, data: &mut u64) -> u32 {
        (**self).get_scom(target, addr, data)
    }

    fn put_scom_under_mask(&self, target: &ChipTarget, addr: u64, data: u64, mask: u64) -> u32 {
        (**self).put_scom_under_mask(target, addr, data, mask)
    }
}

/// The eCMD client library, loaded at runtime with `dlopen`.
pub struct EcmdLibrary {
    handle: NonNull<c_void>,
    get_scom: GetScomFn,
    put_scom_under_mask: PutScomUnderMaskFn,
}

impl std::fmt::Debug for EcmdLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcmdLibrary")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

fn dl_error() -> String {
    // SAFETY: dlerror returns null or a valid C string owned by libc
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        return "unknown dl error".into();
    }
    unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
}

fn c_string(bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|err| ScomError::InvalidInput(err.to_string()))
}

impl EcmdLibrary {
    /// Loads the client library named in `config` and the driver file named by
    /// the `config.vendor_dll_env` environment variable.
    pub fn from_env(config: &Config) -> Result<Self> {
        let dll = std::env::var_os(&config.vendor_dll_env).ok_or_else(|| {
            ScomError::VendorLoad(format!("{} is not set", config.vendor_dll_env))
        })?;
        let lib = Self::open(&config.vendor_client_lib)?;
        lib.load_dll(Path::new(&dll), &config.vendor_dll_versions)?;
        Ok(lib)
    }

    /// Opens the client library and resolves its entry points.
    pub fn open(client: impl AsRef<Path>) -> Result<Self> {
        let path = c_string(client.as_ref().as_os_str().as_bytes())?;
        // SAFETY: path is a valid C string
        let raw = unsafe { libc::dlopen(path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        let handle = NonNull::new(raw).ok_or_else(|| ScomError::VendorLoad(dl_error()))?;
        let close_on_err = |err: ScomError| {
            // SAFETY: handle came from dlopen and is not used again
            let _rc = unsafe { libc::dlclose(handle.as_ptr()) };
            err
        };
        let get_scom = Self::symbol(handle, c"ecmd_get_scom").map_err(close_on_err)?;
        let put_scom_under_mask =
            Self::symbol(handle, c"ecmd_put_scom_under_mask").map_err(close_on_err)?;

        // SAFETY: the symbols follow the C prototypes declared above
        Ok(unsafe {
            Self {
                handle,
                get_scom: std::mem::transmute::<*mut c_void, GetScomFn>(get_scom),
                put_scom_under_mask: std::mem::transmute::<*mut c_void, PutScomUnderMaskFn>(
                    put_scom_under_mask,
                ),
            }
        })
    }

    fn symbol(handle: NonNull<c_void>, name: &CStr) -> Result<*mut c_void> {
        // SAFETY: handle is a live dlopen handle and name is a valid C string
        let sym = unsafe { libc::dlsym(handle.as_ptr(), name.as_ptr()) };
        if sym.is_null() {
            return Err(ScomError::VendorLoad(format!(
                "{}: {}",
                name.to_string_lossy(),
                dl_error()
            )));
        }
        Ok(sym)
    }

    fn load_dll(&self, dll: &Path, versions: &str) -> Result<()> {
        let load = Self::symbol(self.handle, c"ecmd_load_dll")?;
        let dll = c_string(dll.as_os_str().as_bytes())?;
        let versions = c_string(versions.as_bytes())?;
        // SAFETY: symbol follows LoadDllFn and both arguments are valid C strings
        let rc = unsafe {
            let load = std::mem::transmute::<*mut c_void, LoadDllFn>(load);
            load(dll.as_ptr(), versions.as_ptr())
        };
        if rc != 0 {
            return Err(ScomError::Vendor {
                op: "ecmdLoadDll",
                rc,
            });
        }
        Ok(())
    }
}

impl EcmdOps for EcmdLibrary {
    fn get_scom(&self, target: &ChipTarget, addr: u64, data: &mut u64) -> u32 {
        // SAFETY: both pointers are valid for the duration of the call
        unsafe { (self.get_scom)(target, addr, data) }
    }

    fn put_scom_under_mask(&self, target: &ChipTarget, addr: u64, data: u64, mask: u64) -> u32 {
        // SAFETY: target is valid for the duration of the call
        unsafe { (self.put_scom_under_mask)(target, addr, data, mask) }
    }
}

impl Drop for EcmdLibrary {
    fn drop(&mut self) {
        // SAFETY: handle came from dlopen and no symbol outlives self
        let _rc = unsafe { libc::dlclose(self.handle.as_ptr()) };
    }
}

/// Builds the data and mask buffers for a write covering bits
/// `start..start + num_bits`, bit 0 being the most significant.
///
/// The low `num_bits` of `value` land in that range.
pub fn range_buffers(value: u64, start: u32, num_bits: u32) -> Result<(u64, u64)> {
    let end = start.saturating_add(num_bits);
    if num_bits == 0 || end > SCOM_WIDTH {
        return Err(ScomError::InvalidInput(format!(
            "bit range {start}+{num_bits} outside 64-bit register"
        )));
    }
    let range = start as usize..end as usize;

    let mut mask = bitarr![u64, Msb0; 0; 64];
    mask[range.clone()].fill(true);
    let mut data = bitarr![u64, Msb0; 0; 64];
    data[range].store_be::<u64>(value);

    Ok((data.into_inner()[0], mask.into_inner()[0]))
}

/// Register access through the vendor library.
///
/// Addresses are passed through unmangled; the library does its own
/// addressing.
#[derive(Debug)]
pub struct EcmdScom<L> {
    lib: L,
    target: ChipTarget,
    debug: bool,
}

impl<L: EcmdOps> EcmdScom<L> {
    pub fn new(lib: L, chip: ChipId, debug: bool) -> Self {
        Self {
            lib,
            target: ChipTarget::processor(chip),
            debug,
        }
    }

    pub fn target(&self) -> &ChipTarget {
        &self.target
    }

    /// Writes the low `num_bits` of `value` into bits `start..start + num_bits`
    /// of the register, leaving the other bits untouched.
    pub fn put_scom_range(&mut self, addr: u64, value: u64, start: u32, num_bits: u32) -> Result<()> {
        if self.debug {
            println!("putscom(0x{addr:016x}, 0x{value:016x})");
        }
        let (data, mask) = range_buffers(value, start, num_bits)?;
        debug!("putScomUnderMask addr={addr:#x} data={data:#018x} mask={mask:#018x}");
        let rc = self
            .lib
            .put_scom_under_mask(&self.target, addr, data, mask);
        if rc != 0 {
            return Err(ScomError::Vendor {
                op: "putScomUnderMask",
                rc,
            });
        }
        Ok(())
    }
}

impl<L: EcmdOps> ScomAdaptor for EcmdScom<L> {
    fn read_scom(&mut self, addr: u64) -> Result<u64> {
        let mut data = 0u64;
        let rc = self.lib.get_scom(&self.target, addr, &mut data);
        if rc != 0 {
            return Err(ScomError::Vendor { op: "getScom", rc });
        }
        if self.debug {
            println!("getscom(0x{addr:016x}) = {data:016x}");
        }
        Ok(data)
    }

    fn write_scom(&mut self, addr: u64, value: u64) -> Result<()> {
        self.put_scom_range(addr, value, 0, SCOM_WIDTH)
    }
}
