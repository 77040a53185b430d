// OLE Automation backend. The SafeArray entry points are resolved from
// oleaut32.dll once per process; a failed resolution is cached and replayed.

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::OnceLock;

use windows::core::{s, w, BSTR, PCSTR};
use windows::Win32::Foundation::{GetLastError, SetLastError, HMODULE, WIN32_ERROR};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

use crate::array::{check_kind, native_index, ArrayHandle, Bounds, SafeArrayBackend};
use crate::element::Element;
use crate::error::{NativeStatus, Result, SafeArrayError};
use crate::status::{self, check_status, E_INVALIDARG};
use crate::vartype::VarType;

const LIBRARY: &str = "oleaut32.dll";

type CreateVectorFn = unsafe extern "system" fn(vt: u16, lower_bound: i32, elements: u32) -> *mut c_void;
type PutElementFn = unsafe extern "system" fn(psa: *mut c_void, indices: *const i32, pv: *const c_void) -> i32;
type GetBoundFn = unsafe extern "system" fn(psa: *mut c_void, dim: u32, bound: *mut i32) -> i32;
type DestroyFn = unsafe extern "system" fn(psa: *mut c_void) -> i32;

struct EntryPoints {
    create_vector: CreateVectorFn,
    put_element: PutElementFn,
    get_lbound: GetBoundFn,
    get_ubound: GetBoundFn,
    destroy: DestroyFn,
}

static ENTRY_POINTS: OnceLock<Result<EntryPoints>> = OnceLock::new();

type RawProc = unsafe extern "system" fn() -> isize;

fn symbol(module: HMODULE, name: PCSTR, display: &'static str) -> Result<RawProc> {
    unsafe { GetProcAddress(module, name) }.ok_or(SafeArrayError::EntryPointMissing {
        library: LIBRARY,
        symbol: display,
    })
}

macro_rules! resolve {
    ($module:expr, $name:literal as $ty:ty) => {{
        let proc = symbol($module, s!($name), $name)?;
        // SAFETY: the export has the documented signature `$ty`.
        unsafe { std::mem::transmute::<RawProc, $ty>(proc) }
    }};
}

fn load() -> Result<EntryPoints> {
    log::debug!("Resolving SafeArray entry points from {}", LIBRARY);
    // Never freed: the entry points are cached for the life of the process.
    let module = unsafe { LoadLibraryW(w!("oleaut32.dll")) }.map_err(|e| SafeArrayError::LibraryUnavailable {
        library: LIBRARY,
        status: NativeStatus(e.code().0),
    })?;

    Ok(EntryPoints {
        create_vector: resolve!(module, "SafeArrayCreateVector" as CreateVectorFn),
        put_element: resolve!(module, "SafeArrayPutElement" as PutElementFn),
        get_lbound: resolve!(module, "SafeArrayGetLBound" as GetBoundFn),
        get_ubound: resolve!(module, "SafeArrayGetUBound" as GetBoundFn),
        destroy: resolve!(module, "SafeArrayDestroy" as DestroyFn),
    })
}

fn entry_points() -> Result<&'static EntryPoints> {
    ENTRY_POINTS.get_or_init(load).as_ref().map_err(Clone::clone)
}

/// SafeArrays allocated by oleaut32.dll.
#[derive(Debug, Clone, Copy, Default)]
pub struct OleAutBackend;

impl OleAutBackend {
    /// Resolves the entry points up front so a missing library is reported
    /// here rather than on first use.
    pub fn new() -> Result<Self> {
        entry_points()?;
        Ok(OleAutBackend)
    }
}

impl SafeArrayBackend for OleAutBackend {
    fn create_vector(&self, kind: VarType, lower_bound: i32, length: u32) -> Result<ArrayHandle> {
        const OPERATION: &str = "SafeArrayCreateVector";
        let api = entry_points()?;

        let (raw, last_error) = unsafe {
            SetLastError(WIN32_ERROR(0));
            let raw = (api.create_vector)(kind.code(), lower_bound, length);
            (raw, GetLastError())
        };
        log::debug!(
            "{}({}, {}, {}) -> {:p}, last error {}",
            OPERATION, kind, lower_bound, length, raw, last_error.0
        );

        match NonNull::new(raw) {
            // SAFETY: oleaut32 just created this array with element type `kind`.
            Some(raw) => Ok(unsafe { ArrayHandle::from_raw(raw, kind) }),
            None => {
                status::normalize_dispatch(OPERATION, last_error.0)?;
                Err(SafeArrayError::NullHandle { operation: OPERATION })
            }
        }
    }

    fn put_element(&self, handle: &ArrayHandle, index: i64, value: &Element) -> Result<()> {
        const OPERATION: &str = "SafeArrayPutElement";
        let api = entry_points()?;
        check_kind(OPERATION, handle, value)?;
        let index = native_index(OPERATION, index)?;

        let hr = match value {
            // A BSTR is passed as itself, not by address; oleaut32 copies it.
            Element::Bstr(text) => {
                let bstr = BSTR::from(text.as_str());
                unsafe { (api.put_element)(handle.as_raw(), &index, bstr.as_ptr().cast()) }
            }
            scalar => {
                let slot = scalar
                    .scalar_slot()
                    .ok_or(SafeArrayError::native(OPERATION, E_INVALIDARG))?;
                unsafe { (api.put_element)(handle.as_raw(), &index, slot.as_ptr()) }
            }
        };
        log::debug!("{}({:p}, {}) -> 0x{:08X}", OPERATION, handle.as_raw(), index, hr as u32);
        check_status(OPERATION, hr)
    }

    fn bounds(&self, handle: &ArrayHandle) -> Result<Bounds> {
        let api = entry_points()?;
        let mut lower = 0i32;
        let mut upper = 0i32;
        check_status("SafeArrayGetLBound", unsafe { (api.get_lbound)(handle.as_raw(), 1, &mut lower) })?;
        check_status("SafeArrayGetUBound", unsafe { (api.get_ubound)(handle.as_raw(), 1, &mut upper) })?;
        Ok(Bounds::from_lower_upper(lower, upper))
    }

    fn destroy(&self, handle: ArrayHandle) -> Result<()> {
        let api = entry_points()?;
        log::debug!("SafeArrayDestroy({:p})", handle.as_raw());
        check_status("SafeArrayDestroy", unsafe { (api.destroy)(handle.as_raw()) })
    }
}
