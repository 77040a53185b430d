// Status translation at the OLE Automation call boundary.

use crate::error::{Result, SafeArrayError};

pub const S_OK: i32 = 0;
pub const E_NOTIMPL: i32 = 0x8000_4001_u32 as i32;
pub const E_OUTOFMEMORY: i32 = 0x8007_000E_u32 as i32;
pub const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;
pub const DISP_E_TYPEMISMATCH: i32 = 0x8002_0005_u32 as i32;
pub const DISP_E_BADINDEX: i32 = 0x8002_000B_u32 as i32;
pub const DISP_E_ARRAYISLOCKED: i32 = 0x8002_000D_u32 as i32;

pub const ERROR_SUCCESS: u32 = 0;

/// Last-error codes that a successful dispatch may leave behind.
pub const BENIGN_DISPATCH_CODES: &[u32] = &[ERROR_SUCCESS];

/// Maps a raw HRESULT onto a result. Zero is success, anything else fails
/// with the code attached.
pub fn check_status(operation: &'static str, hr: i32) -> Result<()> {
    if hr == S_OK {
        Ok(())
    } else {
        Err(SafeArrayError::native(operation, hr))
    }
}

/// Classifies the last-error value observed after invoking an entry point.
pub fn normalize_dispatch(operation: &'static str, last_error: u32) -> Result<()> {
    if BENIGN_DISPATCH_CODES.contains(&last_error) {
        Ok(())
    } else {
        Err(SafeArrayError::native(operation, hresult_from_win32(last_error)))
    }
}

/// HRESULT_FROM_WIN32
pub fn hresult_from_win32(code: u32) -> i32 {
    if code as i32 <= 0 {
        code as i32
    } else {
        ((code & 0x0000_FFFF) | 0x8007_0000) as i32
    }
}

pub(crate) fn describe(hr: i32) -> &'static str {
    match hr {
        S_OK => "The operation completed successfully.",
        E_NOTIMPL => "Not implemented.",
        E_OUTOFMEMORY => "Not enough memory resources are available to complete this operation.",
        E_INVALIDARG => "The parameter is incorrect.",
        DISP_E_TYPEMISMATCH => "Type mismatch.",
        DISP_E_BADINDEX => "Invalid index.",
        DISP_E_ARRAYISLOCKED => "Memory is locked.",
        _ => "unrecognized status",
    }
}
