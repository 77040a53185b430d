use std::fmt;

use thiserror::Error;

use crate::status;

/// Raw HRESULT reported by an OLE Automation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeStatus(pub i32);

impl NativeStatus {
    pub fn code(self) -> i32 {
        self.0
    }

    /// Human readable text for the code.
    pub fn message(self) -> String {
        #[cfg(windows)]
        {
            let text = windows::core::HRESULT(self.0).message();
            if !text.is_empty() {
                return text.trim_end().to_string();
            }
        }
        status::describe(self.0).to_string()
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HRESULT 0x{:08X} ({})", self.0 as u32, self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafeArrayError {
    /// The native library could not be loaded.
    #[error("failed to load {library}: {status}")]
    LibraryUnavailable {
        library: &'static str,
        status: NativeStatus,
    },

    #[error("entry point {symbol} not found in {library}")]
    EntryPointMissing {
        library: &'static str,
        symbol: &'static str,
    },

    /// The entry point ran and reported a failure.
    #[error("{operation} failed: {status}")]
    Native {
        operation: &'static str,
        status: NativeStatus,
    },

    #[error("{operation} returned a null array handle")]
    NullHandle { operation: &'static str },

    /// The operation has no marshalling for the array's element type.
    #[error("{0}")]
    Unsupported(&'static str),
}

impl SafeArrayError {
    pub(crate) fn native(operation: &'static str, code: i32) -> Self {
        SafeArrayError::Native {
            operation,
            status: NativeStatus(code),
        }
    }

    /// The native status carried by the error, if any.
    pub fn status(&self) -> Option<NativeStatus> {
        match self {
            SafeArrayError::LibraryUnavailable { status, .. }
            | SafeArrayError::Native { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the native entry point could not be invoked at all.
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            SafeArrayError::LibraryUnavailable { .. } | SafeArrayError::EntryPointMissing { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SafeArrayError>;
