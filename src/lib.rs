// OLE Automation SafeArray helpers
// Builds one-dimensional variant arrays for COM calls that take array arguments (e.g. WMI methods)

pub mod array;
pub mod config;
pub mod element;
pub mod emulated;
pub mod error;
pub mod status;
pub mod vartype;

#[cfg(windows)]
pub mod native;

// Re-export commonly used types
pub use array::{build_vector, create_vector_array, put_element, ArrayHandle, Bounds, OwnedArray, SafeArrayBackend};
pub use element::Element;
pub use emulated::EmulatedBackend;
pub use error::{NativeStatus, SafeArrayError};
pub use status::check_status;
pub use vartype::VarType;

#[cfg(windows)]
pub use native::OleAutBackend;
