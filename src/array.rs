use std::ffi::c_void;
use std::ptr::NonNull;

use crate::element::Element;
use crate::error::Result;
use crate::status::DISP_E_BADINDEX;
use crate::vartype::VarType;
use crate::SafeArrayError;

/// Non-owning reference to a one-dimensional SafeArray.
///
/// The memory behind it belongs to whichever backend created it and is only
/// released through [`SafeArrayBackend::destroy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayHandle {
    raw: NonNull<c_void>,
    kind: VarType,
}

impl ArrayHandle {
    /// # Safety
    /// `raw` must point at a live SAFEARRAY (or be a backend token) whose
    /// element type is `kind`.
    pub unsafe fn from_raw(raw: NonNull<c_void>, kind: VarType) -> Self {
        Self { raw, kind }
    }

    pub fn kind(&self) -> VarType {
        self.kind
    }

    /// The `SAFEARRAY*` for handing to other COM calls.
    pub fn as_raw(&self) -> *mut c_void {
        self.raw.as_ptr()
    }
}

/// Extent of a vector, stored like SAFEARRAYBOUND: lower bound plus count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub lower: i32,
    pub len: u32,
}

impl Bounds {
    /// Rebuilds the extent from `SafeArrayGetLBound`/`SafeArrayGetUBound`.
    /// oleaut32 computes the upper bound with 32-bit wraparound, so the
    /// count is recovered the same way.
    pub fn from_lower_upper(lower: i32, upper: i32) -> Self {
        Bounds {
            lower,
            len: (upper.wrapping_sub(lower) as u32).wrapping_add(1),
        }
    }

    /// Last valid index; `lower - 1` when empty.
    pub fn upper(&self) -> i64 {
        i64::from(self.lower) + i64::from(self.len) - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, index: i64) -> bool {
        index >= i64::from(self.lower) && index <= self.upper()
    }
}

/// The OLE Automation SafeArray entry points this crate drives.
pub trait SafeArrayBackend {
    /// `SafeArrayCreateVector`
    fn create_vector(&self, kind: VarType, lower_bound: i32, length: u32) -> Result<ArrayHandle>;

    /// `SafeArrayPutElement`
    fn put_element(&self, handle: &ArrayHandle, index: i64, value: &Element) -> Result<()>;

    /// `SafeArrayGetLBound` / `SafeArrayGetUBound` on dimension 1.
    fn bounds(&self, handle: &ArrayHandle) -> Result<Bounds>;

    /// `SafeArrayDestroy`
    fn destroy(&self, handle: ArrayHandle) -> Result<()>;
}

/// `SafeArrayPutElement` takes a `LONG` index; anything wider cannot address
/// a slot.
pub(crate) fn native_index(operation: &'static str, index: i64) -> Result<i32> {
    i32::try_from(index).map_err(|_| SafeArrayError::native(operation, DISP_E_BADINDEX))
}

/// Kind-checks a value against the array before it is marshalled.
pub(crate) fn check_kind(operation: &'static str, handle: &ArrayHandle, value: &Element) -> Result<()> {
    if !handle.kind().has_element() {
        return Err(SafeArrayError::Unsupported(
            "VT_VARIANT, VT_DECIMAL and interface arrays cannot be filled with put_element",
        ));
    }
    if value.kind() == handle.kind() {
        Ok(())
    } else {
        Err(SafeArrayError::native(operation, crate::status::DISP_E_TYPEMISMATCH))
    }
}

pub fn create_vector_array<B: SafeArrayBackend + ?Sized>(
    backend: &B,
    kind: VarType,
    lower_bound: i32,
    length: u32,
) -> Result<ArrayHandle> {
    backend.create_vector(kind, lower_bound, length)
}

pub fn put_element<B: SafeArrayBackend + ?Sized>(
    backend: &B,
    handle: &ArrayHandle,
    index: i64,
    value: &Element,
) -> Result<()> {
    backend.put_element(handle, index, value)
}

/// A vector that is destroyed when dropped.
pub struct OwnedArray<'a, B: SafeArrayBackend + ?Sized> {
    backend: &'a B,
    handle: ArrayHandle,
    armed: bool,
}

impl<'a, B: SafeArrayBackend + ?Sized> OwnedArray<'a, B> {
    pub fn new(backend: &'a B, handle: ArrayHandle) -> Self {
        Self {
            backend,
            handle,
            armed: true,
        }
    }

    pub fn handle(&self) -> &ArrayHandle {
        &self.handle
    }

    pub fn bounds(&self) -> Result<Bounds> {
        self.backend.bounds(&self.handle)
    }

    /// Give up ownership; the caller must destroy the handle.
    pub fn into_handle(mut self) -> ArrayHandle {
        self.armed = false;
        self.handle
    }

    /// Destroy now and surface the status instead of only logging it.
    pub fn destroy(mut self) -> Result<()> {
        self.armed = false;
        self.backend.destroy(self.handle)
    }
}

impl<B: SafeArrayBackend + ?Sized> Drop for OwnedArray<'_, B> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.backend.destroy(self.handle) {
                log::warn!("Failed to destroy {} array {:p}: {}", self.handle.kind(), self.handle.as_raw(), e);
            }
        }
    }
}

/// Create a vector of `kind` starting at `lower_bound` and fill it with
/// `values` in order. A partially populated array is destroyed before a put
/// failure is returned.
pub fn build_vector<'a, B: SafeArrayBackend + ?Sized>(
    backend: &'a B,
    kind: VarType,
    lower_bound: i32,
    values: &[Element],
) -> Result<OwnedArray<'a, B>> {
    let length = u32::try_from(values.len())
        .map_err(|_| SafeArrayError::native("SafeArrayCreateVector", crate::status::E_INVALIDARG))?;
    let array = OwnedArray::new(backend, backend.create_vector(kind, lower_bound, length)?);
    for (offset, value) in values.iter().enumerate() {
        let index = i64::from(lower_bound) + offset as i64;
        backend.put_element(array.handle(), index, value)?;
    }
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_at_the_edges_of_long() {
        let empty = Bounds { lower: i32::MIN, len: 0 };
        assert!(empty.is_empty());
        assert_eq!(empty.upper(), i64::from(i32::MIN) - 1);
        assert!(!empty.contains(i64::from(i32::MIN)));

        let high = Bounds { lower: i32::MAX, len: 2 };
        assert_eq!(high.upper(), i64::from(i32::MAX) + 1);
        assert!(high.contains(i64::from(i32::MAX)));
    }

    #[test]
    fn test_from_lower_upper_wraps_like_oleaut32() {
        assert_eq!(Bounds::from_lower_upper(0, 2), Bounds { lower: 0, len: 3 });
        assert_eq!(Bounds::from_lower_upper(5, 4), Bounds { lower: 5, len: 0 });
        assert_eq!(Bounds::from_lower_upper(i32::MIN, i32::MAX), Bounds { lower: i32::MIN, len: 0 });
        assert_eq!(Bounds::from_lower_upper(i32::MAX, i32::MIN), Bounds { lower: i32::MAX, len: 2 });
    }
}
