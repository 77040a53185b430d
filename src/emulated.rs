// In-process stand-in for oleaut32 SafeArrays. Follows the same contract as
// the native backend so callers can be exercised without OLE Automation.

use std::collections::{BTreeMap, HashMap};
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::array::{check_kind, native_index, ArrayHandle, Bounds, SafeArrayBackend};
use crate::element::Element;
use crate::error::{Result, SafeArrayError};
use crate::status::{DISP_E_BADINDEX, E_INVALIDARG};
use crate::vartype::VarType;

struct EmulatedArray {
    kind: VarType,
    bounds: Bounds,
    slots: BTreeMap<i32, Element>,
}

#[derive(Default)]
pub struct EmulatedBackend {
    arrays: Mutex<HashMap<usize, EmulatedArray>>,
    next_token: AtomicUsize,
    pending_create_failure: Mutex<Option<SafeArrayError>>,
}

impl EmulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_vector` call fail with `error` without creating
    /// anything.
    pub fn fail_next_create(&self, error: SafeArrayError) {
        *lock(&self.pending_create_failure) = Some(error);
    }

    /// Value stored at `index`, if any has been put there.
    pub fn element(&self, handle: &ArrayHandle, index: i32) -> Option<Element> {
        lock(&self.arrays)
            .get(&token(handle))
            .and_then(|array| array.slots.get(&index).cloned())
    }

    /// Number of arrays created and not yet destroyed.
    pub fn live_arrays(&self) -> usize {
        lock(&self.arrays).len()
    }

    fn with_array<T>(
        &self,
        operation: &'static str,
        handle: &ArrayHandle,
        f: impl FnOnce(&mut EmulatedArray) -> Result<T>,
    ) -> Result<T> {
        let mut arrays = lock(&self.arrays);
        let array = arrays
            .get_mut(&token(handle))
            .ok_or_else(|| SafeArrayError::native(operation, E_INVALIDARG))?;
        f(array)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn token(handle: &ArrayHandle) -> usize {
    handle.as_raw() as usize
}

impl SafeArrayBackend for EmulatedBackend {
    fn create_vector(&self, kind: VarType, lower_bound: i32, length: u32) -> Result<ArrayHandle> {
        const OPERATION: &str = "SafeArrayCreateVector";
        log::debug!("[emulated] {}({}, {}, {})", OPERATION, kind, lower_bound, length);

        if let Some(error) = lock(&self.pending_create_failure).take() {
            return Err(error);
        }
        if !kind.is_array_element() {
            return Err(SafeArrayError::NullHandle { operation: OPERATION });
        }
        // Tokens are never dereferenced; zero is skipped so they stay non-null.
        let id = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        let raw = NonNull::new(id as *mut c_void).ok_or(SafeArrayError::NullHandle { operation: OPERATION })?;
        lock(&self.arrays).insert(
            id,
            EmulatedArray {
                kind,
                bounds: Bounds { lower: lower_bound, len: length },
                slots: BTreeMap::new(),
            },
        );
        // SAFETY: the token identifies the array just registered with `kind`.
        Ok(unsafe { ArrayHandle::from_raw(raw, kind) })
    }

    fn put_element(&self, handle: &ArrayHandle, index: i64, value: &Element) -> Result<()> {
        const OPERATION: &str = "SafeArrayPutElement";
        log::debug!("[emulated] {}({:p}, {}, {:?})", OPERATION, handle.as_raw(), index, value);

        self.with_array(OPERATION, handle, |array| {
            if array.kind != handle.kind() {
                return Err(SafeArrayError::native(OPERATION, E_INVALIDARG));
            }
            check_kind(OPERATION, handle, value)?;
            let index = native_index(OPERATION, index)?;
            if !array.bounds.contains(i64::from(index)) {
                return Err(SafeArrayError::native(OPERATION, DISP_E_BADINDEX));
            }
            array.slots.insert(index, value.clone());
            Ok(())
        })
    }

    fn bounds(&self, handle: &ArrayHandle) -> Result<Bounds> {
        self.with_array("SafeArrayGetLBound", handle, |array| Ok(array.bounds))
    }

    fn destroy(&self, handle: ArrayHandle) -> Result<()> {
        log::debug!("[emulated] SafeArrayDestroy({:p})", handle.as_raw());
        lock(&self.arrays)
            .remove(&token(&handle))
            .map(|_| ())
            .ok_or_else(|| SafeArrayError::native("SafeArrayDestroy", E_INVALIDARG))
    }
}
