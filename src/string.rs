//! String and buffer conversion across the native boundary.

use crate::error::Result;
use crate::native::WandLibrary;
use std::ffi::{CStr, CString, c_void};
use std::os::raw::c_char;

/// NUL-terminated copy of a Rust string, alive for the duration of one
/// native call.
///
/// The buffer holds the UTF-8 bytes plus a trailing zero and is released
/// when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct NativeString {
    buf: CString,
}

impl NativeString {
    /// Copy `value` into a native buffer.
    ///
    /// Fails if `value` contains an interior NUL byte.
    pub fn new(value: &str) -> Result<Self> {
        Ok(Self {
            buf: CString::new(value)?,
        })
    }

    /// Pointer to the NUL-terminated bytes.
    pub fn as_ptr(&self) -> *const c_char {
        self.buf.as_ptr()
    }

    /// Length in bytes, excluding the terminator.
    pub fn len(&self) -> usize {
        self.buf.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode a native-owned string and relinquish it.
///
/// Returns `None` for a null pointer, in which case nothing is released.
/// Invalid UTF-8 sequences are replaced with U+FFFD.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer allocated by
/// `library` that the caller owns. The pointer is invalid after this call.
pub unsafe fn load(library: &WandLibrary, ptr: *mut c_char) -> Option<String> {
    let value = unsafe { load_borrowed(ptr) }?;
    unsafe { (library.relinquish_memory)(ptr as *mut c_void) };
    Some(value)
}

/// Decode a native string without releasing it.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer that stays valid
/// for the duration of the call.
pub unsafe fn load_borrowed(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let bytes = unsafe { CStr::from_ptr(ptr) }.to_bytes();
    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// Copy a native-owned byte buffer of known length and relinquish it.
///
/// Returns `None` for a null pointer.
///
/// # Safety
///
/// `ptr` must be null or point to `len` readable bytes allocated by
/// `library` that the caller owns. The pointer is invalid after this call.
pub unsafe fn load_bytes(library: &WandLibrary, ptr: *mut u8, len: usize) -> Option<Vec<u8>> {
    if ptr.is_null() {
        return None;
    }
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec();
    unsafe { (library.relinquish_memory)(ptr as *mut c_void) };
    Some(bytes)
}
