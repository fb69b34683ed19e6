//! Owned native handles and the exception bridge.
//!
//! A [`Handle`] owns exactly one native pointer and releases it exactly once:
//! either through [`Handle::release`] or when dropped. After every native
//! call that can fail, the owner inspects the handle's exception slot through
//! [`Handle::check`] or [`Handle::check_bool`].

use crate::error::{NativeException, Result, Severity, WandError};
use crate::native::{DrawingWandT, ExceptionType, MagickWandT, PixelWandT, WandLibrary};
use crate::string;
use std::marker::PhantomData;
use std::os::raw::c_char;

/// A kind of native handle: its raw type and the entry points that destroy
/// it and access its exception slot.
pub trait HandleKind {
    type Raw;

    /// Name used in acquisition errors and log output.
    const NAME: &'static str;

    /// # Safety
    ///
    /// `raw` must be a live handle of this kind created by `library`.
    unsafe fn destroy(library: &WandLibrary, raw: *mut Self::Raw);

    /// # Safety
    ///
    /// `raw` must be a live handle of this kind created by `library`.
    unsafe fn exception(
        library: &WandLibrary,
        raw: *mut Self::Raw,
        severity: *mut ExceptionType,
    ) -> *mut c_char;

    /// # Safety
    ///
    /// `raw` must be a live handle of this kind created by `library`.
    unsafe fn clear_exception(library: &WandLibrary, raw: *mut Self::Raw);
}

/// `MagickWand` handles.
#[derive(Debug)]
pub enum MagickKind {}

impl HandleKind for MagickKind {
    type Raw = MagickWandT;
    const NAME: &'static str = "magick wand";

    unsafe fn destroy(library: &WandLibrary, raw: *mut MagickWandT) {
        unsafe { (library.destroy_magick_wand)(raw) };
    }

    unsafe fn exception(
        library: &WandLibrary,
        raw: *mut MagickWandT,
        severity: *mut ExceptionType,
    ) -> *mut c_char {
        unsafe { (library.get_exception)(raw, severity) }
    }

    unsafe fn clear_exception(library: &WandLibrary, raw: *mut MagickWandT) {
        unsafe { (library.clear_exception)(raw) };
    }
}

/// `PixelWand` handles.
#[derive(Debug)]
pub enum PixelKind {}

impl HandleKind for PixelKind {
    type Raw = PixelWandT;
    const NAME: &'static str = "pixel wand";

    unsafe fn destroy(library: &WandLibrary, raw: *mut PixelWandT) {
        unsafe { (library.destroy_pixel_wand)(raw) };
    }

    unsafe fn exception(
        library: &WandLibrary,
        raw: *mut PixelWandT,
        severity: *mut ExceptionType,
    ) -> *mut c_char {
        unsafe { (library.pixel_get_exception)(raw, severity) }
    }

    unsafe fn clear_exception(library: &WandLibrary, raw: *mut PixelWandT) {
        unsafe { (library.pixel_clear_exception)(raw) };
    }
}

/// `DrawingWand` handles.
#[derive(Debug)]
pub enum DrawingKind {}

impl HandleKind for DrawingKind {
    type Raw = DrawingWandT;
    const NAME: &'static str = "drawing wand";

    unsafe fn destroy(library: &WandLibrary, raw: *mut DrawingWandT) {
        unsafe { (library.destroy_drawing_wand)(raw) };
    }

    unsafe fn exception(
        library: &WandLibrary,
        raw: *mut DrawingWandT,
        severity: *mut ExceptionType,
    ) -> *mut c_char {
        unsafe { (library.draw_get_exception)(raw, severity) }
    }

    unsafe fn clear_exception(library: &WandLibrary, raw: *mut DrawingWandT) {
        unsafe { (library.draw_clear_exception)(raw) };
    }
}

/// Sole owner of one native handle.
///
/// # Thread Safety
///
/// The native exception slot and cursor are unsynchronized shared state.
/// A `Handle` is neither `Send` nor `Sync`; owners that may move between
/// threads opt in to `Send` themselves.
pub struct Handle<K: HandleKind> {
    raw: *mut K::Raw,
    library: &'static WandLibrary,
    _kind: PhantomData<K>,
}

impl<K: HandleKind> Handle<K> {
    /// Take ownership of `raw`.
    ///
    /// A null pointer means the native allocator failed and is reported as
    /// [`WandError::Acquisition`].
    ///
    /// # Safety
    ///
    /// `raw` must be null or a live handle of kind `K` created by `library`
    /// that no other owner will release.
    pub unsafe fn from_raw(library: &'static WandLibrary, raw: *mut K::Raw) -> Result<Self> {
        if raw.is_null() {
            return Err(WandError::Acquisition { what: K::NAME });
        }
        log::debug!("acquired {} {:p} from {}", K::NAME, raw, library.name);
        Ok(Self {
            raw,
            library,
            _kind: PhantomData,
        })
    }

    /// Allocate a handle with `acquire`, running library initialization
    /// first.
    pub(crate) fn acquire(
        library: &'static WandLibrary,
        acquire: unsafe extern "C" fn() -> *mut K::Raw,
    ) -> Result<Self> {
        library.ensure_initialized();
        unsafe { Self::from_raw(library, acquire()) }
    }

    /// The owned pointer; null once released.
    pub fn as_ptr(&self) -> *mut K::Raw {
        self.raw
    }

    pub fn library(&self) -> &'static WandLibrary {
        self.library
    }

    pub fn is_released(&self) -> bool {
        self.raw.is_null()
    }

    /// Destroy the native handle. Calling this again is a no-op.
    pub fn release(&mut self) {
        if self.raw.is_null() {
            return;
        }
        log::debug!("releasing {} {:p}", K::NAME, self.raw);
        unsafe { K::destroy(self.library, self.raw) };
        self.raw = std::ptr::null_mut();
    }

    /// Copy out the current native exception state.
    pub fn take_exception(&self) -> NativeException {
        unsafe { take_exception::<K>(self.library, self.raw) }
    }

    /// Pass `value` through unless the handle holds a fatal exception, which
    /// is cleared and returned as an error.
    pub fn check<T>(&self, value: T) -> Result<T> {
        unsafe { check::<K, T>(self.library, self.raw, value) }
    }

    /// Like [`check`](Self::check) for native calls returning a status.
    ///
    /// A `false` status without a fatal exception becomes
    /// [`WandError::Failed`].
    pub fn check_status(&self, operation: &'static str, status: bool) -> Result<()> {
        unsafe { check_status::<K>(self.library, self.raw, operation, status) }
    }

    /// Soft variant: a fatal exception is cleared and reported as `false`.
    pub fn check_bool(&self, status: bool) -> bool {
        unsafe { check_bool::<K>(self.library, self.raw, status) }
    }

    /// Clear any fatal exception left by an accessor and return `value`.
    pub fn soft<T>(&self, value: T) -> T {
        self.check_bool(true);
        value
    }
}

impl<K: HandleKind> Drop for Handle<K> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<K: HandleKind> std::fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::NAME)
            .field("raw", &self.raw)
            .field("library", &self.library.name)
            .finish()
    }
}

/// # Safety
///
/// `raw` must be a live handle of kind `K` created by `library`.
pub(crate) unsafe fn take_exception<K: HandleKind>(
    library: &WandLibrary,
    raw: *mut K::Raw,
) -> NativeException {
    let mut severity: ExceptionType = 0;
    let message = unsafe { K::exception(library, raw, &mut severity) };
    NativeException {
        severity: Severity(severity),
        message: unsafe { string::load(library, message) }.unwrap_or_default(),
    }
}

/// Inspect the exception slot; fatal exceptions are cleared and returned.
unsafe fn fatal_exception<K: HandleKind>(
    library: &WandLibrary,
    raw: *mut K::Raw,
) -> Option<NativeException> {
    let exception = unsafe { take_exception::<K>(library, raw) };
    if exception.severity.is_fatal() {
        unsafe { K::clear_exception(library, raw) };
        return Some(exception);
    }
    if exception.severity.is_warning() {
        log::debug!(
            "{} warning {}: {}",
            K::NAME,
            exception.severity,
            exception.message
        );
    }
    None
}

/// # Safety
///
/// `raw` must be a live handle of kind `K` created by `library`.
pub(crate) unsafe fn check<K: HandleKind, T>(
    library: &WandLibrary,
    raw: *mut K::Raw,
    value: T,
) -> Result<T> {
    match unsafe { fatal_exception::<K>(library, raw) } {
        Some(exception) => Err(exception.into()),
        None => Ok(value),
    }
}

/// # Safety
///
/// `raw` must be a live handle of kind `K` created by `library`.
pub(crate) unsafe fn check_status<K: HandleKind>(
    library: &WandLibrary,
    raw: *mut K::Raw,
    operation: &'static str,
    status: bool,
) -> Result<()> {
    if unsafe { check::<K, bool>(library, raw, status) }? {
        Ok(())
    } else {
        Err(WandError::Failed { operation })
    }
}

/// # Safety
///
/// `raw` must be a live handle of kind `K` created by `library`.
pub(crate) unsafe fn check_bool<K: HandleKind>(
    library: &WandLibrary,
    raw: *mut K::Raw,
    status: bool,
) -> bool {
    match unsafe { fatal_exception::<K>(library, raw) } {
        Some(exception) => {
            log::warn!(
                "{} operation failed: {} (severity {})",
                K::NAME,
                exception.message,
                exception.severity
            );
            false
        }
        None => status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExceptionKind;
    use crate::native::simulated;

    fn new_handle() -> Handle<MagickKind> {
        let library = simulated::library();
        Handle::acquire(library, library.new_magick_wand).unwrap()
    }

    #[test]
    fn test_null_is_acquisition_error() {
        let err = unsafe { Handle::<MagickKind>::from_raw(simulated::library(), std::ptr::null_mut()) }
            .unwrap_err();
        assert!(matches!(err, WandError::Acquisition { what: "magick wand" }));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut handle = new_handle();
        let before = simulated::counters();
        handle.release();
        assert!(handle.is_released());
        handle.release();
        drop(handle);
        let after = simulated::counters();
        assert_eq!(after.destroyed - before.destroyed, 1);
        assert_eq!(after.stray_releases, before.stray_releases);
    }

    #[test]
    fn test_drop_releases_once() {
        let handle = new_handle();
        let raw = handle.as_ptr() as usize;
        assert!(simulated::is_live(raw));
        drop(handle);
        assert!(!simulated::is_live(raw));
    }

    #[test]
    fn test_initialization_runs_first() {
        let handle = new_handle();
        assert!(handle.library().is_initialized());
        assert_eq!(simulated::genesis_calls(), 1);
    }

    #[test]
    fn test_fatal_exception_raised_and_cleared() {
        let handle = new_handle();
        simulated::raise(
            handle.as_ptr(),
            ExceptionKind::CorruptImageError.into(),
            "improper image header",
        );
        let err = handle.check(7).unwrap_err();
        match err {
            WandError::Operation { severity, message } => {
                assert_eq!(severity, Severity(425));
                assert_eq!(message, "improper image header");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // state was cleared, the next check starts clean
        assert_eq!(handle.check(7).unwrap(), 7);
        assert_eq!(handle.take_exception().severity, Severity::UNDEFINED);
    }

    #[test]
    fn test_warning_passes_through() {
        let handle = new_handle();
        simulated::raise(handle.as_ptr(), ExceptionKind::OptionWarning.into(), "deprecated");
        assert!(handle.check_bool(true));
        assert_eq!(handle.check("value").unwrap(), "value");
        // warnings are not cleared by the bridge
        assert_eq!(handle.take_exception().severity, Severity(310));
    }

    #[test]
    fn test_check_bool_reports_false_and_clears() {
        let handle = new_handle();
        simulated::raise(handle.as_ptr(), ExceptionKind::BlobError.into(), "unable to open");
        assert!(!handle.check_bool(true));
        assert!(handle.check_bool(true));
        assert!(!handle.check_bool(false));
    }

    #[test]
    fn test_check_status_false_without_exception() {
        let handle = new_handle();
        let err = handle.check_status("MagickWriteImage", false).unwrap_err();
        assert!(matches!(err, WandError::Failed { operation: "MagickWriteImage" }));
        assert!(handle.check_status("MagickWriteImage", true).is_ok());
    }

    #[test]
    fn test_exception_message_relinquished() {
        let handle = new_handle();
        let before = simulated::counters();
        let _ = handle.take_exception();
        assert_eq!(simulated::counters().relinquished - before.relinquished, 1);
    }
}
