//! Native call surface of the MagickWand C API.
//!
//! Every native entry point the crate uses is reached through a
//! [`WandLibrary`] table of C function pointers. Two tables exist:
//!
//! - [`magick()`] (feature `magick`): the linked ImageMagick 6 library.
//! - [`simulated::library()`] (feature `simulated`, always available in
//!   tests): an in-process library implementing the same ABI.
//!
//! Pointer arguments follow the C declarations; constness is not part of
//! the ABI, so wand arguments are uniformly `*mut`.

#[cfg(feature = "magick")]
mod magick;
#[cfg(any(test, feature = "simulated"))]
pub mod simulated;

#[cfg(feature = "magick")]
pub use magick::magick;

use crate::error::{Result, WandError};
use crate::metrics::MetricsLayout;
use crate::string;
use libc::{size_t, ssize_t};
use std::ffi::c_void;
use std::os::raw::{c_char, c_int, c_uchar, c_uint};
use std::sync::Once;

/// Opaque `MagickWand` as seen through a raw pointer.
#[repr(C)]
pub struct MagickWandT {
    _private: [u8; 0],
}

/// Opaque `PixelWand`.
#[repr(C)]
pub struct PixelWandT {
    _private: [u8; 0],
}

/// Opaque `DrawingWand`.
#[repr(C)]
pub struct DrawingWandT {
    _private: [u8; 0],
}

/// `MagickBooleanType`
pub type MagickBoolean = c_uint;
pub const MAGICK_FALSE: MagickBoolean = 0;
pub const MAGICK_TRUE: MagickBoolean = 1;

/// `ExceptionType`
pub type ExceptionType = c_int;
/// `GravityType`
pub type GravityType = c_int;
/// `ImageLayerMethod`
pub type ImageLayerMethod = c_int;
/// `ChannelType`
pub type ChannelType = c_int;

pub(crate) fn to_bool(value: MagickBoolean) -> bool {
    value != MAGICK_FALSE
}

pub(crate) fn from_bool(value: bool) -> MagickBoolean {
    if value { MAGICK_TRUE } else { MAGICK_FALSE }
}

/// Function table for one native MagickWand implementation.
///
/// Tables are `'static` and shared by every handle created from them. The
/// one-time library initialization (`MagickWandGenesis`) is tracked per
/// table and run lazily by the first handle construction.
pub struct WandLibrary {
    /// Human-readable name, used in log output.
    pub name: &'static str,
    /// Slot order of the 13-element font metrics array.
    pub metrics_layout: MetricsLayout,
    init: Once,

    pub genesis: unsafe extern "C" fn(),
    pub get_version: unsafe extern "C" fn(*mut size_t) -> *const c_char,
    pub relinquish_memory: unsafe extern "C" fn(*mut c_void) -> *mut c_void,

    // Magick wand lifecycle
    pub new_magick_wand: unsafe extern "C" fn() -> *mut MagickWandT,
    pub destroy_magick_wand: unsafe extern "C" fn(*mut MagickWandT) -> *mut MagickWandT,
    pub clone_magick_wand: unsafe extern "C" fn(*mut MagickWandT) -> *mut MagickWandT,
    pub clear_magick_wand: unsafe extern "C" fn(*mut MagickWandT),
    pub get_exception: unsafe extern "C" fn(*mut MagickWandT, *mut ExceptionType) -> *mut c_char,
    pub clear_exception: unsafe extern "C" fn(*mut MagickWandT) -> MagickBoolean,

    // Image collection
    pub new_image:
        unsafe extern "C" fn(*mut MagickWandT, size_t, size_t, *const PixelWandT) -> MagickBoolean,
    pub read_image: unsafe extern "C" fn(*mut MagickWandT, *const c_char) -> MagickBoolean,
    pub ping_image: unsafe extern "C" fn(*mut MagickWandT, *const c_char) -> MagickBoolean,
    pub read_image_blob:
        unsafe extern "C" fn(*mut MagickWandT, *const c_void, size_t) -> MagickBoolean,
    pub write_image: unsafe extern "C" fn(*mut MagickWandT, *const c_char) -> MagickBoolean,
    pub write_images:
        unsafe extern "C" fn(*mut MagickWandT, *const c_char, MagickBoolean) -> MagickBoolean,
    pub get_image_blob: unsafe extern "C" fn(*mut MagickWandT, *mut size_t) -> *mut c_uchar,
    pub add_image: unsafe extern "C" fn(*mut MagickWandT, *const MagickWandT) -> MagickBoolean,
    pub remove_image: unsafe extern "C" fn(*mut MagickWandT) -> MagickBoolean,
    pub combine_images: unsafe extern "C" fn(*mut MagickWandT, ChannelType) -> *mut MagickWandT,
    pub merge_image_layers:
        unsafe extern "C" fn(*mut MagickWandT, ImageLayerMethod) -> *mut MagickWandT,
    pub append_images: unsafe extern "C" fn(*mut MagickWandT, MagickBoolean) -> *mut MagickWandT,
    pub get_image: unsafe extern "C" fn(*mut MagickWandT) -> *mut MagickWandT,
    pub set_image: unsafe extern "C" fn(*mut MagickWandT, *const MagickWandT) -> MagickBoolean,
    pub get_image_width: unsafe extern "C" fn(*mut MagickWandT) -> size_t,
    pub get_image_height: unsafe extern "C" fn(*mut MagickWandT) -> size_t,
    pub get_image_format: unsafe extern "C" fn(*mut MagickWandT) -> *mut c_char,
    pub set_image_format: unsafe extern "C" fn(*mut MagickWandT, *const c_char) -> MagickBoolean,
    pub get_image_property: unsafe extern "C" fn(*mut MagickWandT, *const c_char) -> *mut c_char,
    pub set_image_property:
        unsafe extern "C" fn(*mut MagickWandT, *const c_char, *const c_char) -> MagickBoolean,

    // Iterator
    pub set_iterator_index: unsafe extern "C" fn(*mut MagickWandT, ssize_t) -> MagickBoolean,
    pub get_iterator_index: unsafe extern "C" fn(*mut MagickWandT) -> ssize_t,
    pub reset_iterator: unsafe extern "C" fn(*mut MagickWandT),
    pub set_first_iterator: unsafe extern "C" fn(*mut MagickWandT),
    pub set_last_iterator: unsafe extern "C" fn(*mut MagickWandT),
    pub next_image: unsafe extern "C" fn(*mut MagickWandT) -> MagickBoolean,
    pub previous_image: unsafe extern "C" fn(*mut MagickWandT) -> MagickBoolean,
    pub has_next_image: unsafe extern "C" fn(*mut MagickWandT) -> MagickBoolean,
    pub has_previous_image: unsafe extern "C" fn(*mut MagickWandT) -> MagickBoolean,
    pub get_number_images: unsafe extern "C" fn(*mut MagickWandT) -> size_t,

    // Attributes
    pub get_pointsize: unsafe extern "C" fn(*mut MagickWandT) -> f64,
    pub set_pointsize: unsafe extern "C" fn(*mut MagickWandT, f64) -> MagickBoolean,
    pub get_gravity: unsafe extern "C" fn(*mut MagickWandT) -> GravityType,
    pub set_gravity: unsafe extern "C" fn(*mut MagickWandT, GravityType) -> MagickBoolean,
    pub get_antialias: unsafe extern "C" fn(*mut MagickWandT) -> MagickBoolean,
    pub set_antialias: unsafe extern "C" fn(*mut MagickWandT, MagickBoolean) -> MagickBoolean,
    pub get_font: unsafe extern "C" fn(*mut MagickWandT) -> *mut c_char,
    pub set_font: unsafe extern "C" fn(*mut MagickWandT, *const c_char) -> MagickBoolean,
    pub get_size: unsafe extern "C" fn(*mut MagickWandT, *mut size_t, *mut size_t) -> MagickBoolean,
    pub set_size: unsafe extern "C" fn(*mut MagickWandT, size_t, size_t) -> MagickBoolean,
    pub get_background_color: unsafe extern "C" fn(*mut MagickWandT) -> *mut PixelWandT,
    pub set_background_color:
        unsafe extern "C" fn(*mut MagickWandT, *const PixelWandT) -> MagickBoolean,
    pub get_page: unsafe extern "C" fn(
        *mut MagickWandT,
        *mut size_t,
        *mut size_t,
        *mut ssize_t,
        *mut ssize_t,
    ) -> MagickBoolean,
    pub set_page:
        unsafe extern "C" fn(*mut MagickWandT, size_t, size_t, ssize_t, ssize_t) -> MagickBoolean,

    // Text metrics
    pub query_font_metrics:
        unsafe extern "C" fn(*mut MagickWandT, *const DrawingWandT, *const c_char) -> *mut f64,
    pub query_multiline_font_metrics:
        unsafe extern "C" fn(*mut MagickWandT, *const DrawingWandT, *const c_char) -> *mut f64,

    // Pixel wand
    pub new_pixel_wand: unsafe extern "C" fn() -> *mut PixelWandT,
    pub destroy_pixel_wand: unsafe extern "C" fn(*mut PixelWandT) -> *mut PixelWandT,
    pub clone_pixel_wand: unsafe extern "C" fn(*const PixelWandT) -> *mut PixelWandT,
    pub pixel_set_color: unsafe extern "C" fn(*mut PixelWandT, *const c_char) -> MagickBoolean,
    pub pixel_get_color_as_string: unsafe extern "C" fn(*mut PixelWandT) -> *mut c_char,
    pub pixel_get_exception: unsafe extern "C" fn(*mut PixelWandT, *mut ExceptionType) -> *mut c_char,
    pub pixel_clear_exception: unsafe extern "C" fn(*mut PixelWandT) -> MagickBoolean,

    // Drawing wand
    pub new_drawing_wand: unsafe extern "C" fn() -> *mut DrawingWandT,
    pub destroy_drawing_wand: unsafe extern "C" fn(*mut DrawingWandT) -> *mut DrawingWandT,
    pub draw_set_font: unsafe extern "C" fn(*mut DrawingWandT, *const c_char) -> MagickBoolean,
    pub draw_set_font_size: unsafe extern "C" fn(*mut DrawingWandT, f64),
    pub draw_get_exception:
        unsafe extern "C" fn(*mut DrawingWandT, *mut ExceptionType) -> *mut c_char,
    pub draw_clear_exception: unsafe extern "C" fn(*mut DrawingWandT) -> MagickBoolean,
}

impl WandLibrary {
    /// Run the library's process-wide initialization exactly once.
    pub fn ensure_initialized(&self) {
        self.init.call_once(|| {
            log::debug!("initializing native library {}", self.name);
            unsafe { (self.genesis)() };
        });
    }

    /// Whether [`ensure_initialized`](Self::ensure_initialized) has completed.
    pub fn is_initialized(&self) -> bool {
        self.init.is_completed()
    }

    /// Fail with [`WandError::LibraryMismatch`] unless `other` is this very
    /// table. Handles are only meaningful to the library that created them.
    pub(crate) fn ensure_same(&self, other: &WandLibrary) -> Result<()> {
        if std::ptr::eq(self, other) {
            return Ok(());
        }
        Err(WandError::LibraryMismatch {
            expected: self.name,
            found: other.name,
        })
    }
}

impl std::fmt::Debug for WandLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WandLibrary")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Version string reported by the native library.
///
/// The string is owned by the library and is not relinquished.
pub fn version(library: &WandLibrary) -> Option<String> {
    library.ensure_initialized();
    let mut number: size_t = 0;
    let ptr = unsafe { (library.get_version)(&mut number) };
    unsafe { string::load_borrowed(ptr) }
}

/// Builds a [`WandLibrary`] from the native MagickWand names in scope at
/// the call site.
#[allow(unused_macros)]
macro_rules! wand_library {
    ($name:expr, $layout:expr) => {
        $crate::native::wand_library!($name, $layout, MagickWandGenesis)
    };
    ($name:expr, $layout:expr, $genesis:expr) => {
        $crate::native::WandLibrary {
            name: $name,
            metrics_layout: $layout,
            init: ::std::sync::Once::new(),
            genesis: $genesis,
            get_version: MagickGetVersion,
            relinquish_memory: MagickRelinquishMemory,
            new_magick_wand: NewMagickWand,
            destroy_magick_wand: DestroyMagickWand,
            clone_magick_wand: CloneMagickWand,
            clear_magick_wand: ClearMagickWand,
            get_exception: MagickGetException,
            clear_exception: MagickClearException,
            new_image: MagickNewImage,
            read_image: MagickReadImage,
            ping_image: MagickPingImage,
            read_image_blob: MagickReadImageBlob,
            write_image: MagickWriteImage,
            write_images: MagickWriteImages,
            get_image_blob: MagickGetImageBlob,
            add_image: MagickAddImage,
            remove_image: MagickRemoveImage,
            combine_images: MagickCombineImages,
            merge_image_layers: MagickMergeImageLayers,
            append_images: MagickAppendImages,
            get_image: MagickGetImage,
            set_image: MagickSetImage,
            get_image_width: MagickGetImageWidth,
            get_image_height: MagickGetImageHeight,
            get_image_format: MagickGetImageFormat,
            set_image_format: MagickSetImageFormat,
            get_image_property: MagickGetImageProperty,
            set_image_property: MagickSetImageProperty,
            set_iterator_index: MagickSetIteratorIndex,
            get_iterator_index: MagickGetIteratorIndex,
            reset_iterator: MagickResetIterator,
            set_first_iterator: MagickSetFirstIterator,
            set_last_iterator: MagickSetLastIterator,
            next_image: MagickNextImage,
            previous_image: MagickPreviousImage,
            has_next_image: MagickHasNextImage,
            has_previous_image: MagickHasPreviousImage,
            get_number_images: MagickGetNumberImages,
            get_pointsize: MagickGetPointsize,
            set_pointsize: MagickSetPointsize,
            get_gravity: MagickGetGravity,
            set_gravity: MagickSetGravity,
            get_antialias: MagickGetAntialias,
            set_antialias: MagickSetAntialias,
            get_font: MagickGetFont,
            set_font: MagickSetFont,
            get_size: MagickGetSize,
            set_size: MagickSetSize,
            get_background_color: MagickGetBackgroundColor,
            set_background_color: MagickSetBackgroundColor,
            get_page: MagickGetPage,
            set_page: MagickSetPage,
            query_font_metrics: MagickQueryFontMetrics,
            query_multiline_font_metrics: MagickQueryMultilineFontMetrics,
            new_pixel_wand: NewPixelWand,
            destroy_pixel_wand: DestroyPixelWand,
            clone_pixel_wand: ClonePixelWand,
            pixel_set_color: PixelSetColor,
            pixel_get_color_as_string: PixelGetColorAsString,
            pixel_get_exception: PixelGetException,
            pixel_clear_exception: PixelClearException,
            new_drawing_wand: NewDrawingWand,
            destroy_drawing_wand: DestroyDrawingWand,
            draw_set_font: DrawSetFont,
            draw_set_font_size: DrawSetFontSize,
            draw_get_exception: DrawGetException,
            draw_clear_exception: DrawClearException,
        }
    };
}
#[cfg(any(test, feature = "magick", feature = "simulated"))]
pub(crate) use wand_library;
