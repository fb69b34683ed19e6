//! Owned color values (`PixelWand`).

use crate::error::Result;
use crate::handle::{Handle, PixelKind};
use crate::native::{PixelWandT, WandLibrary, to_bool};
use crate::string::{self, NativeString};

/// A single color held by the native library.
#[derive(Debug)]
pub struct PixelWand {
    handle: Handle<PixelKind>,
}

// SAFETY: the pixel wand is exclusively owned; native state is never shared
// between instances.
unsafe impl Send for PixelWand {}

impl PixelWand {
    pub fn new(library: &'static WandLibrary) -> Result<Self> {
        Ok(Self {
            handle: Handle::acquire(library, library.new_pixel_wand)?,
        })
    }

    /// Allocate a pixel wand set to `color` (a name such as `"red"` or a
    /// `#rrggbb` value).
    pub fn from_color(library: &'static WandLibrary, color: &str) -> Result<Self> {
        let mut pixel = Self::new(library)?;
        pixel.set_color(color)?;
        Ok(pixel)
    }

    /// Adopt a pixel wand returned by the native library.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a pixel wand created by `library` and owned by
    /// the caller.
    pub(crate) unsafe fn from_raw(library: &'static WandLibrary, raw: *mut PixelWandT) -> Result<Self> {
        Ok(Self {
            handle: unsafe { Handle::from_raw(library, raw) }?,
        })
    }

    pub fn set_color(&mut self, color: &str) -> Result<()> {
        let color = NativeString::new(color)?;
        let status = unsafe { (self.library().pixel_set_color)(self.as_ptr(), color.as_ptr()) };
        self.handle.check_status("PixelSetColor", to_bool(status))
    }

    /// The color as the library formats it.
    pub fn color(&self) -> Option<String> {
        let library = self.library();
        let ptr = unsafe { (library.pixel_get_color_as_string)(self.as_ptr()) };
        self.handle.soft(unsafe { string::load(library, ptr) })
    }

    /// Duplicate into an independent native pixel wand.
    pub fn try_clone(&self) -> Result<Self> {
        let library = self.library();
        unsafe { Self::from_raw(library, (library.clone_pixel_wand)(self.as_ptr())) }
    }

    pub fn as_ptr(&self) -> *mut PixelWandT {
        self.handle.as_ptr()
    }

    pub fn library(&self) -> &'static WandLibrary {
        self.handle.library()
    }
}
