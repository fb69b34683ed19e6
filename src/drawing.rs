//! Drawing contexts (`DrawingWand`), used as the font source for text
//! measurement.

use crate::error::Result;
use crate::handle::{DrawingKind, Handle};
use crate::native::{DrawingWandT, WandLibrary, to_bool};
use crate::string::NativeString;

/// An owned native drawing context.
///
/// Only the font settings are exposed; they feed
/// [`Wand::query_font_metrics`](crate::Wand::query_font_metrics).
#[derive(Debug)]
pub struct DrawingWand {
    handle: Handle<DrawingKind>,
}

// SAFETY: the drawing wand is exclusively owned.
unsafe impl Send for DrawingWand {}

impl DrawingWand {
    /// Allocate a drawing wand, initializing `library` first if needed.
    ///
    /// Fails with [`WandError::Acquisition`](crate::WandError::Acquisition)
    /// if the native allocator returns null.
    pub fn new(library: &'static WandLibrary) -> Result<Self> {
        Ok(Self {
            handle: Handle::acquire(library, library.new_drawing_wand)?,
        })
    }

    /// Select the font by name or path.
    ///
    /// An empty name is rejected by the library with a draw error, which is
    /// cleared before returning.
    pub fn set_font(&mut self, font: &str) -> Result<()> {
        let font = NativeString::new(font)?;
        let status = unsafe { (self.library().draw_set_font)(self.as_ptr(), font.as_ptr()) };
        self.handle.check_status("DrawSetFont", to_bool(status))
    }

    /// Set the font size in points. The native call reports no status.
    pub fn set_font_size(&mut self, pointsize: f64) {
        unsafe { (self.library().draw_set_font_size)(self.as_ptr(), pointsize) };
    }

    /// The owned native pointer.
    pub fn as_ptr(&self) -> *mut DrawingWandT {
        self.handle.as_ptr()
    }

    pub fn library(&self) -> &'static WandLibrary {
        self.handle.library()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::simulated;

    #[test]
    fn test_set_font() {
        let mut drawing = DrawingWand::new(simulated::library()).unwrap();
        drawing.set_font("DejaVu-Sans").unwrap();
        assert!(drawing.set_font("").is_err());
        // the failed call left no exception behind
        drawing.set_font("Helvetica").unwrap();
    }
}
