//! Per-image views into a wand.

use crate::error::Result;
use crate::handle::{self, MagickKind};
use crate::native::{MagickWandT, WandLibrary, to_bool};
use crate::string::{self, NativeString};

/// One image of a [`Wand`](crate::Wand), named by its position.
///
/// An `Image` owns nothing: it aliases its parent's native handle and is
/// only ever handed out as a borrow of the parent, so it cannot be held
/// across an operation that changes the parent's image list.
///
/// Every query first moves the parent's native cursor to this image.
pub struct Image {
    raw: *mut MagickWandT,
    library: &'static WandLibrary,
    position: usize,
}

impl Image {
    pub(crate) fn new(raw: *mut MagickWandT, library: &'static WandLibrary, position: usize) -> Self {
        Self {
            raw,
            library,
            position,
        }
    }

    pub(crate) fn shift_down(&mut self) {
        self.position -= 1;
    }

    /// Zero-based position within the parent wand.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the parent's cursor to this image.
    pub fn select(&self) -> bool {
        let index = self.position as isize;
        let status = unsafe { (self.library.set_iterator_index)(self.raw, index) };
        self.check_bool(to_bool(status))
    }

    pub fn width(&self) -> usize {
        self.select();
        let width = unsafe { (self.library.get_image_width)(self.raw) };
        self.soft(width)
    }

    pub fn height(&self) -> usize {
        self.select();
        let height = unsafe { (self.library.get_image_height)(self.raw) };
        self.soft(height)
    }

    /// Image format (e.g. `"PNG"`); `None` when the library reports none.
    pub fn format(&self) -> Option<String> {
        self.select();
        let ptr = unsafe { (self.library.get_image_format)(self.raw) };
        let format = unsafe { string::load(self.library, ptr) };
        self.soft(format.filter(|f| !f.is_empty()))
    }

    pub fn set_format(&self, format: &str) -> Result<()> {
        let format = NativeString::new(format)?;
        self.select();
        let status = unsafe { (self.library.set_image_format)(self.raw, format.as_ptr()) };
        unsafe {
            handle::check_status::<MagickKind>(
                self.library,
                self.raw,
                "MagickSetImageFormat",
                to_bool(status),
            )
        }
    }

    pub fn property(&self, name: &str) -> Option<String> {
        let name = NativeString::new(name).ok()?;
        self.select();
        let ptr = unsafe { (self.library.get_image_property)(self.raw, name.as_ptr()) };
        self.soft(unsafe { string::load(self.library, ptr) })
    }

    pub fn set_property(&self, name: &str, value: &str) -> Result<()> {
        let name = NativeString::new(name)?;
        let value = NativeString::new(value)?;
        self.select();
        let status = unsafe {
            (self.library.set_image_property)(self.raw, name.as_ptr(), value.as_ptr())
        };
        unsafe {
            handle::check_status::<MagickKind>(
                self.library,
                self.raw,
                "MagickSetImageProperty",
                to_bool(status),
            )
        }
    }

    fn check_bool(&self, status: bool) -> bool {
        unsafe { handle::check_bool::<MagickKind>(self.library, self.raw, status) }
    }

    fn soft<T>(&self, value: T) -> T {
        self.check_bool(true);
        value
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("position", &self.position)
            .finish()
    }
}
