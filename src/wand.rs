//! The multi-image container and its image-list mirror.

use crate::error::{Result, WandError};
use crate::handle::{Handle, MagickKind};
use crate::image::Image;
use crate::native::{MagickWandT, WandLibrary};

/// Owner of one native `MagickWand`: a sequence of images plus a cursor.
///
/// Alongside the handle the wand keeps a mirror of [`Image`] entries, one
/// per native image in native order. Every operation that can change the
/// image count or order rebuilds the mirror before returning. Cursor moves
/// leave it untouched; the cursor itself lives in the native library and is
/// queried on demand.
///
/// # Thread Safety
///
/// `Wand` is `Send` but not `Sync`. The cursor and exception slot are
/// unsynchronized native state, so a wand must only be used from one thread
/// at a time. Distinct wands are independent.
pub struct Wand {
    handle: Handle<MagickKind>,
    images: Vec<Image>,
}

// SAFETY: the native wand is exclusively owned by this value (clones and
// derived wands get new handles), and `Image` entries only alias it.
unsafe impl Send for Wand {}

impl Wand {
    /// Wrap an owned handle and build the mirror from the native count.
    pub(crate) fn from_handle(handle: Handle<MagickKind>) -> Self {
        let mut wand = Self {
            handle,
            images: Vec::new(),
        };
        wand.reload_images();
        wand
    }

    /// Rebuild the mirror from the native image count.
    pub(crate) fn reload_images(&mut self) {
        let count = self.image_count();
        let raw = self.as_ptr();
        let library = self.library();
        self.images.clear();
        self.images
            .extend((0..count).map(|position| Image::new(raw, library, position)));
        log::debug!("image list reloaded: {count} image(s)");
    }

    /// Drop the mirror entry at `position` and renumber the entries after it.
    pub(crate) fn forget_image(&mut self, position: usize) {
        if position >= self.images.len() {
            self.reload_images();
            return;
        }
        self.images.remove(position);
        for image in &mut self.images[position..] {
            image.shift_down();
        }
    }

    pub(crate) fn clear_images(&mut self) {
        self.images.clear();
    }

    pub(crate) fn handle(&self) -> &Handle<MagickKind> {
        &self.handle
    }

    /// The owned native pointer.
    pub fn as_ptr(&self) -> *mut MagickWandT {
        self.handle.as_ptr()
    }

    pub fn library(&self) -> &'static WandLibrary {
        self.handle.library()
    }

    /// Mirror entries, in native order.
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn image(&self, position: usize) -> Option<&Image> {
        self.images.get(position)
    }

    /// Number of images according to the native library.
    pub fn image_count(&self) -> usize {
        unsafe { (self.library().get_number_images)(self.as_ptr()) }
    }

    /// The mirror entry at the native cursor.
    ///
    /// Fails with [`WandError::IndexOutOfRange`] when the cursor does not
    /// name an image, e.g. on an empty wand.
    pub fn current_image(&self) -> Result<&Image> {
        let index = self.raw_iterator_index();
        usize::try_from(index)
            .ok()
            .and_then(|i| self.images.get(i))
            .ok_or(WandError::IndexOutOfRange {
                index,
                count: self.images.len(),
            })
    }

    /// Release the native handle now and empty the mirror.
    ///
    /// The wand is consumed, so nothing can reach the destroyed handle
    /// afterwards. Dropping a wand releases it the same way.
    ///
    /// ```compile_fail
    /// fn reuse(wand: magickwand::Wand) -> usize {
    ///     wand.dispose();
    ///     wand.image_count()
    /// }
    /// ```
    pub fn dispose(mut self) {
        self.images.clear();
        self.handle.release();
    }
}

impl std::fmt::Debug for Wand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wand")
            .field("handle", &self.handle)
            .field("images", &self.images.len())
            .finish()
    }
}
