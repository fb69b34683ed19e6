//! Wand construction, duplication and release.

use crate::error::Result;
use crate::handle::Handle;
use crate::native::{MagickWandT, WandLibrary};
use crate::pixel::PixelWand;
use crate::wand::Wand;

impl Wand {
    /// Create an empty wand.
    ///
    /// Fails with [`WandError::Acquisition`](crate::WandError::Acquisition)
    /// if the native allocator returns null.
    pub fn new(library: &'static WandLibrary) -> Result<Self> {
        let handle = Handle::acquire(library, library.new_magick_wand)?;
        Ok(Self::from_handle(handle))
    }

    /// Take ownership of an existing native wand.
    ///
    /// The handle is adopted, not duplicated, and is destroyed with the
    /// returned value.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a live wand created by `library` that no other
    /// owner will release.
    pub unsafe fn from_raw(library: &'static WandLibrary, raw: *mut MagickWandT) -> Result<Self> {
        library.ensure_initialized();
        let handle = unsafe { Handle::from_raw(library, raw) }?;
        Ok(Self::from_handle(handle))
    }

    /// Create a wand holding one `width` x `height` image filled with
    /// `color`.
    pub fn canvas(
        library: &'static WandLibrary,
        width: usize,
        height: usize,
        color: &str,
    ) -> Result<Self> {
        let pixel = PixelWand::from_color(library, color)?;
        Self::canvas_with_pixel(library, width, height, &pixel)
    }

    /// Create a wand holding one `width` x `height` image filled with the
    /// color of `pixel`.
    pub fn canvas_with_pixel(
        library: &'static WandLibrary,
        width: usize,
        height: usize,
        pixel: &PixelWand,
    ) -> Result<Self> {
        let mut wand = Self::new(library)?;
        wand.new_image(width, height, pixel)?;
        Ok(wand)
    }

    /// Create an empty wand with its canvas size preset, for readers that
    /// synthesize images (such as `xc:`).
    pub fn with_size(library: &'static WandLibrary, width: usize, height: usize) -> Result<Self> {
        let wand = Self::new(library)?;
        wand.set_size(width, height)?;
        Ok(wand)
    }

    /// Create a wand and read every path into it.
    ///
    /// Each path is read independently: a path that fails is logged and
    /// skipped, and images already read are kept.
    pub fn open<P: AsRef<str>>(library: &'static WandLibrary, paths: &[P]) -> Result<Self> {
        let mut wand = Self::new(library)?;
        wand.open_images(paths);
        Ok(wand)
    }

    /// Like [`open`](Self::open), but only reads image attributes (size,
    /// format), not pixel data.
    pub fn ping<P: AsRef<str>>(library: &'static WandLibrary, paths: &[P]) -> Result<Self> {
        let mut wand = Self::new(library)?;
        for path in paths {
            let path = path.as_ref();
            if !wand.ping_path(path) {
                log::warn!("skipping {path}: ping failed");
            }
        }
        Ok(wand)
    }

    /// Create a wand from an encoded image held in memory.
    pub fn from_blob(library: &'static WandLibrary, blob: &[u8]) -> Result<Self> {
        let mut wand = Self::new(library)?;
        wand.read_blob_checked(blob)?;
        Ok(wand)
    }

    /// Duplicate the native wand.
    ///
    /// The clone owns an independent native handle and its own mirror.
    pub fn try_clone(&self) -> Result<Self> {
        let library = self.library();
        let raw = unsafe { (library.clone_magick_wand)(self.as_ptr()) };
        let handle = unsafe { Handle::from_raw(library, raw) }?;
        Ok(Self::from_handle(handle))
    }

    /// Release every image but keep the native wand for reuse.
    pub fn clear(&mut self) {
        unsafe { (self.library().clear_magick_wand)(self.as_ptr()) };
        self.clear_images();
    }

    pub(crate) fn open_images<P: AsRef<str>>(&mut self, paths: &[P]) {
        for path in paths {
            let path = path.as_ref();
            if !self.read(path) {
                log::warn!("skipping {path}: read failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::native::simulated;
    use crate::{PixelWand, Wand, WandError};

    #[test]
    fn test_new_wand_is_empty() {
        let wand = Wand::new(simulated::library()).unwrap();
        assert_eq!(wand.image_count(), 0);
        assert!(wand.images().is_empty());
        assert_eq!(wand.iterator_index(), None);
    }

    #[test]
    fn test_from_raw_adopts_handle() {
        let library = simulated::library();
        let raw = unsafe { (library.new_magick_wand)() };
        let before = simulated::counters();
        let wand = unsafe { Wand::from_raw(library, raw) }.unwrap();
        assert_eq!(wand.as_ptr(), raw);
        drop(wand);
        assert_eq!(simulated::counters().destroyed - before.destroyed, 1);
    }

    #[test]
    fn test_from_raw_null_is_acquisition_error() {
        let err = unsafe { Wand::from_raw(simulated::library(), std::ptr::null_mut()) }.unwrap_err();
        assert!(matches!(err, WandError::Acquisition { .. }));
    }

    #[test]
    fn test_canvas() {
        let wand = Wand::canvas(simulated::library(), 320, 200, "red").unwrap();
        assert_eq!(wand.images().len(), 1);
        let image = wand.current_image().unwrap();
        assert_eq!((image.width(), image.height()), (320, 200));
    }

    #[test]
    fn test_canvas_with_pixel() {
        let library = simulated::library();
        let pixel = PixelWand::from_color(library, "#336699").unwrap();
        let wand = Wand::canvas_with_pixel(library, 8, 8, &pixel).unwrap();
        assert_eq!(wand.images()[0].property("label").as_deref(), Some("#336699"));
    }

    #[test]
    fn test_canvas_failures() {
        let library = simulated::library();
        assert!(Wand::canvas(library, 10, 10, "not-a-color").is_err());
        let err = Wand::canvas(library, 0, 10, "red").unwrap_err();
        assert_eq!(err.severity().map(|s| s.0), Some(410));
    }

    #[test]
    fn test_open_skips_failed_path() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.sim");
        let third = dir.path().join("third.sim");
        std::fs::write(&first, "10x10 red first\n").unwrap();
        std::fs::write(&third, "30x30 blue third\n").unwrap();
        let missing = dir.path().join("missing.sim");

        let paths = [
            first.to_str().unwrap(),
            missing.to_str().unwrap(),
            third.to_str().unwrap(),
        ];
        let wand = Wand::open(simulated::library(), &paths).unwrap();
        assert_eq!(wand.images().len(), 2);
        let labels: Vec<_> = wand
            .images()
            .iter()
            .map(|i| i.property("label").unwrap())
            .collect();
        assert_eq!(labels, ["first", "third"]);
    }

    #[test]
    fn test_ping_reads_attributes_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.sim");
        std::fs::write(&path, "64x48 red a\n64x48 blue b\n").unwrap();

        let wand = Wand::ping(simulated::library(), &[path.to_str().unwrap()]).unwrap();
        assert_eq!(wand.images().len(), 2);
        let image = &wand.images()[1];
        assert_eq!((image.width(), image.height()), (64, 48));
        assert_eq!(image.format().as_deref(), Some("SIM"));
        // pinged images carry no pixel data and cannot be encoded
        assert!(wand.to_blob().is_err());
    }

    #[test]
    fn test_from_blob() {
        let wand = Wand::from_blob(simulated::library(), b"5x7 green g\n2x2 red r\n").unwrap();
        assert_eq!(wand.images().len(), 2);
        assert!(Wand::from_blob(simulated::library(), b"garbage").is_err());
    }

    #[test]
    fn test_clone_is_independent() {
        let library = simulated::library();
        let source = Wand::open(library, &["xc:red", "xc:green", "xc:blue"]).unwrap();
        let mut clone = source.try_clone().unwrap();
        assert_ne!(clone.as_ptr(), source.as_ptr());
        assert_eq!(clone.images().len(), 3);

        clone.remove_images(&[0]);
        assert!(clone.read("xc:white"));
        clone.read("xc:black");
        assert_eq!(clone.images().len(), 4);
        assert_eq!(source.image_count(), 3);
        assert_eq!(source.images().len(), 3);
    }

    #[test]
    fn test_clear_keeps_handle() {
        let library = simulated::library();
        let mut wand = Wand::open(library, &["xc:red", "xc:green"]).unwrap();
        let raw = wand.as_ptr();
        wand.clear();
        assert_eq!(wand.as_ptr(), raw);
        assert!(wand.images().is_empty());
        assert!(wand.read("xc:blue"));
        assert_eq!(wand.images().len(), 1);
    }
}
