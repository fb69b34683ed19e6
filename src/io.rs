//! Reading images into a wand and writing them back out.
//!
//! Every reader rebuilds the image mirror before returning, whether it
//! succeeded or not: a multi-frame read can fail part way through.

use crate::error::{Result, WandError};
use crate::native::{from_bool, to_bool};
use crate::pixel::PixelWand;
use crate::string::{self, NativeString};
use crate::wand::Wand;
use std::ffi::c_void;

impl Wand {
    /// Read `path` and insert its images after the cursor.
    ///
    /// Returns `false` on failure; the exception is cleared and logged.
    pub fn read(&mut self, path: &str) -> bool {
        let Ok(path) = NativeString::new(path) else {
            log::warn!("cannot read {path:?}: interior NUL");
            return false;
        };
        let status = unsafe { (self.library().read_image)(self.as_ptr(), path.as_ptr()) };
        let ok = self.handle().check_bool(to_bool(status));
        self.reload_images();
        ok
    }

    /// Like [`read`](Self::read), without pixel data.
    pub fn ping_path(&mut self, path: &str) -> bool {
        let Ok(path) = NativeString::new(path) else {
            log::warn!("cannot ping {path:?}: interior NUL");
            return false;
        };
        let status = unsafe { (self.library().ping_image)(self.as_ptr(), path.as_ptr()) };
        let ok = self.handle().check_bool(to_bool(status));
        self.reload_images();
        ok
    }

    /// Decode an in-memory image and insert its frames after the cursor.
    pub fn read_blob(&mut self, blob: &[u8]) -> bool {
        let status = unsafe {
            (self.library().read_image_blob)(self.as_ptr(), blob.as_ptr() as *const c_void, blob.len())
        };
        let ok = self.handle().check_bool(to_bool(status));
        self.reload_images();
        ok
    }

    /// Like [`read_blob`](Self::read_blob), reporting the exception.
    pub(crate) fn read_blob_checked(&mut self, blob: &[u8]) -> Result<()> {
        let status = unsafe {
            (self.library().read_image_blob)(self.as_ptr(), blob.as_ptr() as *const c_void, blob.len())
        };
        let result = self
            .handle()
            .check_status("MagickReadImageBlob", to_bool(status));
        self.reload_images();
        result
    }

    /// Add a `width` x `height` image filled with `background`.
    pub fn new_image(&mut self, width: usize, height: usize, background: &PixelWand) -> Result<()> {
        self.library().ensure_same(background.library())?;
        let status = unsafe {
            (self.library().new_image)(self.as_ptr(), width, height, background.as_ptr())
        };
        let result = self.handle().check_status("MagickNewImage", to_bool(status));
        self.reload_images();
        result
    }

    /// Write the current image to `path`.
    pub fn save(&self, path: &str) -> Result<()> {
        let path = NativeString::new(path)?;
        let status = unsafe { (self.library().write_image)(self.as_ptr(), path.as_ptr()) };
        self.handle().check_status("MagickWriteImage", to_bool(status))
    }

    /// Write every image to `path`.
    ///
    /// With `adjoin`, all images go into one file when the format supports
    /// it; otherwise each image is written to its own numbered file.
    pub fn save_all(&self, path: &str, adjoin: bool) -> Result<()> {
        let path = NativeString::new(path)?;
        let status = unsafe {
            (self.library().write_images)(self.as_ptr(), path.as_ptr(), from_bool(adjoin))
        };
        self.handle().check_status("MagickWriteImages", to_bool(status))
    }

    /// Encode the current image in its format.
    ///
    /// The native buffer is copied and relinquished before the exception
    /// check, on success and failure alike.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let library = self.library();
        let mut length = 0;
        let ptr = unsafe { (library.get_image_blob)(self.as_ptr(), &mut length) };
        let blob = unsafe { string::load_bytes(library, ptr, length) };
        self.handle().check(blob)?.ok_or(WandError::NullResult {
            operation: "MagickGetImageBlob",
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::native::simulated;
    use crate::{ExceptionKind, PixelWand, Wand, WandError};

    fn labels(wand: &Wand) -> Vec<String> {
        wand.images()
            .iter()
            .map(|image| image.property("label").unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_read_failure_keeps_images() {
        let mut wand = Wand::open(simulated::library(), &["xc:red"]).unwrap();
        assert!(!wand.read("/nonexistent/dir/image.sim"));
        assert_eq!(wand.images().len(), 1);
        assert!(!wand.read("xc:not-a-color"));
        assert!(!wand.read("bad\0path"));
        assert!(wand.read("xc:green"));
        assert_eq!(labels(&wand), ["red", "green"]);
    }

    #[test]
    fn test_read_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut wand = Wand::new(simulated::library()).unwrap();
        assert!(!wand.read(dir.path().to_str().unwrap()));
        assert!(wand.images().is_empty());
    }

    #[test]
    fn test_save_all_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sequence.sim");
        let path = path.to_str().unwrap();

        let wand = Wand::open(simulated::library(), &["xc:red", "xc:green", "xc:blue"]).unwrap();
        wand.save_all(path, true).unwrap();

        let reopened = Wand::open(simulated::library(), &[path]).unwrap();
        assert_eq!(reopened.images().len(), 3);
        assert_eq!(labels(&reopened), ["red", "green", "blue"]);
    }

    #[test]
    fn test_save_all_without_adjoin_splits_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.sim");

        let wand = Wand::open(simulated::library(), &["xc:red", "xc:green"]).unwrap();
        wand.save_all(path.to_str().unwrap(), false).unwrap();

        assert!(dir.path().join("frame-0.sim").exists());
        assert!(dir.path().join("frame-1.sim").exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_current_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.sim");

        let wand = Wand::open(simulated::library(), &["xc:red", "xc:green"]).unwrap();
        assert!(wand.set_iterator_index(0));
        wand.save(path.to_str().unwrap()).unwrap();

        let reopened = Wand::open(simulated::library(), &[path.to_str().unwrap()]).unwrap();
        assert_eq!(labels(&reopened), ["red"]);
    }

    #[test]
    fn test_save_failures_raise() {
        let wand = Wand::new(simulated::library()).unwrap();
        let err = wand.save("/tmp/never-written.sim").unwrap_err();
        assert_eq!(err.severity().map(|s| s.0), Some(470));

        let wand = Wand::open(simulated::library(), &["xc:red"]).unwrap();
        let err = wand.save("/nonexistent/dir/out.sim").unwrap_err();
        assert_eq!(err.severity().map(|s| s.0), Some(435));
    }

    #[test]
    fn test_blob_round_trip() {
        let library = simulated::library();
        let wand = Wand::canvas(library, 12, 8, "orange").unwrap();
        let blob = wand.to_blob().unwrap();

        let mut decoded = Wand::new(library).unwrap();
        assert!(decoded.read_blob(&blob));
        let image = decoded.current_image().unwrap();
        assert_eq!((image.width(), image.height()), (12, 8));
        assert_eq!(image.property("label").as_deref(), Some("orange"));
    }

    #[test]
    fn test_empty_blob_rejected() {
        let mut wand = Wand::new(simulated::library()).unwrap();
        assert!(!wand.read_blob(&[]));
        assert!(wand.images().is_empty());
    }

    #[test]
    fn test_to_blob_relinquishes_once() {
        let wand = Wand::open(simulated::library(), &["xc:red"]).unwrap();
        let before = simulated::counters();
        let blob = wand.to_blob().unwrap();
        assert!(!blob.is_empty());
        let after = simulated::counters();
        // the blob plus the exception message inspected by the bridge
        assert_eq!(after.relinquished - before.relinquished, 2);
        assert_eq!(after.stray_releases, before.stray_releases);
    }

    #[test]
    fn test_new_image_appends() {
        let library = simulated::library();
        let mut wand = Wand::open(library, &["xc:red"]).unwrap();
        let pixel = PixelWand::from_color(library, "blue").unwrap();
        wand.new_image(3, 3, &pixel).unwrap();
        assert_eq!(labels(&wand), ["red", "blue"]);
        assert!(wand.new_image(0, 3, &pixel).is_err());
        assert_eq!(wand.images().len(), 2);
    }

    #[test]
    fn test_to_blob_relinquishes_on_error() {
        let wand = Wand::open(simulated::library(), &["xc:red"]).unwrap();
        simulated::raise(wand.as_ptr(), ExceptionKind::CorruptImageError.into(), "encoder");
        let before = simulated::counters();
        let err = wand.to_blob().unwrap_err();
        assert_eq!(err.severity().map(|s| s.0), Some(425));
        let after = simulated::counters();
        assert_eq!(after.relinquished - before.relinquished, 2);
        assert_eq!(after.stray_releases, before.stray_releases);
    }

    #[test]
    fn test_new_image_rejects_foreign_pixel() {
        let mut wand = Wand::new(simulated::library()).unwrap();
        let pixel = PixelWand::from_color(simulated::alternate_library(), "blue").unwrap();
        let err = wand.new_image(2, 2, &pixel).unwrap_err();
        assert!(matches!(err, WandError::LibraryMismatch { .. }));
        assert!(wand.images().is_empty());
    }
}
