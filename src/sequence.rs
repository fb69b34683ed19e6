//! Image-list mutations: adding, removing and composing images.

use crate::error::{Result, WandError};
use crate::handle::Handle;
use crate::native::{MagickWandT, from_bool, to_bool};
use crate::types::{ChannelType, LayerMethod};
use crate::wand::Wand;

impl Wand {
    /// Add every image of `other`, before the first image when `prepend`,
    /// after the last otherwise.
    pub fn add_image(&mut self, other: &Wand, prepend: bool) -> bool {
        self.add_images(prepend, &[other])
    }

    /// Add the images of each wand in `others`.
    ///
    /// Every add is attempted even after one fails; the result is `true`
    /// only if all of them succeeded. A wand from another library table
    /// counts as a failed add.
    pub fn add_images(&mut self, prepend: bool, others: &[&Wand]) -> bool {
        if prepend {
            self.set_first_iterator();
        } else {
            self.set_last_iterator();
        }
        let mut ok = true;
        for other in others {
            if let Err(err) = self.library().ensure_same(other.library()) {
                log::warn!("cannot add images: {err}");
                ok = false;
                continue;
            }
            let status = unsafe { (self.library().add_image)(self.as_ptr(), other.as_ptr()) };
            ok &= self.handle().check_bool(to_bool(status));
        }
        self.reload_images();
        ok
    }

    /// Remove the image at the cursor.
    ///
    /// On success exactly that mirror entry is dropped and the entries after
    /// it move down one position.
    pub fn remove_image(&mut self) -> bool {
        let position = self.raw_iterator_index();
        let status = unsafe { (self.library().remove_image)(self.as_ptr()) };
        if !self.handle().check_bool(to_bool(status)) {
            return false;
        }
        match usize::try_from(position) {
            Ok(position) => self.forget_image(position),
            Err(_) => self.reload_images(),
        }
        true
    }

    /// Remove the image at each index, in the order given.
    ///
    /// Indexes are not rebased: after removing index 0, the image that was
    /// at index 2 is at index 1. An index the cursor cannot move to is
    /// skipped rather than removing whatever image the cursor is on.
    pub fn remove_images(&mut self, indexes: &[usize]) {
        for &index in indexes {
            let Ok(index) = isize::try_from(index) else {
                continue;
            };
            if self.set_iterator_index(index) {
                self.remove_image();
            }
        }
    }

    /// Combine the images into one, each supplying one of `channels`.
    pub fn combine(&self, channels: ChannelType) -> Result<Wand> {
        let raw = unsafe { (self.library().combine_images)(self.as_ptr(), channels.bits()) };
        self.derived("MagickCombineImages", raw)
    }

    /// Merge the images as layers.
    pub fn merge_layers(&self, method: LayerMethod) -> Result<Wand> {
        let raw = unsafe { (self.library().merge_image_layers)(self.as_ptr(), method.into()) };
        self.derived("MagickMergeImageLayers", raw)
    }

    /// Join all images into one, left to right, or top to bottom with
    /// `stack`.
    ///
    /// The native call only appends from the cursor onward, so the cursor is
    /// reset first.
    pub fn append(&self, stack: bool) -> Result<Wand> {
        self.reset_iterator();
        let raw = unsafe { (self.library().append_images)(self.as_ptr(), from_bool(stack)) };
        self.derived("MagickAppendImages", raw)
    }

    /// A new wand holding a copy of the image at the cursor.
    pub fn get_image(&self) -> Result<Wand> {
        let raw = unsafe { (self.library().get_image)(self.as_ptr()) };
        self.derived("MagickGetImage", raw)
    }

    /// Replace the image at the cursor with the images of `other`.
    pub fn set_image(&mut self, other: &Wand) -> Result<()> {
        self.library().ensure_same(other.library())?;
        let status = unsafe { (self.library().set_image)(self.as_ptr(), other.as_ptr()) };
        let result = self.handle().check_status("MagickSetImage", to_bool(status));
        self.reload_images();
        result
    }

    /// Adopt a wand returned by a derived-image call, then check the
    /// source's exception slot. The result is owned before any error can
    /// return, so a failed check still destroys it.
    fn derived(&self, operation: &'static str, raw: *mut MagickWandT) -> Result<Wand> {
        if raw.is_null() {
            self.handle().check(())?;
            return Err(WandError::NullResult { operation });
        }
        let handle = unsafe { Handle::from_raw(self.library(), raw) }?;
        self.handle().check(())?;
        Ok(Wand::from_handle(handle))
    }
}

#[cfg(test)]
mod tests {
    use crate::native::simulated;
    use crate::types::{ChannelType, LayerMethod};
    use crate::{ExceptionKind, Wand, WandError};

    fn open(paths: &[&str]) -> Wand {
        Wand::open(simulated::library(), paths).unwrap()
    }

    fn labels(wand: &Wand) -> Vec<String> {
        wand.images()
            .iter()
            .map(|image| image.property("label").unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_add_image_appends() {
        let mut wand = open(&["xc:red", "xc:green"]);
        wand.set_iterator_index(0);
        let other = open(&["xc:blue", "xc:white"]);
        assert!(wand.add_image(&other, false));
        assert_eq!(labels(&wand), ["red", "green", "blue", "white"]);
        assert_eq!(other.images().len(), 2);
    }

    #[test]
    fn test_add_image_prepends() {
        let mut wand = open(&["xc:red", "xc:green"]);
        let other = open(&["xc:blue"]);
        assert!(wand.add_image(&other, true));
        assert_eq!(labels(&wand), ["blue", "red", "green"]);
    }

    #[test]
    fn test_add_images_attempts_every_source() {
        let library = simulated::library();
        let mut wand = open(&["xc:red"]);
        let empty = Wand::new(library).unwrap();
        let blue = open(&["xc:blue"]);
        let white = open(&["xc:white"]);
        assert!(!wand.add_images(false, &[&blue, &empty, &white]));
        assert_eq!(labels(&wand), ["red", "blue", "white"]);
        assert_eq!(wand.images().len(), wand.image_count());
    }

    #[test]
    fn test_remove_image_shifts_later_entries() {
        let mut wand = open(&["xc:red", "xc:green", "xc:blue", "xc:white"]);
        assert!(wand.set_iterator_index(1));
        assert!(wand.remove_image());

        assert_eq!(wand.images().len(), 3);
        for (i, image) in wand.images().iter().enumerate() {
            assert_eq!(image.position(), i);
        }
        assert_eq!(labels(&wand), ["red", "blue", "white"]);
        // the entry at position 1 now reads the image that followed
        assert_eq!(wand.images()[1].property("label").as_deref(), Some("blue"));
    }

    #[test]
    fn test_remove_image_on_empty_wand() {
        let mut wand = Wand::new(simulated::library()).unwrap();
        assert!(!wand.remove_image());
        assert!(wand.images().is_empty());
    }

    #[test]
    fn test_remove_images_does_not_rebase() {
        let mut wand = open(&["xc:red", "xc:green", "xc:blue", "xc:white"]);
        wand.remove_images(&[0, 1]);
        assert_eq!(labels(&wand), ["green", "white"]);

        // out-of-range indexes are skipped
        wand.remove_images(&[5]);
        assert_eq!(wand.images().len(), 2);
    }

    #[test]
    fn test_append_after_mid_list_insert() {
        let mut wand = open(&["xc:red", "xc:green", "xc:blue"]);
        assert!(wand.set_iterator_index(1));
        assert!(wand.read("xc:white"));
        assert_eq!(labels(&wand), ["red", "green", "white", "blue"]);

        let appended = wand.append(false).unwrap();
        assert_eq!(appended.images().len(), 1);
        let image = &appended.images()[0];
        assert_eq!(image.property("label").as_deref(), Some("red,green,white,blue"));
        assert_eq!((image.width(), image.height()), (4, 1));

        // the source keeps its images
        assert_eq!(wand.images().len(), 4);
    }

    #[test]
    fn test_append_stacked() {
        let library = simulated::library();
        let mut wand = Wand::with_size(library, 10, 5).unwrap();
        assert!(wand.read("xc:red"));
        assert!(wand.read("xc:blue"));
        let stacked = wand.append(true).unwrap();
        let image = stacked.current_image().unwrap();
        assert_eq!((image.width(), image.height()), (10, 10));
    }

    #[test]
    fn test_derived_wands_are_independent() {
        let wand = open(&["xc:red", "xc:green", "xc:blue"]);
        let combined = wand.combine(ChannelType::RGB).unwrap();
        let merged = wand.merge_layers(LayerMethod::Merge).unwrap();
        assert_ne!(combined.as_ptr(), wand.as_ptr());
        assert_ne!(merged.as_ptr(), combined.as_ptr());
        assert_eq!(combined.images().len(), 1);
        assert_eq!(merged.images().len(), 1);
        assert_eq!(wand.images().len(), 3);
    }

    #[test]
    fn test_derived_from_empty_wand_fails() {
        let wand = Wand::new(simulated::library()).unwrap();
        let err = wand.append(false).unwrap_err();
        assert_eq!(err.severity().map(|s| s.0), Some(470));
        assert!(wand.combine(ChannelType::DEFAULT).is_err());
        assert!(wand.merge_layers(LayerMethod::Flatten).is_err());
        assert!(wand.get_image().is_err());
    }

    #[test]
    fn test_get_image_copies_current() {
        let wand = open(&["xc:red", "xc:green", "xc:blue"]);
        assert!(wand.set_iterator_index(1));
        let single = wand.get_image().unwrap();
        assert_eq!(labels(&single), ["green"]);
        assert_eq!(wand.images().len(), 3);
    }

    #[test]
    fn test_set_image_replaces_current() {
        let mut wand = open(&["xc:red", "xc:green", "xc:blue"]);
        assert!(wand.set_iterator_index(1));
        let replacement = open(&["xc:white", "xc:black"]);
        wand.set_image(&replacement).unwrap();
        assert_eq!(labels(&wand), ["red", "white", "black", "blue"]);
        assert_eq!(wand.images().len(), wand.image_count());
    }

    #[test]
    fn test_derived_wand_destroyed_when_source_reports_error() {
        let wand = open(&["xc:red", "xc:green"]);
        simulated::raise(wand.as_ptr(), ExceptionKind::ImageError.into(), "late failure");
        let before = simulated::counters();
        let err = wand.get_image().unwrap_err();
        assert_eq!(err.severity().map(|s| s.0), Some(465));
        // the copy made by the library was adopted and destroyed
        let after = simulated::counters();
        assert_eq!(after.destroyed - before.destroyed, 1);
        assert_eq!(after.stray_releases, before.stray_releases);
        // the error was cleared with the source still intact
        assert_eq!(labels(&wand.get_image().unwrap()), ["green"]);
    }

    #[test]
    fn test_wand_from_other_library_rejected() {
        let mut wand = open(&["xc:red"]);
        let foreign = Wand::open(simulated::alternate_library(), &["xc:blue"]).unwrap();
        let white = open(&["xc:white"]);

        assert!(!wand.add_images(false, &[&foreign, &white]));
        assert_eq!(labels(&wand), ["red", "white"]);

        let err = wand.set_image(&foreign).unwrap_err();
        assert!(matches!(
            err,
            WandError::LibraryMismatch {
                expected: "simulated",
                found: "simulated (alternate)",
            }
        ));
        assert_eq!(labels(&wand), ["red", "white"]);
        assert_eq!(wand.images().len(), wand.image_count());
    }
}
