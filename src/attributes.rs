//! Wand-level settings: text rendering options, canvas size, background
//! color and page geometry.

use crate::error::{Result, WandError};
use crate::native::{from_bool, to_bool};
use crate::pixel::PixelWand;
use crate::string::{self, NativeString};
use crate::types::{Gravity, PageGeometry, Size};
use crate::wand::Wand;

impl Wand {
    /// Point size used when rendering or measuring text; `0.0` until set.
    pub fn pointsize(&self) -> f64 {
        let pointsize = unsafe { (self.library().get_pointsize)(self.as_ptr()) };
        self.handle().soft(pointsize)
    }

    /// Set the text point size.
    pub fn set_pointsize(&self, pointsize: f64) -> Result<()> {
        let status = unsafe { (self.library().set_pointsize)(self.as_ptr(), pointsize) };
        self.handle().check_status("MagickSetPointsize", to_bool(status))
    }

    /// Text gravity; `None` while undefined.
    pub fn gravity(&self) -> Option<Gravity> {
        let gravity = unsafe { (self.library().get_gravity)(self.as_ptr()) };
        Gravity::try_from(self.handle().soft(gravity)).ok()
    }

    /// Set where text is anchored on the canvas.
    pub fn set_gravity(&self, gravity: Gravity) -> Result<()> {
        let status = unsafe { (self.library().set_gravity)(self.as_ptr(), gravity.into()) };
        self.handle().check_status("MagickSetGravity", to_bool(status))
    }

    /// Whether text and shapes are antialiased. On by default.
    pub fn antialias(&self) -> bool {
        let antialias = unsafe { (self.library().get_antialias)(self.as_ptr()) };
        self.handle().soft(to_bool(antialias))
    }

    pub fn set_antialias(&self, antialias: bool) -> Result<()> {
        let status = unsafe { (self.library().set_antialias)(self.as_ptr(), from_bool(antialias)) };
        self.handle().check_status("MagickSetAntialias", to_bool(status))
    }

    /// Font name; `None` when no font is set.
    pub fn font(&self) -> Option<String> {
        let library = self.library();
        let ptr = unsafe { (library.get_font)(self.as_ptr()) };
        self.handle().soft(unsafe { string::load(library, ptr) })
    }

    /// Set the font by name or path.
    ///
    /// # Errors
    ///
    /// [`WandError::InteriorNul`] if `font` contains a NUL byte; no native
    /// call is made.
    pub fn set_font(&self, font: &str) -> Result<()> {
        let font = NativeString::new(font)?;
        let status = unsafe { (self.library().set_font)(self.as_ptr(), font.as_ptr()) };
        self.handle().check_status("MagickSetFont", to_bool(status))
    }

    /// Canvas size used by readers that synthesize images.
    pub fn size(&self) -> Result<Size> {
        let mut size = Size::default();
        let status =
            unsafe { (self.library().get_size)(self.as_ptr(), &mut size.width, &mut size.height) };
        self.handle().check_status("MagickGetSize", to_bool(status))?;
        Ok(size)
    }

    /// Preset the canvas size for readers such as `xc:`.
    pub fn set_size(&self, width: usize, height: usize) -> Result<()> {
        let status = unsafe { (self.library().set_size)(self.as_ptr(), width, height) };
        self.handle().check_status("MagickSetSize", to_bool(status))
    }

    /// A new pixel wand holding the background color.
    ///
    /// # Returns
    ///
    /// An owned [`PixelWand`], destroyed when dropped. It is adopted before
    /// the exception check, so an error never leaks it.
    pub fn background_color(&self) -> Result<PixelWand> {
        let library = self.library();
        let raw = unsafe { (library.get_background_color)(self.as_ptr()) };
        if raw.is_null() {
            self.handle().check(())?;
            return Err(WandError::NullResult {
                operation: "MagickGetBackgroundColor",
            });
        }
        let pixel = unsafe { PixelWand::from_raw(library, raw) }?;
        self.handle().check(pixel)
    }

    /// Set the background color from `color`, which must come from the same
    /// library table as this wand.
    pub fn set_background_color(&self, color: &PixelWand) -> Result<()> {
        self.library().ensure_same(color.library())?;
        let status =
            unsafe { (self.library().set_background_color)(self.as_ptr(), color.as_ptr()) };
        self.handle()
            .check_status("MagickSetBackgroundColor", to_bool(status))
    }

    /// Page (virtual canvas) geometry.
    pub fn page(&self) -> Result<PageGeometry> {
        let mut page = PageGeometry::default();
        let status = unsafe {
            (self.library().get_page)(
                self.as_ptr(),
                &mut page.width,
                &mut page.height,
                &mut page.x,
                &mut page.y,
            )
        };
        self.handle().check_status("MagickGetPage", to_bool(status))?;
        Ok(page)
    }

    pub fn set_page(&self, page: PageGeometry) -> Result<()> {
        let status = unsafe {
            (self.library().set_page)(self.as_ptr(), page.width, page.height, page.x, page.y)
        };
        self.handle().check_status("MagickSetPage", to_bool(status))
    }
}

#[cfg(test)]
mod tests {
    use crate::native::simulated;
    use crate::types::{Gravity, PageGeometry, Size};
    use crate::{ExceptionKind, PixelWand, Wand};

    #[test]
    fn test_defaults() {
        let wand = Wand::new(simulated::library()).unwrap();
        assert_eq!(wand.pointsize(), 0.0);
        assert_eq!(wand.gravity(), None);
        assert!(wand.antialias());
        assert_eq!(wand.font(), None);
        assert_eq!(wand.size().unwrap(), Size::new(0, 0));
        assert_eq!(wand.page().unwrap(), PageGeometry::default());
    }

    #[test]
    fn test_text_settings() {
        let wand = Wand::new(simulated::library()).unwrap();
        wand.set_pointsize(18.5).unwrap();
        assert_eq!(wand.pointsize(), 18.5);

        for gravity in [Gravity::NorthWest, Gravity::Center, Gravity::SouthEast] {
            wand.set_gravity(gravity).unwrap();
            assert_eq!(wand.gravity(), Some(gravity));
        }

        wand.set_antialias(false).unwrap();
        assert!(!wand.antialias());

        wand.set_font("DejaVu-Sans").unwrap();
        assert_eq!(wand.font().as_deref(), Some("DejaVu-Sans"));
    }

    #[test]
    fn test_size_and_page() {
        let wand = Wand::new(simulated::library()).unwrap();
        wand.set_size(640, 480).unwrap();
        assert_eq!(wand.size().unwrap(), Size::new(640, 480));

        let page = PageGeometry::new(800, 600, -12, 30);
        wand.set_page(page).unwrap();
        assert_eq!(wand.page().unwrap(), page);
    }

    #[test]
    fn test_background_color() {
        let library = simulated::library();
        let wand = Wand::new(library).unwrap();
        assert_eq!(wand.background_color().unwrap().color().as_deref(), Some("white"));

        let before = simulated::counters();
        let pixel = PixelWand::from_color(library, "#102030").unwrap();
        wand.set_background_color(&pixel).unwrap();
        let background = wand.background_color().unwrap();
        assert_eq!(background.color().as_deref(), Some("#102030"));
        assert_ne!(background.as_ptr(), pixel.as_ptr());

        // the returned pixel wand is owned and destroyed with its value
        drop(background);
        drop(pixel);
        assert_eq!(simulated::counters().destroyed - before.destroyed, 2);
    }

    #[test]
    fn test_interior_nul_font_rejected() {
        let wand = Wand::new(simulated::library()).unwrap();
        assert!(matches!(
            wand.set_font("bad\0font"),
            Err(crate::WandError::InteriorNul(_))
        ));
    }

    #[test]
    fn test_background_color_destroyed_on_error() {
        let wand = Wand::new(simulated::library()).unwrap();
        simulated::raise(wand.as_ptr(), ExceptionKind::OptionError.into(), "bad color");
        let before = simulated::counters();
        let err = wand.background_color().unwrap_err();
        assert_eq!(err.severity().map(|s| s.0), Some(410));
        assert_eq!(simulated::counters().destroyed - before.destroyed, 1);
        assert!(wand.background_color().is_ok());
    }

    #[test]
    fn test_background_from_other_library_rejected() {
        let wand = Wand::new(simulated::library()).unwrap();
        let pixel = PixelWand::from_color(simulated::alternate_library(), "red").unwrap();
        let err = wand.set_background_color(&pixel).unwrap_err();
        assert!(matches!(err, crate::WandError::LibraryMismatch { .. }));
        assert_eq!(wand.background_color().unwrap().color().as_deref(), Some("white"));
    }
}
