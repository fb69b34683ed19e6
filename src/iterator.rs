//! Native cursor control.
//!
//! The cursor lives in the native wand. Moving it never changes the image
//! list, so none of these operations touch the mirror.

use crate::native::to_bool;
use crate::wand::Wand;

impl Wand {
    /// Position of the native cursor; `None` for an empty wand.
    pub fn iterator_index(&self) -> Option<usize> {
        usize::try_from(self.raw_iterator_index()).ok()
    }

    /// Raw native cursor, `-1` when the library reports none.
    pub(crate) fn raw_iterator_index(&self) -> isize {
        let index = unsafe { (self.library().get_iterator_index)(self.as_ptr()) };
        self.handle().soft(index)
    }

    /// Move the cursor to `index`.
    ///
    /// The index is passed to the library unchecked; an index that names no
    /// image leaves the cursor in place and returns `false`.
    pub fn set_iterator_index(&self, index: isize) -> bool {
        log::trace!("set iterator index {index}");
        let status = unsafe { (self.library().set_iterator_index)(self.as_ptr(), index) };
        self.handle().check_bool(to_bool(status))
    }

    /// Move to the first image; the next [`next_image`](Self::next_image)
    /// stays on it.
    pub fn reset_iterator(&self) {
        log::trace!("reset iterator");
        unsafe { (self.library().reset_iterator)(self.as_ptr()) };
    }

    /// Move to the first image; images added next are inserted before it.
    pub fn set_first_iterator(&self) {
        log::trace!("set first iterator");
        unsafe { (self.library().set_first_iterator)(self.as_ptr()) };
    }

    /// Move to the last image; images added next are appended.
    pub fn set_last_iterator(&self) {
        log::trace!("set last iterator");
        unsafe { (self.library().set_last_iterator)(self.as_ptr()) };
    }

    /// Advance the cursor.
    ///
    /// # Returns
    ///
    /// `false` when there is no further image. Right after
    /// [`reset_iterator`](Self::reset_iterator) the first call lands on the
    /// first image.
    pub fn next_image(&self) -> bool {
        let status = unsafe { (self.library().next_image)(self.as_ptr()) };
        self.handle().check_bool(to_bool(status))
    }

    /// Step the cursor back; `false` at the first image.
    pub fn previous_image(&self) -> bool {
        let status = unsafe { (self.library().previous_image)(self.as_ptr()) };
        self.handle().check_bool(to_bool(status))
    }

    /// Whether an image follows the cursor.
    pub fn has_next_image(&self) -> bool {
        let status = unsafe { (self.library().has_next_image)(self.as_ptr()) };
        self.handle().check_bool(to_bool(status))
    }

    /// Whether an image precedes the cursor.
    pub fn has_previous_image(&self) -> bool {
        let status = unsafe { (self.library().has_previous_image)(self.as_ptr()) };
        self.handle().check_bool(to_bool(status))
    }
}

#[cfg(test)]
mod tests {
    use crate::Wand;
    use crate::native::simulated;

    fn three_colors() -> Wand {
        Wand::open(simulated::library(), &["xc:red", "xc:green", "xc:blue"]).unwrap()
    }

    #[test]
    fn test_cursor_after_reads_is_last() {
        let wand = three_colors();
        assert_eq!(wand.iterator_index(), Some(2));
        assert!(!wand.has_next_image());
        assert!(wand.has_previous_image());
    }

    #[test]
    fn test_set_iterator_index_out_of_range() {
        let wand = three_colors();
        assert!(wand.set_iterator_index(1));
        assert!(!wand.set_iterator_index(3));
        assert_eq!(wand.iterator_index(), Some(1));
    }

    #[test]
    fn test_reset_then_walk() {
        let wand = three_colors();
        wand.reset_iterator();
        let mut seen = Vec::new();
        while wand.next_image() {
            seen.push(wand.current_image().unwrap().position());
        }
        assert_eq!(seen, [0, 1, 2]);
        // the mirror is untouched by cursor moves
        assert_eq!(wand.images().len(), 3);
    }

    #[test]
    fn test_first_and_last() {
        let wand = three_colors();
        wand.set_first_iterator();
        assert_eq!(wand.iterator_index(), Some(0));
        assert!(!wand.previous_image());
        wand.set_last_iterator();
        assert_eq!(wand.iterator_index(), Some(2));
    }

    #[test]
    fn test_empty_wand_cursor() {
        let wand = Wand::new(simulated::library()).unwrap();
        assert_eq!(wand.iterator_index(), None);
        assert!(!wand.next_image());
        assert!(!wand.has_previous_image());
        // failures were cleared by the bridge
        assert!(!wand.handle().take_exception().severity.is_fatal());
    }
}
