//! Font metrics returned by the native text measurement queries.

use crate::drawing::DrawingWand;
use crate::error::{Result, WandError};
use crate::string::NativeString;
use crate::wand::Wand;
use serde::{Deserialize, Serialize};

/// Number of slots in the native metrics array.
pub const METRICS_LEN: usize = 13;

/// One field of [`FontMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    CharacterWidth,
    CharacterHeight,
    Ascender,
    Descender,
    TextWidth,
    TextHeight,
    HorizontalAdvance,
    BoundingBoxX1,
    BoundingBoxY1,
    BoundingBoxX2,
    BoundingBoxY2,
    OriginX,
    OriginY,
}

/// Maps each slot of the native metrics array to the field it fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsLayout {
    slots: [MetricField; METRICS_LEN],
}

impl MetricsLayout {
    /// Slot order documented for `MagickQueryFontMetrics`.
    pub const IMAGEMAGICK: MetricsLayout = MetricsLayout::new([
        MetricField::CharacterWidth,
        MetricField::CharacterHeight,
        MetricField::Ascender,
        MetricField::Descender,
        MetricField::TextWidth,
        MetricField::TextHeight,
        MetricField::HorizontalAdvance,
        MetricField::BoundingBoxX1,
        MetricField::BoundingBoxY1,
        MetricField::BoundingBoxX2,
        MetricField::BoundingBoxY2,
        MetricField::OriginX,
        MetricField::OriginY,
    ]);

    pub const fn new(slots: [MetricField; METRICS_LEN]) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[MetricField; METRICS_LEN] {
        &self.slots
    }
}

impl Default for MetricsLayout {
    fn default() -> Self {
        Self::IMAGEMAGICK
    }
}

/// Text measurements for one string rendered with one drawing context.
///
/// All fields are value types that can be safely copied.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FontMetrics {
    pub character_width: f64,
    pub character_height: f64,
    pub ascender: f64,
    pub descender: f64,
    pub text_width: f64,
    pub text_height: f64,
    pub horizontal_advance: f64,
    pub bounding_box_x1: f64,
    pub bounding_box_y1: f64,
    pub bounding_box_x2: f64,
    pub bounding_box_y2: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl FontMetrics {
    /// Build from a native array in the ImageMagick slot order.
    pub fn from_slots(values: &[f64; METRICS_LEN]) -> Self {
        Self::with_layout(values, &MetricsLayout::IMAGEMAGICK)
    }

    /// Build from a native array using an explicit slot layout.
    pub fn with_layout(values: &[f64; METRICS_LEN], layout: &MetricsLayout) -> Self {
        let mut metrics = Self::default();
        for (value, field) in values.iter().zip(layout.slots()) {
            *metrics.field_mut(*field) = *value;
        }
        metrics
    }

    pub fn get(&self, field: MetricField) -> f64 {
        match field {
            MetricField::CharacterWidth => self.character_width,
            MetricField::CharacterHeight => self.character_height,
            MetricField::Ascender => self.ascender,
            MetricField::Descender => self.descender,
            MetricField::TextWidth => self.text_width,
            MetricField::TextHeight => self.text_height,
            MetricField::HorizontalAdvance => self.horizontal_advance,
            MetricField::BoundingBoxX1 => self.bounding_box_x1,
            MetricField::BoundingBoxY1 => self.bounding_box_y1,
            MetricField::BoundingBoxX2 => self.bounding_box_x2,
            MetricField::BoundingBoxY2 => self.bounding_box_y2,
            MetricField::OriginX => self.origin_x,
            MetricField::OriginY => self.origin_y,
        }
    }

    fn field_mut(&mut self, field: MetricField) -> &mut f64 {
        match field {
            MetricField::CharacterWidth => &mut self.character_width,
            MetricField::CharacterHeight => &mut self.character_height,
            MetricField::Ascender => &mut self.ascender,
            MetricField::Descender => &mut self.descender,
            MetricField::TextWidth => &mut self.text_width,
            MetricField::TextHeight => &mut self.text_height,
            MetricField::HorizontalAdvance => &mut self.horizontal_advance,
            MetricField::BoundingBoxX1 => &mut self.bounding_box_x1,
            MetricField::BoundingBoxY1 => &mut self.bounding_box_y1,
            MetricField::BoundingBoxX2 => &mut self.bounding_box_x2,
            MetricField::BoundingBoxY2 => &mut self.bounding_box_y2,
            MetricField::OriginX => &mut self.origin_x,
            MetricField::OriginY => &mut self.origin_y,
        }
    }

    /// Render as a JSON object.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Wand {
    /// Measure `text` as it would be rendered with `drawing`.
    ///
    /// With `multiline`, line breaks in `text` are honored. Exactly
    /// [`METRICS_LEN`] values are copied out of the native array. The array
    /// is never relinquished here.
    pub fn query_font_metrics(
        &self,
        drawing: &DrawingWand,
        text: &str,
        multiline: bool,
    ) -> Result<FontMetrics> {
        let library = self.library();
        library.ensure_same(drawing.library())?;
        let text = NativeString::new(text)?;
        let query = if multiline {
            library.query_multiline_font_metrics
        } else {
            library.query_font_metrics
        };
        let ptr = unsafe { query(self.as_ptr(), drawing.as_ptr(), text.as_ptr()) };
        let ptr = self.handle().check(ptr)?;
        if ptr.is_null() {
            return Err(WandError::NullResult {
                operation: "MagickQueryFontMetrics",
            });
        }

        let mut values = [0.0f64; METRICS_LEN];
        values.copy_from_slice(unsafe { std::slice::from_raw_parts(ptr, METRICS_LEN) });
        Ok(FontMetrics::with_layout(&values, &library.metrics_layout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::simulated;

    fn sequential() -> [f64; METRICS_LEN] {
        std::array::from_fn(|i| (i + 1) as f64)
    }

    #[test]
    fn test_from_slots_maps_documented_order() {
        let m = FontMetrics::from_slots(&sequential());
        assert_eq!(m.character_width, 1.0);
        assert_eq!(m.character_height, 2.0);
        assert_eq!(m.ascender, 3.0);
        assert_eq!(m.descender, 4.0);
        assert_eq!(m.text_width, 5.0);
        assert_eq!(m.text_height, 6.0);
        assert_eq!(m.horizontal_advance, 7.0);
        assert_eq!(m.bounding_box_x1, 8.0);
        assert_eq!(m.bounding_box_y1, 9.0);
        assert_eq!(m.bounding_box_x2, 10.0);
        assert_eq!(m.bounding_box_y2, 11.0);
        assert_eq!(m.origin_x, 12.0);
        assert_eq!(m.origin_y, 13.0);
    }

    #[test]
    fn test_custom_layout() {
        let mut slots = *MetricsLayout::IMAGEMAGICK.slots();
        slots.swap(7, 9);
        let layout = MetricsLayout::new(slots);
        let m = FontMetrics::with_layout(&sequential(), &layout);
        assert_eq!(m.bounding_box_x1, 10.0);
        assert_eq!(m.bounding_box_x2, 8.0);
        assert_eq!(m.get(MetricField::BoundingBoxY1), 9.0);
    }

    #[test]
    fn test_to_json() {
        let json = FontMetrics::from_slots(&sequential()).to_json().unwrap();
        assert!(json.starts_with(r#"{"character_width":1.0,"character_height":2.0"#));
        assert!(json.contains(r#""bounding_box_y2":11.0"#));
        assert!(json.ends_with(r#""origin_y":13.0}"#));
    }

    #[test]
    fn test_query_font_metrics() {
        let library = simulated::library();
        let wand = Wand::canvas(library, 100, 40, "white").unwrap();
        let mut drawing = DrawingWand::new(library).unwrap();
        drawing.set_font_size(20.0);

        let before = simulated::counters();
        let single = wand.query_font_metrics(&drawing, "abcd", false).unwrap();
        assert_eq!(single.character_height, 20.0);
        assert_eq!(single.text_width, 4.0 * single.character_width);
        assert_eq!(single.text_height, 20.0);
        assert!(single.ascender > 0.0 && single.descender < 0.0);
        // the array belongs to the library; releasing it would show up as a
        // stray release
        assert_eq!(simulated::counters().stray_releases, before.stray_releases);

        let multi = wand.query_font_metrics(&drawing, "ab\nabcdef", true).unwrap();
        assert_eq!(multi.text_height, 40.0);
        assert_eq!(multi.text_width, 6.0 * multi.character_width);
    }

    #[test]
    fn test_query_with_foreign_drawing_rejected() {
        let wand = Wand::canvas(simulated::library(), 10, 10, "white").unwrap();
        let drawing = DrawingWand::new(simulated::alternate_library()).unwrap();
        let err = wand.query_font_metrics(&drawing, "text", false).unwrap_err();
        assert!(matches!(err, WandError::LibraryMismatch { .. }));
    }

    #[test]
    fn test_query_font_metrics_on_empty_wand_fails() {
        let library = simulated::library();
        let wand = Wand::new(library).unwrap();
        let drawing = DrawingWand::new(library).unwrap();
        let err = wand.query_font_metrics(&drawing, "text", false).unwrap_err();
        assert_eq!(err.severity().map(|s| s.0), Some(470));
        // the wand stays usable
        assert_eq!(wand.image_count(), 0);
    }
}
