//! Declarations for the linked ImageMagick 6 MagickWand library.

use super::{
    ChannelType, DrawingWandT, ExceptionType, GravityType, ImageLayerMethod, MagickBoolean,
    MagickWandT, PixelWandT, WandLibrary,
};
use crate::metrics::MetricsLayout;
use libc::{size_t, ssize_t};
use std::ffi::c_void;
use std::os::raw::{c_char, c_uchar};

#[allow(non_snake_case)]
unsafe extern "C" {
    fn MagickWandGenesis();
    fn MagickGetVersion(version: *mut size_t) -> *const c_char;
    fn MagickRelinquishMemory(resource: *mut c_void) -> *mut c_void;

    fn NewMagickWand() -> *mut MagickWandT;
    fn DestroyMagickWand(wand: *mut MagickWandT) -> *mut MagickWandT;
    fn CloneMagickWand(wand: *mut MagickWandT) -> *mut MagickWandT;
    fn ClearMagickWand(wand: *mut MagickWandT);
    fn MagickGetException(wand: *mut MagickWandT, severity: *mut ExceptionType) -> *mut c_char;
    fn MagickClearException(wand: *mut MagickWandT) -> MagickBoolean;

    fn MagickNewImage(
        wand: *mut MagickWandT,
        columns: size_t,
        rows: size_t,
        background: *const PixelWandT,
    ) -> MagickBoolean;
    fn MagickReadImage(wand: *mut MagickWandT, filename: *const c_char) -> MagickBoolean;
    fn MagickPingImage(wand: *mut MagickWandT, filename: *const c_char) -> MagickBoolean;
    fn MagickReadImageBlob(wand: *mut MagickWandT, blob: *const c_void, length: size_t)
    -> MagickBoolean;
    fn MagickWriteImage(wand: *mut MagickWandT, filename: *const c_char) -> MagickBoolean;
    fn MagickWriteImages(
        wand: *mut MagickWandT,
        filename: *const c_char,
        adjoin: MagickBoolean,
    ) -> MagickBoolean;
    fn MagickGetImageBlob(wand: *mut MagickWandT, length: *mut size_t) -> *mut c_uchar;
    fn MagickAddImage(wand: *mut MagickWandT, add_wand: *const MagickWandT) -> MagickBoolean;
    fn MagickRemoveImage(wand: *mut MagickWandT) -> MagickBoolean;
    fn MagickCombineImages(wand: *mut MagickWandT, channel: ChannelType) -> *mut MagickWandT;
    fn MagickMergeImageLayers(wand: *mut MagickWandT, method: ImageLayerMethod)
    -> *mut MagickWandT;
    fn MagickAppendImages(wand: *mut MagickWandT, stack: MagickBoolean) -> *mut MagickWandT;
    fn MagickGetImage(wand: *mut MagickWandT) -> *mut MagickWandT;
    fn MagickSetImage(wand: *mut MagickWandT, set_wand: *const MagickWandT) -> MagickBoolean;
    fn MagickGetImageWidth(wand: *mut MagickWandT) -> size_t;
    fn MagickGetImageHeight(wand: *mut MagickWandT) -> size_t;
    fn MagickGetImageFormat(wand: *mut MagickWandT) -> *mut c_char;
    fn MagickSetImageFormat(wand: *mut MagickWandT, format: *const c_char) -> MagickBoolean;
    fn MagickGetImageProperty(wand: *mut MagickWandT, property: *const c_char) -> *mut c_char;
    fn MagickSetImageProperty(
        wand: *mut MagickWandT,
        property: *const c_char,
        value: *const c_char,
    ) -> MagickBoolean;

    fn MagickSetIteratorIndex(wand: *mut MagickWandT, index: ssize_t) -> MagickBoolean;
    fn MagickGetIteratorIndex(wand: *mut MagickWandT) -> ssize_t;
    fn MagickResetIterator(wand: *mut MagickWandT);
    fn MagickSetFirstIterator(wand: *mut MagickWandT);
    fn MagickSetLastIterator(wand: *mut MagickWandT);
    fn MagickNextImage(wand: *mut MagickWandT) -> MagickBoolean;
    fn MagickPreviousImage(wand: *mut MagickWandT) -> MagickBoolean;
    fn MagickHasNextImage(wand: *mut MagickWandT) -> MagickBoolean;
    fn MagickHasPreviousImage(wand: *mut MagickWandT) -> MagickBoolean;
    fn MagickGetNumberImages(wand: *mut MagickWandT) -> size_t;

    fn MagickGetPointsize(wand: *mut MagickWandT) -> f64;
    fn MagickSetPointsize(wand: *mut MagickWandT, pointsize: f64) -> MagickBoolean;
    fn MagickGetGravity(wand: *mut MagickWandT) -> GravityType;
    fn MagickSetGravity(wand: *mut MagickWandT, gravity: GravityType) -> MagickBoolean;
    fn MagickGetAntialias(wand: *mut MagickWandT) -> MagickBoolean;
    fn MagickSetAntialias(wand: *mut MagickWandT, antialias: MagickBoolean) -> MagickBoolean;
    fn MagickGetFont(wand: *mut MagickWandT) -> *mut c_char;
    fn MagickSetFont(wand: *mut MagickWandT, font: *const c_char) -> MagickBoolean;
    fn MagickGetSize(wand: *mut MagickWandT, columns: *mut size_t, rows: *mut size_t)
    -> MagickBoolean;
    fn MagickSetSize(wand: *mut MagickWandT, columns: size_t, rows: size_t) -> MagickBoolean;
    fn MagickGetBackgroundColor(wand: *mut MagickWandT) -> *mut PixelWandT;
    fn MagickSetBackgroundColor(wand: *mut MagickWandT, background: *const PixelWandT)
    -> MagickBoolean;
    fn MagickGetPage(
        wand: *mut MagickWandT,
        width: *mut size_t,
        height: *mut size_t,
        x: *mut ssize_t,
        y: *mut ssize_t,
    ) -> MagickBoolean;
    fn MagickSetPage(
        wand: *mut MagickWandT,
        width: size_t,
        height: size_t,
        x: ssize_t,
        y: ssize_t,
    ) -> MagickBoolean;

    fn MagickQueryFontMetrics(
        wand: *mut MagickWandT,
        drawing_wand: *const DrawingWandT,
        text: *const c_char,
    ) -> *mut f64;
    fn MagickQueryMultilineFontMetrics(
        wand: *mut MagickWandT,
        drawing_wand: *const DrawingWandT,
        text: *const c_char,
    ) -> *mut f64;

    fn NewPixelWand() -> *mut PixelWandT;
    fn DestroyPixelWand(wand: *mut PixelWandT) -> *mut PixelWandT;
    fn ClonePixelWand(wand: *const PixelWandT) -> *mut PixelWandT;
    fn PixelSetColor(wand: *mut PixelWandT, color: *const c_char) -> MagickBoolean;
    fn PixelGetColorAsString(wand: *mut PixelWandT) -> *mut c_char;
    fn PixelGetException(wand: *mut PixelWandT, severity: *mut ExceptionType) -> *mut c_char;
    fn PixelClearException(wand: *mut PixelWandT) -> MagickBoolean;

    fn NewDrawingWand() -> *mut DrawingWandT;
    fn DestroyDrawingWand(wand: *mut DrawingWandT) -> *mut DrawingWandT;
    fn DrawSetFont(wand: *mut DrawingWandT, font_name: *const c_char) -> MagickBoolean;
    fn DrawSetFontSize(wand: *mut DrawingWandT, pointsize: f64);
    fn DrawGetException(wand: *mut DrawingWandT, severity: *mut ExceptionType) -> *mut c_char;
    fn DrawClearException(wand: *mut DrawingWandT) -> MagickBoolean;
}

static MAGICK: WandLibrary = super::wand_library!("ImageMagick", MetricsLayout::IMAGEMAGICK);

/// Function table for the linked MagickWand library.
pub fn magick() -> &'static WandLibrary {
    &MAGICK
}
