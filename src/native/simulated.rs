//! In-process MagickWand implementation with the native ABI.
//!
//! Backs the test suite and downstream tests that cannot link ImageMagick.
//! Handles are synthetic addresses that are never reused, so a destroyed
//! handle can always be told apart from a live one. Every string and blob
//! handed to the caller comes from `malloc` and is tracked until it is
//! relinquished; releasing anything unknown is counted as a stray release
//! and otherwise ignored.
//!
//! Images are records (size, color, format, properties). Files use a small
//! text encoding with one frame per line:
//!
//! ```text
//! 64x48 red optional label
//! ```
//!
//! The pseudo-format `xc:<color>` yields one image of the wand's preset
//! size (1x1 when unset).
#![allow(non_snake_case)]

use super::{
    ChannelType, DrawingWandT, ExceptionType, GravityType, ImageLayerMethod, MAGICK_FALSE,
    MAGICK_TRUE, MagickBoolean, MagickWandT, PixelWandT, WandLibrary, from_bool,
};
use crate::metrics::{METRICS_LEN, MetricsLayout};
use libc::{size_t, ssize_t};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{CStr, c_void};
use std::os::raw::{c_char, c_uchar};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

static SIMULATED: WandLibrary = super::wand_library!("simulated", MetricsLayout::IMAGEMAGICK);

static ALTERNATE: WandLibrary = super::wand_library!(
    "simulated (alternate)",
    MetricsLayout::IMAGEMAGICK,
    AlternateGenesis
);

/// The simulated library table.
pub fn library() -> &'static WandLibrary {
    &SIMULATED
}

/// A second table over the same simulated objects.
///
/// Handles created through it are rejected when passed to a wand of
/// [`library`], as they would be between two real libraries. Initializing
/// it is not counted by [`genesis_calls`].
pub fn alternate_library() -> &'static WandLibrary {
    &ALTERNATE
}

const VERSION: &CStr = c"ImageMagick 6.9.13-0 Q16 (simulated)";
const VERSION_NUMBER: size_t = 0x69d;

const OPTION_ERROR: i32 = 410;
const MISSING_DELEGATE_ERROR: i32 = 420;
const CORRUPT_IMAGE_ERROR: i32 = 425;
const BLOB_ERROR: i32 = 435;
const DRAW_ERROR: i32 = 460;
const IMAGE_ERROR: i32 = 465;
const WAND_ERROR: i32 = 470;

const KNOWN_FORMATS: &[&str] = &["PNG", "JPEG", "JPG", "GIF", "TIFF", "BMP", "XC", "TXT", "SIM"];
const NAMED_COLORS: &[&str] = &[
    "black",
    "white",
    "red",
    "green",
    "blue",
    "yellow",
    "cyan",
    "magenta",
    "gray",
    "grey",
    "orange",
    "purple",
    "none",
    "transparent",
];

// ---------------------------------------------------------------------------
// Bookkeeping
// ---------------------------------------------------------------------------

/// Per-thread tallies of release calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Buffers freed through `MagickRelinquishMemory`.
    pub relinquished: usize,
    /// Handles destroyed, all kinds.
    pub destroyed: usize,
    /// Relinquish or destroy calls on something not currently live.
    pub stray_releases: usize,
}

thread_local! {
    static COUNTERS: Cell<Counters> = const {
        Cell::new(Counters {
            relinquished: 0,
            destroyed: 0,
            stray_releases: 0,
        })
    };
}

/// Release tallies for the calling thread.
pub fn counters() -> Counters {
    COUNTERS.with(Cell::get)
}

fn count(update: impl FnOnce(&mut Counters)) {
    COUNTERS.with(|cell| {
        let mut counters = cell.get();
        update(&mut counters);
        cell.set(counters);
    });
}

static GENESIS_CALLS: AtomicUsize = AtomicUsize::new(0);

/// How many times `MagickWandGenesis` has run in this process.
pub fn genesis_calls() -> usize {
    GENESIS_CALLS.load(Ordering::SeqCst)
}

static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(0x10_0000);
static OBJECTS: Mutex<BTreeMap<usize, Object>> = Mutex::new(BTreeMap::new());
static ALLOCATIONS: Mutex<BTreeSet<usize>> = Mutex::new(BTreeSet::new());

fn objects() -> MutexGuard<'static, BTreeMap<usize, Object>> {
    OBJECTS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn allocations() -> MutexGuard<'static, BTreeSet<usize>> {
    ALLOCATIONS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether `handle` names a live wand of any kind.
pub fn is_live(handle: usize) -> bool {
    objects().contains_key(&handle)
}

/// Record an exception on a magick wand, as a failing native call would.
pub fn raise(raw: *mut MagickWandT, severity: i32, message: &str) {
    if let Some(Object::Magick(wand)) = objects().get_mut(&(raw as usize)) {
        wand.exception.set(severity, message.to_string());
    }
}

/// Copy `bytes` into a tracked native buffer with a trailing NUL.
pub fn alloc_bytes_nul(bytes: &[u8]) -> *mut c_char {
    let ptr = unsafe { libc::malloc(bytes.len() + 1) } as *mut u8;
    if ptr.is_null() {
        return std::ptr::null_mut();
    }
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
        *ptr.add(bytes.len()) = 0;
    }
    allocations().insert(ptr as usize);
    ptr as *mut c_char
}

/// Copy `value` into a tracked native string.
pub fn alloc_string(value: &str) -> *mut c_char {
    alloc_bytes_nul(value.as_bytes())
}

/// Copy a NUL-terminated string into a tracked native string.
pub fn alloc_string_from(ptr: *const c_char) -> *mut c_char {
    if ptr.is_null() {
        return std::ptr::null_mut();
    }
    alloc_bytes_nul(unsafe { CStr::from_ptr(ptr) }.to_bytes())
}

/// Copy `bytes` into a tracked native buffer; returns the pointer and length.
pub fn alloc_blob(bytes: &[u8]) -> (*mut u8, usize) {
    let ptr = unsafe { libc::malloc(bytes.len().max(1)) } as *mut u8;
    if ptr.is_null() {
        return (ptr, 0);
    }
    unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
    allocations().insert(ptr as usize);
    (ptr, bytes.len())
}

fn new_handle(object: Object) -> usize {
    let handle = NEXT_HANDLE.fetch_add(0x10, Ordering::Relaxed);
    objects().insert(handle, object);
    handle
}

fn insert_handle(objects: &mut BTreeMap<usize, Object>, object: Object) -> usize {
    let handle = NEXT_HANDLE.fetch_add(0x10, Ordering::Relaxed);
    objects.insert(handle, object);
    handle
}

fn destroy(handle: usize) {
    if objects().remove(&handle).is_some() {
        count(|c| c.destroyed += 1);
    } else {
        count(|c| c.stray_releases += 1);
    }
}

unsafe fn arg(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

fn is_color(name: &str) -> bool {
    if let Some(hex) = name.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8 | 12 | 16)
            && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    NAMED_COLORS.contains(&name.to_ascii_lowercase().as_str())
}

// ---------------------------------------------------------------------------
// Object model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Exception {
    severity: i32,
    message: String,
}

impl Exception {
    fn set(&mut self, severity: i32, message: String) {
        self.severity = severity;
        self.message = message;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone)]
struct SimImage {
    width: usize,
    height: usize,
    color: String,
    format: String,
    properties: BTreeMap<String, String>,
    pinged: bool,
}

impl SimImage {
    fn new(width: usize, height: usize, color: &str, format: &str, label: Option<&str>) -> Self {
        let mut properties = BTreeMap::new();
        if let Some(label) = label {
            properties.insert("label".to_string(), label.to_string());
        }
        Self {
            width,
            height,
            color: color.to_string(),
            format: format.to_string(),
            properties,
            pinged: false,
        }
    }

    fn label(&self) -> &str {
        self.properties.get("label").map_or("", String::as_str)
    }

    fn encode(&self) -> String {
        match self.properties.get("label") {
            Some(label) => format!("{}x{} {} {}\n", self.width, self.height, self.color, label),
            None => format!("{}x{} {}\n", self.width, self.height, self.color),
        }
    }
}

type Failure = (i32, String);

fn decode(text: &str, source: &str) -> Result<Vec<SimImage>, Failure> {
    let corrupt = || (CORRUPT_IMAGE_ERROR, format!("ImproperImageHeader `{source}'"));
    let mut images = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut fields = line.splitn(3, ' ');
        let geometry = fields.next().ok_or_else(corrupt)?;
        let color = fields.next().ok_or_else(corrupt)?;
        let label = fields.next();
        let (width, height) = geometry.split_once('x').ok_or_else(corrupt)?;
        let width: usize = width.parse().map_err(|_| corrupt())?;
        let height: usize = height.parse().map_err(|_| corrupt())?;
        if width == 0 || height == 0 || !is_color(color) {
            return Err(corrupt());
        }
        images.push(SimImage::new(width, height, color, "SIM", label));
    }
    if images.is_empty() {
        return Err(corrupt());
    }
    Ok(images)
}

#[derive(Debug, Clone)]
struct SimWand {
    images: Vec<SimImage>,
    cursor: usize,
    insert_before: bool,
    image_pending: bool,
    exception: Exception,
    pointsize: f64,
    gravity: GravityType,
    antialias: bool,
    font: Option<String>,
    size: (usize, usize),
    background: String,
    page: (usize, usize, isize, isize),
    metrics: Box<[f64; METRICS_LEN]>,
}

impl Default for SimWand {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            cursor: 0,
            insert_before: false,
            image_pending: false,
            exception: Exception::default(),
            pointsize: 0.0,
            gravity: 0,
            antialias: true,
            font: None,
            size: (0, 0),
            background: "white".to_string(),
            page: (0, 0, 0, 0),
            metrics: Box::new([0.0; METRICS_LEN]),
        }
    }
}

impl SimWand {
    fn with_images(images: Vec<SimImage>) -> Self {
        let cursor = images.len().saturating_sub(1);
        Self {
            images,
            cursor,
            ..Self::default()
        }
    }

    fn fail(&mut self, severity: i32, message: impl Into<String>) {
        self.exception.set(severity, message.into());
    }

    /// Record the empty-wand exception; true when the wand has no images.
    fn no_images(&mut self) -> bool {
        if self.images.is_empty() {
            self.fail(WAND_ERROR, "ContainsNoImages `simulated'");
            return true;
        }
        false
    }

    fn current(&mut self) -> Option<&mut SimImage> {
        if self.no_images() {
            return None;
        }
        self.images.get_mut(self.cursor)
    }

    /// Insert `new` relative to the cursor, the way `MagickAddImage` and the
    /// readers do.
    fn insert(&mut self, new: Vec<SimImage>) {
        let added = new.len();
        if added == 0 {
            return;
        }
        if self.images.is_empty() {
            self.images = new;
            self.cursor = if self.insert_before { 0 } else { added - 1 };
        } else if self.insert_before && self.cursor == 0 {
            self.images.splice(0..0, new);
            self.cursor = 0;
        } else if self.cursor + 1 == self.images.len() {
            self.images.extend(new);
            self.cursor = self.images.len() - 1;
        } else {
            let at = self.cursor + 1;
            self.images.splice(at..at, new);
        }
        self.image_pending = false;
    }

    fn read(&mut self, path: &str, ping: bool) -> bool {
        match self.load(path) {
            Ok(mut images) => {
                for image in &mut images {
                    image.pinged = ping;
                }
                self.insert(images);
                true
            }
            Err((severity, message)) => {
                self.fail(severity, message);
                false
            }
        }
    }

    fn load(&self, path: &str) -> Result<Vec<SimImage>, Failure> {
        if let Some(color) = path.strip_prefix("xc:") {
            if !is_color(color) {
                return Err((OPTION_ERROR, format!("UnrecognizedColor `{color}'")));
            }
            let (width, height) = match self.size {
                (0, _) | (_, 0) => (1, 1),
                size => size,
            };
            return Ok(vec![SimImage::new(width, height, color, "XC", Some(color))]);
        }
        let text = std::fs::read(path).map_err(|e| {
            (BLOB_ERROR, format!("UnableToOpenBlob `{path}': {e}"))
        })?;
        decode(&String::from_utf8_lossy(&text), path)
    }

    fn write(&mut self, path: &str, images: &[SimImage]) -> bool {
        if images.iter().any(|image| image.pinged) {
            self.fail(IMAGE_ERROR, format!("ImageHasNoPixelData `{path}'"));
            return false;
        }
        let text: String = images.iter().map(SimImage::encode).collect();
        match std::fs::write(path, text) {
            Ok(()) => true,
            Err(e) => {
                self.fail(BLOB_ERROR, format!("UnableToOpenBlob `{path}': {e}"));
                false
            }
        }
    }

    fn compute_metrics(&mut self, pointsize: f64, text: &str, multiline: bool) -> *mut f64 {
        let lines: Vec<&str> = if multiline {
            text.split('\n').collect()
        } else {
            vec![text]
        };
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let character_width = pointsize / 2.0;
        let ascender = pointsize * 0.75;
        let descender = -pointsize * 0.25;
        let text_width = widest as f64 * character_width;
        *self.metrics = [
            character_width,
            pointsize,
            ascender,
            descender,
            text_width,
            pointsize * lines.len() as f64,
            character_width,
            0.0,
            descender,
            text_width,
            ascender,
            text_width,
            0.0,
        ];
        self.metrics.as_mut_ptr()
    }
}

#[derive(Debug, Clone)]
struct SimPixel {
    color: String,
    exception: Exception,
}

#[derive(Debug, Clone)]
struct SimDrawing {
    font_size: f64,
    exception: Exception,
}

#[derive(Debug)]
enum Object {
    Magick(SimWand),
    Pixel(SimPixel),
    Drawing(SimDrawing),
}

fn with_wand<R>(raw: *const MagickWandT, default: R, f: impl FnOnce(&mut SimWand) -> R) -> R {
    match objects().get_mut(&(raw as usize)) {
        Some(Object::Magick(wand)) => f(wand),
        _ => default,
    }
}

fn with_pixel<R>(raw: *const PixelWandT, default: R, f: impl FnOnce(&mut SimPixel) -> R) -> R {
    match objects().get_mut(&(raw as usize)) {
        Some(Object::Pixel(pixel)) => f(pixel),
        _ => default,
    }
}

fn with_drawing<R>(raw: *const DrawingWandT, default: R, f: impl FnOnce(&mut SimDrawing) -> R) -> R {
    match objects().get_mut(&(raw as usize)) {
        Some(Object::Drawing(drawing)) => f(drawing),
        _ => default,
    }
}

fn images_of(objects: &BTreeMap<usize, Object>, raw: *const MagickWandT) -> Option<Vec<SimImage>> {
    match objects.get(&(raw as usize)) {
        Some(Object::Magick(wand)) => Some(wand.images.clone()),
        _ => None,
    }
}

/// Build a derived wand from `raw`'s images, or record an exception and
/// return null.
fn derive(
    raw: *mut MagickWandT,
    build: impl FnOnce(&SimWand) -> Option<Vec<SimImage>>,
) -> *mut MagickWandT {
    let mut objects = objects();
    let images = match objects.get_mut(&(raw as usize)) {
        Some(Object::Magick(wand)) => {
            if wand.no_images() {
                return std::ptr::null_mut();
            }
            build(wand)
        }
        _ => None,
    };
    match images {
        Some(images) => {
            let handle = insert_handle(&mut objects, Object::Magick(SimWand::with_images(images)));
            std::ptr::without_provenance_mut(handle)
        }
        None => std::ptr::null_mut(),
    }
}

fn joined_labels(images: &[SimImage]) -> String {
    images.iter().map(SimImage::label).collect::<Vec<_>>().join(",")
}

// ---------------------------------------------------------------------------
// Library and memory
// ---------------------------------------------------------------------------

unsafe extern "C" fn MagickWandGenesis() {
    GENESIS_CALLS.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn AlternateGenesis() {}

unsafe extern "C" fn MagickGetVersion(number: *mut size_t) -> *const c_char {
    if !number.is_null() {
        unsafe { *number = VERSION_NUMBER };
    }
    VERSION.as_ptr()
}

unsafe extern "C" fn MagickRelinquishMemory(memory: *mut c_void) -> *mut c_void {
    if memory.is_null() {
        return memory;
    }
    if allocations().remove(&(memory as usize)) {
        unsafe { libc::free(memory) };
        count(|c| c.relinquished += 1);
    } else {
        count(|c| c.stray_releases += 1);
    }
    std::ptr::null_mut()
}

// ---------------------------------------------------------------------------
// Magick wand lifecycle and exceptions
// ---------------------------------------------------------------------------

unsafe extern "C" fn NewMagickWand() -> *mut MagickWandT {
    std::ptr::without_provenance_mut(new_handle(Object::Magick(SimWand::default())))
}

unsafe extern "C" fn DestroyMagickWand(wand: *mut MagickWandT) -> *mut MagickWandT {
    destroy(wand as usize);
    std::ptr::null_mut()
}

unsafe extern "C" fn CloneMagickWand(wand: *mut MagickWandT) -> *mut MagickWandT {
    let mut objects = objects();
    let clone = match objects.get(&(wand as usize)) {
        Some(Object::Magick(source)) => SimWand {
            exception: Exception::default(),
            metrics: Box::new([0.0; METRICS_LEN]),
            ..source.clone()
        },
        _ => return std::ptr::null_mut(),
    };
    std::ptr::without_provenance_mut(insert_handle(&mut objects, Object::Magick(clone)))
}

unsafe extern "C" fn ClearMagickWand(wand: *mut MagickWandT) {
    with_wand(wand, (), |w| *w = SimWand::default());
}

unsafe extern "C" fn MagickGetException(
    wand: *mut MagickWandT,
    severity: *mut ExceptionType,
) -> *mut c_char {
    let exception = with_wand(wand, Exception::default(), |w| w.exception.clone());
    if !severity.is_null() {
        unsafe { *severity = exception.severity };
    }
    alloc_string(&exception.message)
}

unsafe extern "C" fn MagickClearException(wand: *mut MagickWandT) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        w.exception.clear();
        MAGICK_TRUE
    })
}

// ---------------------------------------------------------------------------
// Image collection
// ---------------------------------------------------------------------------

unsafe extern "C" fn MagickNewImage(
    wand: *mut MagickWandT,
    columns: size_t,
    rows: size_t,
    background: *const PixelWandT,
) -> MagickBoolean {
    let color = with_pixel(background, None, |p| Some(p.color.clone()));
    with_wand(wand, MAGICK_FALSE, |w| {
        let Some(color) = color else {
            w.fail(WAND_ERROR, "InvalidPixelWand `simulated'");
            return MAGICK_FALSE;
        };
        if columns == 0 || rows == 0 {
            w.fail(OPTION_ERROR, format!("NegativeOrZeroImageSize `{columns}x{rows}'"));
            return MAGICK_FALSE;
        }
        w.insert(vec![SimImage::new(columns, rows, &color, "", Some(&color))]);
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickReadImage(wand: *mut MagickWandT, filename: *const c_char) -> MagickBoolean {
    let path = unsafe { arg(filename) }.unwrap_or_default();
    with_wand(wand, MAGICK_FALSE, |w| from_bool(w.read(&path, false)))
}

unsafe extern "C" fn MagickPingImage(wand: *mut MagickWandT, filename: *const c_char) -> MagickBoolean {
    let path = unsafe { arg(filename) }.unwrap_or_default();
    with_wand(wand, MAGICK_FALSE, |w| from_bool(w.read(&path, true)))
}

unsafe extern "C" fn MagickReadImageBlob(
    wand: *mut MagickWandT,
    blob: *const c_void,
    length: size_t,
) -> MagickBoolean {
    let bytes = if blob.is_null() || length == 0 {
        None
    } else {
        Some(unsafe { std::slice::from_raw_parts(blob as *const u8, length) }.to_vec())
    };
    with_wand(wand, MAGICK_FALSE, |w| {
        let Some(bytes) = bytes else {
            w.fail(BLOB_ERROR, "ZeroLengthBlobNotPermitted `blob'");
            return MAGICK_FALSE;
        };
        match decode(&String::from_utf8_lossy(&bytes), "blob") {
            Ok(images) => {
                w.insert(images);
                MAGICK_TRUE
            }
            Err((severity, message)) => {
                w.fail(severity, message);
                MAGICK_FALSE
            }
        }
    })
}

unsafe extern "C" fn MagickWriteImage(wand: *mut MagickWandT, filename: *const c_char) -> MagickBoolean {
    let path = unsafe { arg(filename) }.unwrap_or_default();
    with_wand(wand, MAGICK_FALSE, |w| {
        let Some(image) = w.current().cloned() else {
            return MAGICK_FALSE;
        };
        from_bool(w.write(&path, &[image]))
    })
}

unsafe extern "C" fn MagickWriteImages(
    wand: *mut MagickWandT,
    filename: *const c_char,
    adjoin: MagickBoolean,
) -> MagickBoolean {
    let path = unsafe { arg(filename) }.unwrap_or_default();
    with_wand(wand, MAGICK_FALSE, |w| {
        if w.no_images() {
            return MAGICK_FALSE;
        }
        let images = w.images.clone();
        if adjoin != MAGICK_FALSE || images.len() == 1 {
            return from_bool(w.write(&path, &images));
        }
        let target = Path::new(&path);
        let stem = target.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let extension = target.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
        for (scene, image) in images.iter().enumerate() {
            let scene_path = target.with_file_name(format!("{stem}-{scene}{extension}"));
            if !w.write(&scene_path.to_string_lossy(), std::slice::from_ref(image)) {
                return MAGICK_FALSE;
            }
        }
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickGetImageBlob(wand: *mut MagickWandT, length: *mut size_t) -> *mut c_uchar {
    let encoded = with_wand(wand, None, |w| {
        let image = w.current()?.clone();
        if image.pinged {
            w.fail(IMAGE_ERROR, "ImageHasNoPixelData `blob'");
            return None;
        }
        Some(image.encode())
    });
    let (ptr, len) = match encoded {
        Some(text) => alloc_blob(text.as_bytes()),
        None => (std::ptr::null_mut(), 0),
    };
    if !length.is_null() {
        unsafe { *length = len };
    }
    ptr
}

unsafe extern "C" fn MagickAddImage(wand: *mut MagickWandT, add_wand: *const MagickWandT) -> MagickBoolean {
    let mut objects = objects();
    let Some(images) = images_of(&objects, add_wand) else {
        return MAGICK_FALSE;
    };
    match objects.get_mut(&(wand as usize)) {
        Some(Object::Magick(w)) => {
            if images.is_empty() {
                w.fail(WAND_ERROR, "ContainsNoImages `add'");
                return MAGICK_FALSE;
            }
            w.insert(images);
            MAGICK_TRUE
        }
        _ => MAGICK_FALSE,
    }
}

unsafe extern "C" fn MagickRemoveImage(wand: *mut MagickWandT) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        if w.no_images() {
            return MAGICK_FALSE;
        }
        w.images.remove(w.cursor);
        if w.cursor >= w.images.len() {
            w.cursor = w.images.len().saturating_sub(1);
        }
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickCombineImages(wand: *mut MagickWandT, _channel: ChannelType) -> *mut MagickWandT {
    derive(wand, |w| {
        let first = &w.images[0];
        let label = joined_labels(&w.images);
        Some(vec![SimImage::new(first.width, first.height, &first.color, &first.format, Some(&label))])
    })
}

unsafe extern "C" fn MagickMergeImageLayers(
    wand: *mut MagickWandT,
    _method: ImageLayerMethod,
) -> *mut MagickWandT {
    derive(wand, |w| {
        let width = w.images.iter().map(|i| i.width).max().unwrap_or(0);
        let height = w.images.iter().map(|i| i.height).max().unwrap_or(0);
        let label = joined_labels(&w.images);
        Some(vec![SimImage::new(width, height, &w.background, &w.images[0].format, Some(&label))])
    })
}

/// Appends from the current image to the end of the list.
unsafe extern "C" fn MagickAppendImages(wand: *mut MagickWandT, stack: MagickBoolean) -> *mut MagickWandT {
    derive(wand, |w| {
        let from = &w.images[w.cursor..];
        let (width, height) = if stack != MAGICK_FALSE {
            (
                from.iter().map(|i| i.width).max().unwrap_or(0),
                from.iter().map(|i| i.height).sum(),
            )
        } else {
            (
                from.iter().map(|i| i.width).sum(),
                from.iter().map(|i| i.height).max().unwrap_or(0),
            )
        };
        let label = joined_labels(from);
        Some(vec![SimImage::new(width, height, &from[0].color, &from[0].format, Some(&label))])
    })
}

unsafe extern "C" fn MagickGetImage(wand: *mut MagickWandT) -> *mut MagickWandT {
    derive(wand, |w| w.images.get(w.cursor).cloned().map(|image| vec![image]))
}

unsafe extern "C" fn MagickSetImage(wand: *mut MagickWandT, set_wand: *const MagickWandT) -> MagickBoolean {
    let mut objects = objects();
    let Some(images) = images_of(&objects, set_wand) else {
        return MAGICK_FALSE;
    };
    match objects.get_mut(&(wand as usize)) {
        Some(Object::Magick(w)) => {
            if w.no_images() {
                return MAGICK_FALSE;
            }
            if images.is_empty() {
                w.fail(WAND_ERROR, "ContainsNoImages `set'");
                return MAGICK_FALSE;
            }
            let at = w.cursor;
            let added = images.len();
            w.images.splice(at..=at, images);
            w.cursor = at + added - 1;
            MAGICK_TRUE
        }
        _ => MAGICK_FALSE,
    }
}

unsafe extern "C" fn MagickGetImageWidth(wand: *mut MagickWandT) -> size_t {
    with_wand(wand, 0, |w| w.current().map_or(0, |i| i.width))
}

unsafe extern "C" fn MagickGetImageHeight(wand: *mut MagickWandT) -> size_t {
    with_wand(wand, 0, |w| w.current().map_or(0, |i| i.height))
}

unsafe extern "C" fn MagickGetImageFormat(wand: *mut MagickWandT) -> *mut c_char {
    match with_wand(wand, None, |w| w.current().map(|i| i.format.clone())) {
        Some(format) => alloc_string(&format),
        None => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn MagickSetImageFormat(wand: *mut MagickWandT, format: *const c_char) -> MagickBoolean {
    let format = unsafe { arg(format) }.unwrap_or_default().to_ascii_uppercase();
    with_wand(wand, MAGICK_FALSE, |w| {
        if w.no_images() {
            return MAGICK_FALSE;
        }
        if !KNOWN_FORMATS.contains(&format.as_str()) {
            w.fail(MISSING_DELEGATE_ERROR, format!("NoEncodeDelegateForThisImageFormat `{format}'"));
            return MAGICK_FALSE;
        }
        let cursor = w.cursor;
        w.images[cursor].format = format;
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickGetImageProperty(wand: *mut MagickWandT, property: *const c_char) -> *mut c_char {
    let name = unsafe { arg(property) }.unwrap_or_default();
    match with_wand(wand, None, |w| w.current()?.properties.get(&name).cloned()) {
        Some(value) => alloc_string(&value),
        None => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn MagickSetImageProperty(
    wand: *mut MagickWandT,
    property: *const c_char,
    value: *const c_char,
) -> MagickBoolean {
    let name = unsafe { arg(property) }.unwrap_or_default();
    let value = unsafe { arg(value) }.unwrap_or_default();
    with_wand(wand, MAGICK_FALSE, |w| match w.current() {
        Some(image) => {
            image.properties.insert(name, value);
            MAGICK_TRUE
        }
        None => MAGICK_FALSE,
    })
}

// ---------------------------------------------------------------------------
// Iterator
// ---------------------------------------------------------------------------

/// Negative indexes count back from the last image.
unsafe extern "C" fn MagickSetIteratorIndex(wand: *mut MagickWandT, index: ssize_t) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        let count = w.images.len() as isize;
        let position = if index < 0 { count + index } else { index };
        if position < 0 || position >= count {
            return MAGICK_FALSE;
        }
        w.cursor = position as usize;
        w.insert_before = false;
        w.image_pending = false;
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickGetIteratorIndex(wand: *mut MagickWandT) -> ssize_t {
    with_wand(wand, -1, |w| {
        if w.images.is_empty() {
            w.fail(WAND_ERROR, "ContainsNoIterators `simulated'");
            return -1;
        }
        w.cursor as ssize_t
    })
}

unsafe extern "C" fn MagickResetIterator(wand: *mut MagickWandT) {
    with_wand(wand, (), |w| {
        w.cursor = 0;
        w.insert_before = false;
        w.image_pending = true;
    });
}

unsafe extern "C" fn MagickSetFirstIterator(wand: *mut MagickWandT) {
    with_wand(wand, (), |w| {
        w.cursor = 0;
        w.insert_before = true;
        w.image_pending = false;
    });
}

unsafe extern "C" fn MagickSetLastIterator(wand: *mut MagickWandT) {
    with_wand(wand, (), |w| {
        w.cursor = w.images.len().saturating_sub(1);
        w.insert_before = false;
        w.image_pending = false;
    });
}

unsafe extern "C" fn MagickNextImage(wand: *mut MagickWandT) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        if w.no_images() {
            return MAGICK_FALSE;
        }
        w.insert_before = false;
        if w.image_pending {
            w.image_pending = false;
            return MAGICK_TRUE;
        }
        if w.cursor + 1 >= w.images.len() {
            w.image_pending = true;
            return MAGICK_FALSE;
        }
        w.cursor += 1;
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickPreviousImage(wand: *mut MagickWandT) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        if w.no_images() {
            return MAGICK_FALSE;
        }
        if w.image_pending {
            w.image_pending = false;
            return MAGICK_TRUE;
        }
        if w.cursor == 0 {
            w.image_pending = true;
            w.insert_before = true;
            return MAGICK_FALSE;
        }
        w.cursor -= 1;
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickHasNextImage(wand: *mut MagickWandT) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        if w.no_images() {
            return MAGICK_FALSE;
        }
        from_bool(w.cursor + 1 < w.images.len())
    })
}

unsafe extern "C" fn MagickHasPreviousImage(wand: *mut MagickWandT) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        if w.no_images() {
            return MAGICK_FALSE;
        }
        from_bool(w.cursor > 0)
    })
}

unsafe extern "C" fn MagickGetNumberImages(wand: *mut MagickWandT) -> size_t {
    with_wand(wand, 0, |w| w.images.len())
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

unsafe extern "C" fn MagickGetPointsize(wand: *mut MagickWandT) -> f64 {
    with_wand(wand, 0.0, |w| w.pointsize)
}

unsafe extern "C" fn MagickSetPointsize(wand: *mut MagickWandT, pointsize: f64) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        w.pointsize = pointsize;
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickGetGravity(wand: *mut MagickWandT) -> GravityType {
    with_wand(wand, 0, |w| w.gravity)
}

unsafe extern "C" fn MagickSetGravity(wand: *mut MagickWandT, gravity: GravityType) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        if !(0..=9).contains(&gravity) {
            w.fail(OPTION_ERROR, format!("UnrecognizedGravityType `{gravity}'"));
            return MAGICK_FALSE;
        }
        w.gravity = gravity;
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickGetAntialias(wand: *mut MagickWandT) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| from_bool(w.antialias))
}

unsafe extern "C" fn MagickSetAntialias(wand: *mut MagickWandT, antialias: MagickBoolean) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        w.antialias = antialias != MAGICK_FALSE;
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickGetFont(wand: *mut MagickWandT) -> *mut c_char {
    match with_wand(wand, None, |w| w.font.clone()) {
        Some(font) => alloc_string(&font),
        None => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn MagickSetFont(wand: *mut MagickWandT, font: *const c_char) -> MagickBoolean {
    let font = unsafe { arg(font) };
    with_wand(wand, MAGICK_FALSE, |w| {
        w.font = font.filter(|f| !f.is_empty());
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickGetSize(
    wand: *mut MagickWandT,
    columns: *mut size_t,
    rows: *mut size_t,
) -> MagickBoolean {
    let Some((width, height)) = with_wand(wand, None, |w| Some(w.size)) else {
        return MAGICK_FALSE;
    };
    unsafe {
        if !columns.is_null() {
            *columns = width;
        }
        if !rows.is_null() {
            *rows = height;
        }
    }
    MAGICK_TRUE
}

unsafe extern "C" fn MagickSetSize(wand: *mut MagickWandT, columns: size_t, rows: size_t) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        w.size = (columns, rows);
        MAGICK_TRUE
    })
}

unsafe extern "C" fn MagickGetBackgroundColor(wand: *mut MagickWandT) -> *mut PixelWandT {
    let mut objects = objects();
    let color = match objects.get(&(wand as usize)) {
        Some(Object::Magick(w)) => w.background.clone(),
        _ => return std::ptr::null_mut(),
    };
    let pixel = SimPixel {
        color,
        exception: Exception::default(),
    };
    std::ptr::without_provenance_mut(insert_handle(&mut objects, Object::Pixel(pixel)))
}

unsafe extern "C" fn MagickSetBackgroundColor(
    wand: *mut MagickWandT,
    background: *const PixelWandT,
) -> MagickBoolean {
    let color = with_pixel(background, None, |p| Some(p.color.clone()));
    with_wand(wand, MAGICK_FALSE, |w| match color {
        Some(color) => {
            w.background = color;
            MAGICK_TRUE
        }
        None => {
            w.fail(WAND_ERROR, "InvalidPixelWand `simulated'");
            MAGICK_FALSE
        }
    })
}

unsafe extern "C" fn MagickGetPage(
    wand: *mut MagickWandT,
    width: *mut size_t,
    height: *mut size_t,
    x: *mut ssize_t,
    y: *mut ssize_t,
) -> MagickBoolean {
    let Some(page) = with_wand(wand, None, |w| Some(w.page)) else {
        return MAGICK_FALSE;
    };
    unsafe {
        if !width.is_null() {
            *width = page.0;
        }
        if !height.is_null() {
            *height = page.1;
        }
        if !x.is_null() {
            *x = page.2;
        }
        if !y.is_null() {
            *y = page.3;
        }
    }
    MAGICK_TRUE
}

unsafe extern "C" fn MagickSetPage(
    wand: *mut MagickWandT,
    width: size_t,
    height: size_t,
    x: ssize_t,
    y: ssize_t,
) -> MagickBoolean {
    with_wand(wand, MAGICK_FALSE, |w| {
        w.page = (width, height, x, y);
        MAGICK_TRUE
    })
}

// ---------------------------------------------------------------------------
// Text metrics
// ---------------------------------------------------------------------------

unsafe fn query_metrics(
    wand: *mut MagickWandT,
    drawing: *const DrawingWandT,
    text: *const c_char,
    multiline: bool,
) -> *mut f64 {
    let text = unsafe { arg(text) }.unwrap_or_default();
    let pointsize = with_drawing(drawing, None, |d| Some(d.font_size));
    with_wand(wand, std::ptr::null_mut(), |w| {
        let Some(pointsize) = pointsize else {
            w.fail(WAND_ERROR, "InvalidDrawingWand `simulated'");
            return std::ptr::null_mut();
        };
        if w.no_images() {
            return std::ptr::null_mut();
        }
        w.compute_metrics(pointsize, &text, multiline)
    })
}

unsafe extern "C" fn MagickQueryFontMetrics(
    wand: *mut MagickWandT,
    drawing: *const DrawingWandT,
    text: *const c_char,
) -> *mut f64 {
    unsafe { query_metrics(wand, drawing, text, false) }
}

unsafe extern "C" fn MagickQueryMultilineFontMetrics(
    wand: *mut MagickWandT,
    drawing: *const DrawingWandT,
    text: *const c_char,
) -> *mut f64 {
    unsafe { query_metrics(wand, drawing, text, true) }
}

// ---------------------------------------------------------------------------
// Pixel wand
// ---------------------------------------------------------------------------

unsafe extern "C" fn NewPixelWand() -> *mut PixelWandT {
    let pixel = SimPixel {
        color: "black".to_string(),
        exception: Exception::default(),
    };
    std::ptr::without_provenance_mut(new_handle(Object::Pixel(pixel)))
}

unsafe extern "C" fn DestroyPixelWand(wand: *mut PixelWandT) -> *mut PixelWandT {
    destroy(wand as usize);
    std::ptr::null_mut()
}

unsafe extern "C" fn ClonePixelWand(wand: *const PixelWandT) -> *mut PixelWandT {
    let mut objects = objects();
    let clone = match objects.get(&(wand as usize)) {
        Some(Object::Pixel(pixel)) => SimPixel {
            color: pixel.color.clone(),
            exception: Exception::default(),
        },
        _ => return std::ptr::null_mut(),
    };
    std::ptr::without_provenance_mut(insert_handle(&mut objects, Object::Pixel(clone)))
}

unsafe extern "C" fn PixelSetColor(wand: *mut PixelWandT, color: *const c_char) -> MagickBoolean {
    let color = unsafe { arg(color) }.unwrap_or_default();
    with_pixel(wand, MAGICK_FALSE, |p| {
        if !is_color(&color) {
            p.exception.set(OPTION_ERROR, format!("UnrecognizedColor `{color}'"));
            return MAGICK_FALSE;
        }
        p.color = color;
        MAGICK_TRUE
    })
}

unsafe extern "C" fn PixelGetColorAsString(wand: *mut PixelWandT) -> *mut c_char {
    match with_pixel(wand, None, |p| Some(p.color.clone())) {
        Some(color) => alloc_string(&color),
        None => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn PixelGetException(wand: *mut PixelWandT, severity: *mut ExceptionType) -> *mut c_char {
    let exception = with_pixel(wand, Exception::default(), |p| p.exception.clone());
    if !severity.is_null() {
        unsafe { *severity = exception.severity };
    }
    alloc_string(&exception.message)
}

unsafe extern "C" fn PixelClearException(wand: *mut PixelWandT) -> MagickBoolean {
    with_pixel(wand, MAGICK_FALSE, |p| {
        p.exception.clear();
        MAGICK_TRUE
    })
}

// ---------------------------------------------------------------------------
// Drawing wand
// ---------------------------------------------------------------------------

unsafe extern "C" fn NewDrawingWand() -> *mut DrawingWandT {
    let drawing = SimDrawing {
        font_size: 12.0,
        exception: Exception::default(),
    };
    std::ptr::without_provenance_mut(new_handle(Object::Drawing(drawing)))
}

unsafe extern "C" fn DestroyDrawingWand(wand: *mut DrawingWandT) -> *mut DrawingWandT {
    destroy(wand as usize);
    std::ptr::null_mut()
}

unsafe extern "C" fn DrawSetFont(wand: *mut DrawingWandT, font_name: *const c_char) -> MagickBoolean {
    let font = unsafe { arg(font_name) }.unwrap_or_default();
    with_drawing(wand, MAGICK_FALSE, |d| {
        if font.is_empty() {
            d.exception.set(DRAW_ERROR, "UnableToReadFont `'".to_string());
            return MAGICK_FALSE;
        }
        MAGICK_TRUE
    })
}

unsafe extern "C" fn DrawSetFontSize(wand: *mut DrawingWandT, pointsize: f64) {
    with_drawing(wand, (), |d| d.font_size = pointsize);
}

unsafe extern "C" fn DrawGetException(wand: *mut DrawingWandT, severity: *mut ExceptionType) -> *mut c_char {
    let exception = with_drawing(wand, Exception::default(), |d| d.exception.clone());
    if !severity.is_null() {
        unsafe { *severity = exception.severity };
    }
    alloc_string(&exception.message)
}

unsafe extern "C" fn DrawClearException(wand: *mut DrawingWandT) -> MagickBoolean {
    with_drawing(wand, MAGICK_FALSE, |d| {
        d.exception.clear();
        MAGICK_TRUE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relinquish_unknown_pointer_is_stray() {
        let before = counters();
        let mut local = 0u8;
        unsafe { MagickRelinquishMemory(&mut local as *mut u8 as *mut c_void) };
        let after = counters();
        assert_eq!(after.stray_releases - before.stray_releases, 1);
        assert_eq!(after.relinquished, before.relinquished);
    }

    #[test]
    fn test_handles_are_never_reused() {
        let first = unsafe { NewMagickWand() };
        unsafe { DestroyMagickWand(first) };
        let second = unsafe { NewMagickWand() };
        assert_ne!(first, second);
        assert!(!is_live(first as usize));
        unsafe { DestroyMagickWand(second) };
    }

    #[test]
    fn test_decode_frames() {
        let images = decode("2x3 red a b c\n\n4x5 #00ff00\n", "test").unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].label(), "a b c");
        assert_eq!((images[1].width, images[1].height), (4, 5));
        assert_eq!(decode("0x3 red", "test").unwrap_err().0, CORRUPT_IMAGE_ERROR);
        assert_eq!(decode("", "test").unwrap_err().0, CORRUPT_IMAGE_ERROR);
    }

    #[test]
    fn test_insert_mid_list_keeps_cursor() {
        let mut wand = SimWand::with_images(vec![
            SimImage::new(1, 1, "red", "XC", Some("a")),
            SimImage::new(1, 1, "red", "XC", Some("b")),
        ]);
        wand.cursor = 0;
        wand.insert(vec![SimImage::new(1, 1, "red", "XC", Some("new"))]);
        let labels: Vec<_> = wand.images.iter().map(SimImage::label).collect();
        assert_eq!(labels, ["a", "new", "b"]);
        assert_eq!(wand.cursor, 0);
    }
}
