//! Safe ownership layer over the MagickWand C API.
//!
//! This crate wraps the native `MagickWand`, `PixelWand` and `DrawingWand`
//! handles in owned Rust values, turns the native exception slot into
//! `Result` errors, and keeps a per-image mirror of each wand's image list in
//! step with the native list.
//!
//! # Native Libraries
//!
//! All native calls go through a [`WandLibrary`] function table:
//!
//! - `magick` feature: `native::magick()`, the linked ImageMagick 6 library
//! - `simulated` feature: `native::simulated::library()`, an in-process
//!   implementation of the same ABI for tests
//!
//! # Thread Safety
//!
//! [`Wand`], [`PixelWand`] and [`DrawingWand`] are `Send` but NOT `Sync`.
//! A native handle carries an unsynchronized cursor and exception slot, so
//! each value must be used from one thread at a time. Distinct values are
//! independent.
//!
//! # Memory Management
//!
//! - Every handle is destroyed exactly once, on [`Wand::dispose`] or drop
//! - Strings and blobs returned by the library are copied and relinquished
//! - Strings passed to the library live exactly as long as the call
//! - [`Image`] values borrow their wand and own nothing

#![allow(clippy::missing_safety_doc)]

mod attributes;
mod drawing;
mod error;
mod handle;
mod image;
mod io;
mod iterator;
mod lifecycle;
mod metrics;
pub mod native;
mod pixel;
mod sequence;
pub mod string;
pub mod types;
mod wand;

pub use drawing::DrawingWand;
pub use error::{ExceptionKind, NativeException, Result, Severity, WandError};
pub use handle::{DrawingKind, Handle, HandleKind, MagickKind, PixelKind};
pub use image::Image;
pub use metrics::{FontMetrics, METRICS_LEN, MetricField, MetricsLayout};
pub use native::{WandLibrary, version};
pub use pixel::PixelWand;
pub use string::NativeString;
pub use wand::Wand;
