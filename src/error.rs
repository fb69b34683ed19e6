//! Error handling for the wand layer.
//!
//! Native MagickWand calls report failures through a per-handle exception
//! slot holding a severity code and a message. This module models those
//! codes and the Rust error type they are turned into.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Crate result type.
pub type Result<T, E = WandError> = std::result::Result<T, E>;

/// Native exception severity (`ExceptionType`).
///
/// Codes 300-399 are warnings, 400-699 errors and 700+ fatal errors.
/// Everything from 400 up is treated as a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Severity(pub i32);

impl Severity {
    pub const UNDEFINED: Severity = Severity(0);
    pub const WARNING: Severity = Severity(300);
    pub const ERROR: Severity = Severity(400);
    pub const FATAL: Severity = Severity(700);

    /// Whether this severity fails the operation that produced it.
    pub fn is_fatal(self) -> bool {
        self >= Self::ERROR
    }

    pub fn is_warning(self) -> bool {
        self >= Self::WARNING && self < Self::ERROR
    }

    /// The named exception kind, if the code is one the library defines.
    pub fn kind(self) -> Option<ExceptionKind> {
        ExceptionKind::try_from(self.0).ok()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{kind:?} ({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<ExceptionKind> for Severity {
    fn from(kind: ExceptionKind) -> Self {
        Severity(kind.into())
    }
}

/// Exception codes defined by MagickWand.
///
/// These codes are stable and match the native `ExceptionType` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum ExceptionKind {
    /// No exception
    Undefined = 0,

    // Warnings (300-399)
    ResourceLimitWarning = 300,
    TypeWarning = 305,
    OptionWarning = 310,
    DelegateWarning = 315,
    MissingDelegateWarning = 320,
    CorruptImageWarning = 325,
    FileOpenWarning = 330,
    BlobWarning = 335,
    StreamWarning = 340,
    CacheWarning = 345,
    CoderWarning = 350,
    FilterWarning = 352,
    ModuleWarning = 355,
    DrawWarning = 360,
    ImageWarning = 365,
    WandWarning = 370,
    RandomWarning = 375,
    XServerWarning = 380,
    MonitorWarning = 385,
    RegistryWarning = 390,
    ConfigureWarning = 395,
    PolicyWarning = 399,

    // Errors (400-499)
    ResourceLimitError = 400,
    TypeError = 405,
    OptionError = 410,
    DelegateError = 415,
    MissingDelegateError = 420,
    CorruptImageError = 425,
    FileOpenError = 430,
    BlobError = 435,
    StreamError = 440,
    CacheError = 445,
    CoderError = 450,
    FilterError = 452,
    ModuleError = 455,
    DrawError = 460,
    ImageError = 465,
    WandError = 470,
    RandomError = 475,
    XServerError = 480,
    MonitorError = 485,
    RegistryError = 490,
    ConfigureError = 495,
    PolicyError = 499,

    // Fatal errors (700-799)
    ResourceLimitFatalError = 700,
    TypeFatalError = 705,
    OptionFatalError = 710,
    DelegateFatalError = 715,
    MissingDelegateFatalError = 720,
    CorruptImageFatalError = 725,
    FileOpenFatalError = 730,
    BlobFatalError = 735,
    StreamFatalError = 740,
    CacheFatalError = 745,
    CoderFatalError = 750,
    FilterFatalError = 752,
    ModuleFatalError = 755,
    DrawFatalError = 760,
    ImageFatalError = 765,
    WandFatalError = 770,
    RandomFatalError = 775,
    XServerFatalError = 780,
    MonitorFatalError = 785,
    RegistryFatalError = 790,
    ConfigureFatalError = 795,
    PolicyFatalError = 799,
}

/// Exception state copied out of a native handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeException {
    pub severity: Severity,
    pub message: String,
}

/// Errors produced by the wand layer.
#[derive(Debug, Error)]
pub enum WandError {
    /// The native allocator returned a null handle.
    #[error("error acquiring {what}")]
    Acquisition { what: &'static str },

    /// The native call recorded a fatal exception.
    #[error("{message} (severity {severity})")]
    Operation { severity: Severity, message: String },

    /// The native call reported failure without recording an exception.
    #[error("{operation} failed")]
    Failed { operation: &'static str },

    /// The native call returned null where a value was expected.
    #[error("{operation} returned no result")]
    NullResult { operation: &'static str },

    /// The iterator position does not name an image in the wand.
    #[error("image index {index} out of range for {count} image(s)")]
    IndexOutOfRange { index: isize, count: usize },

    /// A handle created by one library table was passed to another.
    #[error("handle from {found} passed to {expected}")]
    LibraryMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A string argument contains an interior NUL byte.
    #[error("string argument contains an interior NUL byte")]
    InteriorNul(#[from] std::ffi::NulError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WandError {
    /// Severity carried by an operation failure.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            WandError::Operation { severity, .. } => Some(*severity),
            _ => None,
        }
    }
}

impl From<NativeException> for WandError {
    fn from(e: NativeException) -> Self {
        WandError::Operation {
            severity: e.severity,
            message: e.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classes() {
        assert!(!Severity::UNDEFINED.is_fatal());
        assert!(Severity(310).is_warning());
        assert!(!Severity(310).is_fatal());
        assert!(Severity(400).is_fatal());
        assert!(Severity(435).is_fatal());
        assert!(Severity(799).is_fatal());
        assert!(!Severity(435).is_warning());
    }

    #[test]
    fn test_severity_kind_lookup() {
        assert_eq!(Severity(435).kind(), Some(ExceptionKind::BlobError));
        assert_eq!(Severity(470).kind(), Some(ExceptionKind::WandError));
        assert_eq!(Severity(401).kind(), None);
        assert_eq!(Severity::from(ExceptionKind::OptionWarning), Severity(310));
    }

    #[test]
    fn test_operation_error_display() {
        let err = WandError::from(NativeException {
            severity: Severity(435),
            message: "unable to open image `missing.png'".to_string(),
        });
        let text = err.to_string();
        assert!(text.contains("unable to open image"));
        assert!(text.contains("BlobError (435)"));
        assert_eq!(err.severity(), Some(Severity(435)));
    }
}
