//! Value types exchanged with the native library.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Text and composition gravity (`GravityType`).
///
/// The native `UndefinedGravity` (0) has no variant; getters report it as
/// `None`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum Gravity {
    NorthWest = 1,
    North = 2,
    NorthEast = 3,
    West = 4,
    Center = 5,
    East = 6,
    SouthWest = 7,
    South = 8,
    SouthEast = 9,
}

/// Layer composition method (`ImageLayerMethod`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum LayerMethod {
    Undefined = 0,
    Coalesce = 1,
    CompareAny = 2,
    CompareClear = 3,
    CompareOverlay = 4,
    Dispose = 5,
    Optimize = 6,
    OptimizeImage = 7,
    OptimizePlus = 8,
    OptimizeTrans = 9,
    RemoveDups = 10,
    RemoveZero = 11,
    Composite = 12,
    Merge = 13,
    Flatten = 14,
    Mosaic = 15,
    TrimBounds = 16,
}

bitflags! {
    /// Channel selection (`ChannelType`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelType: i32 {
        const RED = 0x0001;
        const GREEN = 0x0002;
        const BLUE = 0x0004;
        const OPACITY = 0x0008;
        const INDEX = 0x0020;
        const TRUE_ALPHA = 0x0040;
        const RGB = 0x0080;
        const SYNC = 0x0100;
        const COMPOSITE = 0x002f;
        const ALL = 0x07ff_ffff;
        const DEFAULT = (Self::ALL.bits() | Self::SYNC.bits()) & !Self::OPACITY.bits();
    }
}

impl ChannelType {
    pub const GRAY: ChannelType = ChannelType::RED;
    pub const CYAN: ChannelType = ChannelType::RED;
    pub const MAGENTA: ChannelType = ChannelType::GREEN;
    pub const YELLOW: ChannelType = ChannelType::BLUE;
    pub const BLACK: ChannelType = ChannelType::INDEX;
}

/// Canvas size in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// Page geometry: canvas size plus offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: usize,
    pub height: usize,
    pub x: isize,
    pub y: isize,
}

impl PageGeometry {
    pub fn new(width: usize, height: usize, x: isize, y: isize) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }
}
