//! Viewer configuration.

use crate::enums::Space;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scale applied to the largest physical extent of the volume when sizing
/// the absolute-space cube, leaving room for any viewing plane.
pub const DEFAULT_CUBE_SCALE: f64 = 1.5;

/// Centre-line overlay drawn in absolute space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Crosshair {
    pub color: [u8; 3],
    /// Blend factor toward `color`, in `[0, 1]`.
    pub opacity: f32,
}

impl Default for Crosshair {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ViewerConfig {
    /// Absolute-space cube edge relative to the largest physical extent.
    pub cube_scale: f64,
    /// `None` disables the overlay.
    pub crosshair: Option<Crosshair>,
    /// Space a new view starts in.
    pub default_space: Space,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            cube_scale: DEFAULT_CUBE_SCALE,
            crosshair: Some(Crosshair::default()),
            default_space: Space::Absolute,
        }
    }
}

impl ViewerConfig {
    pub fn with_space(mut self, space: Space) -> Self {
        self.default_space = space;
        self
    }

    pub fn without_crosshair(mut self) -> Self {
        self.crosshair = None;
        self
    }
}
