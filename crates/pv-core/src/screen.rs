//! Layout of the slide inside the viewer work space

use serde::{Deserialize, Serialize};

/// Dimensions of the work space and the slide placed in it.
///
/// `slide_size` is the fraction of the largest 4:3 rectangle that fits the
/// work space; `slide_horizontal` / `slide_vertical` position the slide in
/// the remaining white space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfiguration {
    pub aspect_ratio: f64,
    pub slide_size: f64,
    pub slide_horizontal: f64,
    pub slide_vertical: f64,
}

impl Default for ScreenConfiguration {
    fn default() -> Self {
        Self {
            aspect_ratio: 1.33333,
            slide_size: 1.0,
            slide_horizontal: 0.5,
            slide_vertical: 0.5,
        }
    }
}

impl ScreenConfiguration {
    /// Default layout with the slide scaled by `slide_size`
    pub fn with_slide_size(slide_size: f64) -> Self {
        Self {
            slide_size,
            ..Self::default()
        }
    }
}
