// THEORY:
// A `Blob` is one connected foreground region that survived area filtering in a
// single frame. Like the rest of the per-frame data it is a "dumb" container:
// it knows its shape and how busy it looks, nothing about previous frames.
//
// Identity is weak on purpose: `slot_id` is derived from the region's rank in
// that frame's extraction order. The same person can get a different slot id
// on the next frame if the extraction order changes. Consumers that key state
// by `slot_id` inherit that limitation.

use serde::Serialize;

/// Axis-aligned bounding box in pixel coordinates. `width` and `height` are
/// always at least 1 for a box produced by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Builds the box spanning two inclusive corner points.
    pub fn from_corners(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A candidate worker silhouette for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blob {
    /// `"worker_<i>"`, where `i` is the rank in this frame's discovery order. Not persistent.
    pub slot_id: String,
    pub bbox: BoundingBox,
    /// Area enclosed by the region's outer contour, in pixels.
    pub area: f64,
    /// Fraction of the bounding box covered by foreground, in `[0, 1]`.
    pub motion_density: f64,
    pub is_active: bool,
}

/// Slot id for the `index`-th region discovered in a frame.
pub fn slot_id(index: usize) -> String {
    format!("worker_{index}")
}
