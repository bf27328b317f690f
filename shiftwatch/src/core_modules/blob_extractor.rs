// THEORY:
// The `BlobExtractor` is the engine of the spatial layer. It takes the raw
// foreground mask from the background model and produces the list of worker
// candidates for one frame.
//
// Steps:
// 1.  **Noise Cleanup**: Opening first (drops isolated speckles), closing second
//     (fills pinholes inside real silhouettes).
// 2.  **Outer Regions**: External contours only; anything nested inside a hole
//     of a bigger region belongs to that region.
// 3.  **Size Filter**: Regions whose contour area is at most `min_area` are
//     discarded as noise or distant clutter.
// 4.  **Activity**: Motion density is the foreground share of the bounding
//     box. A blob is active when that share is strictly above the cutoff.
// 5.  **Stateless Utility**: No memory of previous frames. Slot ids come from
//     the discovery rank in this frame, counting discarded regions too.

use crate::config::DetectionConfig;
use crate::core_modules::blob::{Blob, BoundingBox, slot_id};
use crate::core_modules::contours::contours::find_external_contours;
use crate::core_modules::morphology::{StructuringElement, close, open};
use image::GrayImage;

pub struct BlobExtractor {
    element: StructuringElement,
    min_area: f64,
    /// Density above which a blob is active, already divided by 100.
    motion_cutoff: f64,
}

impl BlobExtractor {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            element: StructuringElement::ellipse(config.kernel_size),
            min_area: config.min_area,
            motion_cutoff: config.motion_threshold / 100.0,
        }
    }

    /// Cleans `mask` and extracts every blob that passes the area filter.
    pub fn extract(&self, mask: &GrayImage) -> Vec<Blob> {
        let cleaned = self.clean(mask);
        self.extract_cleaned(&cleaned)
    }

    /// Opening followed by closing.
    pub fn clean(&self, mask: &GrayImage) -> GrayImage {
        close(&open(mask, &self.element), &self.element)
    }

    /// Extraction on a mask that has already been cleaned.
    pub fn extract_cleaned(&self, cleaned: &GrayImage) -> Vec<Blob> {
        let mut blobs = Vec::new();
        for (index, contour) in find_external_contours(cleaned).iter().enumerate() {
            let area = contour.area();
            if area <= self.min_area {
                continue;
            }

            let bbox = contour.bounding_box();
            let motion_density = motion_density(cleaned, &bbox);
            blobs.push(Blob {
                slot_id: slot_id(index),
                bbox,
                area,
                motion_density,
                is_active: self.is_active(motion_density),
            });
        }

        log::trace!("extracted {} blobs", blobs.len());
        blobs
    }

    /// Strict comparison: a density equal to the cutoff is idle.
    pub fn is_active(&self, motion_density: f64) -> bool {
        motion_density > self.motion_cutoff
    }
}

/// Share of foreground pixels inside `bbox`. Zero-sized boxes give `0.0`.
pub fn motion_density(mask: &GrayImage, bbox: &BoundingBox) -> f64 {
    let box_area = bbox.area();
    if box_area == 0 {
        return 0.0;
    }

    let (width, height) = mask.dimensions();
    let x_end = (bbox.x + bbox.width).min(width);
    let y_end = (bbox.y + bbox.height).min(height);
    let mut lit = 0u64;
    for y in bbox.y..y_end {
        for x in bbox.x..x_end {
            if mask.get_pixel(x, y)[0] > 0 {
                lit += 1;
            }
        }
    }
    lit as f64 / box_area as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::collections::HashSet;

    fn paint_rect(mask: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    fn paint_ring(mask: &mut GrayImage, x0: u32, y0: u32, size: u32, thickness: u32) {
        paint_rect(mask, x0, y0, size, thickness);
        paint_rect(mask, x0, y0 + size - thickness, size, thickness);
        paint_rect(mask, x0, y0, thickness, size);
        paint_rect(mask, x0 + size - thickness, y0, thickness, size);
    }

    fn extractor() -> BlobExtractor {
        BlobExtractor::new(&DetectionConfig::default())
    }

    #[test]
    fn solid_silhouette_is_active() {
        let mut mask = GrayImage::new(120, 120);
        paint_rect(&mut mask, 20, 30, 40, 40);

        let blobs = extractor().extract(&mask);
        assert_eq!(blobs.len(), 1);
        let blob = &blobs[0];
        assert!(blob.area > 1000.0);
        assert_eq!(blob.bbox, BoundingBox { x: 20, y: 30, width: 40, height: 40 });
        assert!(blob.motion_density > 0.99);
        assert!(blob.is_active);
        assert!(blob.slot_id.starts_with("worker_"));
    }

    #[test]
    fn small_regions_and_speckles_are_dropped() {
        let mut mask = GrayImage::new(120, 120);
        paint_rect(&mut mask, 10, 10, 30, 30);
        mask.put_pixel(100, 100, Luma([255]));
        mask.put_pixel(101, 5, Luma([255]));

        assert!(extractor().extract(&mask).is_empty());
    }

    #[test]
    fn area_filter_is_strict() {
        // A 41x26 block traces to a 40x25 polygon: area exactly 1000.
        let mut mask = GrayImage::new(80, 60);
        paint_rect(&mut mask, 5, 5, 41, 26);
        assert!(extractor().extract_cleaned(&mask).is_empty());

        let mut mask = GrayImage::new(80, 60);
        paint_rect(&mut mask, 5, 5, 41, 27);
        let blobs = extractor().extract_cleaned(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 1040.0);
    }

    #[test]
    fn sparse_outline_is_idle() {
        let mut mask = GrayImage::new(140, 140);
        paint_ring(&mut mask, 20, 20, 100, 5);

        let blobs = extractor().extract(&mask);
        assert_eq!(blobs.len(), 1);
        assert!(blobs[0].motion_density < 0.25);
        assert!(!blobs[0].is_active);
    }

    #[test]
    fn cutoff_equality_is_idle() {
        let extractor = extractor();
        assert!(!extractor.is_active(0.25));
        assert!(extractor.is_active(0.250_001));
        assert!(!extractor.is_active(0.0));

        let custom = BlobExtractor::new(&DetectionConfig {
            motion_threshold: 15.0,
            ..DetectionConfig::default()
        });
        assert!(custom.is_active(0.2));
    }

    #[test]
    fn density_counts_every_lit_pixel_in_the_box() {
        let mut mask = GrayImage::new(10, 10);
        paint_rect(&mut mask, 0, 0, 2, 4);
        let bbox = BoundingBox { x: 0, y: 0, width: 4, height: 4 };
        assert_eq!(motion_density(&mask, &bbox), 0.5);

        let empty = BoundingBox { x: 0, y: 0, width: 0, height: 3 };
        assert_eq!(motion_density(&mask, &empty), 0.0);
    }

    #[test]
    fn slot_ids_are_unique_within_a_frame() {
        let mut mask = GrayImage::new(200, 200);
        paint_rect(&mut mask, 10, 10, 40, 40);
        paint_rect(&mut mask, 120, 20, 45, 50);
        paint_rect(&mut mask, 60, 130, 50, 45);

        let blobs = extractor().extract(&mask);
        assert_eq!(blobs.len(), 3);
        let ids: HashSet<&str> = blobs.iter().map(|b| b.slot_id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }
}
