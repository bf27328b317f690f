// THEORY:
// Debug overlay writer. Every `stride`-th processed frame is copied, each blob
// gets a box (green when active, red when idle), and the result is written as
// a PNG. The observer only reads blob data; nothing flows back into the
// pipeline.

use image::{Rgb, RgbImage};
use shiftwatch::{BoundingBox, FrameAnalysis, FrameObserver};
use std::path::PathBuf;

const ACTIVE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const IDLE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: u32 = 2;

pub struct AnnotatedFrameWriter {
    dir: PathBuf,
    stride: u64,
    written: u64,
}

impl AnnotatedFrameWriter {
    pub fn create(dir: impl Into<PathBuf>, stride: u64) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            stride: stride.max(1),
            written: 0,
        })
    }
}

impl FrameObserver for AnnotatedFrameWriter {
    fn on_frame(&mut self, frame: &RgbImage, analysis: &FrameAnalysis, _elapsed_secs: f64) -> shiftwatch::Result<()> {
        if analysis.frame_index.saturating_sub(1) % self.stride != 0 {
            return Ok(());
        }

        let mut canvas = frame.clone();
        for blob in &analysis.blobs {
            let color = if blob.is_active { ACTIVE_COLOR } else { IDLE_COLOR };
            draw_box(&mut canvas, &blob.bbox, color);
        }

        let path = self.dir.join(format!("frame_{:06}.png", analysis.frame_index));
        canvas.save(&path)?;
        self.written += 1;
        log::debug!("annotated frame #{} written to {}", self.written, path.display());
        Ok(())
    }
}

/// Draws a hollow rectangle inside `bbox`, clipped to the image.
fn draw_box(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let x_end = (bbox.x + bbox.width).min(width);
    let y_end = (bbox.y + bbox.height).min(height);

    for y in bbox.y..y_end {
        for x in bbox.x..x_end {
            let on_edge = x < bbox.x + BOX_THICKNESS
                || y < bbox.y + BOX_THICKNESS
                || x + BOX_THICKNESS >= bbox.x + bbox.width
                || y + BOX_THICKNESS >= bbox.y + bbox.height;
            if on_edge {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiftwatch::Blob;

    fn blob(is_active: bool, bbox: BoundingBox) -> Blob {
        Blob {
            slot_id: "worker_0".to_string(),
            bbox,
            area: 400.0,
            motion_density: if is_active { 0.9 } else { 0.1 },
            is_active,
        }
    }

    #[test]
    fn box_outline_leaves_interior_untouched() {
        let mut canvas = RgbImage::new(20, 20);
        draw_box(&mut canvas, &BoundingBox { x: 2, y: 2, width: 10, height: 10 }, ACTIVE_COLOR);

        assert_eq!(*canvas.get_pixel(2, 2), ACTIVE_COLOR);
        assert_eq!(*canvas.get_pixel(11, 11), ACTIVE_COLOR);
        assert_eq!(*canvas.get_pixel(6, 6), Rgb([0, 0, 0]));
        assert_eq!(*canvas.get_pixel(12, 12), Rgb([0, 0, 0]));
    }

    #[test]
    fn box_is_clipped_to_the_image() {
        let mut canvas = RgbImage::new(10, 10);
        draw_box(&mut canvas, &BoundingBox { x: 5, y: 5, width: 20, height: 20 }, IDLE_COLOR);
        assert_eq!(*canvas.get_pixel(5, 9), IDLE_COLOR);
    }

    #[test]
    fn writes_every_stride_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = AnnotatedFrameWriter::create(dir.path().join("overlay"), 2).unwrap();
        let frame = RgbImage::new(32, 32);

        for frame_index in 1..=4 {
            let analysis = FrameAnalysis {
                frame_index,
                timestamp: frame_index as f64,
                blobs: vec![blob(frame_index == 1, BoundingBox { x: 4, y: 4, width: 12, height: 12 })],
            };
            writer.on_frame(&frame, &analysis, 0.0).unwrap();
        }

        assert_eq!(writer.written, 2);
        let first = image::open(dir.path().join("overlay/frame_000001.png")).unwrap().into_rgb8();
        assert_eq!(*first.get_pixel(4, 4), ACTIVE_COLOR);
        let third = image::open(dir.path().join("overlay/frame_000003.png")).unwrap().into_rgb8();
        assert_eq!(*third.get_pixel(4, 4), IDLE_COLOR);
        assert!(!dir.path().join("overlay/frame_000002.png").exists());
    }
}
