//! Frame ingestion sources.
//!
//! The monitor core never decodes video itself. A driving loop pulls frames
//! from a [`FrameSource`] and pushes them through a pipeline. This module
//! defines that seam plus one file-backed implementation, [`ImageSequenceSource`],
//! which replays a directory of still images in file-name order.
//!
//! Source contract:
//! - `open()` failing is a startup failure; no session runs.
//! - `read()` returning [`FrameRead::Skipped`] is transient; the caller reads again.
//! - `read()` returning [`FrameRead::EndOfStream`] lets the caller `rewind()`
//!   and keep going (infinite replay of file-backed sources).

use crate::error::{MonitorError, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Outcome of a single read.
#[derive(Debug)]
pub enum FrameRead {
    Frame(RgbImage),
    /// This frame could not be read, but the stream continues.
    Skipped,
    EndOfStream,
}

pub trait FrameSource {
    /// Human-readable name for logs and reports.
    fn name(&self) -> String;

    fn open(&mut self) -> Result<()>;

    fn read(&mut self) -> Result<FrameRead>;

    /// Restart from the first frame.
    fn rewind(&mut self) -> Result<()>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn read(&mut self) -> Result<FrameRead> {
        (**self).read()
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }
}

/// Replays the still images of one directory, sorted by file name.
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    frames_decoded: u64,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            cursor: 0,
            frames_decoded: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    fn open_error(&self, reason: impl Into<String>) -> MonitorError {
        MonitorError::SourceOpen {
            source_name: self.name(),
            reason: reason.into(),
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn name(&self) -> String {
        self.dir.display().to_string()
    }

    fn open(&mut self) -> Result<()> {
        if !self.dir.is_dir() {
            return Err(self.open_error("not a directory"));
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| self.open_error(e.to_string()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| self.open_error(e.to_string()))?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(self.open_error("no image files found"));
        }
        log::info!("ImageSequenceSource: {} frames in {}", files.len(), self.dir.display());
        self.files = files;
        self.cursor = 0;
        Ok(())
    }

    fn read(&mut self) -> Result<FrameRead> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(FrameRead::EndOfStream);
        };
        self.cursor += 1;

        match image::open(path) {
            Ok(img) => {
                self.frames_decoded += 1;
                Ok(FrameRead::Frame(img.into_rgb8()))
            }
            Err(e) => {
                log::warn!("skipping unreadable frame {}: {e}", path.display());
                Ok(FrameRead::Skipped)
            }
        }
    }

    fn rewind(&mut self) -> Result<()> {
        log::debug!("ImageSequenceSource: rewinding {}", self.dir.display());
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_frame(dir: &Path, name: &str, value: u8) {
        RgbImage::from_pixel(8, 6, Rgb([value, value, value]))
            .save(dir.join(name))
            .unwrap();
    }

    fn frame_value(read: FrameRead) -> u8 {
        match read {
            FrameRead::Frame(img) => img.get_pixel(0, 0)[0],
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn missing_directory_fails_to_open() {
        let mut source = ImageSequenceSource::new("/definitely/not/here");
        assert!(matches!(source.open(), Err(MonitorError::SourceOpen { .. })));
    }

    #[test]
    fn directory_without_images_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        let mut source = ImageSequenceSource::new(dir.path());
        assert!(source.open().is_err());
    }

    #[test]
    fn frames_replay_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "frame_002.png", 20);
        write_frame(dir.path(), "frame_001.png", 10);
        std::fs::write(dir.path().join("README"), "ignored").unwrap();

        let mut source = ImageSequenceSource::new(dir.path());
        source.open().unwrap();
        assert_eq!(source.len(), 2);

        assert_eq!(frame_value(source.read().unwrap()), 10);
        assert_eq!(frame_value(source.read().unwrap()), 20);
        assert!(matches!(source.read().unwrap(), FrameRead::EndOfStream));

        source.rewind().unwrap();
        assert_eq!(frame_value(source.read().unwrap()), 10);
        assert_eq!(source.frames_decoded(), 3);
    }

    #[test]
    fn corrupt_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_broken.png"), b"not a png").unwrap();
        write_frame(dir.path(), "b_good.png", 99);

        let mut source = ImageSequenceSource::new(dir.path());
        source.open().unwrap();
        assert!(matches!(source.read().unwrap(), FrameRead::Skipped));
        assert_eq!(frame_value(source.read().unwrap()), 99);
    }
}
