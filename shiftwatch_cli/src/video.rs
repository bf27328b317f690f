// THEORY:
// OpenCV-backed frame source for video files and cameras. Only compiled with
// the `opencv` feature, since it links against the system OpenCV libraries.
// A target that parses as an integer is a camera index; anything else is a
// file path. An empty read ends a file but only drops a camera frame, and
// cameras are never rewound. Frames arrive as BGR `Mat`s and are converted to `RgbImage`
// before they reach the pipeline.

use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use shiftwatch::{FrameRead, FrameSource, MonitorError};

use crate::capture_target::CaptureTarget;

pub struct VideoSource {
    target: String,
    kind: CaptureTarget,
    capture: Option<VideoCapture>,
    frame: Mat,
}

impl VideoSource {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            kind: CaptureTarget::parse(&target),
            target,
            capture: None,
            frame: Mat::default(),
        }
    }

    fn open_error(&self, reason: impl Into<String>) -> MonitorError {
        MonitorError::SourceOpen {
            source_name: self.target.clone(),
            reason: reason.into(),
        }
    }

    fn read_error(&self, reason: impl Into<String>) -> MonitorError {
        MonitorError::SourceRead {
            source_name: self.target.clone(),
            reason: reason.into(),
        }
    }

    fn to_rgb(&self) -> opencv::Result<Option<RgbImage>> {
        let mut rgb = Mat::default();
        imgproc::cvt_color(&self.frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
        let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
        let bytes = rgb.data_bytes()?.to_vec();
        Ok(RgbImage::from_raw(width, height, bytes))
    }
}

impl FrameSource for VideoSource {
    fn name(&self) -> String {
        self.target.clone()
    }

    fn open(&mut self) -> shiftwatch::Result<()> {
        let capture = match &self.kind {
            CaptureTarget::Camera(index) => VideoCapture::new(*index, videoio::CAP_ANY),
            CaptureTarget::File(path) => VideoCapture::from_file(path, videoio::CAP_ANY),
        }
        .map_err(|e| self.open_error(e.to_string()))?;

        if !capture.is_opened().map_err(|e| self.open_error(e.to_string()))? {
            return Err(self.open_error("capture did not open"));
        }
        log::info!("VideoSource: opened {}", self.target);
        self.capture = Some(capture);
        Ok(())
    }

    fn read(&mut self) -> shiftwatch::Result<FrameRead> {
        let Some(capture) = self.capture.as_mut() else {
            return Err(self.read_error("read before open"));
        };

        match capture.read(&mut self.frame) {
            Ok(true) if !self.frame.empty() => match self.to_rgb() {
                Ok(Some(image)) => Ok(FrameRead::Frame(image)),
                Ok(None) => Ok(FrameRead::Skipped),
                Err(e) => {
                    log::warn!("VideoSource: dropping frame from {}: {e}", self.target);
                    Ok(FrameRead::Skipped)
                }
            },
            Ok(_) => Ok(self.kind.empty_read()),
            Err(e) => {
                log::warn!("VideoSource: read failed on {}: {e}", self.target);
                Ok(FrameRead::Skipped)
            }
        }
    }

    fn rewind(&mut self) -> shiftwatch::Result<()> {
        if self.kind.is_camera() {
            return Ok(());
        }
        let Some(capture) = self.capture.as_mut() else {
            return Err(self.read_error("rewind before open"));
        };
        let rewound = capture
            .set(videoio::CAP_PROP_POS_FRAMES, 0.0)
            .map_err(|e| MonitorError::SourceRead {
                source_name: self.target.clone(),
                reason: e.to_string(),
            })?;
        if !rewound {
            return Err(self.read_error("capture does not support seeking back to the first frame"));
        }
        Ok(())
    }
}
