// THEORY:
// What an OpenCV target string names, and what an empty read means for it.
// A file that returns no frame has run out and should be rewound. A camera
// that returns no frame has only dropped one; it never ends and never rewinds.
// Kept free of OpenCV types so the rules build and test without the feature.
#![cfg_attr(not(feature = "opencv"), allow(dead_code))]

use shiftwatch::FrameRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    Camera(i32),
    File(String),
}

impl CaptureTarget {
    /// An integer is a camera index; anything else is a file path.
    pub fn parse(target: &str) -> Self {
        match target.trim().parse::<i32>() {
            Ok(index) => Self::Camera(index),
            Err(_) => Self::File(target.to_string()),
        }
    }

    pub fn is_camera(&self) -> bool {
        matches!(self, Self::Camera(_))
    }

    /// Outcome of a read that returned `false` or an empty frame.
    pub fn empty_read(&self) -> FrameRead {
        match self {
            Self::Camera(_) => FrameRead::Skipped,
            Self::File(_) => FrameRead::EndOfStream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_cameras() {
        assert_eq!(CaptureTarget::parse("0"), CaptureTarget::Camera(0));
        assert_eq!(CaptureTarget::parse(" 2 "), CaptureTarget::Camera(2));
        assert_eq!(
            CaptureTarget::parse("line_a.mp4"),
            CaptureTarget::File("line_a.mp4".to_string())
        );
        assert!(!CaptureTarget::parse("./0.avi").is_camera());
    }

    #[test]
    fn empty_camera_read_is_a_dropped_frame() {
        assert!(matches!(CaptureTarget::Camera(0).empty_read(), FrameRead::Skipped));
    }

    #[test]
    fn empty_file_read_is_end_of_stream() {
        assert!(matches!(
            CaptureTarget::File("clip.mp4".to_string()).empty_read(),
            FrameRead::EndOfStream
        ));
    }
}
