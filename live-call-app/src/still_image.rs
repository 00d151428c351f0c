use std::path::Path;

use live_call_core::{SessionError, VideoFrame, VideoSource};

/// A fixed picture standing in for the camera.
pub struct StillImage {
    frame: VideoFrame,
}

impl StillImage {
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        let image = image::open(path).map_err(|e| {
            SessionError::ConfigurationFailed(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(Self::from_rgba(image.to_rgba8()))
    }

    pub fn from_rgba(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            frame: VideoFrame {
                width,
                height,
                rgba: image.into_raw(),
            },
        }
    }
}

impl VideoSource for StillImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        Some(self.frame.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_the_same_frame_every_time() {
        let source = StillImage::from_rgba(image::RgbaImage::from_pixel(
            8,
            4,
            image::Rgba([10, 20, 30, 255]),
        ));

        assert_eq!(source.dimensions(), (8, 4));
        let frame = source.current_frame().unwrap();
        assert_eq!(frame.rgba.len(), 8 * 4 * 4);
        assert_eq!(&frame.rgba[..4], &[10, 20, 30, 255]);
        assert_eq!(source.current_frame(), Some(frame));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let result = StillImage::open(Path::new("/nonexistent/still.png"));
        assert!(matches!(result, Err(SessionError::ConfigurationFailed(_))));
    }
}
