use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::models::error::SessionError;
use crate::models::media::{VideoFrame, VideoInputFrame, JPEG_MIME_TYPE};

/// Downscales RGBA frames and compresses them to JPEG.
///
/// Factor and quality are fixed for the lifetime of the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEncoder {
    pub downscale_factor: u32,
    pub jpeg_quality: u8,
}

impl FrameEncoder {
    pub fn new(downscale_factor: u32, jpeg_quality: u8) -> Self {
        Self {
            downscale_factor: downscale_factor.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Output dimensions for a source frame, or `None` if the frame would vanish.
    pub fn target_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let w = width / self.downscale_factor;
        let h = height / self.downscale_factor;
        if w == 0 || h == 0 {
            None
        } else {
            Some((w, h))
        }
    }

    /// Downscale and compress one frame.
    ///
    /// Returns `Ok(None)` for frames too small to survive the downscale.
    pub fn encode(&self, frame: VideoFrame) -> Result<Option<VideoInputFrame>, SessionError> {
        let Some((width, height)) = self.target_size(frame.width, frame.height) else {
            return Ok(None);
        };

        let source = RgbaImage::from_raw(frame.width, frame.height, frame.rgba).ok_or_else(|| {
            SessionError::EncodingFailed(format!(
                "frame buffer does not match {}x{} RGBA",
                frame.width, frame.height
            ))
        })?;

        let scaled = imageops::resize(&source, width, height, FilterType::Triangle);
        let rgb = DynamicImage::ImageRgba8(scaled).into_rgb8();

        let mut compressed = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut compressed, self.jpeg_quality);
            encoder
                .encode_image(&rgb)
                .map_err(|e| SessionError::EncodingFailed(format!("jpeg encoding failed: {}", e)))?;
        }

        Ok(Some(VideoInputFrame {
            compressed,
            mime_type: JPEG_MIME_TYPE.to_string(),
        }))
    }
}
