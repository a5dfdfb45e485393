use thiserror::Error;

use super::BoxFuture;

/// A decoded RGB8 frame, row-major, three bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn from_rgb8(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(3)?;
        if width == 0 || height == 0 || pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Option<Self> {
        let count = (width as usize).checked_mul(height as usize)?;
        let pixels = rgb.iter().copied().cycle().take(count * 3).collect();
        Self::from_rgb8(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + x as usize) * 3;
        match self.pixels.get(offset..offset + 3)? {
            [r, g, b] => Some([*r, *g, *b]),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned status {0}")]
    Status(u16),
}

pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, FetchError>>;
}

#[derive(Debug, Error)]
#[error("could not decode image: {0}")]
pub struct DecodeError(pub String);

pub trait FrameDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, DecodeError>;
}

#[derive(Debug, Error)]
#[error("classifier failed: {0}")]
pub struct ClassifierError(pub String);

/// Returns one probability in `[0, 1]` per input frame.
pub trait FrameClassifier: Send + Sync {
    fn predict_frames(&self, frames: &[Frame]) -> Result<Vec<f64>, ClassifierError>;
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("frame extractor unavailable: {0}")]
    Unavailable(String),
    #[error("frame extraction failed: {0}")]
    Failed(String),
}

/// Obtains up to `frame_count` evenly spaced frames from a video URL. Partial
/// failures yield fewer frames rather than an error.
pub trait FrameExtractor: Send + Sync {
    fn extract(
        &self,
        url: &str,
        frame_count: usize,
    ) -> BoxFuture<'_, Result<Vec<Frame>, ExtractionError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_lookup_is_bounds_checked() {
        let mut pixels = vec![0u8; 2 * 2 * 3];
        pixels[9..12].copy_from_slice(&[7, 8, 9]);
        let frame = Frame::from_rgb8(2, 2, pixels).expect("frame");
        assert_eq!(frame.pixel(1, 1), Some([7, 8, 9]));
        assert_eq!(frame.pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(frame.pixel(2, 0), None);
        assert_eq!(frame.pixel(0, 2), None);
        assert_eq!(frame.pixel(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        assert!(Frame::from_rgb8(2, 2, vec![0; 11]).is_none());
        assert!(Frame::from_rgb8(0, 2, Vec::new()).is_none());
        assert!(Frame::filled(3, 1, [1, 2, 3]).is_some());
    }
}
