use deepguard_domain::ports::media::{
    ClassifierError, DecodeError, Frame, FrameClassifier, FrameDecoder,
};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

pub const MODEL_INPUT_SIZE: u32 = 224;

/// Decodes JPEG, PNG and WebP bytes into RGB8 frames.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFrameDecoder;

impl FrameDecoder for ImageFrameDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError("empty body".into()));
        }
        let image = image::load_from_memory(bytes)
            .map_err(|err| DecodeError(err.to_string()))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        Frame::from_rgb8(width, height, image.into_raw())
            .ok_or_else(|| DecodeError("image has no pixels".into()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FrameFeatures {
    luma_mean: f64,
    contrast: f64,
    saturation: f64,
    edge_density: f64,
}

/// Stand-in detector: a fixed logistic layer over a few global image
/// statistics. Deterministic, and not a real deepfake model.
#[derive(Clone, Copy, Debug)]
pub struct BaselineFrameClassifier {
    bias: f64,
    contrast_weight: f64,
    saturation_weight: f64,
    edge_weight: f64,
    exposure_weight: f64,
}

impl Default for BaselineFrameClassifier {
    fn default() -> Self {
        Self {
            bias: -2.0,
            contrast_weight: 2.5,
            saturation_weight: 1.0,
            edge_weight: 3.0,
            exposure_weight: -0.5,
        }
    }
}

impl BaselineFrameClassifier {
    fn probability(&self, features: FrameFeatures) -> f64 {
        let logit = self.bias
            + self.contrast_weight * features.contrast
            + self.saturation_weight * features.saturation
            + self.edge_weight * features.edge_density
            + self.exposure_weight * (features.luma_mean - 0.5).abs();
        1.0 / (1.0 + (-logit).exp())
    }
}

impl FrameClassifier for BaselineFrameClassifier {
    fn predict_frames(&self, frames: &[Frame]) -> Result<Vec<f64>, ClassifierError> {
        frames
            .iter()
            .map(|frame| {
                let resized = resize_for_model(frame)?;
                Ok(self.probability(extract_features(&resized)))
            })
            .collect()
    }
}

fn resize_for_model(frame: &Frame) -> Result<RgbImage, ClassifierError> {
    let image = RgbImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
        .ok_or_else(|| ClassifierError("frame buffer does not match dimensions".into()))?;
    if image.dimensions() == (MODEL_INPUT_SIZE, MODEL_INPUT_SIZE) {
        return Ok(image);
    }
    Ok(imageops::resize(
        &image,
        MODEL_INPUT_SIZE,
        MODEL_INPUT_SIZE,
        FilterType::Triangle,
    ))
}

fn luma(pixel: &Rgb<u8>) -> f64 {
    let [r, g, b] = pixel.0;
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0
}

fn saturation(pixel: &Rgb<u8>) -> f64 {
    let max = *pixel.0.iter().max().unwrap_or(&0) as f64;
    let min = *pixel.0.iter().min().unwrap_or(&0) as f64;
    if max == 0.0 { 0.0 } else { (max - min) / max }
}

fn extract_features(image: &RgbImage) -> FrameFeatures {
    let (width, height) = image.dimensions();
    let count = (width as f64) * (height as f64);

    let mut luma_sum = 0.0;
    let mut luma_sq_sum = 0.0;
    let mut saturation_sum = 0.0;
    let mut gradient_sum = 0.0;
    let mut gradient_count = 0.0;

    for (x, y, pixel) in image.enumerate_pixels() {
        let value = luma(pixel);
        luma_sum += value;
        luma_sq_sum += value * value;
        saturation_sum += saturation(pixel);

        if x + 1 < width {
            gradient_sum += (value - luma(image.get_pixel(x + 1, y))).abs();
            gradient_count += 1.0;
        }
        if y + 1 < height {
            gradient_sum += (value - luma(image.get_pixel(x, y + 1))).abs();
            gradient_count += 1.0;
        }
    }

    let luma_mean = luma_sum / count;
    let variance = (luma_sq_sum / count - luma_mean * luma_mean).max(0.0);
    FrameFeatures {
        luma_mean,
        // a luma std-dev of 0.5 is the maximum for values in [0, 1]
        contrast: (variance.sqrt() / 0.5).min(1.0),
        saturation: saturation_sum / count,
        edge_density: if gradient_count > 0.0 {
            gradient_sum / gradient_count
        } else {
            0.0
        },
    }
}
