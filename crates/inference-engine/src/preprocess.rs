//! Camera frame preprocessing

use camera_capture::CameraFrame;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::InferenceError;

/// Color space the network was trained on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Yuv,
}

/// Resizes, converts and scales frames into a `1 x H x W x 3` f32 tensor
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    height: u32,
    width: u32,
    color_space: ColorSpace,
    normalize: bool,
}

impl ImagePreprocessor {
    pub fn new(height: u32, width: u32, color_space: ColorSpace, normalize: bool) -> Self {
        Self {
            height,
            width,
            color_space,
            normalize,
        }
    }

    /// Target tensor shape (batch of one, channels last)
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, 3]
    }

    /// Build the image tensor for one frame
    pub fn preprocess(&self, frame: &CameraFrame) -> Result<Array4<f32>, InferenceError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(InferenceError::InvalidInputShape {
                expected: "non-empty camera frame".to_string(),
                actual: format!("{}x{} frame", frame.width(), frame.height()),
            });
        }

        let mut image = frame.resize_area(self.width, self.height);
        if self.color_space == ColorSpace::Yuv {
            image = image.to_yuv();
        }

        let scale = if self.normalize { 1.0 / 255.0 } else { 1.0 };
        let data: Vec<f32> = image.data().iter().map(|&v| v as f32 * scale).collect();

        let [n, h, w, c] = self.shape();
        Array4::from_shape_vec((n, h, w, c), data).map_err(|e| InferenceError::InvalidInputShape {
            expected: format!("image {:?}", self.shape()),
            actual: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, pixel: [u8; 3]) -> CameraFrame {
        CameraFrame::new(pixel.repeat((width * height) as usize), width, height, 0).unwrap()
    }

    #[test]
    fn test_tensor_shape_follows_target() {
        let pre = ImagePreprocessor::new(66, 200, ColorSpace::Rgb, false);
        let tensor = pre.preprocess(&frame(800, 600, [1, 2, 3])).unwrap();
        assert_eq!(tensor.shape(), &[1, 66, 200, 3]);
    }

    #[test]
    fn test_raw_values_without_normalization() {
        let pre = ImagePreprocessor::new(2, 2, ColorSpace::Rgb, false);
        let tensor = pre.preprocess(&frame(4, 4, [10, 20, 255])).unwrap();
        assert_eq!(tensor[[0, 1, 1, 0]], 10.0);
        assert_eq!(tensor[[0, 1, 1, 2]], 255.0);
    }

    #[test]
    fn test_normalization_scales_to_unit_range() {
        let pre = ImagePreprocessor::new(2, 2, ColorSpace::Rgb, true);
        let tensor = pre.preprocess(&frame(4, 4, [255, 0, 51])).unwrap();
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 0, 1]], 0.0);
        assert!((tensor[[0, 0, 0, 2]] - 0.2).abs() < 1e-6);
        assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_yuv_conversion_applied_after_resize() {
        let pre = ImagePreprocessor::new(1, 1, ColorSpace::Yuv, false);
        let tensor = pre.preprocess(&frame(3, 3, [100, 100, 100])).unwrap();
        assert_eq!(tensor[[0, 0, 0, 0]], 100.0);
        assert_eq!(tensor[[0, 0, 0, 1]], 128.0);
        assert_eq!(tensor[[0, 0, 0, 2]], 128.0);
    }

    #[test]
    fn test_empty_frame_rejected() {
        let pre = ImagePreprocessor::new(66, 200, ColorSpace::Yuv, true);
        let empty = CameraFrame::new(Vec::new(), 0, 0, 9).unwrap();
        assert!(matches!(
            pre.preprocess(&empty),
            Err(InferenceError::InvalidInputShape { .. })
        ));
    }
}
