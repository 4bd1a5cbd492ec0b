//! Camera frame types and processing

use std::fs;
use std::path::Path;

use image::{ColorType, ImageFormat};
use tracing::debug;

use crate::CameraError;

/// RGB camera frame as delivered by the simulator
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    /// RGB pixel data, row-major (width * height * 3)
    data: Vec<u8>,
    /// Frame width
    width: u32,
    /// Frame height
    height: u32,
    /// Simulator frame index
    frame: u64,
}

impl CameraFrame {
    /// Create a new frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, frame: u64) -> Result<Self, CameraError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CameraError::Format(format!(
                "expected {} bytes for {}x{} RGB, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            frame,
        })
    }

    /// Load a frame from an image file on disk
    pub fn load(path: &Path, frame: u64) -> Result<Self, CameraError> {
        let rgb = image::open(path)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::new(rgb.into_raw(), width, height, frame)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Raw RGB bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Resize using area averaging.
    ///
    /// Every destination pixel is the mean of the source region it covers,
    /// with partially covered source pixels weighted by their overlap. The
    /// result is deterministic and matches the usual `INTER_AREA` behaviour
    /// for downscaling.
    pub fn resize_area(&self, new_width: u32, new_height: u32) -> CameraFrame {
        let x_weights = area_weights(self.width, new_width);
        let y_weights = area_weights(self.height, new_height);
        let area = (self.width as f32 / new_width.max(1) as f32)
            * (self.height as f32 / new_height.max(1) as f32);

        let mut resized = Vec::with_capacity(new_width as usize * new_height as usize * 3);
        for rows in &y_weights {
            for cols in &x_weights {
                let mut acc = [0.0f32; 3];
                for &(sy, wy) in rows {
                    let row_start = sy * self.width as usize;
                    for &(sx, wx) in cols {
                        let idx = (row_start + sx) * 3;
                        let w = wx * wy;
                        acc[0] += self.data[idx] as f32 * w;
                        acc[1] += self.data[idx + 1] as f32 * w;
                        acc[2] += self.data[idx + 2] as f32 * w;
                    }
                }
                for channel in acc {
                    resized.push(saturate(channel / area));
                }
            }
        }

        debug!(
            "Resized frame {} from {}x{} to {}x{}",
            self.frame, self.width, self.height, new_width, new_height
        );

        CameraFrame {
            data: resized,
            width: new_width,
            height: new_height,
            frame: self.frame,
        }
    }

    /// Convert RGB to YUV (BT.601, chroma offset by 128)
    pub fn to_yuv(&self) -> CameraFrame {
        let mut yuv = Vec::with_capacity(self.data.len());
        for pixel in self.data.chunks_exact(3) {
            let (r, g, b) = (pixel[0] as f32, pixel[1] as f32, pixel[2] as f32);
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            let u = 0.492 * (b - y) + 128.0;
            let v = 0.877 * (r - y) + 128.0;
            yuv.extend_from_slice(&[saturate(y), saturate(u), saturate(v)]);
        }

        CameraFrame {
            data: yuv,
            width: self.width,
            height: self.height,
            frame: self.frame,
        }
    }

    /// Save as JPEG, creating parent directories as needed
    pub fn save_jpeg(&self, path: &Path) -> Result<(), CameraError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            ColorType::Rgb8,
            ImageFormat::Jpeg,
        )?;
        Ok(())
    }
}

/// Source indices and coverage weights for each destination index along one axis
fn area_weights(src: u32, dst: u32) -> Vec<Vec<(usize, f32)>> {
    if src == 0 || dst == 0 {
        return vec![Vec::new(); dst as usize];
    }

    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|d| {
            let start = d as f64 * scale;
            let end = ((d + 1) as f64 * scale).min(src as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src as usize);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min((s + 1) as f64) - start.max(s as f64);
                    (overlap > 1e-9).then_some((s, overlap as f32))
                })
                .collect()
        })
        .collect()
}

fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uniform(width: u32, height: u32, pixel: [u8; 3]) -> CameraFrame {
        let data = pixel.repeat((width * height) as usize);
        CameraFrame::new(data, width, height, 7).unwrap()
    }

    #[test]
    fn test_rejects_wrong_buffer_length() {
        let result = CameraFrame::new(vec![0; 10], 2, 2, 0);
        assert!(matches!(result, Err(CameraError::Format(_))));
    }

    #[test]
    fn test_area_resize_averages_blocks() {
        // 4x2 image: left 2x2 block is 0, right 2x2 block is 200
        let mut data = Vec::new();
        for _ in 0..2 {
            data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 200, 200, 200, 200, 200, 200]);
        }
        let frame = CameraFrame::new(data, 4, 2, 0).unwrap();

        let resized = frame.resize_area(2, 1);
        assert_eq!(resized.width(), 2);
        assert_eq!(resized.height(), 1);
        assert_eq!(resized.get_pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(resized.get_pixel(1, 0), Some([200, 200, 200]));
    }

    #[test]
    fn test_area_resize_fractional_coverage() {
        // 3 pixels wide into 2: middle pixel is split evenly between outputs
        let data = vec![0, 0, 0, 90, 90, 90, 180, 180, 180];
        let frame = CameraFrame::new(data, 3, 1, 0).unwrap();

        let resized = frame.resize_area(2, 1);
        // (0 * 1.0 + 90 * 0.5) / 1.5 = 30, (90 * 0.5 + 180 * 1.0) / 1.5 = 150
        assert_eq!(resized.get_pixel(0, 0), Some([30, 30, 30]));
        assert_eq!(resized.get_pixel(1, 0), Some([150, 150, 150]));
    }

    #[test]
    fn test_resize_keeps_frame_index() {
        let frame = uniform(8, 6, [10, 20, 30]);
        assert_eq!(frame.resize_area(4, 3).frame(), 7);
    }

    #[test]
    fn test_yuv_of_gray_has_neutral_chroma() {
        let frame = uniform(2, 2, [100, 100, 100]);
        let yuv = frame.to_yuv();
        assert_eq!(yuv.get_pixel(1, 1), Some([100, 128, 128]));
    }

    #[test]
    fn test_yuv_of_white() {
        let yuv = uniform(1, 1, [255, 255, 255]).to_yuv();
        assert_eq!(yuv.get_pixel(0, 0), Some([255, 128, 128]));
    }

    #[test]
    fn test_jpeg_save_and_load() {
        let dir = std::env::temp_dir().join(format!("camera-capture-jpeg-{}", std::process::id()));
        let path = dir.join("nested").join("000000001.jpg");

        let frame = uniform(16, 8, [120, 60, 30]);
        frame.save_jpeg(&path).unwrap();

        let loaded = CameraFrame::load(&path, 1).unwrap();
        assert_eq!(loaded.width(), 16);
        assert_eq!(loaded.height(), 8);
        assert_eq!(loaded.frame(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    proptest! {
        #[test]
        fn test_area_resize_preserves_uniform_color(
            w in 1u32..40,
            h in 1u32..40,
            nw in 1u32..20,
            nh in 1u32..20,
            r in any::<u8>(),
            g in any::<u8>(),
            b in any::<u8>(),
        ) {
            let resized = uniform(w, h, [r, g, b]).resize_area(nw, nh);
            prop_assert_eq!(resized.data().len(), (nw * nh * 3) as usize);
            for pixel in resized.data().chunks_exact(3) {
                prop_assert_eq!(pixel, &[r, g, b][..]);
            }
        }
    }
}
