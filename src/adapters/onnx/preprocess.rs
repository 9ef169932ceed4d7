use image::{imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

const PAD_COLOR: Rgb<u8> = Rgb([114, 114, 114]);

/// Geometría del letterbox, para devolver las cajas a la imagen original.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub gain: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub width: u32,
    pub height: u32,
}

impl Letterbox {
    pub fn new(width: u32, height: u32, size: u32) -> Self {
        let gain = (size as f32 / width as f32).min(size as f32 / height as f32);
        let (new_w, new_h) = scaled_dims(width, height, gain, size);
        Self {
            gain,
            pad_x: ((size - new_w) / 2) as f32,
            pad_y: ((size - new_h) / 2) as f32,
            width,
            height,
        }
    }

    /// Lleva una caja `[x1, y1, x2, y2]` del espacio letterbox a píxeles originales, recortada a la imagen.
    pub fn restore(&self, xyxy: [f32; 4]) -> [f32; 4] {
        let w = self.width as f32;
        let h = self.height as f32;
        [
            ((xyxy[0] - self.pad_x) / self.gain).clamp(0.0, w),
            ((xyxy[1] - self.pad_y) / self.gain).clamp(0.0, h),
            ((xyxy[2] - self.pad_x) / self.gain).clamp(0.0, w),
            ((xyxy[3] - self.pad_y) / self.gain).clamp(0.0, h),
        ]
    }
}

fn scaled_dims(width: u32, height: u32, gain: f32, size: u32) -> (u32, u32) {
    let new_w = ((width as f32 * gain).round() as u32).clamp(1, size);
    let new_h = ((height as f32 * gain).round() as u32).clamp(1, size);
    (new_w, new_h)
}

/// Redimensiona `rgb` a un lienzo `size`x`size` conservando la proporción y devuelve el
/// tensor NCHW en [0,1] junto con la geometría del letterbox.
pub fn letterbox(rgb: &RgbImage, size: u32) -> (Array4<f32>, Letterbox) {
    let geometry = Letterbox::new(rgb.width(), rgb.height(), size);
    let (new_w, new_h) = scaled_dims(rgb.width(), rgb.height(), geometry.gain, size);

    let resized = image::imageops::resize(rgb, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, PAD_COLOR);
    image::imageops::overlay(&mut canvas, &resized, geometry.pad_x as i64, geometry.pad_y as i64);

    let s = size as usize;
    let mut input = Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }

    (input, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_is_padded_vertically() {
        let img = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        let (input, lb) = letterbox(&img, 64);

        assert_eq!(input.shape(), &[1, 3, 64, 64]);
        assert_eq!(lb.gain, 0.32);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 16.0);

        let pad = 114.0 / 255.0;
        assert!((input[[0, 0, 0, 0]] - pad).abs() < 1e-6);
        assert!((input[[0, 1, 32, 32]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn restore_inverts_scaling_and_padding() {
        let lb = Letterbox::new(200, 100, 64);
        let restored = lb.restore([0.0, 16.0, 32.0, 32.0]);
        assert_eq!(restored, [0.0, 0.0, 100.0, 50.0]);
    }

    #[test]
    fn restore_clips_to_image() {
        let lb = Letterbox::new(200, 100, 64);
        let restored = lb.restore([-10.0, 0.0, 70.0, 64.0]);
        assert_eq!(restored, [0.0, 0.0, 200.0, 100.0]);
    }
}
