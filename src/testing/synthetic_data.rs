//! Synthetic images for offline testing

use image::{DynamicImage, RgbImage};

/// Gradient RGB image whose content shifts with `frame_number`
pub fn synthetic_image(frame_number: u64, width: u32, height: u32) -> DynamicImage {
    let base = (frame_number % 256) as u8;
    let image = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            base.wrapping_add((x % 256) as u8),
            base.wrapping_add((y % 256) as u8),
            base.wrapping_add(((x + y) % 256) as u8),
        ])
    });
    DynamicImage::ImageRgb8(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_image_correct_size() {
        let image = synthetic_image(0, 320, 240);
        assert_eq!((image.width(), image.height()), (320, 240));
        assert_eq!(image.to_rgb8().as_raw().len(), 320 * 240 * 3);
    }

    #[test]
    fn test_synthetic_images_differ() {
        let image0 = synthetic_image(0, 32, 24).to_rgb8();
        let image1 = synthetic_image(1, 32, 24).to_rgb8();
        assert_ne!(image0.get_pixel(0, 0), image1.get_pixel(0, 0));
    }
}
