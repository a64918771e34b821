//! Pre-OCR image enhancement.
//!
//! A deterministic, side-effect-free transform: grayscale, fixed contrast
//! and sharpness boosts, a small median filter, and an upscale for small
//! images. Enhancement is best-effort: any internal failure returns the
//! original image untouched rather than failing the pipeline.

use anyhow::Result;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use tracing::{debug, warn};

/// Contrast boost around the image mean.
pub const CONTRAST_FACTOR: f32 = 1.5;
/// Unsharp-mask strength.
pub const SHARPNESS_FACTOR: f32 = 2.0;
/// Smallest acceptable dimension; smaller images are upscaled until the
/// shorter side reaches this floor.
pub const MIN_DIMENSION: u32 = 1000;

/// Enhance an image for OCR. Returns the original unchanged if any step
/// fails internally.
pub fn enhance_for_ocr(img: &DynamicImage) -> DynamicImage {
    match try_enhance(img) {
        Ok(enhanced) => enhanced,
        Err(e) => {
            warn!("Image enhancement failed, using original image: {}", e);
            img.clone()
        }
    }
}

fn try_enhance(img: &DynamicImage) -> Result<DynamicImage> {
    let gray = img.to_luma8();
    debug!(
        "Enhancing {}x{} image for OCR",
        gray.width(),
        gray.height()
    );

    let contrasted = boost_contrast(&gray, CONTRAST_FACTOR);
    let sharpened = sharpen(&contrasted, SHARPNESS_FACTOR);
    let denoised = median_filter(&sharpened, 1, 1);

    Ok(upscale_if_small(
        DynamicImage::ImageLuma8(denoised),
        MIN_DIMENSION,
    ))
}

/// Scale pixel values away from the image mean by a fixed factor.
fn boost_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    // Sum in f64: a u32 accumulator overflows past ~16.8M white pixels,
    // which a blank full-page scan easily reaches.
    let pixel_count = (u64::from(img.width()) * u64::from(img.height())).max(1) as f64;
    let mean = (img.pixels().map(|p| f64::from(p[0])).sum::<f64>() / pixel_count) as f32;

    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let value = mean + (pixel[0] as f32 - mean) * factor;
        out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Unsharp mask: blend the image against a blurred copy. A strength of 1.0
/// is a no-op; 2.0 doubles the edge response.
fn sharpen(img: &GrayImage, strength: f32) -> GrayImage {
    let blurred = gaussian_blur_f32(img, 1.0);

    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let original = pixel[0] as f32;
        let smooth = blurred.get_pixel(x, y)[0] as f32;
        let value = smooth + (original - smooth) * strength;
        out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Uniformly upscale with Lanczos3 so the smaller dimension reaches the
/// floor. Larger images pass through untouched.
fn upscale_if_small(img: DynamicImage, floor: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width >= floor && height >= floor {
        return img;
    }

    let scale = floor as f32 / width.min(height).max(1) as f32;
    let new_width = (width as f32 * scale).round() as u32;
    let new_height = (height as f32 * scale).round() as u32;
    debug!(
        "Upscaling {}x{} image by {:.2}x for OCR",
        width, height, scale
    );
    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        let img = GrayImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Luma([200u8])
            } else {
                Luma([60u8])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_enhancement_is_deterministic() {
        let img = checkerboard(64, 64);
        let a = enhance_for_ocr(&img);
        let b = enhance_for_ocr(&img);
        assert_eq!(a.to_luma8().as_raw(), b.to_luma8().as_raw());
    }

    #[test]
    fn test_small_image_upscaled_to_floor() {
        let img = checkerboard(200, 400);
        let enhanced = enhance_for_ocr(&img);
        assert!(enhanced.width().min(enhanced.height()) >= MIN_DIMENSION);
        // Aspect ratio preserved within rounding
        let ratio_before = 400.0 / 200.0;
        let ratio_after = enhanced.height() as f32 / enhanced.width() as f32;
        assert!((ratio_before - ratio_after).abs() < 0.05);
    }

    #[test]
    fn test_large_image_not_resized() {
        let img = checkerboard(1200, 1600);
        let enhanced = enhance_for_ocr(&img);
        assert_eq!(enhanced.width(), 1200);
        assert_eq!(enhanced.height(), 1600);
    }

    #[test]
    fn test_output_is_grayscale() {
        let rgb = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            1024,
            1024,
            image::Rgb([120, 80, 200]),
        ));
        let enhanced = enhance_for_ocr(&rgb);
        assert!(matches!(enhanced, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_contrast_boost_handles_full_page_scan_sizes() {
        // A blank 4600x4600 scan pushes the pixel sum past u32::MAX; the
        // mean must still come out exact. Uniform input is a fixed point
        // of the transform, so every pixel stays white.
        let img = GrayImage::from_pixel(4600, 4600, Luma([255u8]));
        let boosted = boost_contrast(&img, CONTRAST_FACTOR);
        assert_eq!(boosted.get_pixel(0, 0)[0], 255);
        assert_eq!(boosted.get_pixel(4599, 4599)[0], 255);
    }

    #[test]
    fn test_contrast_boost_spreads_values() {
        let img = GrayImage::from_fn(16, 16, |x, _| {
            if x < 8 {
                Luma([110u8])
            } else {
                Luma([150u8])
            }
        });
        let boosted = boost_contrast(&img, CONTRAST_FACTOR);
        let dark = boosted.get_pixel(0, 0)[0];
        let light = boosted.get_pixel(15, 0)[0];
        assert!(dark < 110);
        assert!(light > 150);
    }
}
