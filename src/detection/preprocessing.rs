use image::{DynamicImage, GrayImage};
use imageproc::contrast::equalize_histogram;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Spread the intensity histogram to improve contrast
pub fn equalize(img: &GrayImage) -> GrayImage {
    equalize_histogram(img)
}

/// Grayscale conversion followed by histogram equalization
pub fn prepare(img: &DynamicImage) -> GrayImage {
    equalize(&to_grayscale(img))
}
