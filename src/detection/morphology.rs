use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{Mask, dilate, grayscale_close, open};

/// Radius of the speckle-removing opening (3x3 ellipse is the unit diamond).
const OPEN_RADIUS: u8 = 1;
/// Side of the elliptical hole-filling kernel.
const CLOSE_SIZE: u32 = 5;
/// Two passes of a 3x3 square dilation.
const DILATE_RADIUS: u8 = 2;

/// The 5x5 elliptical structuring element: the full middle three rows plus
/// the centre pixel of the top and bottom rows.
pub fn ellipse_kernel() -> Mask {
    let center = CLOSE_SIZE / 2;
    let image = GrayImage::from_fn(CLOSE_SIZE, CLOSE_SIZE, |x, y| {
        if y.abs_diff(center) <= 1 || x == center {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    Mask::from_image(&image, center as u8, center as u8)
}

/// Close small holes and gaps with the 5x5 ellipse.
pub fn fill_gaps(mask: &GrayImage) -> GrayImage {
    grayscale_close(mask, &ellipse_kernel())
}

/// Denoise a raw foreground mask: open, then close, then dilate.
///
/// Output pixels are 0 or 255 regardless of input values; any non-zero
/// input pixel counts as foreground.
pub fn clean(mask: &GrayImage) -> GrayImage {
    let opened = open(mask, Norm::L1, OPEN_RADIUS);
    let closed = fill_gaps(&opened);
    dilate(&closed, Norm::LInf, DILATE_RADIUS)
}
