use image::{GrayImage, Luma};

use crate::models::{BOTTOM_MARGIN, Point, RoiGeometry, RoiPolygon};

/// Frame sides beyond this are treated as this long when placing the ROI.
const MAX_FRAME_SIDE: u32 = 1 << 24;

/// Place the ROI for a frame of the given size.
///
/// The rectangle is centered horizontally and sits `BOTTOM_MARGIN` above the
/// bottom edge, then shifted by the geometry offsets. An ROI larger than the
/// frame yields negative coordinates, which callers clip when drawing.
/// Out-of-range geometry is clamped to `MAX_ROI_EXTENT` first.
pub fn resolve(geometry: &RoiGeometry, frame_width: u32, frame_height: u32) -> RoiPolygon {
    let geometry = geometry.bounded();
    let frame_width = frame_width.min(MAX_FRAME_SIDE) as i32;
    let frame_height = frame_height.min(MAX_FRAME_SIDE) as i32;

    // Floor division so oversized regions stay centered.
    let x_center = (frame_width - geometry.width).div_euclid(2);
    let y_bottom = frame_height - geometry.height - BOTTOM_MARGIN;

    let x = x_center + geometry.x_offset;
    let y = y_bottom + geometry.y_offset;

    RoiPolygon {
        corners: [
            Point::new(x, y),
            Point::new(x + geometry.width, y),
            Point::new(x + geometry.width, y + geometry.height),
            Point::new(x, y + geometry.height),
        ],
    }
}

/// Filled ROI mask: 255 inside the polygon (edges included), 0 elsewhere.
pub fn roi_mask(polygon: &RoiPolygon, width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if polygon.contains(x as i32, y as i32) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Keep `image` where `mask` is non-zero, zero everywhere else.
pub fn apply_mask(image: &GrayImage, mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.get_pixel(x, y)[0] != 0 {
            *image.get_pixel(x, y)
        } else {
            Luma([0u8])
        }
    })
}

/// Zero out every pixel outside the polygon in place.
pub fn clip_to_roi(mask: &mut GrayImage, polygon: &RoiPolygon) {
    for (x, y, pixel) in mask.enumerate_pixels_mut() {
        if !polygon.contains(x as i32, y as i32) {
            pixel[0] = 0;
        }
    }
}
