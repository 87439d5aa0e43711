use anyhow::Result;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb};
use std::cell::RefCell;
use std::rc::Rc;

use roiwatch::config::GeometryStore;
use roiwatch::io::RenderSink;
use roiwatch::{DetectionSummary, FrameOutput, RoiGeometry};

pub const FRAME_WIDTH: u32 = 320;
pub const FRAME_HEIGHT: u32 = 240;

/// ROI that fits inside a 320x240 frame: x 60..=260, y 80..=230.
pub const TEST_ROI: RoiGeometry = RoiGeometry {
    width: 200,
    height: 150,
    x_offset: 0,
    y_offset: 0,
};

/// RGB frame filled with a single gray level
pub fn flat_frame(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([value, value, value])))
}

/// Left half at 50, right half at 100, so histogram equalization keeps
/// both halves and a bright object distinct.
pub fn two_tone_frame() -> DynamicImage {
    let img = ImageBuffer::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, _| {
        let v = if x < FRAME_WIDTH / 2 { 50u8 } else { 100u8 };
        Rgb([v, v, v])
    });
    DynamicImage::ImageRgb8(img)
}

/// The two-tone scene with a bright square whose top-left corner is (x, y).
pub fn two_tone_with_square(x: u32, y: u32, size: u32) -> DynamicImage {
    let mut img = two_tone_frame().to_rgb8();
    for py in y..y + size {
        for px in x..x + size {
            img.put_pixel(px, py, Rgb([200, 200, 200]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

/// Deterministic pseudo-random grayscale noise (xorshift).
pub fn noise_frame(width: u32, height: u32, seed: u32) -> DynamicImage {
    let mut state = seed.max(1);
    let img = ImageBuffer::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        Luma([(state & 0xFF) as u8])
    });
    DynamicImage::ImageLuma8(img)
}

pub fn gray_flat(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Binary mask with the given filled rectangles (x, y, width, height).
pub fn mask_with_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for &(x, y, w, h) in rects {
        for py in y..y + h {
            for px in x..x + w {
                mask.put_pixel(px, py, Luma([255]));
            }
        }
    }
    mask
}

/// Geometry store that records every save in memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub saved: Rc<RefCell<Vec<RoiGeometry>>>,
}

impl GeometryStore for MemoryStore {
    fn save(&mut self, geometry: &RoiGeometry) -> Result<()> {
        self.saved.borrow_mut().push(*geometry);
        Ok(())
    }
}

/// Geometry store whose writes always fail.
pub struct FailingStore;

impl GeometryStore for FailingStore {
    fn save(&mut self, _geometry: &RoiGeometry) -> Result<()> {
        Err(anyhow::anyhow!("disk full"))
    }
}

/// Render sink that keeps the summary of every presented frame.
#[derive(Clone, Default)]
pub struct CollectingSink {
    pub summaries: Rc<RefCell<Vec<DetectionSummary>>>,
}

impl RenderSink for CollectingSink {
    fn present(&mut self, output: &FrameOutput) -> Result<()> {
        self.summaries.borrow_mut().push(output.summary.clone());
        Ok(())
    }
}
