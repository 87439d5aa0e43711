use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::models::{Overlay, Point, Status};
use crate::pipeline::FrameOutput;

/// Consumer of annotated frames
pub trait RenderSink {
    fn present(&mut self, output: &FrameOutput) -> Result<()>;
}

/// Draw blob boxes and the ROI outline onto a copy of the frame.
///
/// Text overlays are left to the display side.
pub fn annotate(frame: &DynamicImage, overlay: &Overlay) -> RgbImage {
    let mut canvas = frame.to_rgb8();

    for bbox in &overlay.boxes {
        let top_left = Point::new(bbox.x as i32, bbox.y as i32);
        let bottom_right = Point::new(
            (bbox.x + bbox.width) as i32,
            (bbox.y + bbox.height) as i32,
        );
        draw_frame(&mut canvas, top_left, bottom_right, overlay.box_color, overlay.thickness);
    }

    draw_frame(
        &mut canvas,
        overlay.roi_outline.top_left(),
        overlay.roi_outline.bottom_right(),
        overlay.outline_color,
        overlay.thickness,
    );

    canvas
}

/// Rectangle with corners on `top_left` and `bottom_right`, thickened outwards.
/// Parts outside the canvas are clipped.
fn draw_frame(canvas: &mut RgbImage, top_left: Point, bottom_right: Point, color: Rgb<u8>, thickness: u32) {
    let width = (bottom_right.x - top_left.x + 1).max(1);
    let height = (bottom_right.y - top_left.y + 1).max(1);

    for t in 0..thickness.max(1) as i32 {
        let rect = Rect::at(top_left.x - t, top_left.y - t)
            .of_size((width + 2 * t) as u32, (height + 2 * t) as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Writes each annotated frame and its mask as PNG files.
pub struct ImageDirSink {
    output_dir: PathBuf,
}

impl ImageDirSink {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }
}

impl RenderSink for ImageDirSink {
    fn present(&mut self, output: &FrameOutput) -> Result<()> {
        let frame_path = self.output_dir.join(format!("frame_{:05}.png", output.index));
        let mask_path = self.output_dir.join(format!("mask_{:05}.png", output.index));

        annotate(&output.frame, &output.overlay)
            .save(&frame_path)
            .map_err(|e| anyhow::anyhow!("Failed to save annotated frame: {}", e))?;
        output
            .mask
            .save(&mask_path)
            .map_err(|e| anyhow::anyhow!("Failed to save mask: {}", e))?;

        for text in &output.overlay.texts {
            debug!("Frame {}: {}", output.index, text.text);
        }
        Ok(())
    }
}

/// Logs the detection status, loudly only when it changes.
#[derive(Debug, Default)]
pub struct LogSink {
    last_status: Option<Status>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSink for LogSink {
    fn present(&mut self, output: &FrameOutput) -> Result<()> {
        let summary = &output.summary;
        if self.last_status != Some(summary.status) {
            info!(
                "Frame {}: {} ({} detected)",
                output.index,
                summary.status_label(),
                summary.count
            );
            self.last_status = Some(summary.status);
        } else {
            debug!("Frame {}: {} detected", output.index, summary.count);
        }
        Ok(())
    }
}
