use anyhow::Result;
use image::{DynamicImage, GenericImageView, GrayImage};
use log::{debug, warn};
use std::path::PathBuf;

use crate::config::Settings;
use crate::detection::background::{BackgroundModel, BackgroundParams};
use crate::detection::{contours, geometry, morphology, preprocessing};
use crate::interaction::{ControllerState, InteractionController};
use crate::io::render::annotate;
use crate::models::{Blob, DetectionSummary, Overlay, RoiGeometry, RoiPolygon};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Context shared by every frame the pipeline processes
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub verbose: bool,
    pub debug: Option<DebugConfig>,
}

/// Everything the pipeline produced for one frame
#[derive(Clone, Debug)]
pub struct FrameOutput {
    /// 1-based position of the frame in the stream
    pub index: u64,
    pub frame: DynamicImage,
    pub polygon: RoiPolygon,
    /// Cleaned foreground mask, zero outside the ROI
    pub mask: GrayImage,
    pub blobs: Vec<Blob>,
    pub summary: DetectionSummary,
    pub overlay: Overlay,
}

/// State that outlives a single frame and is only changed by key input.
#[derive(Clone, Debug)]
pub struct MonitorState {
    pub geometry: RoiGeometry,
    pub controller: InteractionController,
}

impl MonitorState {
    pub fn new(geometry: RoiGeometry, controller: InteractionController) -> Self {
        Self {
            geometry,
            controller,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.geometry,
            InteractionController::new(settings.bindings.clone(), settings.resize_step),
        )
    }

    /// Apply one polled key (or none) to the geometry.
    pub fn handle_key(&mut self, key: Option<u8>) -> ControllerState {
        self.controller.handle_key(key, &mut self.geometry)
    }
}

/// Per-frame motion detection: mask to the ROI, subtract the background,
/// clean the mask and count blobs.
pub struct FramePipeline {
    background: BackgroundModel,
    min_blob_area: f64,
    context: PipelineContext,
    frames: u64,
}

impl FramePipeline {
    pub fn new(params: BackgroundParams, min_blob_area: f64) -> Self {
        Self {
            background: BackgroundModel::new(params),
            min_blob_area,
            context: PipelineContext::default(),
            frames: 0,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.background.clone(), settings.min_blob_area)
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.context.verbose = verbose;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });

        Ok(self)
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Run detection on one frame using the given ROI geometry.
    pub fn process(&mut self, geometry: &RoiGeometry, frame: DynamicImage) -> Result<FrameOutput> {
        let (width, height) = frame.dimensions();

        if let Some((w, h)) = self.background.dimensions() {
            if (w, h) != (width, height) {
                warn!(
                    "Frame size changed from {}x{} to {}x{}, reinitialising background model",
                    w, h, width, height
                );
                self.background.reset_to(width, height);
            }
        }

        self.frames += 1;
        let index = self.frames;

        let gray = preprocessing::prepare(&frame);
        let polygon = geometry::resolve(geometry, width, height);
        let roi = geometry::roi_mask(&polygon, width, height);
        let masked = geometry::apply_mask(&gray, &roi);

        let raw = self.background.apply(&masked)?;
        let mut mask = morphology::clean(&raw);
        geometry::clip_to_roi(&mut mask, &polygon);

        let blobs = contours::find_blobs(&mask, self.min_blob_area)?;
        let summary = DetectionSummary::from_blobs(&blobs);
        let overlay = Overlay::new(polygon, &blobs, &summary);

        if self.context.verbose {
            debug!(
                "Frame {}: ROI {}x{} at ({}, {}), {} blob(s), {}",
                index,
                geometry.width,
                geometry.height,
                polygon.top_left().x,
                polygon.top_left().y,
                summary.count,
                summary.status_label()
            );
        }

        let output = FrameOutput {
            index,
            frame,
            polygon,
            mask,
            blobs,
            summary,
            overlay,
        };

        let stages = [("01_grayscale", &gray), ("02_roi_masked", &masked), ("03_foreground", &raw)];
        if let Err(e) = self.save_debug_output(&output, &stages) {
            warn!("Failed to save debug output for frame {}: {:#}", index, e);
        }

        Ok(output)
    }

    /// Process a frame, then apply the key polled after it. The geometry
    /// change takes effect on the next frame.
    pub fn step(
        &mut self,
        state: &mut MonitorState,
        frame: DynamicImage,
        key: Option<u8>,
    ) -> Result<(ControllerState, FrameOutput)> {
        let output = self.process(&state.geometry, frame)?;
        Ok((state.handle_key(key), output))
    }

    /// Save intermediate stages if debug mode is enabled
    fn save_debug_output(&self, output: &FrameOutput, stages: &[(&str, &GrayImage)]) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };
        if !debug_config.enabled {
            return Ok(());
        }

        let frame_dir = debug_config.output_dir.join(format!("frame_{:05}", output.index));
        std::fs::create_dir_all(&frame_dir)?;

        for (name, image) in stages {
            image
                .save(frame_dir.join(format!("{}.png", name)))
                .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        }

        output
            .mask
            .save(frame_dir.join("04_cleaned.png"))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        annotate(&output.frame, &output.overlay)
            .save(frame_dir.join("05_annotated.png"))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;

        if self.context.verbose {
            debug!("Debug: saved frame_{:05}/", output.index);
        }

        Ok(())
    }
}
