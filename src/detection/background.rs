use image::{GrayImage, Luma};
use log::debug;

use crate::error::DetectionError;

/// Gaussians tracked per pixel.
const MAX_MODES: usize = 5;
/// Cumulative weight of the leading modes that make up the background.
const BACKGROUND_RATIO: f32 = 0.9;
/// Squared Mahalanobis distance under which a sample updates an existing mode.
const GENERATION_THRESHOLD: f32 = 9.0;
const INITIAL_VARIANCE: f32 = 15.0;
const MIN_VARIANCE: f32 = 4.0;
const MAX_VARIANCE: f32 = 75.0;
/// Prior that slowly starves modes nobody matches.
const COMPLEXITY_PRIOR: f32 = 0.05;
/// Darkest a shadow may make a background pixel, as a fraction of the mean.
const SHADOW_TAU: f32 = 0.5;

pub const BACKGROUND_VALUE: u8 = 0;
pub const SHADOW_VALUE: u8 = 127;
pub const FOREGROUND_VALUE: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    Background,
    Shadow,
    Foreground,
}

impl PixelClass {
    pub fn value(self) -> u8 {
        match self {
            PixelClass::Background => BACKGROUND_VALUE,
            PixelClass::Shadow => SHADOW_VALUE,
            PixelClass::Foreground => FOREGROUND_VALUE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundParams {
    /// Number of recent frames that shape the model
    pub history: u32,
    /// Squared distance threshold; higher means less sensitive
    pub var_threshold: f32,
    pub detect_shadows: bool,
}

impl Default for BackgroundParams {
    fn default() -> Self {
        Self {
            history: 100,
            var_threshold: 30.0,
            detect_shadows: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Gaussian {
    weight: f32,
    mean: f32,
    variance: f32,
}

/// Adaptive per-pixel mixture-of-Gaussians background subtractor.
///
/// The model adopts the size of the first frame it sees. Feeding a frame of
/// any other size is a `DimensionMismatch`; callers must `reset_to` first.
pub struct BackgroundModel {
    params: BackgroundParams,
    width: u32,
    height: u32,
    frames: u64,
    modes: Vec<Gaussian>,
    used: Vec<u8>,
}

impl BackgroundModel {
    pub fn new(params: BackgroundParams) -> Self {
        Self {
            params,
            width: 0,
            height: 0,
            frames: 0,
            modes: Vec::new(),
            used: Vec::new(),
        }
    }

    pub fn with_dimensions(params: BackgroundParams, width: u32, height: u32) -> Self {
        let mut model = Self::new(params);
        model.reset_to(width, height);
        model
    }

    pub fn params(&self) -> &BackgroundParams {
        &self.params
    }

    /// Size the model was built for, if it has seen a frame yet.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        if self.used.is_empty() {
            None
        } else {
            Some((self.width, self.height))
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames
    }

    /// Forget everything, including the frame size.
    pub fn reset(&mut self) {
        self.width = 0;
        self.height = 0;
        self.frames = 0;
        self.modes = Vec::new();
        self.used = Vec::new();
    }

    /// Start over with an empty model for frames of the given size.
    pub fn reset_to(&mut self, width: u32, height: u32) {
        let pixels = width as usize * height as usize;
        debug!("Background model initialised for {}x{}", width, height);
        self.width = width;
        self.height = height;
        self.frames = 0;
        self.modes = vec![Gaussian::default(); pixels * MAX_MODES];
        self.used = vec![0; pixels];
    }

    /// Update the model with `frame` and label every pixel as background (0),
    /// shadow (127) or foreground (255).
    pub fn classify(&mut self, frame: &GrayImage) -> Result<GrayImage, DetectionError> {
        let (width, height) = frame.dimensions();
        match self.dimensions() {
            None => self.reset_to(width, height),
            Some((w, h)) if (w, h) != (width, height) => {
                return Err(DetectionError::DimensionMismatch {
                    expected_width: w,
                    expected_height: h,
                    actual_width: width,
                    actual_height: height,
                });
            }
            Some(_) => {}
        }

        self.frames += 1;
        let horizon = (2 * self.frames).min(self.params.history.max(1) as u64);
        let alpha = 1.0 / horizon as f32;

        let mut labels = GrayImage::new(width, height);
        let Self {
            params,
            modes,
            used,
            ..
        } = self;

        for (idx, (pixel, out)) in frame.pixels().zip(labels.pixels_mut()).enumerate() {
            let slots = &mut modes[idx * MAX_MODES..(idx + 1) * MAX_MODES];
            let class = update_pixel(slots, &mut used[idx], pixel[0] as f32, alpha, params);
            *out = Luma([class.value()]);
        }

        Ok(labels)
    }

    /// Binary foreground mask: foreground is 255, background and shadow are 0.
    pub fn apply(&mut self, frame: &GrayImage) -> Result<GrayImage, DetectionError> {
        let mut mask = self.classify(frame)?;
        for pixel in mask.pixels_mut() {
            if pixel[0] != FOREGROUND_VALUE {
                pixel[0] = 0;
            }
        }
        Ok(mask)
    }
}

fn update_pixel(
    modes: &mut [Gaussian],
    used: &mut u8,
    sample: f32,
    alpha: f32,
    params: &BackgroundParams,
) -> PixelClass {
    let prune = -alpha * COMPLEXITY_PRIOR;
    let mut count = *used as usize;
    let mut background = false;
    let mut matched = false;
    let mut total_weight = 0.0f32;

    let mut mode = 0;
    while mode < count {
        let g = &mut modes[mode];
        let mut weight = (1.0 - alpha) * g.weight + prune;

        if !matched {
            let diff = g.mean - sample;
            let dist2 = diff * diff;

            if total_weight < BACKGROUND_RATIO && dist2 < params.var_threshold * g.variance {
                background = true;
            }

            if dist2 < GENERATION_THRESHOLD * g.variance {
                matched = true;
                weight += alpha;
                let k = alpha / weight;
                g.mean -= k * diff;
                g.variance = (g.variance + k * (dist2 - g.variance)).clamp(MIN_VARIANCE, MAX_VARIANCE);
            }
        }

        if weight < -prune {
            modes.copy_within(mode + 1..count, mode);
            count -= 1;
            continue;
        }

        modes[mode].weight = weight;
        total_weight += weight;
        mode += 1;
    }

    if total_weight > 0.0 {
        for g in &mut modes[..count] {
            g.weight /= total_weight;
        }
    }
    modes[..count].sort_by(|a, b| b.weight.total_cmp(&a.weight));

    // Shadows are judged against modes that existed before this sample.
    let class = if background {
        PixelClass::Background
    } else if params.detect_shadows && is_shadow(&modes[..count], sample, params.var_threshold) {
        PixelClass::Shadow
    } else {
        PixelClass::Foreground
    };

    if !matched {
        let slot = if count == MAX_MODES {
            MAX_MODES - 1
        } else {
            count += 1;
            count - 1
        };

        let weight = if count == 1 {
            1.0
        } else {
            for g in &mut modes[..slot] {
                g.weight *= 1.0 - alpha;
            }
            alpha
        };

        modes[slot] = Gaussian {
            weight,
            mean: sample,
            variance: INITIAL_VARIANCE,
        };
        modes[..count].sort_by(|a, b| b.weight.total_cmp(&a.weight));
    }

    *used = count as u8;
    class
}

/// A darker copy of a leading background mode counts as shadow.
fn is_shadow(modes: &[Gaussian], sample: f32, var_threshold: f32) -> bool {
    let mut total_weight = 0.0f32;

    for g in modes {
        let numerator = g.mean * sample;
        let denominator = g.mean * g.mean;
        if denominator == 0.0 {
            return false;
        }

        if numerator <= denominator && numerator >= SHADOW_TAU * denominator {
            let a = numerator / denominator;
            let diff = a * g.mean - sample;
            if diff * diff < var_threshold * g.variance * a * a {
                return true;
            }
        }

        total_weight += g.weight;
        if total_weight > BACKGROUND_RATIO {
            return false;
        }
    }

    false
}
