// THEORY:
// The `BackgroundModel` is the temporal layer of the monitor. It learns what the
// empty scene looks like and reports, per frame, which pixels do not fit that
// picture.
//
// Key architectural principles:
// 1.  **Per-Pixel Mixture**: Every pixel owns a small, weight-sorted set of RGB
//     Gaussians. A pixel is background when it matches one of the heaviest
//     modes whose cumulative weight stays under the background ratio. This lets
//     a pixel have several "normal" looks (a flickering light, a swaying cable).
// 2.  **Adaptive Learning**: Matched modes are pulled towards the new sample,
//     weights decay, and modes that fall below a pruning floor are dropped. The
//     learning rate starts fast and settles at `1 / history`, so the model
//     converges quickly after start-up and then forgets at a steady pace.
// 3.  **Shadow Awareness**: A non-background pixel that is a uniformly darker
//     copy of a background mode is a shadow, not an object. Shadows are marked
//     with a sentinel value and then cleared by `apply`, so they never count
//     as foreground downstream.
// 4.  **Strict Ordering**: The model mutates on every call. Frames must arrive
//     in order, one at a time, never skipped. Skipping or reordering desyncs
//     the learning window from the clock.

use crate::config::BackgroundConfig;
use image::{GrayImage, RgbImage};

pub const FOREGROUND: u8 = 255;
pub const SHADOW: u8 = 127;
pub const BACKGROUND: u8 = 0;

const MAX_MODES: usize = 5;
const BACKGROUND_RATIO: f32 = 0.9;
const VAR_THRESHOLD_GEN: f32 = 9.0;
const VAR_INIT: f32 = 15.0;
const VAR_MIN: f32 = 4.0;
const VAR_MAX: f32 = 5.0 * VAR_INIT;
const COMPLEXITY_REDUCTION: f32 = 0.05;
const SHADOW_TAU: f32 = 0.5;

/// One Gaussian component of a pixel's mixture.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GaussianMode {
    weight: f32,
    variance: f32,
    mean: [f32; 3],
}

/// Adaptive Gaussian-mixture background subtractor.
pub struct BackgroundModel {
    history: u32,
    /// Squared Mahalanobis distance for the background decision.
    var_threshold: f32,
    detect_shadows: bool,
    width: u32,
    height: u32,
    /// `MAX_MODES` slots per pixel, sorted by descending weight.
    modes: Vec<GaussianMode>,
    /// How many slots of each pixel are currently in use.
    modes_used: Vec<u8>,
    frames_seen: u64,
}

impl BackgroundModel {
    pub fn new(config: &BackgroundConfig) -> Self {
        Self {
            history: config.history.max(1),
            var_threshold: config.var_threshold as f32,
            detect_shadows: config.detect_shadows,
            width: 0,
            height: 0,
            modes: Vec::new(),
            modes_used: Vec::new(),
            frames_seen: 0,
        }
    }

    /// Feeds one frame and returns its foreground mask (`0` or `255`).
    /// Shadow pixels are already cleared.
    pub fn apply(&mut self, frame: &RgbImage) -> GrayImage {
        let mut mask = self.apply_with_shadows(frame);
        suppress_shadows(&mut mask);
        mask
    }

    /// Feeds one frame and returns the raw mask, where shadow pixels carry
    /// the `SHADOW` sentinel.
    pub fn apply_with_shadows(&mut self, frame: &RgbImage) -> GrayImage {
        let (width, height) = frame.dimensions();
        if (width, height) != (self.width, self.height) {
            if self.frames_seen > 0 {
                log::warn!(
                    "frame size changed from {}x{} to {}x{}; relearning background",
                    self.width,
                    self.height,
                    width,
                    height
                );
            }
            self.reset(width, height);
        }

        self.frames_seen += 1;
        let alpha = self.learning_rate();
        let var_threshold = self.var_threshold;
        let detect_shadows = self.detect_shadows;

        let mut mask = GrayImage::new(width, height);
        let per_pixel = self.modes.chunks_mut(MAX_MODES).zip(self.modes_used.iter_mut());
        for ((pixel, out), (modes, used)) in frame.pixels().zip(mask.pixels_mut()).zip(per_pixel) {
            let sample = [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32];
            out[0] = update_pixel(modes, used, sample, alpha, var_threshold, detect_shadows);
        }
        mask
    }

    /// Number of frames the model has learned from since the last reset.
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    fn reset(&mut self, width: u32, height: u32) {
        let pixels = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.modes = vec![GaussianMode::default(); pixels * MAX_MODES];
        self.modes_used = vec![0; pixels];
        self.frames_seen = 0;
    }

    fn learning_rate(&self) -> f32 {
        let window = (2 * self.frames_seen).min(self.history as u64).max(1);
        1.0 / window as f32
    }
}

/// Clears every shadow-marked pixel so only true foreground remains.
pub fn suppress_shadows(mask: &mut GrayImage) {
    for pixel in mask.pixels_mut() {
        if pixel[0] == SHADOW {
            pixel[0] = BACKGROUND;
        }
    }
}

/// Updates one pixel's mixture with a new sample and classifies it.
fn update_pixel(
    modes: &mut [GaussianMode],
    used: &mut u8,
    sample: [f32; 3],
    alpha: f32,
    var_threshold: f32,
    detect_shadows: bool,
) -> u8 {
    let one_minus_alpha = 1.0 - alpha;
    let prune = -alpha * COMPLEXITY_REDUCTION;
    let n_modes = *used as usize;
    let mut remaining = n_modes;
    let mut fits = false;
    let mut background = false;
    let mut total_weight = 0.0f32;

    for mode in 0..n_modes {
        let mut weight = one_minus_alpha * modes[mode].weight + prune;
        let mut swaps = 0;

        if !fits {
            let variance = modes[mode].variance;
            let diff = [
                modes[mode].mean[0] - sample[0],
                modes[mode].mean[1] - sample[1],
                modes[mode].mean[2] - sample[2],
            ];
            let dist2 = diff.iter().map(|d| d * d).sum::<f32>();

            if total_weight < BACKGROUND_RATIO && dist2 < var_threshold * variance {
                background = true;
            }

            if dist2 < VAR_THRESHOLD_GEN * variance {
                fits = true;
                weight += alpha;
                let k = alpha / weight;
                for (mean, d) in modes[mode].mean.iter_mut().zip(diff) {
                    *mean -= k * d;
                }
                modes[mode].variance = (variance + k * (dist2 - variance)).clamp(VAR_MIN, VAR_MAX);

                // Keep the slots sorted by weight.
                let mut i = mode;
                while i > 0 && weight >= modes[i - 1].weight {
                    modes.swap(i, i - 1);
                    i -= 1;
                    swaps += 1;
                }
            }
        }

        if weight < -prune {
            weight = 0.0;
            remaining -= 1;
        }
        modes[mode - swaps].weight = weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        let norm = 1.0 / total_weight;
        for mode in &mut modes[..n_modes] {
            mode.weight *= norm;
        }
    }

    let mut n_modes = remaining;
    if !fits {
        let slot = if n_modes == MAX_MODES {
            MAX_MODES - 1
        } else {
            n_modes += 1;
            n_modes - 1
        };

        if n_modes == 1 {
            modes[slot].weight = 1.0;
        } else {
            modes[slot].weight = alpha;
            for mode in &mut modes[..n_modes - 1] {
                mode.weight *= one_minus_alpha;
            }
        }
        modes[slot].mean = sample;
        modes[slot].variance = VAR_INIT;

        let mut i = slot;
        while i > 0 && alpha >= modes[i - 1].weight {
            modes.swap(i, i - 1);
            i -= 1;
        }
    }
    *used = n_modes as u8;

    if background {
        BACKGROUND
    } else if detect_shadows && is_shadow(&modes[..n_modes], sample, var_threshold) {
        SHADOW
    } else {
        FOREGROUND
    }
}

/// A sample is a shadow when it is a darker, colour-preserving scaling of one
/// of the background modes.
fn is_shadow(modes: &[GaussianMode], sample: [f32; 3], var_threshold: f32) -> bool {
    let mut cumulative = 0.0f32;
    for mode in modes {
        let numerator: f32 = mode.mean.iter().zip(sample).map(|(m, s)| m * s).sum();
        let denominator: f32 = mode.mean.iter().map(|m| m * m).sum();
        if denominator == 0.0 {
            return false;
        }

        if numerator <= denominator && numerator >= SHADOW_TAU * denominator {
            let a = numerator / denominator;
            let dist2a: f32 = mode
                .mean
                .iter()
                .zip(sample)
                .map(|(m, s)| (a * m - s).powi(2))
                .sum();
            if dist2a < var_threshold * mode.variance * a * a {
                return true;
            }
        }

        cumulative += mode.weight;
        if cumulative > BACKGROUND_RATIO {
            return false;
        }
    }
    false
}
