//! Detail/edge remap function and its lookup-table realizations.
//!
//! `RemapFunction` maps a signed difference from a base value to a new
//! difference. Differences up to `sigma_r` are detail and follow
//! `sigma_r * fd(|i| / sigma_r)`; larger ones are edges and are scaled by `beta`
//! past the threshold. The tables in `lut` sample it once per run so the
//! strategies never evaluate powers per pixel.

mod lut;


use rayon::prelude::*;

use crate::common::ParRowsMut;
use crate::engine::Config;
use crate::plane::Plane;
use crate::sample::Sample;

pub use lut::{FixedPointScale, LUT_SIZE, RemapLookup, RemapLut, RemapLut16};

/// Lower bound of the detail/edge threshold.
pub const MIN_SIGMA_R: f32 = 1e-5;

/// Hermite interpolation between `edge0` and `edge1`.
///
/// Degenerates to a step at `edge0` when `edge1 <= edge0`.
#[inline]
pub fn smoothstep(x: f32, edge0: f32, edge1: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemapFunction {
    alpha: f32,
    beta: f32,
    sigma_r: f32,
    noise_level: f32,
}

impl RemapFunction {
    pub fn new(alpha: f32, beta: f32, sigma_r: f32, noise_level: f32) -> Self {
        assert!(alpha > 0.0, "Alpha must be positive, got {alpha}");
        Self {
            alpha,
            beta,
            sigma_r: sigma_r.max(MIN_SIGMA_R),
            noise_level,
        }
    }

    /// Remap for the working domain of `config`: the threshold is a log value
    /// in log-domain mode.
    pub fn from_config(config: &Config) -> Self {
        let sigma_r = if config.log_domain {
            config.threshold.exp()
        } else {
            config.threshold
        };
        Self::new(config.alpha, config.beta, sigma_r, config.noise_level)
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    #[inline]
    pub fn beta(&self) -> f32 {
        self.beta
    }

    #[inline]
    pub fn sigma_r(&self) -> f32 {
        self.sigma_r
    }

    #[inline]
    pub fn noise_level(&self) -> f32 {
        self.noise_level
    }

    /// True when every difference maps to itself.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.alpha == 1.0 && self.beta == 1.0
    }

    /// Remapped difference for a signed difference `i` from the base value.
    pub fn remap(&self, i: f32) -> f32 {
        let magnitude = i.abs();
        let sign = i.signum();
        if magnitude > self.sigma_r {
            sign * (self.beta * (magnitude - self.sigma_r) + self.sigma_r)
        } else if self.alpha == 1.0 {
            i
        } else {
            sign * self.sigma_r * self.detail(magnitude / self.sigma_r)
        }
    }

    /// Detail curve on normalized magnitude `d` in `[0, 1]`.
    ///
    /// Enhancement (`alpha < 1`) fades back to identity below the noise level.
    fn detail(&self, d: f32) -> f32 {
        let curved = d.powf(self.alpha);
        if self.alpha < 1.0 {
            let tau = smoothstep(d * self.sigma_r, self.noise_level, 2.0 * self.noise_level);
            tau * curved + (1.0 - tau) * d
        } else {
            curved
        }
    }
}

/// Remap every sample of `src` around `base`, parallel across rows.
pub fn remap_plane<T: Sample, L: RemapLookup<T>>(lut: &L, src: &Plane<T>, base: T) -> Plane<T> {
    let mut dst = src.clone();
    let stride = dst.stride();
    dst.data_mut()
        .par_rows_mut(stride)
        .for_each(|(_, chunk)| {
            for v in chunk.iter_mut() {
                *v = lut.remap(*v, base);
            }
        });
    dst
}
