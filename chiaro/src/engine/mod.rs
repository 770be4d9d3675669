//! Local Laplacian tone-mapping engine.
//!
//! `LocalLaplacian` owns the parameters, the progress and cancellation hooks,
//! and the caches derived from the last source plane. Gray planes are filtered
//! directly; RGB planes are split into luminance and color ratios, only the
//! luminance is filtered, and the ratios are multiplied back.

mod cancel;
mod color;
mod config;
mod exact;
mod interpolate;
mod post;
mod progress;

#[cfg(test)]
mod tests;

use std::ops::RangeInclusive;
use std::time::Instant;

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::plane::PlaneF32;
use crate::pyramid::level_count;
use crate::remap::{FixedPointScale, RemapFunction, RemapLut, RemapLut16};

pub use cancel::CancellationToken;
pub use color::{LUMA_WEIGHTS, MIN_LUMINANCE};
pub use config::{Config, Operation};
pub use post::outlier_stretch;
pub use progress::ProgressCallback;

use color::ColorSplit;

/// Floor applied before taking the logarithm in log-domain mode.
pub const LOG_FLOOR: f32 = 1e-6;

/// Why the cached tone-mapped plane is stale. Ordered by how much must be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirtyReason {
    /// Tone parameters changed: rebuild the tone-mapped plane.
    Parameters,
    /// Source changed: rebuild the luminance split and the tone-mapped plane.
    Source,
}

/// Freshness of the engine caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheState {
    Clean,
    Dirty(DirtyReason),
}

impl CacheState {
    /// Mark dirty for `reason`, keeping a stronger pending reason.
    pub fn invalidate(self, reason: DirtyReason) -> Self {
        match self {
            Self::Clean => Self::Dirty(reason),
            Self::Dirty(pending) => Self::Dirty(pending.max(reason)),
        }
    }

    pub fn is_clean(self) -> bool {
        self == Self::Clean
    }
}

/// Planes derived from the source that do not depend on tone parameters.
#[derive(Debug)]
enum SourceCache {
    Gray(PlaneF32),
    Color(ColorSplit),
}

impl SourceCache {
    fn build(source: &PlaneF32) -> Result<Self> {
        match source.channels() {
            1 => Ok(Self::Gray(source.clone())),
            3 => Ok(Self::Color(ColorSplit::new(source))),
            channels => Err(Error::UnsupportedChannelCount { channels }),
        }
    }

    /// The plane the filter runs on.
    fn working(&self) -> &PlaneF32 {
        match self {
            Self::Gray(plane) => plane,
            Self::Color(split) => &split.luminance,
        }
    }

    fn matches_shape(&self, source: &PlaneF32) -> bool {
        let working = self.working();
        let channels = match self {
            Self::Gray(_) => 1,
            Self::Color(_) => 3,
        };
        working.width() == source.width()
            && working.height() == source.height()
            && channels == source.channels()
    }
}

/// Local Laplacian pyramid tone mapper.
///
/// Not meant for concurrent `apply` calls; use one engine per job.
#[derive(Debug)]
pub struct LocalLaplacian {
    config: Config,
    progress: ProgressCallback,
    cancel: CancellationToken,
    state: CacheState,
    source: Option<SourceCache>,
    tone_mapped: Option<PlaneF32>,
}

impl LocalLaplacian {
    /// # Panics
    /// Panics if `config` is invalid, see `Config::validate`.
    pub fn new(config: Config) -> Self {
        config.validate();
        Self {
            config,
            progress: ProgressCallback::default(),
            cancel: CancellationToken::default(),
            state: CacheState::Dirty(DirtyReason::Source),
            source: None,
            tone_mapped: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the parameters. Only tone-affecting changes invalidate the cache.
    ///
    /// # Panics
    /// Panics if `config` is invalid, see `Config::validate`.
    pub fn set_config(&mut self, config: Config) {
        config.validate();
        if self.config.tone_differs(&config) {
            self.state = self.state.invalidate(DirtyReason::Parameters);
        }
        self.config = config;
    }

    pub fn set_progress_callback(&mut self, progress: ProgressCallback) {
        self.progress = progress;
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    /// The source plane content changed; the next `apply` rebuilds everything.
    pub fn source_changed(&mut self) {
        self.state = self.state.invalidate(DirtyReason::Source);
    }

    pub fn cache_state(&self) -> CacheState {
        self.state
    }

    /// Tone map `source`, reusing cached work when nothing relevant changed.
    ///
    /// `source` holds linear samples in `[0, 1]` with 1 or 3 channels.
    pub fn apply(&mut self, source: &PlaneF32) -> Result<PlaneF32> {
        let start = Instant::now();
        if !matches!(source.channels(), 1 | 3) {
            return Err(Error::UnsupportedChannelCount {
                channels: source.channels(),
            });
        }

        let rebuild_source = match &self.source {
            None => true,
            Some(cache) if !cache.matches_shape(source) => {
                tracing::warn!(
                    width = source.width(),
                    height = source.height(),
                    channels = source.channels(),
                    "Source shape changed without source_changed(), rebuilding caches"
                );
                self.state = self.state.invalidate(DirtyReason::Source);
                true
            }
            Some(_) => self.state == CacheState::Dirty(DirtyReason::Source),
        };

        let cache = match self.source.take() {
            Some(cache) if !rebuild_source => cache,
            _ => {
                source.ensure_finite("input")?;
                self.tone_mapped = None;
                SourceCache::build(source)?
            }
        };

        let cached = if self.state.is_clean() {
            self.tone_mapped.take()
        } else {
            None
        };
        let result = match cached {
            Some(plane) => Ok(plane),
            None => tone_map(cache.working(), &self.config, &self.progress, &self.cancel),
        };
        let cache = self.source.insert(cache);
        let tone_mapped = match result {
            Ok(plane) => plane,
            Err(err) => {
                self.state = CacheState::Dirty(DirtyReason::Parameters);
                return Err(err);
            }
        };

        let mut output = match cache {
            SourceCache::Gray(_) => tone_mapped.clone(),
            SourceCache::Color(split) => split.recombine(&tone_mapped),
        };
        self.tone_mapped = Some(tone_mapped);
        self.state = CacheState::Clean;

        if let Some(size) = self.config.outlier_reduction_filter_size {
            outlier_stretch(&mut output, size);
        }

        self.progress.report(100.0);
        tracing::info!(
            operation = %self.config.operation,
            width = output.width(),
            height = output.height(),
            channels = output.channels(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Local Laplacian applied"
        );

        Ok(output)
    }
}

/// Levels the filter processes for a pyramid of `levels` levels: the
/// configured range clipped to levels that have a coarser neighbour.
fn processed_levels(levels: usize, config: &Config) -> Option<RangeInclusive<usize>> {
    let top = levels.checked_sub(2)?.min(config.max_level);
    (config.min_level <= top).then_some(config.min_level..=top)
}

/// Run the configured strategy on a single-channel plane.
fn tone_map(
    plane: &PlaneF32,
    config: &Config,
    progress: &ProgressCallback,
    cancel: &CancellationToken,
) -> Result<PlaneF32> {
    let (min, max) = plane.min_max();
    if max - min <= f32::EPSILON {
        tracing::debug!(min, max, "Constant plane, skipping tone mapping");
        return Ok(plane.clone());
    }

    let levels = level_count(plane.width(), plane.height());
    let Some(range) = processed_levels(levels, config) else {
        tracing::debug!(levels, "No pyramid level selected, skipping tone mapping");
        return Ok(plane.clone());
    };

    let working = if config.log_domain {
        plane.map(|v| v.max(LOG_FLOOR).ln())
    } else {
        plane.clone()
    };
    let (min, max) = working.min_max();
    let remap = RemapFunction::from_config(config);
    let steps = interpolate::step_count(config.alpha);

    tracing::debug!(
        operation = %config.operation,
        levels,
        first = *range.start(),
        last = *range.end(),
        min,
        max,
        "Tone mapping plane"
    );

    let result = match config.operation {
        Operation::Exact => {
            let lut = RemapLut::build(&remap, min, max)?;
            exact::remap_exact(&working, &lut, range, progress, cancel)?
        }
        Operation::Interpolated => {
            let lut = RemapLut::build(&remap, min, max)?;
            interpolate::remap_interpolated(&working, &lut, range, steps, progress, cancel)?
        }
        Operation::ExactFixed => {
            let scale = FixedPointScale::new(min, max);
            let lut = RemapLut16::build(&remap, &scale)?;
            let fixed = scale.quantize(&working);
            scale.dequantize(&exact::remap_exact(&fixed, &lut, range, progress, cancel)?)
        }
        Operation::InterpolatedFixed => {
            let scale = FixedPointScale::new(min, max);
            let lut = RemapLut16::build(&remap, &scale)?;
            let fixed = scale.quantize(&working);
            let result =
                interpolate::remap_interpolated(&fixed, &lut, range, steps, progress, cancel)?;
            scale.dequantize(&result)
        }
    };

    let mut result = sanitize(result);
    if config.log_domain {
        result.data_mut().par_iter_mut().for_each(|v| *v = v.exp());
    }
    Ok(result)
}

/// Replace non-finite samples with 0. They indicate a defect, so debug builds panic.
fn sanitize(mut plane: PlaneF32) -> PlaneF32 {
    let bad = plane.data().iter().filter(|v| !v.is_finite()).count();
    if bad > 0 {
        debug_assert_eq!(bad, 0, "tone mapping produced {bad} non-finite samples");
        tracing::error!(count = bad, "Tone mapping produced non-finite samples, clamping to 0");
        plane
            .data_mut()
            .par_iter_mut()
            .filter(|v| !v.is_finite())
            .for_each(|v| *v = 0.0);
    }
    plane
}
