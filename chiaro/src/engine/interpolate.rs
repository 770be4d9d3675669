//! Interpolated local Laplacian filtering.
//!
//! The source is remapped around `steps` evenly spaced base values and one
//! Laplacian pyramid is built per base value. Each output coefficient blends
//! the two pyramids whose base values bracket the pixel's Gaussian value.

use std::ops::RangeInclusive;

use rayon::prelude::*;

use super::cancel::CancellationToken;
use super::progress::{ProgressCallback, step_progress};
use crate::common::ParRowsMut;
use crate::error::Result;
use crate::plane::Plane;
use crate::pyramid::{Pyramid, level_count};
use crate::remap::{RemapLookup, remap_plane};
use crate::sample::Sample;

/// Base-value step count: the remap is linear in the base value when detail
/// is left alone, so fewer steps suffice.
pub(crate) fn step_count(alpha: f32) -> usize {
    if alpha == 1.0 { 16 } else { 256 }
}

/// Run the interpolated filter over the processed `levels` of a
/// single-channel `src`.
pub(crate) fn remap_interpolated<T: Sample, L: RemapLookup<T>>(
    src: &Plane<T>,
    lut: &L,
    levels: RangeInclusive<usize>,
    steps: usize,
    progress: &ProgressCallback,
    cancel: &CancellationToken,
) -> Result<Plane<T>> {
    assert_eq!(src.channels(), 1, "strategies operate on single-channel planes");
    assert!(steps >= 2, "interpolation needs at least 2 steps");
    let level_total = level_count(src.width(), src.height());
    let top = *levels.end();
    assert!(top + 1 < level_total, "level {top} has no coarser level");

    let gaussian = Pyramid::gaussian(src.clone(), level_total);
    let mut output = Pyramid::laplacian(&gaussian).into_levels();

    let (min, max) = src.min_max();
    let grid = StepGrid::new(min, max, steps);
    let mut previous: Option<Vec<Plane<T>>> = None;

    for step in 0..steps {
        cancel.check()?;

        let base: T = grid.value(step);
        let remapped = Pyramid::gaussian(remap_plane(lut, src, base), top + 2);
        let current: Vec<Plane<T>> = levels.clone().map(|l| remapped.residual(l)).collect();

        if let Some(previous) = &previous {
            for (i, level) in levels.clone().enumerate() {
                blend_level(
                    &mut output[level],
                    gaussian.level(level),
                    &previous[i],
                    &current[i],
                    &grid,
                    step,
                );
            }
        }
        previous = Some(current);

        progress.report(step_progress(step, steps));
    }

    tracing::debug!(steps, top, "Interpolated levels done");
    Ok(Pyramid::from_levels(output).reconstruct())
}

/// Evenly spaced base values over `[min, max]`.
struct StepGrid {
    min: f32,
    span: f32,
    steps: usize,
}

impl StepGrid {
    fn new(min: f32, max: f32, steps: usize) -> Self {
        Self {
            min,
            span: max - min,
            steps,
        }
    }

    /// Base value of `step`, rounded to the sample type.
    fn value<T: Sample>(&self, step: usize) -> T {
        T::from_f32(self.min + self.span * step as f32 / (self.steps - 1) as f32)
    }

    /// Index `k` of the interval `[step k, step k + 1]` containing `g`.
    /// The first and last intervals absorb values past the ends.
    fn interval(&self, g: f32) -> usize {
        if self.span <= 0.0 {
            return 0;
        }
        let t = (g - self.min) / self.span * (self.steps - 1) as f32;
        (t.floor().max(0.0) as usize).min(self.steps - 2)
    }
}

/// Blend `previous` and `current` into `out` for every pixel whose Gaussian
/// value falls in the interval ending at `step`.
fn blend_level<T: Sample>(
    out: &mut Plane<T>,
    gaussian: &Plane<T>,
    previous: &Plane<T>,
    current: &Plane<T>,
    grid: &StepGrid,
    step: usize,
) {
    let lo = grid.value::<T>(step - 1).to_f32();
    let hi = grid.value::<T>(step).to_f32();
    let stride = out.stride();

    out.data_mut()
        .par_rows_mut(stride)
        .for_each(|(first_row, chunk)| {
            let offset = first_row * stride;
            for (i, v) in chunk.iter_mut().enumerate() {
                let idx = offset + i;
                let g = gaussian.data()[idx].to_f32();
                if grid.interval(g) != step - 1 {
                    continue;
                }
                let a = if hi > lo {
                    ((g - lo) / (hi - lo)).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                *v = previous.data()[idx].lerp(current.data()[idx], a);
            }
        });
}
