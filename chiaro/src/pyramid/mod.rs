//! Gaussian and Laplacian pyramids over planes of any `Sample` type.
//!
//! Level 0 is full resolution; every following level is `half_size` of the
//! previous one. A Laplacian pyramid stores `G[L] - upsample(G[L + 1])` for all
//! but the last level, and the coarsest Gaussian level as the low-pass residual,
//! so `reconstruct` inverts `laplacian` up to rounding.

mod resample;


use rayon::prelude::*;

use crate::common::ParRowsMut;
use crate::plane::Plane;
use crate::roi::Roi;
use crate::sample::Sample;

pub use resample::{downsample, downsample_roi, half_size, upsample, upsample_at};

/// Number of levels for a `width x height` plane: `floor(log2(max(w, h))) + 1`.
pub fn level_count(width: usize, height: usize) -> usize {
    let largest = width.max(height);
    assert!(largest > 0, "plane must not be empty");
    largest.ilog2() as usize + 1
}

/// Dimensions of each of the `levels` levels of a pyramid over `width x height`.
pub fn level_sizes(width: usize, height: usize, levels: usize) -> Vec<(usize, usize)> {
    std::iter::successors(Some((width, height)), |&(w, h)| Some(half_size(w, h)))
        .take(levels)
        .collect()
}

/// An ordered stack of planes, finest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Pyramid<T> {
    levels: Vec<Plane<T>>,
}

impl<T: Sample> Pyramid<T> {
    /// Gaussian pyramid with `levels` levels whose level 0 is `base`.
    pub fn gaussian(base: Plane<T>, levels: usize) -> Self {
        assert!(levels >= 1, "pyramid must have at least 1 level");
        let mut planes = Vec::with_capacity(levels);
        planes.push(base);
        for level in 1..levels {
            let next = downsample(&planes[level - 1]);
            planes.push(next);
        }
        Self { levels: planes }
    }

    /// Laplacian pyramid derived from a Gaussian one.
    pub fn laplacian(gaussian: &Pyramid<T>) -> Self {
        let top = gaussian.len() - 1;
        let mut planes: Vec<Plane<T>> = (0..top).map(|level| gaussian.residual(level)).collect();
        planes.push(gaussian.levels[top].clone());
        Self { levels: planes }
    }

    /// Band-pass residual `G[level] - upsample(G[level + 1])` of a Gaussian pyramid.
    pub fn residual(&self, level: usize) -> Plane<T> {
        assert!(
            level + 1 < self.levels.len(),
            "residual of level {level} needs a coarser level"
        );
        combine_upsampled(&self.levels[level], &self.levels[level + 1], T::sat_sub)
    }

    /// Collapse a Laplacian pyramid into a single full-resolution plane.
    pub fn reconstruct(&self) -> Plane<T> {
        let top = self.levels.len() - 1;
        let mut acc = self.levels[top].clone();
        for level in (0..top).rev() {
            acc = combine_upsampled(&self.levels[level], &acc, T::sat_add);
        }
        acc
    }
}

impl<T> Pyramid<T> {
    pub fn from_levels(levels: Vec<Plane<T>>) -> Self {
        assert!(!levels.is_empty(), "pyramid must have at least 1 level");
        Self { levels }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[inline]
    pub fn level(&self, level: usize) -> &Plane<T> {
        &self.levels[level]
    }

    #[inline]
    pub fn level_mut(&mut self, level: usize) -> &mut Plane<T> {
        &mut self.levels[level]
    }

    #[inline]
    pub fn levels(&self) -> &[Plane<T>] {
        &self.levels
    }

    #[inline]
    pub fn into_levels(self) -> Vec<Plane<T>> {
        self.levels
    }
}

/// `op(fine, upsample(coarse))` per sample, without materializing the upsample.
fn combine_upsampled<T: Sample>(fine: &Plane<T>, coarse: &Plane<T>, op: fn(T, T) -> T) -> Plane<T> {
    debug_assert_eq!(
        half_size(fine.width(), fine.height()),
        (coarse.width(), coarse.height())
    );
    let mut out = fine.clone();
    let coarse_level = Roi::from_size(coarse.width(), coarse.height());
    let fine_level = Roi::from_size(fine.width(), fine.height());
    let stride = out.stride();

    out.data_mut()
        .par_rows_mut(stride)
        .for_each(|(first_row, chunk)| {
            let mut up = vec![T::default(); stride];
            for (local_y, row) in chunk.chunks_mut(stride).enumerate() {
                resample::upsample_row(
                    coarse,
                    &coarse_level,
                    &coarse_level,
                    &fine_level,
                    first_row + local_y,
                    &mut up,
                );
                for (v, &u) in row.iter_mut().zip(&up) {
                    *v = op(*v, u);
                }
            }
        });

    out
}
