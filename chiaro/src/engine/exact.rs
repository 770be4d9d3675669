//! Exact local Laplacian filtering.
//!
//! Every coefficient at level `L` is taken from the Laplacian pyramid of the
//! source remapped around that pixel's own Gaussian value. Only the ROI chain
//! feeding the single coefficient is remapped and downsampled, so each pixel
//! costs `O(4^L)` work instead of a full pyramid.

use std::ops::RangeInclusive;

use rayon::prelude::*;

use super::cancel::CancellationToken;
use super::progress::{ProgressCallback, exact_level_progress};
use crate::common::ParRowsMut;
use crate::error::Result;
use crate::plane::Plane;
use crate::pyramid::{Pyramid, downsample_roi, level_count, upsample_at};
use crate::remap::RemapLookup;
use crate::roi::Roi;
use crate::sample::Sample;

/// Run the exact filter over the processed `levels` of a single-channel `src`.
///
/// Levels outside the range and the low-pass residual keep the coefficients
/// of `src` itself.
pub(crate) fn remap_exact<T: Sample, L: RemapLookup<T>>(
    src: &Plane<T>,
    lut: &L,
    levels: RangeInclusive<usize>,
    progress: &ProgressCallback,
    cancel: &CancellationToken,
) -> Result<Plane<T>> {
    assert_eq!(src.channels(), 1, "strategies operate on single-channel planes");
    let level_total = level_count(src.width(), src.height());
    assert!(
        *levels.end() + 1 < level_total,
        "level {} has no coarser level",
        levels.end()
    );

    let gaussian = Pyramid::gaussian(src.clone(), level_total);
    let extents: Vec<Roi> = gaussian
        .levels()
        .iter()
        .map(|p| Roi::from_size(p.width(), p.height()))
        .collect();
    let mut output = Pyramid::laplacian(&gaussian).into_levels();

    for level in levels.rev() {
        cancel.check()?;

        let base = gaussian.level(level);
        let out = &mut output[level];
        let stride = out.stride();
        out.data_mut()
            .par_rows_mut(stride)
            .for_each(|(first_row, chunk)| {
                let mut chain = RoiChain::new(level);
                for (local_y, row) in chunk.chunks_mut(stride).enumerate() {
                    let y = first_row + local_y;
                    for (x, coef) in row.iter_mut().enumerate() {
                        *coef = chain.coefficient(src, lut, &extents, base.get(x, y, 0), x, y);
                    }
                }
            });

        tracing::debug!(level, "Exact level done");
        progress.report(exact_level_progress(level, level_total));
    }

    Ok(Pyramid::from_levels(output).reconstruct())
}

/// Per-partition scratch: the ROIs and partial Gaussian levels needed for one
/// coefficient at `level`, reused from pixel to pixel.
struct RoiChain<T> {
    level: usize,
    rois: Vec<Roi>,
    planes: Vec<Plane<T>>,
}

impl<T: Sample> RoiChain<T> {
    fn new(level: usize) -> Self {
        Self {
            level,
            rois: vec![Roi::pixel(0, 0); level + 2],
            planes: (0..level + 2).map(|_| Plane::new(1, 1, 1)).collect(),
        }
    }

    fn coefficient<L: RemapLookup<T>>(
        &mut self,
        src: &Plane<T>,
        lut: &L,
        extents: &[Roi],
        g0: T,
        x: usize,
        y: usize,
    ) -> T {
        let level = self.level;

        // Walk from the upsample support of the pixel down to level 0.
        self.rois[level + 1] = Roi::pixel(x, y).upsample_source(&extents[level + 1]);
        for k in (0..=level).rev() {
            self.rois[k] = self.rois[k + 1].downsample_source(&extents[k]);
        }

        remap_roi(lut, src, &self.rois[0], g0, &mut self.planes[0]);
        for k in 1..=level + 1 {
            let (finer, coarser) = self.planes.split_at_mut(k);
            downsample_roi(
                &finer[k - 1],
                &self.rois[k - 1],
                &extents[k - 1],
                &mut coarser[0],
                &self.rois[k],
            );
        }

        let roi = &self.rois[level];
        let fine = self.planes[level].get(x - roi.left, y - roi.top, 0);
        let up = upsample_at(
            &self.planes[level + 1],
            &self.rois[level + 1],
            &extents[level + 1],
            x,
            y,
            0,
        );
        fine.sat_sub(up)
    }
}

/// Remap the `roi` part of `src` around `base` into `dst`, resized to the ROI.
fn remap_roi<T: Sample, L: RemapLookup<T>>(
    lut: &L,
    src: &Plane<T>,
    roi: &Roi,
    base: T,
    dst: &mut Plane<T>,
) {
    dst.resize(roi.width(), roi.height());
    let width = roi.width();
    for (local_y, row) in dst.data_mut().chunks_mut(width).enumerate() {
        let src_row = &src.row(roi.top + local_y)[roi.left..=roi.right];
        for (d, &s) in row.iter_mut().zip(src_row) {
            *d = lut.remap(s, base);
        }
    }
}
