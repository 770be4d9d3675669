//! Resampling between adjacent pyramid levels.
//!
//! Downsampling is a 3x3 tent (`[1, 2, 1] / 4` in each direction) centered on
//! fine pixel `2x`, edge-clamped. Upsampling is bilinear with coarse sample `k`
//! located on fine pixel `2k`. Both have ROI-restricted forms that read from a
//! buffer covering only part of a level and produce bit-identical values to the
//! whole-plane forms.
//!
//! Resampling is a convex combination of source samples, so finite input gives
//! finite output. The engine rejects non-finite input with `Plane::ensure_finite`
//! and non-finite remap tables at LUT build time, both as `Error::NonFinite`.
//! Past those boundaries a non-finite sample is a bug, checked with
//! `debug_assert!` only.

use rayon::prelude::*;

use crate::common::ParRowsMut;
use crate::plane::Plane;
use crate::roi::Roi;
use crate::sample::Sample;

/// Size of the next coarser level.
#[inline]
pub fn half_size(width: usize, height: usize) -> (usize, usize) {
    (width.div_ceil(2), height.div_ceil(2))
}

/// Downsample a whole plane to `half_size`, parallel across rows.
pub fn downsample<T: Sample>(src: &Plane<T>) -> Plane<T> {
    let (width, height) = half_size(src.width(), src.height());
    let mut dst = Plane::new(width, height, src.channels());
    let src_level = Roi::from_size(src.width(), src.height());
    let dst_roi = Roi::from_size(width, height);
    let stride = dst.stride();

    dst.data_mut()
        .par_rows_mut(stride)
        .for_each(|(first_row, chunk)| {
            for (local_y, row) in chunk.chunks_mut(stride).enumerate() {
                downsample_row(src, &src_level, &src_level, &dst_roi, first_row + local_y, row);
            }
        });

    dst
}

/// Downsample `dst_roi` of the coarse level into `dst`.
///
/// `src` holds the fine level restricted to `src_roi`, which must cover
/// `dst_roi.downsample_source(src_level)`. `dst` is resized to `dst_roi`.
pub fn downsample_roi<T: Sample>(
    src: &Plane<T>,
    src_roi: &Roi,
    src_level: &Roi,
    dst: &mut Plane<T>,
    dst_roi: &Roi,
) {
    debug_assert_eq!(src.width(), src_roi.width());
    debug_assert_eq!(src.height(), src_roi.height());
    debug_assert!(
        src_roi.contains_roi(&dst_roi.downsample_source(src_level)),
        "source {src_roi:?} does not cover downsample of {dst_roi:?}"
    );
    assert_eq!(src.channels(), dst.channels(), "channel count mismatch");

    dst.resize(dst_roi.width(), dst_roi.height());
    let stride = dst.stride();
    for (local_y, row) in dst.data_mut().chunks_mut(stride).enumerate() {
        downsample_row(src, src_roi, src_level, dst_roi, dst_roi.top + local_y, row);
    }
}

/// Upsample a whole plane to `width x height`, parallel across rows.
pub fn upsample<T: Sample>(src: &Plane<T>, width: usize, height: usize) -> Plane<T> {
    debug_assert_eq!(half_size(width, height), (src.width(), src.height()));
    let mut dst = Plane::new(width, height, src.channels());
    let src_level = Roi::from_size(src.width(), src.height());
    let dst_roi = Roi::from_size(width, height);
    let stride = dst.stride();

    dst.data_mut()
        .par_rows_mut(stride)
        .for_each(|(first_row, chunk)| {
            for (local_y, row) in chunk.chunks_mut(stride).enumerate() {
                upsample_row(src, &src_level, &src_level, &dst_roi, first_row + local_y, row);
            }
        });

    dst
}

/// Single upsampled sample at fine pixel `(x, y)`, channel `c`.
///
/// `src` holds the coarse level restricted to `src_roi`, which must cover
/// `Roi::pixel(x, y).upsample_source(src_level)`.
pub fn upsample_at<T: Sample>(
    src: &Plane<T>,
    src_roi: &Roi,
    src_level: &Roi,
    x: usize,
    y: usize,
    c: usize,
) -> T {
    debug_assert!(src_roi.contains_roi(&Roi::pixel(x, y).upsample_source(src_level)));
    let ch = src.channels();
    let x0 = (x / 2 - src_roi.left) * ch + c;
    let x1 = (x.div_ceil(2).min(src_level.right) - src_roi.left) * ch + c;
    let r0 = src.row(y / 2 - src_roi.top);
    let r1 = src.row(y.div_ceil(2).min(src_level.bottom) - src_roi.top);
    let acc = (r0[x0].widen() + r0[x1].widen()) + (r1[x0].widen() + r1[x1].widen());
    T::narrow(acc, 2)
}

/// One output row of the 3x3 tent downsample. `out` covers `dst_roi` columns.
fn downsample_row<T: Sample>(
    src: &Plane<T>,
    src_roi: &Roi,
    src_level: &Roi,
    dst_roi: &Roi,
    y: usize,
    out: &mut [T],
) {
    let ch = src.channels();
    let rows = [
        (2 * y).saturating_sub(1).max(src_level.top),
        (2 * y).min(src_level.bottom),
        (2 * y + 1).min(src_level.bottom),
    ]
    .map(|sy| src.row(sy - src_roi.top));

    for (i, x) in (dst_roi.left..=dst_roi.right).enumerate() {
        let [c0, c1, c2] = [
            (2 * x).saturating_sub(1).max(src_level.left),
            (2 * x).min(src_level.right),
            (2 * x + 1).min(src_level.right),
        ]
        .map(|sx| (sx - src_roi.left) * ch);

        for c in 0..ch {
            let tap = |row: &[T]| {
                let mid = row[c1 + c].widen();
                row[c0 + c].widen() + mid + mid + row[c2 + c].widen()
            };
            let mid = tap(rows[1]);
            let value = T::narrow(tap(rows[0]) + mid + mid + tap(rows[2]), 4);
            debug_assert!(value.is_finite(), "downsample produced {value:?}");
            out[i * ch + c] = value;
        }
    }
}

/// One output row of the bilinear upsample. `out` covers `dst_roi` columns.
pub(crate) fn upsample_row<T: Sample>(
    src: &Plane<T>,
    src_roi: &Roi,
    src_level: &Roi,
    dst_roi: &Roi,
    y: usize,
    out: &mut [T],
) {
    let ch = src.channels();
    let r0 = src.row(y / 2 - src_roi.top);
    let r1 = src.row(y.div_ceil(2).min(src_level.bottom) - src_roi.top);

    for (i, x) in (dst_roi.left..=dst_roi.right).enumerate() {
        let x0 = (x / 2 - src_roi.left) * ch;
        let x1 = (x.div_ceil(2).min(src_level.right) - src_roi.left) * ch;
        for c in 0..ch {
            // Pairwise sums keep repeated taps exact, so even pixels copy the coarse sample.
            let acc = (r0[x0 + c].widen() + r0[x1 + c].widen())
                + (r1[x0 + c].widen() + r1[x1 + c].widen());
            out[i * ch + c] = T::narrow(acc, 2);
        }
    }
}
