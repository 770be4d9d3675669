//! Luminance/color separation for RGB planes.

use rayon::prelude::*;

use crate::common::{ParRowsMut, par_rows_mut3};
use crate::plane::{Plane, PlaneF32};

/// Rec. 709 luma weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Smallest luminance after shifting, so color ratios stay finite.
pub const MIN_LUMINANCE: f32 = 1e-3;

/// RGB plane split into a strictly positive luminance plane and the ratio of
/// each channel to it.
#[derive(Debug, Clone)]
pub(crate) struct ColorSplit {
    pub luminance: PlaneF32,
    pub normalized: [PlaneF32; 3],
}

impl ColorSplit {
    pub fn new(rgb: &PlaneF32) -> Self {
        assert_eq!(rgb.channels(), 3, "color split needs an RGB plane");
        let (width, height) = (rgb.width(), rgb.height());

        let mut luminance = Plane::new(width, height, 1);
        luminance
            .data_mut()
            .par_rows_mut(width)
            .for_each(|(first_row, chunk)| {
                for (local_y, row) in chunk.chunks_mut(width).enumerate() {
                    let src = rgb.row(first_row + local_y);
                    for (l, px) in row.iter_mut().zip(src.chunks_exact(3)) {
                        *l = LUMA_WEIGHTS[0] * px[0]
                            + LUMA_WEIGHTS[1] * px[1]
                            + LUMA_WEIGHTS[2] * px[2];
                    }
                }
            });

        let (min, _) = luminance.min_max();
        let shift = (MIN_LUMINANCE - min).max(0.0);
        if shift > 0.0 {
            luminance.data_mut().par_iter_mut().for_each(|l| *l += shift);
        }

        let mut normalized: [PlaneF32; 3] = std::array::from_fn(|_| Plane::new(width, height, 1));
        let [r, g, b] = &mut normalized;
        par_rows_mut3(r.data_mut(), g.data_mut(), b.data_mut(), width).for_each(
            |(first_row, (r, g, b))| {
                let start = first_row * width;
                let lum = &luminance.data()[start..start + r.len()];
                let src = &rgb.data()[start * 3..(start + r.len()) * 3];
                for (i, px) in src.chunks_exact(3).enumerate() {
                    let inv = 1.0 / lum[i];
                    r[i] = px[0] * inv;
                    g[i] = px[1] * inv;
                    b[i] = px[2] * inv;
                }
            },
        );

        tracing::debug!(shift, "Split RGB plane into luminance and color ratios");
        Self {
            luminance,
            normalized,
        }
    }

    /// RGB plane with every channel ratio multiplied by `luminance`.
    pub fn recombine(&self, luminance: &PlaneF32) -> PlaneF32 {
        assert!(
            luminance.same_shape(&self.luminance),
            "tone-mapped luminance shape differs from the split source"
        );
        let width = luminance.width();
        let stride = width * 3;
        let mut rgb = Plane::new(width, luminance.height(), 3);

        rgb.data_mut()
            .par_rows_mut(stride)
            .for_each(|(first_row, chunk)| {
                let start = first_row * width;
                for (i, px) in chunk.chunks_exact_mut(3).enumerate() {
                    let l = luminance.data()[start + i];
                    for (c, v) in px.iter_mut().enumerate() {
                        *v = self.normalized[c].data()[start + i] * l;
                    }
                }
            });

        rgb
    }
}
