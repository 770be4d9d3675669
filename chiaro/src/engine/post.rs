//! Outlier-robust min/max stretch applied to the final plane.

use rayon::prelude::*;

use crate::common::ParRowsMut;
use crate::plane::PlaneF32;

/// Rescale `plane` into `[0, 1]` using the range of a smoothed copy, so a few
/// isolated extreme samples do not decide the stretch.
///
/// Leaves the plane untouched when the smoothed range is degenerate.
pub fn outlier_stretch(plane: &mut PlaneF32, filter_size: f32) {
    assert!(filter_size > 0.0, "Outlier reduction filter size must be positive");
    let mut smoothed = plane.clone();
    attack_decay_rows(&mut smoothed, filter_size);
    attack_decay_columns(&mut smoothed, filter_size);

    let (lo, hi) = smoothed.min_max();
    let range = hi - lo;
    if !(range > f32::EPSILON) {
        tracing::debug!(lo, hi, "Skipping outlier stretch of degenerate range");
        return;
    }

    let scale = 1.0 / range;
    plane
        .data_mut()
        .par_iter_mut()
        .for_each(|v| *v = ((*v - lo) * scale).clamp(0.0, 1.0));
    tracing::debug!(lo, hi, filter_size, "Applied outlier stretch");
}

/// One-pole smoothing run forward then backward over `values`, `step` apart.
fn attack_decay(values: &mut [f32], step: usize, k: f32) {
    let n = values.len().div_ceil(step);
    if n == 0 {
        return;
    }
    let mut state = values[0];
    for i in 0..n {
        let v = &mut values[i * step];
        state += k * (*v - state);
        *v = state;
    }
    let mut state = values[(n - 1) * step];
    for i in (0..n).rev() {
        let v = &mut values[i * step];
        state += k * (*v - state);
        *v = state;
    }
}

fn attack_decay_rows(plane: &mut PlaneF32, filter_size: f32) {
    let k = (1.0 / filter_size).min(1.0);
    let channels = plane.channels();
    let stride = plane.stride();
    plane
        .data_mut()
        .par_rows_mut(stride)
        .for_each(|(_, chunk)| {
            for row in chunk.chunks_mut(stride) {
                for c in 0..channels {
                    attack_decay(&mut row[c..], channels, k);
                }
            }
        });
}

fn attack_decay_columns(plane: &mut PlaneF32, filter_size: f32) {
    let k = (1.0 / filter_size).min(1.0);
    let stride = plane.stride();
    let height = plane.height();

    // Transpose so each column is a contiguous run of `height` samples.
    let mut columns = vec![0.0f32; stride * height];
    let data = plane.data();
    columns
        .par_chunks_mut(height)
        .enumerate()
        .for_each(|(col, column)| {
            for (y, v) in column.iter_mut().enumerate() {
                *v = data[y * stride + col];
            }
            attack_decay(column, 1, k);
        });

    plane
        .data_mut()
        .par_rows_mut(stride)
        .for_each(|(first_row, chunk)| {
            for (local_y, row) in chunk.chunks_mut(stride).enumerate() {
                let y = first_row + local_y;
                for (col, v) in row.iter_mut().enumerate() {
                    *v = columns[col * height + y];
                }
            }
        });
}
