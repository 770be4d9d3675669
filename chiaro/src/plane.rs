//! Planar sample buffers.

use std::ops::{Index, IndexMut};

use crate::error::{Error, Result};
use crate::sample::Sample;

/// Row-major interleaved sample buffer.
///
/// `stride == width * channels`; sample `c` of pixel `(x, y)` lives at
/// `y * stride + x * channels + c`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
    channels: usize,
}

pub type PlaneF32 = Plane<f32>;
pub type PlaneI16 = Plane<i16>;

impl<T> Plane<T> {
    pub fn from_vec(width: usize, height: usize, channels: usize, data: Vec<T>) -> Self {
        assert!(width > 0 && height > 0, "plane must not be empty");
        assert!(channels > 0, "plane must have at least one channel");
        assert_eq!(
            data.len(),
            width * height * channels,
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.width * self.channels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn index_of(&self, x: usize, y: usize, c: usize) -> usize {
        debug_assert!(x < self.width && y < self.height && c < self.channels);
        y * self.stride() + x * self.channels + c
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let stride = self.stride();
        &self.data[y * stride..(y + 1) * stride]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let stride = self.stride();
        &mut self.data[y * stride..(y + 1) * stride]
    }

    /// Whether `other` has the same width, height and channel count.
    #[inline]
    pub fn same_shape<U>(&self, other: &Plane<U>) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }
}

impl<T: Copy> Plane<T> {
    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> T {
        self.data[self.index_of(x, y, c)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, c: usize, value: T) {
        let idx = self.index_of(x, y, c);
        self.data[idx] = value;
    }

    pub fn new_filled(width: usize, height: usize, channels: usize, value: T) -> Self {
        Self::from_vec(width, height, channels, vec![value; width * height * channels])
    }

    /// Apply `f` to every sample, producing a plane of the same shape.
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Plane<U> {
        Plane {
            data: self.data.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }

    /// Copy of a single channel as a one-channel plane.
    pub fn channel(&self, c: usize) -> Plane<T> {
        assert!(c < self.channels, "channel {c} out of range");
        Plane {
            data: self.data[c..].iter().step_by(self.channels).copied().collect(),
            width: self.width,
            height: self.height,
            channels: 1,
        }
    }
}

impl<T: Default + Clone> Plane<T> {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self::from_vec(
            width,
            height,
            channels,
            vec![T::default(); width * height * channels],
        )
    }

    /// Reshape in place, reusing the existing allocation when it is large enough.
    /// Sample values after a resize are unspecified.
    pub fn resize(&mut self, width: usize, height: usize) {
        assert!(width > 0 && height > 0, "plane must not be empty");
        self.width = width;
        self.height = height;
        self.data
            .resize(width * height * self.channels, T::default());
    }
}

impl<T: Sample> Plane<T> {
    /// Minimum and maximum sample values as `f32`.
    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                let v = v.to_f32();
                (lo.min(v), hi.max(v))
            })
    }

    /// Fail with `Error::NonFinite` at the first NaN or infinite sample.
    pub fn ensure_finite(&self, stage: &'static str) -> Result<()> {
        match self.data.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(Error::NonFinite { stage, index }),
            None => Ok(()),
        }
    }
}

impl<T> Index<(usize, usize)> for Plane<T> {
    type Output = T;

    /// First channel of pixel `(x, y)`.
    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.data[y * self.width * self.channels + x * self.channels]
    }
}

impl<T> IndexMut<(usize, usize)> for Plane<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        let stride = self.width * self.channels;
        &mut self.data[y * stride + x * self.channels]
    }
}

impl<T> AsRef<[T]> for Plane<T> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        &self.data
    }
}

impl<T> From<Plane<T>> for Vec<T> {
    #[inline]
    fn from(plane: Plane<T>) -> Self {
        plane.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_stores_shape() {
        let plane = Plane::from_vec(3, 2, 1, vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(plane.width(), 3);
        assert_eq!(plane.height(), 2);
        assert_eq!(plane.channels(), 1);
        assert_eq!(plane.stride(), 3);
        assert_eq!(plane.len(), 6);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_from_vec_panics_on_size_mismatch() {
        Plane::from_vec(2, 2, 3, vec![0.0f32; 4]);
    }

    #[test]
    fn test_interleaved_addressing() {
        // 2x2 RGB: pixel (1, 1) channel 2 is the last sample.
        let data: Vec<i16> = (0..12).collect();
        let plane = Plane::from_vec(2, 2, 3, data);
        assert_eq!(plane.stride(), 6);
        assert_eq!(plane.get(0, 0, 0), 0);
        assert_eq!(plane.get(1, 0, 1), 4);
        assert_eq!(plane.get(0, 1, 0), 6);
        assert_eq!(plane.get(1, 1, 2), 11);
        assert_eq!(plane.row(1), &[6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_index_tuple_reads_first_channel() {
        let mut plane = Plane::from_vec(2, 2, 1, vec![1i16, 2, 3, 4]);
        assert_eq!(plane[(1, 1)], 4);
        plane[(0, 1)] = 9;
        assert_eq!(plane.get(0, 1, 0), 9);
    }

    #[test]
    fn test_channel_extracts_single_channel() {
        let plane = Plane::from_vec(2, 1, 3, vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let green = plane.channel(1);
        assert_eq!(green.channels(), 1);
        assert_eq!(green.data(), &[2.0, 5.0]);
    }

    #[test]
    fn test_resize_reuses_storage() {
        let mut plane: PlaneF32 = Plane::new(8, 8, 1);
        plane.resize(3, 2);
        assert_eq!(plane.len(), 6);
        assert_eq!(plane.stride(), 3);
        plane.resize(5, 5);
        assert_eq!(plane.len(), 25);
    }

    #[test]
    fn test_min_max() {
        let plane = Plane::from_vec(2, 2, 1, vec![0.25f32, -1.0, 3.5, 0.0]);
        assert_eq!(plane.min_max(), (-1.0, 3.5));
    }

    #[test]
    fn test_ensure_finite_reports_first_index() {
        let plane = Plane::from_vec(3, 1, 1, vec![0.0f32, f32::NAN, f32::INFINITY]);
        match plane.ensure_finite("input") {
            Err(Error::NonFinite { stage, index }) => {
                assert_eq!(stage, "input");
                assert_eq!(index, 1);
            }
            other => panic!("expected NonFinite error, got {other:?}"),
        }
        assert!(Plane::new_filled(4, 4, 1, 0.5f32).ensure_finite("input").is_ok());
    }

    #[test]
    fn test_map_changes_element_type() {
        let plane = Plane::from_vec(2, 1, 1, vec![0.5f32, 1.0]);
        let fixed = plane.map(|v| (v * 16384.0) as i16);
        assert_eq!(fixed.data(), &[8192, 16384]);
    }
}
