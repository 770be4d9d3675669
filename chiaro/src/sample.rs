//! Numeric element types that pyramids and planes are generic over.
//!
//! Two element types are supported: `f32` for the floating-point strategies and
//! `i16` for the fixed-point ones. Pyramid resampling only needs additions and a
//! power-of-two division, so every kernel accumulates in `Sample::Acc` and
//! narrows once at the end.

use std::fmt::Debug;
use std::ops::Add;

use num_traits::Zero;

/// Fixed-point representation of `1.0` in `i16` planes.
pub const FIXED_ONE: i32 = 16384;

/// A plane element.
pub trait Sample: Copy + Default + PartialOrd + Debug + Send + Sync + 'static {
    /// Accumulator wide enough to sum 16 samples without overflow.
    type Acc: Copy + Zero + Add<Output = Self::Acc> + Send + Sync;

    fn widen(self) -> Self::Acc;

    /// Divide an accumulator by `2^shift` (rounding for integers) and convert back.
    fn narrow(acc: Self::Acc, shift: u32) -> Self;

    /// Addition that saturates for integer samples.
    fn sat_add(self, rhs: Self) -> Self;

    /// Subtraction that saturates for integer samples.
    fn sat_sub(self, rhs: Self) -> Self;

    /// `self + (other - self) * t` with `t` in `[0, 1]`.
    fn lerp(self, other: Self, t: f32) -> Self;

    fn from_f32(value: f32) -> Self;

    fn to_f32(self) -> f32;

    fn is_finite(self) -> bool;
}

impl Sample for f32 {
    type Acc = f32;

    #[inline]
    fn widen(self) -> f32 {
        self
    }

    #[inline]
    fn narrow(acc: f32, shift: u32) -> f32 {
        acc * (1.0 / (1u32 << shift) as f32)
    }

    #[inline]
    fn sat_add(self, rhs: f32) -> f32 {
        self + rhs
    }

    #[inline]
    fn sat_sub(self, rhs: f32) -> f32 {
        self - rhs
    }

    #[inline]
    fn lerp(self, other: f32, t: f32) -> f32 {
        self + (other - self) * t
    }

    #[inline]
    fn from_f32(value: f32) -> f32 {
        value
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
}

impl Sample for i16 {
    type Acc = i32;

    #[inline]
    fn widen(self) -> i32 {
        self as i32
    }

    #[inline]
    fn narrow(acc: i32, shift: u32) -> i16 {
        let rounded = if shift == 0 {
            acc
        } else {
            (acc + (1 << (shift - 1))) >> shift
        };
        rounded.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    #[inline]
    fn sat_add(self, rhs: i16) -> i16 {
        self.saturating_add(rhs)
    }

    #[inline]
    fn sat_sub(self, rhs: i16) -> i16 {
        self.saturating_sub(rhs)
    }

    /// Blends with a 16-bit fractional weight in 64-bit intermediates.
    #[inline]
    fn lerp(self, other: i16, t: f32) -> i16 {
        let weight = (t.clamp(0.0, 1.0) * 65536.0).round() as i64;
        let delta = other as i64 - self as i64;
        let value = self as i64 + ((delta * weight + 32768) >> 16);
        value.clamp(i16::MIN as i64, i16::MAX as i64) as i16
    }

    #[inline]
    fn from_f32(value: f32) -> i16 {
        value.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn is_finite(self) -> bool {
        true
    }
}
