//! Lookup tables for `RemapFunction`.

use rayon::prelude::*;

use super::RemapFunction;
use crate::error::{Error, Result};
use crate::plane::{Plane, PlaneF32, PlaneI16};
use crate::sample::{FIXED_ONE, Sample};

/// Entries in the floating-point remap table.
pub const LUT_SIZE: usize = 16384;

/// Remapping of a sample around a base value, as used by the strategies.
pub trait RemapLookup<T: Sample>: Sync {
    /// `base + remap(value - base)`.
    fn remap(&self, value: T, base: T) -> T;
}

/// Float remap table over the difference domain `[min - max, max - min]`.
///
/// Lookups interpolate linearly between neighbouring entries and clamp to the
/// domain.
#[derive(Debug, Clone)]
pub struct RemapLut {
    table: Vec<f32>,
    domain_min: f32,
    scale: f32,
}

impl RemapLut {
    /// Sample `remap` for a plane whose values lie in `[min, max]`.
    pub fn build(remap: &RemapFunction, min: f32, max: f32) -> Result<Self> {
        let range = (max - min).max(f32::EPSILON);
        let domain_min = -range;
        let scale = (LUT_SIZE - 1) as f32 / (2.0 * range);

        let table: Vec<f32> = (0..LUT_SIZE)
            .into_par_iter()
            .map(|i| remap.remap(domain_min + i as f32 / scale))
            .collect();

        if let Some(index) = table.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFinite {
                stage: "remap LUT",
                index,
            });
        }

        tracing::debug!(
            entries = LUT_SIZE,
            domain_min,
            domain_max = range,
            sigma_r = remap.sigma_r(),
            "Built float remap LUT"
        );

        Ok(Self {
            table,
            domain_min,
            scale,
        })
    }

    /// Remapped difference for `distance`.
    #[inline]
    pub fn lookup(&self, distance: f32) -> f32 {
        let pos = ((distance - self.domain_min) * self.scale).clamp(0.0, (LUT_SIZE - 1) as f32);
        let i = (pos as usize).min(LUT_SIZE - 2);
        let frac = pos - i as f32;
        let lo = self.table[i];
        lo + (self.table[i + 1] - lo) * frac
    }

    #[inline]
    pub fn table(&self) -> &[f32] {
        &self.table
    }
}

impl RemapLookup<f32> for RemapLut {
    #[inline]
    fn remap(&self, value: f32, base: f32) -> f32 {
        base + self.lookup(value - base)
    }
}

/// Affine map between float samples in `[offset, offset + range]` and
/// fixed-point samples in `[0, FIXED_ONE]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPointScale {
    offset: f32,
    unit: f32,
}

impl FixedPointScale {
    pub fn new(min: f32, max: f32) -> Self {
        let range = (max - min).max(f32::EPSILON);
        Self {
            offset: min,
            unit: range / FIXED_ONE as f32,
        }
    }

    /// Float value of one fixed-point step.
    #[inline]
    pub fn unit(&self) -> f32 {
        self.unit
    }

    #[inline]
    pub fn to_fixed(&self, value: f32) -> i16 {
        i16::from_f32((value - self.offset) / self.unit)
    }

    #[inline]
    pub fn to_float(&self, value: i16) -> f32 {
        value as f32 * self.unit + self.offset
    }

    pub fn quantize(&self, plane: &PlaneF32) -> PlaneI16 {
        let data = plane.data().par_iter().map(|&v| self.to_fixed(v)).collect();
        Plane::from_vec(plane.width(), plane.height(), plane.channels(), data)
    }

    pub fn dequantize(&self, plane: &PlaneI16) -> PlaneF32 {
        let data = plane.data().par_iter().map(|&v| self.to_float(v)).collect();
        Plane::from_vec(plane.width(), plane.height(), plane.channels(), data)
    }
}

/// Fixed-point remap table with one entry per integer difference in
/// `[-FIXED_ONE, FIXED_ONE]`.
#[derive(Debug, Clone)]
pub struct RemapLut16 {
    table: Vec<i32>,
}

impl RemapLut16 {
    pub fn build(remap: &RemapFunction, scale: &FixedPointScale) -> Result<Self> {
        let unit = scale.unit();
        let remapped: Vec<f32> = (-FIXED_ONE..=FIXED_ONE)
            .into_par_iter()
            .map(|d| remap.remap(d as f32 * unit) / unit)
            .collect();

        if let Some(index) = remapped.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFinite {
                stage: "fixed-point remap LUT",
                index,
            });
        }

        tracing::debug!(
            entries = remapped.len(),
            unit,
            sigma_r = remap.sigma_r(),
            "Built fixed-point remap LUT"
        );

        Ok(Self {
            table: remapped.into_iter().map(|v| v.round() as i32).collect(),
        })
    }

    /// Remapped difference for `distance`, clamped to the table domain.
    #[inline]
    pub fn lookup(&self, distance: i32) -> i32 {
        self.table[(distance.clamp(-FIXED_ONE, FIXED_ONE) + FIXED_ONE) as usize]
    }
}

impl RemapLookup<i16> for RemapLut16 {
    #[inline]
    fn remap(&self, value: i16, base: i16) -> i16 {
        let remapped = base as i32 + self.lookup(value as i32 - base as i32);
        remapped.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}
