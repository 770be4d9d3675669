//! Inclusive rectangular regions of interest.

/// Axis-aligned pixel rectangle with inclusive bounds on all sides.
///
/// A pixel `(x, y)` is inside if `left <= x <= right` and `top <= y <= bottom`.
/// An ROI always covers at least one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Roi {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

impl Roi {
    #[inline]
    pub fn new(left: usize, right: usize, top: usize, bottom: usize) -> Self {
        assert!(left <= right, "ROI left {left} exceeds right {right}");
        assert!(top <= bottom, "ROI top {top} exceeds bottom {bottom}");
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// ROI covering a whole `width x height` plane.
    #[inline]
    pub fn from_size(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "ROI of an empty plane");
        Self::new(0, width - 1, 0, height - 1)
    }

    /// Single-pixel ROI.
    #[inline]
    pub fn pixel(x: usize, y: usize) -> Self {
        Self::new(x, x, y, y)
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.right - self.left + 1
    }

    #[inline]
    pub const fn height(&self) -> usize {
        self.bottom - self.top + 1
    }

    #[inline]
    pub const fn area(&self) -> usize {
        self.width() * self.height()
    }

    #[inline]
    pub const fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    #[inline]
    pub const fn contains_roi(&self, other: &Roi) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }

    /// Overlap of two regions, `None` when they are disjoint.
    pub fn intersect(&self, other: &Roi) -> Option<Roi> {
        let left = self.left.max(other.left);
        let right = self.right.min(other.right);
        let top = self.top.max(other.top);
        let bottom = self.bottom.min(other.bottom);
        (left <= right && top <= bottom).then_some(Roi {
            left,
            right,
            top,
            bottom,
        })
    }

    /// Smallest region containing both.
    pub fn union(&self, other: &Roi) -> Roi {
        Roi {
            left: self.left.min(other.left),
            right: self.right.max(other.right),
            top: self.top.min(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Translate by `(dx, dy)`.
    ///
    /// # Panics
    /// Panics if the result would have negative coordinates.
    pub fn offset(&self, dx: isize, dy: isize) -> Roi {
        let shift = |v: usize, d: isize| {
            v.checked_add_signed(d)
                .unwrap_or_else(|| panic!("ROI offset ({dx}, {dy}) leaves the plane"))
        };
        Roi {
            left: shift(self.left, dx),
            right: shift(self.right, dx),
            top: shift(self.top, dy),
            bottom: shift(self.bottom, dy),
        }
    }

    /// Index of `(x, y)` inside a buffer covering exactly this ROI.
    #[inline]
    pub fn local_index(&self, x: usize, y: usize, channels: usize) -> usize {
        debug_assert!(self.contains(x, y), "({x}, {y}) outside {self:?}");
        ((y - self.top) * self.width() + (x - self.left)) * channels
    }

    /// Region of the finer level (`fine` is its full extent) read by a 3x3
    /// downsample producing this coarse region.
    pub fn downsample_source(&self, fine: &Roi) -> Roi {
        Roi {
            left: (2 * self.left).saturating_sub(1).max(fine.left),
            right: (2 * self.right + 1).min(fine.right),
            top: (2 * self.top).saturating_sub(1).max(fine.top),
            bottom: (2 * self.bottom + 1).min(fine.bottom),
        }
    }

    /// Region of the coarser level (`coarse` is its full extent) read by a
    /// bilinear upsample producing this fine region.
    pub fn upsample_source(&self, coarse: &Roi) -> Roi {
        Roi {
            left: (self.left / 2).min(coarse.right),
            right: self.right.div_ceil(2).min(coarse.right),
            top: (self.top / 2).min(coarse.bottom),
            bottom: self.bottom.div_ceil(2).min(coarse.bottom),
        }
    }
}
