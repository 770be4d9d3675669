//! Tone-mapping parameters.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Execution strategy for the local Laplacian filter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Per-pixel remapped pyramids on minimal ROIs, float samples.
    Exact,
    /// Same as `Exact` on 16-bit fixed-point samples.
    ExactFixed,
    /// Blend of pyramids remapped at quantized base values, float samples.
    #[default]
    Interpolated,
    /// Same as `Interpolated` on 16-bit fixed-point samples.
    InterpolatedFixed,
}

impl Operation {
    pub fn is_exact(self) -> bool {
        matches!(self, Self::Exact | Self::ExactFixed)
    }

    pub fn is_fixed_point(self) -> bool {
        matches!(self, Self::ExactFixed | Self::InterpolatedFixed)
    }
}

/// Parameters of a local Laplacian tone-mapping run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detail gain. Below 1 enhances detail, 1 keeps it, above 1 smooths it.
    pub alpha: f32,
    /// Edge gain. Below 1 compresses large-scale contrast, above 1 expands it.
    pub beta: f32,
    /// Detail/edge boundary in working-domain units (a log value in log-domain mode).
    pub threshold: f32,
    /// Differences below this level are not enhanced.
    pub noise_level: f32,
    /// Process `ln(x)` instead of linear samples.
    pub log_domain: bool,
    /// Finest processed pyramid level.
    pub min_level: usize,
    /// Coarsest processed pyramid level. `usize::MAX` processes all of them.
    pub max_level: usize,
    /// Smoothing size for the final min/max stretch. `None` disables the stretch.
    pub outlier_reduction_filter_size: Option<f32>,
    pub operation: Operation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 1.0,
            threshold: 0.1,
            noise_level: 0.01,
            log_domain: false,
            min_level: 0,
            max_level: usize::MAX,
            outlier_reduction_filter_size: None,
            operation: Operation::default(),
        }
    }
}

impl Config {
    /// Leaves the image unchanged.
    pub fn identity() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            ..Self::default()
        }
    }

    /// Boosts fine texture while keeping edges and noise untouched.
    pub fn detail_enhance() -> Self {
        Self {
            alpha: 0.25,
            beta: 1.0,
            threshold: 0.1,
            noise_level: 0.01,
            ..Self::default()
        }
    }

    /// Compresses large-scale contrast in the log domain, then stretches to `[0, 1]`.
    pub fn tone_compress() -> Self {
        Self {
            alpha: 1.0,
            beta: 0.3,
            threshold: -1.0,
            noise_level: 0.0,
            log_domain: true,
            outlier_reduction_filter_size: Some(8.0),
            ..Self::default()
        }
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_levels(mut self, min_level: usize, max_level: usize) -> Self {
        self.min_level = min_level;
        self.max_level = max_level;
        self
    }

    pub fn with_outlier_reduction(mut self, filter_size: f32) -> Self {
        self.outlier_reduction_filter_size = Some(filter_size);
        self
    }

    /// Validate the configuration.
    ///
    /// # Panics
    /// Panics with a descriptive message if any parameter is invalid.
    pub fn validate(&self) {
        assert!(self.alpha > 0.0, "Alpha must be positive, got {}", self.alpha);
        assert!(
            self.beta.is_finite() && self.beta >= 0.0,
            "Beta must be finite and non-negative, got {}",
            self.beta
        );
        assert!(self.threshold.is_finite(), "Threshold must be finite");
        assert!(
            self.noise_level >= 0.0,
            "Noise level must be non-negative, got {}",
            self.noise_level
        );
        assert!(
            self.min_level <= self.max_level,
            "Min level {} must not exceed max level {}",
            self.min_level,
            self.max_level
        );
        if let Some(size) = self.outlier_reduction_filter_size {
            assert!(size > 0.0, "Outlier reduction filter size must be positive");
        }
    }

    /// Whether switching from `self` to `other` changes the tone-mapped plane.
    ///
    /// Only the outlier stretch is applied after the cached result.
    pub fn tone_differs(&self, other: &Config) -> bool {
        let Config {
            alpha,
            beta,
            threshold,
            noise_level,
            log_domain,
            min_level,
            max_level,
            outlier_reduction_filter_size: _,
            operation,
        } = other;
        self.alpha != *alpha
            || self.beta != *beta
            || self.threshold != *threshold
            || self.noise_level != *noise_level
            || self.log_domain != *log_domain
            || self.min_level != *min_level
            || self.max_level != *max_level
            || self.operation != *operation
    }
}
