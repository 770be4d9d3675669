//! Chiaro - local Laplacian pyramid tone mapping.
//!
//! Edge-aware detail enhancement and contrast compression for planar images
//! ("Local Laplacian Filters", Paris, Hasinoff and Kautz). Every output
//! coefficient is computed from a pyramid of the image remapped around that
//! pixel's own base value, so large edges keep their shape while fine detail
//! is boosted or smoothed.
//!
//! Four strategies are available: exact and interpolated, each on `f32` or
//! 16-bit fixed-point samples.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use chiaro::{Config, LocalLaplacian, Operation, PlaneF32};
//!
//! let source = PlaneF32::from_vec(width, height, 3, linear_rgb);
//! let mut engine = LocalLaplacian::new(Config::detail_enhance());
//! let result = engine.apply(&source)?;
//! ```

pub(crate) mod common;
pub mod engine;
mod error;
pub mod plane;
pub mod pyramid;
pub mod remap;
pub mod roi;
pub mod sample;

// ============================================================================
// Core types
// ============================================================================

pub use error::{Error, Result};
pub use plane::{Plane, PlaneF32, PlaneI16};
pub use roi::Roi;
pub use sample::{FIXED_ONE, Sample};

// ============================================================================
// Pyramids and remapping
// ============================================================================

pub use pyramid::{Pyramid, level_count, level_sizes};
pub use remap::{FixedPointScale, RemapFunction, RemapLookup, RemapLut, RemapLut16};

// ============================================================================
// Engine
// ============================================================================

pub use engine::{
    CacheState, CancellationToken, Config, DirtyReason, LocalLaplacian, Operation,
    ProgressCallback,
};
