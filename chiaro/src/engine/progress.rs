//! Progress reporting for tone-mapping runs.

use std::fmt;
use std::sync::Arc;

/// Optional shared callback receiving a completion percentage in `[0, 100]`.
#[derive(Clone, Default)]
pub struct ProgressCallback(Option<Arc<dyn Fn(f32) + Send + Sync>>);

impl ProgressCallback {
    pub fn new(f: impl Fn(f32) + Send + Sync + 'static) -> Self {
        Self(Some(Arc::new(f)))
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    /// Report progress using the callback if set.
    pub fn report(&self, percent: f32) {
        if let Some(f) = self.0.as_ref() {
            f(percent);
        }
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("ProgressCallback(Some(..))"),
            None => f.write_str("ProgressCallback(None)"),
        }
    }
}

/// Exact strategies finish fine levels last and those dominate run time, so
/// progress grows quadratically as `level` goes down to 0.
pub(crate) fn exact_level_progress(level: usize, levels: usize) -> f32 {
    if levels <= 1 {
        return 95.0;
    }
    let span = (levels - 1) as f32;
    let done = span - level as f32;
    95.0 * done * done / (span * span)
}

/// Progress after finishing base-value step `step` of `steps`.
pub(crate) fn step_progress(step: usize, steps: usize) -> f32 {
    95.0 * (step + 1) as f32 / steps as f32
}
