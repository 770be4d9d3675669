//! Common utilities for chiaro.

pub mod parallel;

pub use parallel::{ParRowsMut, par_rows_mut3};
