//! Example: Synthetic Tone Mapping
//!
//! Runs every local Laplacian strategy on a generated high-dynamic-range RGB
//! plane and prints how each one changed the image:
//! 1. Detail enhancement with the default interpolated strategy
//! 2. Log-domain contrast compression with the outlier stretch
//! 3. The same detail enhancement with every strategy
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=chiaro=debug cargo run --release --example synthetic_tone_map -- [size]
//! ```

use std::env;

use anyhow::Result;
use chiaro::{Config, LocalLaplacian, Operation, PlaneF32, ProgressCallback};
use strum::IntoEnumIterator;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let size = match env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 256,
    };
    let source = synthetic_scene(size);
    print_stats("source", &source);

    // === Detail enhancement ===
    let mut engine = LocalLaplacian::new(Config::detail_enhance());
    engine.set_progress_callback(ProgressCallback::new(|percent| {
        tracing::debug!(percent, "Progress");
    }));
    let enhanced = engine.apply(&source)?;
    print_stats("detail_enhance", &enhanced);

    // === Contrast compression ===
    // Only the tone parameters changed: the luminance split is reused.
    engine.set_config(Config::tone_compress());
    let compressed = engine.apply(&source)?;
    print_stats("tone_compress", &compressed);

    // === Strategy comparison ===
    let reference = enhanced;
    for operation in Operation::iter() {
        let config = Config::detail_enhance().with_operation(operation);
        let result = LocalLaplacian::new(config).apply(&source)?;
        let max_diff = reference
            .data()
            .iter()
            .zip(result.data())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        println!("{operation:>20}: max difference to interpolated {max_diff:.5}");
    }

    Ok(())
}

/// Bright window over a dark textured room: a wide luminance range with fine detail.
fn synthetic_scene(size: usize) -> PlaneF32 {
    let mut data = Vec::with_capacity(size * size * 3);
    for y in 0..size {
        for x in 0..size {
            let (u, v) = (x as f32 / size as f32, y as f32 / size as f32);
            let window = (0.3..0.7).contains(&u) && (0.2..0.5).contains(&v);
            let texture = 0.5 + 0.5 * (u * 90.0).sin() * (v * 70.0).sin();
            let level = if window { 0.8 + 0.15 * texture } else { 0.02 + 0.03 * texture };
            data.extend_from_slice(&[level, level * 0.9, level * 0.7]);
        }
    }
    PlaneF32::from_vec(size, size, 3, data)
}

fn print_stats(label: &str, plane: &PlaneF32) {
    let (min, max) = plane.min_max();
    let mean = plane.data().iter().sum::<f32>() / plane.len() as f32;
    println!("{label:>20}: min {min:.4}, max {max:.4}, mean {mean:.4}");
}

fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
