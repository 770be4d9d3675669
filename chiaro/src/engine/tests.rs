use std::sync::{Arc, Mutex};

use rand::prelude::*;
use strum::IntoEnumIterator;

use super::*;
use crate::plane::Plane;
use crate::pyramid::Pyramid;
use crate::remap::RemapLookup;

fn noise_plane(width: usize, height: usize, channels: usize, range: (f32, f32), seed: u64) -> PlaneF32 {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height * channels)
        .map(|_| rng.random_range(range.0..range.1))
        .collect();
    Plane::from_vec(width, height, channels, data)
}

/// Smooth diagonal gradient over `[0.2, 0.8]` with a little noise.
fn textured_plane(width: usize, height: usize, seed: u64) -> PlaneF32 {
    let noise = noise_plane(width, height, 1, (-0.05, 0.05), seed);
    let data = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .zip(noise.data())
        .map(|((x, y), n)| {
            let t = (x + y) as f32 / (width + height - 2) as f32;
            (0.25 + 0.5 * t + n).clamp(0.2, 0.8)
        })
        .collect();
    Plane::from_vec(width, height, 1, data)
}

fn max_abs_diff(a: &PlaneF32, b: &PlaneF32) -> f32 {
    assert!(a.same_shape(b));
    a.data()
        .iter()
        .zip(b.data())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

fn mean_abs_diff(a: &PlaneF32, b: &PlaneF32) -> f32 {
    let sum: f32 = a.data().iter().zip(b.data()).map(|(x, y)| (x - y).abs()).sum();
    sum / a.len() as f32
}

fn run(config: Config, source: &PlaneF32) -> PlaneF32 {
    LocalLaplacian::new(config).apply(source).unwrap()
}

fn luminance(rgb: &PlaneF32) -> Vec<f32> {
    rgb.data()
        .chunks_exact(3)
        .map(|px| LUMA_WEIGHTS.iter().zip(px).map(|(w, v)| w * v).sum())
        .collect()
}

fn correlation(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b) {
        let (dx, dy) = (x as f64 - mean_a, y as f64 - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    cov / (var_a * var_b).sqrt()
}

fn std_dev(values: &[f32]) -> f32 {
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n).sqrt()
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn test_identity_float_strategies_gray() {
    let source = noise_plane(24, 20, 1, (0.0, 1.0), 1);
    for operation in [Operation::Exact, Operation::Interpolated] {
        let config = Config {
            threshold: 0.07,
            noise_level: 0.02,
            ..Config::identity().with_operation(operation)
        };
        let out = run(config, &source);
        let err = max_abs_diff(&out, &source);
        assert!(err <= 1e-5, "{operation}: max error {err}");
    }
}

#[test]
fn test_identity_fixed_strategies_within_quantization() {
    let source = noise_plane(24, 20, 1, (0.0, 1.0), 2);
    let (min, max) = source.min_max();
    let unit = (max - min) / 16384.0;
    for operation in [Operation::ExactFixed, Operation::InterpolatedFixed] {
        let out = run(Config::identity().with_operation(operation), &source);
        let err = max_abs_diff(&out, &source);
        assert!(err <= unit, "{operation}: max error {err}, unit {unit}");
    }
}

#[test]
fn test_identity_rgb_and_log_domain() {
    let source = noise_plane(20, 18, 3, (0.0, 1.0), 3);
    for log_domain in [false, true] {
        let config = Config {
            log_domain,
            threshold: if log_domain { -2.0 } else { 0.1 },
            ..Config::identity()
        };
        let out = run(config, &source);
        assert_eq!(out.channels(), 3);
        let err = max_abs_diff(&out, &source);
        assert!(err <= 1e-4, "log_domain {log_domain}: max error {err}");
    }
}

// ============================================================================
// Strategy agreement
// ============================================================================

#[test]
fn test_exact_matches_brute_force_remapped_pyramids() {
    let source = textured_plane(12, 9, 4);
    let (min, max) = source.min_max();
    let remap = RemapFunction::new(0.5, 0.7, 0.1, 0.01);
    let lut = RemapLut::build(&remap, min, max).unwrap();
    let levels = level_count(12, 9);

    let result = exact::remap_exact(
        &source,
        &lut,
        0..=levels - 2,
        &ProgressCallback::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    // One full remapped pyramid per output coefficient.
    let gaussian = Pyramid::gaussian(source.clone(), levels);
    let mut expected = Pyramid::laplacian(&gaussian).into_levels();
    for level in 0..levels - 1 {
        let g = gaussian.level(level);
        for y in 0..g.height() {
            for x in 0..g.width() {
                let g0 = g.get(x, y, 0);
                let remapped = source.map(|v| lut.remap(v, g0));
                let pyramid = Pyramid::gaussian(remapped, level + 2);
                expected[level].set(x, y, 0, pyramid.residual(level).get(x, y, 0));
            }
        }
    }
    let expected = Pyramid::from_levels(expected).reconstruct();

    let err = max_abs_diff(&result, &expected);
    assert!(err < 1e-6, "max error {err}");
}

#[test]
fn test_exact_and_interpolated_agree_for_unit_alpha() {
    let source = textured_plane(32, 32, 5);
    let config = Config {
        alpha: 1.0,
        beta: 0.5,
        threshold: 0.1,
        noise_level: 0.0,
        ..Config::default()
    };
    let exact = run(config.clone().with_operation(Operation::Exact), &source);
    let interpolated = run(config.with_operation(Operation::Interpolated), &source);

    let mean = mean_abs_diff(&exact, &interpolated);
    let max = max_abs_diff(&exact, &interpolated);
    assert!(mean < 2.0 / 255.0, "mean difference {mean}");
    assert!(max < 2.0 / 255.0, "max difference {max}");
    assert!(max_abs_diff(&exact, &source) > 1e-3, "beta 0.5 must change the image");
}

#[test]
fn test_exact_and_interpolated_agree_when_expanding_edges() {
    let source = textured_plane(32, 32, 11);
    let config = Config {
        alpha: 1.0,
        beta: 1.5,
        threshold: 0.05,
        noise_level: 0.0,
        ..Config::default()
    };
    let exact = run(config.clone().with_operation(Operation::Exact), &source);
    let interpolated = run(config.with_operation(Operation::Interpolated), &source);

    let max = max_abs_diff(&exact, &interpolated);
    assert!(max < 2.0 / 255.0, "max difference {max}");
    assert!(max_abs_diff(&exact, &source) > 1e-3, "beta 1.5 must change the image");
}

#[test]
fn test_fixed_point_exact_matches_float() {
    let source = textured_plane(16, 16, 6);
    let config = Config::default();
    let float = run(config.clone().with_operation(Operation::Exact), &source);
    let fixed = run(config.with_operation(Operation::ExactFixed), &source);
    let err = max_abs_diff(&float, &fixed);
    assert!(err < 2.0 / 255.0, "max difference {err}");
}

#[test]
fn test_fixed_point_interpolated_matches_float() {
    let source = textured_plane(32, 24, 7);
    let config = Config::default();
    let float = run(config.clone().with_operation(Operation::Interpolated), &source);
    let fixed = run(config.with_operation(Operation::InterpolatedFixed), &source);
    let err = max_abs_diff(&float, &fixed);
    assert!(err < 2.0 / 255.0, "max difference {err}");
}

#[test]
fn test_detail_enhancement_raises_local_contrast() {
    let mut source = noise_plane(32, 32, 1, (-0.02, 0.02), 8);
    source.data_mut().iter_mut().for_each(|v| *v += 0.5);
    let out = run(Config::detail_enhance(), &source);
    let before = std_dev(source.data());
    let after = std_dev(out.data());
    assert!(after > before * 1.2, "std before {before}, after {after}");
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_rgb_noise_scenario() {
    let source = noise_plane(512, 512, 3, (0.0, 1.0), 9);
    let config = Config {
        alpha: 0.5,
        beta: 0.5,
        threshold: 0.05,
        noise_level: 0.01,
        log_domain: false,
        min_level: 0,
        max_level: usize::MAX,
        outlier_reduction_filter_size: None,
        operation: Operation::Interpolated,
    };
    let out = run(config, &source);

    assert_eq!(out.channels(), 3);
    assert!(out.data().iter().all(|v| v.is_finite()));
    assert!(max_abs_diff(&out, &source) > 1e-2, "output equals input");
    let r = correlation(&luminance(&source), &luminance(&out));
    assert!(r > 0.9, "luminance correlation {r}");
}

#[test]
fn test_all_zero_input_stays_zero() {
    let configs = [
        Config::default(),
        Config::tone_compress(),
        Config::detail_enhance().with_operation(Operation::Exact),
        Config::default().with_operation(Operation::InterpolatedFixed),
    ];
    for channels in [1, 3] {
        let source = Plane::new(16, 12, channels);
        for config in configs.iter().cloned() {
            let out = run(config, &source);
            assert!(
                out.data().iter().all(|&v| v == 0.0),
                "{channels} channels: non-zero output"
            );
        }
    }
}

#[test]
fn test_level_range_outside_pyramid_passes_through() {
    let source = textured_plane(16, 16, 10);
    let out = run(Config::default().with_levels(20, 30), &source);
    assert_eq!(out, source);
}

#[test]
fn test_processed_levels() {
    let config = Config::default();
    assert_eq!(processed_levels(1, &config), None);
    assert_eq!(processed_levels(10, &config), Some(0..=8));
    assert_eq!(processed_levels(10, &config.clone().with_levels(2, 4)), Some(2..=4));
    assert_eq!(processed_levels(4, &config.with_levels(3, 5)), None);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unsupported_channel_count() {
    let mut engine = LocalLaplacian::new(Config::default());
    match engine.apply(&Plane::new(8, 8, 2)) {
        Err(Error::UnsupportedChannelCount { channels }) => assert_eq!(channels, 2),
        other => panic!("expected UnsupportedChannelCount, got {other:?}"),
    }
    assert_eq!(engine.cache_state(), CacheState::Dirty(DirtyReason::Source));
}

#[test]
fn test_non_finite_input_rejected() {
    let mut source = Plane::new_filled(4, 4, 1, 0.5f32);
    source.set(2, 1, 0, f32::NAN);
    let mut engine = LocalLaplacian::new(Config::default());
    match engine.apply(&source) {
        Err(Error::NonFinite { stage, index }) => {
            assert_eq!(stage, "input");
            assert_eq!(index, 6);
        }
        other => panic!("expected NonFinite, got {other:?}"),
    }
}

#[test]
#[should_panic(expected = "Alpha must be positive")]
fn test_non_positive_alpha_panics() {
    LocalLaplacian::new(Config {
        alpha: 0.0,
        ..Config::default()
    });
}

#[test]
#[should_panic(expected = "must not exceed max level")]
fn test_set_config_validates() {
    let mut engine = LocalLaplacian::new(Config::default());
    engine.set_config(Config::default().with_levels(5, 2));
}

#[test]
#[should_panic(expected = "filter size must be positive")]
fn test_zero_outlier_filter_size_panics() {
    Config::default().with_outlier_reduction(0.0).validate();
}

// ============================================================================
// Cache state machine
// ============================================================================

#[test]
fn test_invalidate_keeps_stronger_reason() {
    let state = CacheState::Clean.invalidate(DirtyReason::Parameters);
    assert_eq!(state, CacheState::Dirty(DirtyReason::Parameters));
    let state = state.invalidate(DirtyReason::Source);
    assert_eq!(state, CacheState::Dirty(DirtyReason::Source));
    let state = state.invalidate(DirtyReason::Parameters);
    assert_eq!(state, CacheState::Dirty(DirtyReason::Source));
    assert!(!state.is_clean());
}

#[test]
fn test_cache_transitions() {
    let source = textured_plane(16, 16, 11);
    let mut engine = LocalLaplacian::new(Config::default());
    assert_eq!(engine.cache_state(), CacheState::Dirty(DirtyReason::Source));

    let first = engine.apply(&source).unwrap();
    assert!(engine.cache_state().is_clean());

    // Post-processing only.
    engine.set_config(Config::default().with_outlier_reduction(4.0));
    assert!(engine.cache_state().is_clean());
    let stretched = engine.apply(&source).unwrap();
    let mut expected = first.clone();
    outlier_stretch(&mut expected, 4.0);
    assert_eq!(stretched, expected);

    engine.set_config(Config {
        beta: 0.5,
        ..engine.config().clone()
    });
    assert_eq!(engine.cache_state(), CacheState::Dirty(DirtyReason::Parameters));

    engine.source_changed();
    assert_eq!(engine.cache_state(), CacheState::Dirty(DirtyReason::Source));
    engine.set_config(Config {
        beta: 0.7,
        ..engine.config().clone()
    });
    assert_eq!(engine.cache_state(), CacheState::Dirty(DirtyReason::Source));

    engine.apply(&source).unwrap();
    assert!(engine.cache_state().is_clean());
}

#[test]
fn test_cached_result_reused_until_source_changed() {
    let source = textured_plane(16, 16, 12);
    let other = textured_plane(16, 16, 13);
    let mut engine = LocalLaplacian::new(Config::default());

    let first = engine.apply(&source).unwrap();
    // Same shape, no signal: the cached result is returned.
    assert_eq!(engine.apply(&other).unwrap(), first);

    engine.source_changed();
    let second = engine.apply(&other).unwrap();
    assert_eq!(second, run(Config::default(), &other));
}

#[test]
fn test_shape_change_rebuilds_without_signal() {
    let mut engine = LocalLaplacian::new(Config::default());
    engine.apply(&textured_plane(16, 16, 14)).unwrap();

    let rgb = noise_plane(10, 6, 3, (0.1, 0.9), 15);
    let out = engine.apply(&rgb).unwrap();
    assert_eq!((out.width(), out.height(), out.channels()), (10, 6, 3));
    assert_eq!(out, run(Config::default(), &rgb));
}

// ============================================================================
// Cancellation and progress
// ============================================================================

#[test]
fn test_cancelled_run_leaves_cache_dirty() {
    let source = textured_plane(16, 16, 16);
    for operation in Operation::iter() {
        let token = CancellationToken::new();
        let mut engine = LocalLaplacian::new(Config::default().with_operation(operation));
        engine.set_cancellation_token(token.clone());

        token.cancel();
        assert!(matches!(engine.apply(&source), Err(Error::Cancelled)), "{operation}");
        assert!(!engine.cache_state().is_clean());

        token.reset();
        let out = engine.apply(&source).unwrap();
        assert!(engine.cache_state().is_clean());
        assert_eq!(out, run(Config::default().with_operation(operation), &source));
    }
}

#[test]
fn test_progress_is_monotonic_and_completes() {
    let source = textured_plane(32, 16, 17);
    for operation in Operation::iter() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let mut engine = LocalLaplacian::new(Config::identity().with_operation(operation));
        engine.set_progress_callback(ProgressCallback::new(move |p| {
            sink.lock().unwrap().push(p);
        }));
        engine.apply(&source).unwrap();

        let reports = reports.lock().unwrap();
        assert!(reports.len() > 2, "{operation}: {reports:?}");
        assert!(reports.windows(2).all(|w| w[0] <= w[1]), "{operation}: {reports:?}");
        assert_eq!(*reports.last().unwrap(), 100.0);
        assert!(reports.iter().all(|p| (0.0..=100.0).contains(p)));
        assert!(reports.contains(&95.0), "{operation}: {reports:?}");
    }
}

#[test]
fn test_exact_level_progress_curve() {
    assert_eq!(progress::exact_level_progress(4, 5), 0.0);
    assert_eq!(progress::exact_level_progress(0, 5), 95.0);
    assert!((progress::exact_level_progress(2, 5) - 23.75).abs() < 1e-5);
    assert_eq!(progress::step_progress(15, 16), 95.0);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_json_round_trip() {
    let config = Config::tone_compress().with_operation(Operation::InterpolatedFixed);
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"interpolated_fixed\""));
    let back: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);

    // Missing fields fall back to defaults.
    let partial: Config = serde_json::from_str(r#"{"alpha": 0.75}"#).unwrap();
    assert_eq!(partial.alpha, 0.75);
    assert_eq!(partial.operation, Operation::Interpolated);
    assert_eq!(partial.max_level, usize::MAX);
}

#[test]
fn test_operation_names() {
    let names: Vec<String> = Operation::iter().map(|op| op.to_string()).collect();
    assert_eq!(
        names,
        ["exact", "exact_fixed", "interpolated", "interpolated_fixed"]
    );
    assert!(Operation::ExactFixed.is_exact() && Operation::ExactFixed.is_fixed_point());
    assert!(!Operation::Interpolated.is_exact() && !Operation::Interpolated.is_fixed_point());
}

#[test]
fn test_tone_differs_ignores_outlier_filter() {
    let base = Config::default();
    assert!(!base.tone_differs(&base.clone().with_outlier_reduction(3.0)));
    assert!(base.tone_differs(&base.clone().with_operation(Operation::Exact)));
    assert!(base.tone_differs(&Config {
        log_domain: true,
        ..base.clone()
    }));
}

// ============================================================================
// Color and post-processing
// ============================================================================

#[test]
fn test_color_split_round_trip() {
    let rgb = noise_plane(9, 7, 3, (0.0, 1.0), 18);
    let split = ColorSplit::new(&rgb);
    let (min, _) = split.luminance.min_max();
    assert!(min >= MIN_LUMINANCE * 0.999);
    let back = split.recombine(&split.luminance);
    assert!(max_abs_diff(&back, &rgb) < 1e-5);
}

#[test]
fn test_color_split_gray_pixels_have_unit_ratio() {
    let rgb = Plane::from_vec(2, 1, 3, vec![0.4f32, 0.4, 0.4, 0.8, 0.8, 0.8]);
    let split = ColorSplit::new(&rgb);
    assert!((split.luminance.get(0, 0, 0) - 0.4).abs() < 1e-6);
    for plane in &split.normalized {
        for &v in plane.data() {
            assert!((v - 1.0).abs() < 1e-5);
        }
    }
}

#[test]
fn test_outlier_stretch_ignores_isolated_spike() {
    let width = 32;
    let data: Vec<f32> = (0..width * width)
        .map(|i| 0.3 + 0.4 * (i % width) as f32 / (width - 1) as f32)
        .collect();
    let mut plane = Plane::from_vec(width, width, 1, data);
    plane.set(16, 16, 0, 25.0);

    outlier_stretch(&mut plane, 8.0);
    assert!(plane.data().iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(plane.get(16, 16, 0), 1.0);
    assert_eq!(plane.get(0, 0, 0), 0.0);
    // Without the smoothing the spike would squeeze the ramp into a few percent.
    assert!(plane.get(width - 4, 0, 0) - plane.get(4, 0, 0) > 0.3);
}

#[test]
fn test_outlier_stretch_skips_constant_plane() {
    let mut plane = Plane::new_filled(8, 8, 3, 0.25f32);
    outlier_stretch(&mut plane, 2.0);
    assert!(plane.data().iter().all(|&v| v == 0.25));
}
