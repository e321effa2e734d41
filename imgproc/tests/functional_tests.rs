use cv_core::Dataset;
use cv_imgproc::*;
use cv_runtime::{ReduceStrategy, WorkerGroup};
use image::{GrayImage, Luma};
use proptest::prelude::*;
use std::time::Duration;

fn group(workers: usize) -> WorkerGroup {
    WorkerGroup::new(workers, Duration::from_secs(10), "functional").unwrap()
}

fn gradient_image(width: u32, height: u32) -> GrayImage {
    let mut img = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            // Low-contrast band between 90 and 130.
            let v = 90 + ((x * 7 + y * 3) % 41) as u8;
            img.put_pixel(x, y, Luma([v]));
        }
    }
    img
}

#[test]
fn test_four_by_four_scenario() {
    let pixels: Vec<u8> = vec![0, 0, 1, 1, 2, 2, 3, 3, 0, 1, 2, 3, 0, 1, 2, 3];
    let result = equalize_partitioned(
        &group(2),
        Dataset::new(pixels.clone()),
        EqualizeOptions::default(),
    )
    .unwrap();

    for v in 0..4u8 {
        assert_eq!(result.histogram.get(v), 4);
    }
    assert_eq!(result.histogram.total(), 16);
    assert_eq!(result.cdf.get(0), 4);
    assert_eq!(result.cdf.get(1), 8);
    assert_eq!(result.cdf.get(2), 12);
    assert_eq!(result.cdf.get(3), 16);
    assert_eq!(result.cdf.get(255), 16);

    // round(256 * (256 / 16) * (cdf[v] / 256)) = 16 * cdf[v], clamped to 255.
    let expected: Vec<u8> = pixels
        .iter()
        .map(|&v| ((16 * result.cdf.get(v)) as f64).min(255.0) as u8)
        .collect();
    assert_eq!(result.pixels.as_slice(), expected.as_slice());
    assert_eq!(&result.table.as_slice()[..4], &[64, 128, 192, 255]);
}

#[test]
fn test_worker_count_invariance() {
    let img = gradient_image(61, 37);
    let serial = equalize_serial(img.as_raw(), RemapFormula::Scaled).unwrap();

    for workers in [1, 2, 4, 8] {
        for reduce in [ReduceStrategy::PointToPoint, ReduceStrategy::Tree] {
            let options = EqualizeOptions {
                reduce,
                ..EqualizeOptions::default()
            };
            let result =
                equalize_partitioned(&group(workers), Dataset::new(img.as_raw().clone()), options)
                    .unwrap();
            assert_eq!(result.pixels.as_slice(), serial.as_slice(), "workers={workers}");
            assert_eq!(result.partitions.workers(), workers);
        }
    }
}

#[test]
fn test_histogram_equalization_improves_contrast() {
    let img = gradient_image(32, 32);
    let equalized = equalize_image(&group(4), &img, EqualizeOptions::default()).unwrap();

    assert_eq!(equalized.dimensions(), img.dimensions());
    let max_val = equalized.pixels().map(|p| p[0]).max().unwrap();
    let min_val = equalized.pixels().map(|p| p[0]).min().unwrap();
    assert_eq!(max_val, 255);
    assert!(min_val < 90);
}

#[test]
fn test_legacy_formula_matches_serial() {
    let img = gradient_image(17, 9);
    let serial = equalize_serial(img.as_raw(), RemapFormula::Legacy).unwrap();
    let options = EqualizeOptions {
        formula: RemapFormula::Legacy,
        ..EqualizeOptions::default()
    };
    let result =
        equalize_partitioned(&group(3), Dataset::new(img.as_raw().clone()), options).unwrap();
    assert_eq!(result.pixels.as_slice(), serial.as_slice());
}

#[test]
fn test_legacy_formula_differs_from_scaled() {
    // 512x512 image, so L / A = 1 / 1024.
    let mut pixels = vec![0u8; 1_000];
    pixels.extend(std::iter::repeat(1u8).take(100_000));
    pixels.extend(std::iter::repeat(2u8).take(512 * 512 - 101_000));

    let options = EqualizeOptions {
        formula: RemapFormula::Legacy,
        ..EqualizeOptions::default()
    };
    let legacy = equalize_partitioned(&group(4), Dataset::new(pixels.clone()), options).unwrap();
    let scaled = equalize_serial(&pixels, RemapFormula::Scaled).unwrap();

    // cdf[0] = 1000: round(0.977) = 1 vs 3 buckets -> 0.75 -> 0.
    assert_eq!(scaled[0], 1);
    assert_eq!(legacy.table.apply(0), 0);
    // cdf[1] = 101000: round(98.63) = 99 vs 394 buckets -> 98.5 -> 98.
    assert_eq!(scaled[1_000], 99);
    assert_eq!(legacy.table.apply(1), 98);
    assert_eq!(legacy.table.apply(2), 255);
    assert_eq!(legacy.pixels.as_slice()[1_000], 98);
}

#[test]
fn test_more_workers_than_pixels_is_configuration_error() {
    let err = equalize_partitioned(
        &group(8),
        Dataset::new(vec![1u8, 2, 3]),
        EqualizeOptions::default(),
    )
    .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_out_of_range_sample_fails_the_run() {
    let mut samples = vec![12u16; 100];
    samples[77] = 4096;
    let err = equalize_partitioned(&group(4), Dataset::new(samples), EqualizeOptions::default())
        .unwrap_err();
    assert!(err.is_data_integrity());
    // Partition 3 covers 75..100.
    assert!(matches!(err, Error::WorkerFailed { rank: 3, .. }));
}

#[test]
fn test_wide_samples_in_range_equalize_like_bytes() {
    let bytes: Vec<u8> = (0..500u32).map(|i| (i % 251) as u8).collect();
    let wide: Vec<i32> = bytes.iter().map(|&b| b as i32).collect();
    let options = EqualizeOptions::default();
    let a = equalize_partitioned(&group(3), Dataset::new(bytes), options).unwrap();
    let b = equalize_partitioned(&group(3), Dataset::new(wide), options).unwrap();
    assert_eq!(a.pixels, b.pixels);
}

proptest! {
    #[test]
    fn cdf_is_monotonic_and_complete(samples in prop::collection::vec(any::<u8>(), 1..4000)) {
        let cdf = Cdf::from_histogram(&Histogram::aggregate(&samples).unwrap());
        for v in 0..255u8 {
            prop_assert!(cdf.get(v) <= cdf.get(v + 1));
        }
        prop_assert_eq!(cdf.total(), samples.len() as u64);
    }

    #[test]
    fn remap_is_monotonic_and_tops_out_at_255(
        samples in prop::collection::vec(any::<u8>(), 1..2000),
    ) {
        let cdf = Cdf::from_histogram(&Histogram::aggregate(&samples).unwrap());
        let brightest = *samples.iter().max().unwrap();
        let table = RemapTable::from_cdf(&cdf, RemapFormula::Scaled);
        let legacy = RemapTable::from_cdf(&cdf, RemapFormula::Legacy);
        for v in 0..255u8 {
            prop_assert!(table.apply(v) <= table.apply(v + 1));
            prop_assert!(legacy.apply(v) <= legacy.apply(v + 1));
        }
        prop_assert_eq!(table.apply(brightest), 255);
    }

    #[test]
    fn partitioned_equals_serial(
        samples in prop::collection::vec(any::<u8>(), 8..1500),
        workers in 1usize..8,
    ) {
        let serial = equalize_serial(&samples, RemapFormula::Scaled).unwrap();
        let options = EqualizeOptions::default();
        let result = equalize_partitioned(&group(workers), Dataset::new(samples), options).unwrap();
        prop_assert_eq!(result.pixels.into_inner(), serial);
    }
}
