//! End-to-end: build the branching tables from a small store, persist them,
//! reload them and check the evaluator reproduces the built tables exactly.

use std::fs;
use std::path::Path;

use branchgen::{
    pipeline, BranchingEvaluator, GenError, GeneratorConfig, GeneratorStore, HistogramStore,
    SamplingGrid, TableFormat,
};

/// Bin centers 0.5, 1.5, …, 39.5.
fn centers() -> Vec<f64> {
    (0..40).map(|i| 0.5 + i as f64).collect()
}

/// Write one `ap<ch>.json` (or `a2p.json`) with a flat spectrum of `value`
/// per bin for each detector.
fn write_flat_spectra(dir: &Path, stem: &str, detectors: usize, value: f64) {
    let centers = centers();
    let rows: Vec<serde_json::Value> = (0..detectors)
        .map(|d| {
            serde_json::json!({
                "detector": d,
                "x": centers,
                "y": vec![value; centers.len()],
            })
        })
        .collect();
    fs::write(
        dir.join(format!("{stem}.json")),
        serde_json::to_string(&rows).unwrap(),
    )
    .unwrap();
}

fn test_config() -> GeneratorConfig {
    GeneratorConfig {
        detectors: 2,
        channels: 3,
        scale_factors: vec![2.0, 1.0, 0.5],
        secondary_scale: 4.0,
        write_secondary_curve: false,
        grid: SamplingGrid {
            min: 5.0,
            max: 30.0,
            step: 0.1,
        },
        ..GeneratorConfig::default()
    }
}

#[test]
fn pipeline_builds_persists_and_revalidates() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let cfg = test_config();

    // flat channel densities 5, 3, 2 (pre-scaling), secondary 0.5
    write_flat_spectra(input_dir.path(), "ap0", cfg.detectors, 5.0);
    write_flat_spectra(input_dir.path(), "ap1", cfg.detectors, 3.0);
    write_flat_spectra(input_dir.path(), "ap2", cfg.detectors, 2.0);
    write_flat_spectra(input_dir.path(), "a2p", cfg.detectors, 0.5);

    let input = HistogramStore::new(input_dir.path());
    let output = GeneratorStore::new(output_dir.path(), TableFormat::Parquet);

    let summary = pipeline::run(&input, &output, &cfg).unwrap();
    assert!(summary.failures.is_empty());
    assert_eq!(summary.reports.len(), 2);

    // Yields: 35 bins at or above 5.0; scaled densities 10, 3, 1, secondary 2.
    let yields = &summary.reports.iter().find(|r| r.detector == 0).unwrap().yields;
    assert!((yields.channel_yields[0] - 350.0).abs() < 1e-9);
    assert!((yields.channel_yields[1] - 105.0).abs() < 1e-9);
    assert!((yields.channel_yields[2] - 35.0).abs() < 1e-9);
    assert!((yields.secondary_yield - 70.0).abs() < 1e-9);
    let expected_ratio = 70.0 / 560.0;
    assert!((summary.secondary_ratio() - expected_ratio).abs() < 1e-9);

    for report in &summary.reports {
        // The persisted artifact must reproduce the built table exactly.
        let reloaded = output.read_table(report.detector).unwrap();
        assert_eq!(reloaded.rows, report.table.rows);

        // And the evaluator must see a valid distribution everywhere.
        let evaluator = BranchingEvaluator::new(&reloaded);
        assert!(evaluator.check_normalization(&cfg.grid, 1e-6).is_empty());

        // Scaled rebinned densities 20, 6, 2 => shares 20/28, 6/28, 2/28.
        let probs = evaluator.probabilities(10.0);
        assert!((probs[0] - 20.0 / 28.0).abs() < 1e-9);
        assert!((probs[1] - 6.0 / 28.0).abs() < 1e-9);
        assert!((probs[2] - 2.0 / 28.0).abs() < 1e-9);
    }
}

#[test]
fn secondary_curve_is_persisted_when_enabled() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config();
    cfg.detectors = 1;
    cfg.write_secondary_curve = true;

    write_flat_spectra(input_dir.path(), "ap0", 1, 5.0);
    write_flat_spectra(input_dir.path(), "ap1", 1, 3.0);
    write_flat_spectra(input_dir.path(), "ap2", 1, 2.0);
    write_flat_spectra(input_dir.path(), "a2p", 1, 0.5);

    let input = HistogramStore::new(input_dir.path());
    let output = GeneratorStore::new(output_dir.path(), TableFormat::Json);

    let summary = pipeline::run(&input, &output, &cfg).unwrap();
    assert!(summary.failures.is_empty());

    let table = output.read_table(0).unwrap();
    // 3 indexed channels + the secondary row
    assert_eq!(table.rows.len(), 4);
    // secondary participates in the normalization: 20 + 6 + 2 + 4 = 32
    let evaluator = BranchingEvaluator::new(&table);
    let probs = evaluator.probabilities(12.0);
    assert!((probs[3] - 4.0 / 32.0).abs() < 1e-9);
    assert!(evaluator.check_normalization(&cfg.grid, 1e-6).is_empty());
}

#[test]
fn missing_detector_rows_fail_only_that_detector() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let cfg = test_config(); // asks for 2 detectors

    // store only carries detector 0
    write_flat_spectra(input_dir.path(), "ap0", 1, 5.0);
    write_flat_spectra(input_dir.path(), "ap1", 1, 3.0);
    write_flat_spectra(input_dir.path(), "ap2", 1, 2.0);
    write_flat_spectra(input_dir.path(), "a2p", 1, 0.5);

    let input = HistogramStore::new(input_dir.path());
    let output = GeneratorStore::new(output_dir.path(), TableFormat::Parquet);

    let summary = pipeline::run(&input, &output, &cfg).unwrap();
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].detector, 0);
    assert_eq!(summary.failures.len(), 1);
    let (detector, err) = &summary.failures[0];
    assert_eq!(*detector, 1);
    assert!(matches!(
        err,
        GenError::MissingInput {
            detector: 1,
            channel: Some(0),
            ..
        }
    ));

    // the healthy detector's artifact still exists
    assert!(output.read_table(0).is_ok());
}
