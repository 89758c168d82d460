use rayon::prelude::*;

use crate::aggregate::{aggregate, aggregate_secondary_ratio, subtract_scaled, YieldTable};
use crate::config::GeneratorConfig;
use crate::data::model::Spectrum;
use crate::data::store::{GeneratorStore, HistogramStore};
use crate::error::{GenError, Result};
use crate::evaluate::BranchingEvaluator;
use crate::sampler::{build_branching_table, BranchingTable};
use crate::scale::scale;

/// Tolerance for the post-persist normalization check.
const NORMALIZATION_TOL: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Per-detector unit of work
// ---------------------------------------------------------------------------

/// Everything produced for one detector.
#[derive(Debug, Clone)]
pub struct DetectorReport {
    pub detector: usize,
    pub yields: YieldTable,
    /// Bin-wise sum of the scaled channel spectra.
    pub composite: Spectrum,
    pub table: BranchingTable,
}

/// Outcome of a full run. Detector failures are isolated: one bad detector
/// never blocks the others.
#[derive(Debug)]
pub struct RunSummary {
    pub reports: Vec<DetectorReport>,
    pub failures: Vec<(usize, GenError)>,
}

impl RunSummary {
    /// Summed secondary yields over summed totals across the detectors
    /// that completed.
    pub fn secondary_ratio(&self) -> f64 {
        aggregate_secondary_ratio(self.reports.iter().map(|r| &r.yields))
    }
}

/// Load, scale, aggregate and build for a single detector, then persist the
/// table and verify the persisted copy. Stages are strictly sequential;
/// nothing here is retried (the computation is deterministic).
pub fn process_detector(
    detector: usize,
    input: &HistogramStore,
    output: &GeneratorStore,
    cfg: &GeneratorConfig,
) -> Result<DetectorReport> {
    let mut scaled = Vec::with_capacity(cfg.channels);
    for channel in 0..cfg.channels {
        let raw = input.read_channel(detector, channel)?;
        scaled.push(scale(&raw, cfg.scale_factors[channel]));
    }
    let secondary = scale(&input.read_secondary(detector)?, cfg.secondary_scale);

    let composite = aggregate(&scaled)?;
    let yields = YieldTable::from_spectra(detector, &scaled, &secondary, cfg.yield_threshold);
    log::info!(
        "tel{}: secondary yield {:.3}, total {:.3}, ratio {:.5}",
        detector + 1,
        yields.secondary_yield,
        yields.total(),
        yields.secondary_ratio()
    );

    let mut sampler_inputs = scaled;
    if cfg.write_secondary_curve {
        sampler_inputs.push(secondary);
    }
    let table = build_branching_table(detector, &sampler_inputs, cfg)?;
    output.write_table(&table)?;

    // Verify the artifact as persisted, not the in-memory copy.
    let reloaded = output.read_table(detector)?;
    let evaluator = BranchingEvaluator::new(&reloaded);
    let off = evaluator.check_normalization(&cfg.grid, NORMALIZATION_TOL);
    if let Some(worst) = off
        .iter()
        .map(|&(_, sum)| (sum - 1.0).abs())
        .max_by(f64::total_cmp)
    {
        log::warn!(
            "tel{}: {} grid points off normalization (worst |sum-1| = {:.3e})",
            detector + 1,
            off.len(),
            worst
        );
    }

    Ok(DetectorReport {
        detector,
        yields,
        composite,
        table,
    })
}

/// Run every detector unit in parallel. Only configuration problems fail
/// the run as a whole; per-detector errors land in the summary.
pub fn run(
    input: &HistogramStore,
    output: &GeneratorStore,
    cfg: &GeneratorConfig,
) -> Result<RunSummary> {
    cfg.validate()?;

    let results: Vec<(usize, Result<DetectorReport>)> = (0..cfg.detectors)
        .into_par_iter()
        .map(|detector| (detector, process_detector(detector, input, output, cfg)))
        .collect();

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (detector, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => {
                log::error!("tel{}: {err}", detector + 1);
                failures.push((detector, err));
            }
        }
    }

    let summary = RunSummary { reports, failures };
    log::info!(
        "secondary ratio above {} MeV: {:.5}",
        cfg.yield_threshold,
        summary.secondary_ratio()
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Measurement comparison helpers
// ---------------------------------------------------------------------------

/// Background-subtracted measured spectrum: `physics - background_factor * bg`.
pub fn background_residual(
    physics: &Spectrum,
    background: &Spectrum,
    cfg: &GeneratorConfig,
) -> Result<Spectrum> {
    subtract_scaled(physics, background, cfg.background_factor)
}

/// Composite scaled into measured-counts units for side-by-side comparison.
pub fn comparison_composite(composite: &Spectrum, cfg: &GeneratorConfig) -> Spectrum {
    scale(composite, cfg.composite_scale)
}
