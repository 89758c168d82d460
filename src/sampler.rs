use crate::config::GeneratorConfig;
use crate::data::model::Spectrum;
use crate::error::{GenError, Result};

// ---------------------------------------------------------------------------
// InterpCurve – linear interpolation with clamped ends
// ---------------------------------------------------------------------------

/// A piecewise-linear curve over `(x, y)` points sorted by `x`.
///
/// Queries outside the covered range return the boundary value rather than
/// extrapolating, which keeps grid points just outside data coverage
/// well-behaved.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpCurve {
    points: Vec<(f64, f64)>,
}

impl InterpCurve {
    pub fn from_points(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Curve through a spectrum's `(center, content)` pairs.
    pub fn from_spectrum(spectrum: &Spectrum) -> Self {
        Self {
            points: spectrum
                .centers
                .iter()
                .copied()
                .zip(spectrum.contents.iter().copied())
                .collect(),
        }
    }

    /// Linear interpolation between the two neighbouring points; clamped to
    /// the boundary values outside the covered range.
    pub fn evaluate(&self, x: f64) -> f64 {
        let pts = &self.points;
        let (first, last) = match (pts.first(), pts.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };
        if x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }
        let hi = pts.partition_point(|&(px, _)| px < x);
        let (x0, y0) = pts[hi - 1];
        let (x1, y1) = pts[hi];
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

// ---------------------------------------------------------------------------
// BranchingTable – the generator artifact
// ---------------------------------------------------------------------------

/// One table row: ordered `(energy, probability)` points for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCurve {
    pub channel: usize,
    pub points: Vec<(f64, f64)>,
}

/// Energy-indexed branching probabilities for one detector. At every grid
/// energy the per-channel probabilities are non-negative and sum to 1
/// (up to the epsilon exclusion below).
#[derive(Debug, Clone, PartialEq)]
pub struct BranchingTable {
    pub detector: usize,
    pub rows: Vec<ChannelCurve>,
}

/// Build the branching table for one detector from its scaled per-channel
/// spectra (the caller may append the secondary spectrum as a final entry).
///
/// Per grid energy: evaluate every channel's rebinned curve, clamp negative
/// values to 0 and share out `value / total`. Channels at or below the
/// epsilon get probability 0 (their value still counts towards the total).
/// When the total itself is at or below epsilon, the configured fallback
/// channel takes probability 1 — a deliberate policy inherited from the
/// original analysis, kept because downstream sampling requires a valid
/// distribution at every grid point.
pub fn build_branching_table(
    detector: usize,
    spectra: &[Spectrum],
    cfg: &GeneratorConfig,
) -> Result<BranchingTable> {
    let first = spectra
        .first()
        .ok_or_else(|| GenError::Config("cannot build a sampler from zero spectra".into()))?;
    for (idx, s) in spectra.iter().enumerate().skip(1) {
        if !s.same_binning(first) {
            return Err(GenError::ShapeMismatch {
                context: format!("sampler build for detector {detector}, input {idx}"),
                detail: first.binning_mismatch(s),
            });
        }
    }

    let curves: Vec<InterpCurve> = spectra
        .iter()
        .map(|s| InterpCurve::from_spectrum(&s.rebin(cfg.rebin_factor)))
        .collect();

    let grid_len = cfg.grid.len();
    let mut rows: Vec<ChannelCurve> = (0..curves.len())
        .map(|channel| ChannelCurve {
            channel,
            points: Vec::with_capacity(grid_len),
        })
        .collect();

    for energy in cfg.grid.energies() {
        let values: Vec<f64> = curves.iter().map(|c| c.evaluate(energy).max(0.0)).collect();
        let total: f64 = values.iter().sum();
        let degenerate = total <= cfg.epsilon;

        for (channel, row) in rows.iter_mut().enumerate() {
            let probability = if degenerate {
                if channel == cfg.fallback_channel {
                    1.0
                } else {
                    0.0
                }
            } else if values[channel] > cfg.epsilon {
                values[channel] / total
            } else {
                0.0
            };
            row.points.push((energy, probability));
        }
    }

    Ok(BranchingTable {
        detector,
        rows,
    })
}
