use crate::config::SamplingGrid;
use crate::sampler::{BranchingTable, ChannelCurve, InterpCurve};
use crate::style::{channel_styles, secondary_style, ChannelStyle};

// ---------------------------------------------------------------------------
// BranchingEvaluator – validate and view a persisted table
// ---------------------------------------------------------------------------

/// Re-evaluates a (typically reloaded) [`BranchingTable`] at arbitrary
/// energies, using the same interpolation rule the builder used.
///
/// This performs no new computation: it exists to confirm that the artifact
/// survives the round trip through storage and to derive the stacked
/// diagnostic view.
#[derive(Debug, Clone)]
pub struct BranchingEvaluator {
    channels: Vec<usize>,
    curves: Vec<InterpCurve>,
}

impl BranchingEvaluator {
    pub fn new(table: &BranchingTable) -> Self {
        Self {
            channels: table.rows.iter().map(|r| r.channel).collect(),
            curves: table
                .rows
                .iter()
                .map(|r| InterpCurve::from_points(r.points.clone()))
                .collect(),
        }
    }

    /// Channel identifiers in row order.
    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    /// Per-row probabilities at `energy`, in row order.
    pub fn probabilities(&self, energy: f64) -> Vec<f64> {
        self.curves.iter().map(|c| c.evaluate(energy)).collect()
    }

    /// Cumulative probabilities at `energy`: entry `i` is the sum over rows
    /// `0..=i`. The last entry is the total, expected to be 1.
    pub fn stacked(&self, energy: f64) -> Vec<f64> {
        let mut acc = 0.0;
        self.curves
            .iter()
            .map(|c| {
                acc += c.evaluate(energy);
                acc
            })
            .collect()
    }

    /// Stacked curves over the whole grid, one per row — the cumulative view
    /// a diagnostics layer draws as a filled stack.
    pub fn stacked_bands(&self, grid: &SamplingGrid) -> Vec<ChannelCurve> {
        let mut bands: Vec<ChannelCurve> = self
            .channels
            .iter()
            .map(|&channel| ChannelCurve {
                channel,
                points: Vec::with_capacity(grid.len()),
            })
            .collect();
        for energy in grid.energies() {
            for (band, level) in bands.iter_mut().zip(self.stacked(energy)) {
                band.points.push((energy, level));
            }
        }
        bands
    }

    /// [`stacked_bands`](Self::stacked_bands) paired with display styles,
    /// ready for a diagnostics layer to draw as a filled stack. Rows with a
    /// channel index at or beyond `indexed_channels` are the secondary
    /// curve and are styled black.
    pub fn styled_stacked_bands(
        &self,
        grid: &SamplingGrid,
        indexed_channels: usize,
    ) -> Vec<(ChannelStyle, ChannelCurve)> {
        let styles = channel_styles(indexed_channels);
        self.stacked_bands(grid)
            .into_iter()
            .map(|band| {
                let style = styles
                    .get(band.channel)
                    .cloned()
                    .unwrap_or_else(secondary_style);
                (style, band)
            })
            .collect()
    }

    /// Grid energies where the probabilities do not sum to 1 within `tol`,
    /// together with the offending sum. Empty means the table is a valid
    /// distribution everywhere.
    pub fn check_normalization(&self, grid: &SamplingGrid, tol: f64) -> Vec<(f64, f64)> {
        grid.energies()
            .filter_map(|energy| {
                let sum: f64 = self.probabilities(energy).iter().sum();
                ((sum - 1.0).abs() > tol).then_some((energy, sum))
            })
            .collect()
    }
}
