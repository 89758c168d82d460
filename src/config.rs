use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Per-channel cross-section normalization factors for the production
/// campaign, indexed by channel (ground state first).
pub const DEFAULT_SCALE_FACTORS: [f64; 41] = [
    36.982545, 54.633287, 62.085444, 48.770858, 52.704735, 50.506098, 42.675392, 37.507057,
    38.011826, 21.401443, 36.845087, 32.023705, 32.741086, 18.226524, 28.519727, 30.878202,
    31.323751, 26.627127, 25.394701, 23.673539, 14.323031, 24.097924, 12.652305, 15.346899,
    10.520887, 19.483616, 15.459227, 16.390521, 14.979996, 12.825722, 12.631248, 6.778514,
    12.05896, 5.102659, 5.492337, 9.130406, 7.219848, 3.102373, 7.063787, 6.688967, 2.982683,
];

// ---------------------------------------------------------------------------
// SamplingGrid – the energy axis of the branching table
// ---------------------------------------------------------------------------

/// Regular energy grid the branching probabilities are tabulated on.
///
/// Covers `[min, max)` in steps of `step`, half-open like the original
/// sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingGrid {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SamplingGrid {
    /// Number of grid points.
    pub fn len(&self) -> usize {
        ((self.max - self.min) / self.step - 1e-9).ceil() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grid energies, lowest first.
    pub fn energies(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |i| self.min + i as f64 * self.step)
    }
}

// ---------------------------------------------------------------------------
// GeneratorConfig – every externally supplied scalar in one place
// ---------------------------------------------------------------------------

/// Configuration for one generator run.
///
/// Defaults reproduce the production campaign: 5 telescopes, 41 proton
/// channels plus the two-proton secondary, yields above 5 MeV, sampling
/// grid 5–30 MeV in 0.1 MeV steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of independent detector units (telescopes).
    pub detectors: usize,
    /// Number of indexed reaction channels.
    pub channels: usize,
    /// Per-channel normalization factors; length must equal `channels`.
    pub scale_factors: Vec<f64>,
    /// Normalization factor for the secondary (two-proton) spectrum.
    pub secondary_scale: f64,
    /// Persist the secondary curve alongside the indexed channels.
    pub write_secondary_curve: bool,
    /// Yields integrate spectrum content at or above this energy.
    pub yield_threshold: f64,
    /// Energy grid of the branching table.
    pub grid: SamplingGrid,
    /// Densities at or below this value are treated as absent.
    pub epsilon: f64,
    /// Adjacent-bin merge factor applied before curve interpolation.
    pub rebin_factor: usize,
    /// Channel granted probability 1 when total density is degenerate.
    pub fallback_channel: usize,
    /// Scale applied to the background run before subtraction.
    pub background_factor: f64,
    /// Scale applied to the composite when comparing against measurement.
    pub composite_scale: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            detectors: 5,
            channels: DEFAULT_SCALE_FACTORS.len(),
            scale_factors: DEFAULT_SCALE_FACTORS.to_vec(),
            secondary_scale: 131.664094,
            write_secondary_curve: false,
            yield_threshold: 5.0,
            grid: SamplingGrid {
                min: 5.0,
                max: 30.0,
                step: 0.1,
            },
            epsilon: 1e-3,
            rebin_factor: 2,
            fallback_channel: 0,
            background_factor: 4.42,
            composite_scale: 1.5e-5,
        }
    }
}

impl GeneratorConfig {
    /// Load a configuration from a JSON file; missing fields fall back to
    /// the defaults above.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| GenError::Config(format!("reading {}: {e}", path.display())))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| GenError::Config(format!("parsing {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.detectors == 0 {
            return Err(GenError::Config("detectors must be > 0".into()));
        }
        if self.channels == 0 {
            return Err(GenError::Config("channels must be > 0".into()));
        }
        if self.scale_factors.len() != self.channels {
            return Err(GenError::Config(format!(
                "{} scale factors for {} channels",
                self.scale_factors.len(),
                self.channels
            )));
        }
        if self.fallback_channel >= self.channels {
            return Err(GenError::Config(format!(
                "fallback channel {} out of range (channels = {})",
                self.fallback_channel, self.channels
            )));
        }
        if self.rebin_factor == 0 {
            return Err(GenError::Config("rebin factor must be >= 1".into()));
        }
        if !(self.grid.step > 0.0) || !(self.grid.max > self.grid.min) {
            return Err(GenError::Config(format!(
                "bad sampling grid: [{}, {}) step {}",
                self.grid.min, self.grid.max, self.grid.step
            )));
        }
        if self.epsilon < 0.0 {
            return Err(GenError::Config("epsilon must be >= 0".into()));
        }
        Ok(())
    }
}
