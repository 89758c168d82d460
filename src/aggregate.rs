use crate::data::model::Spectrum;
use crate::error::{GenError, Result};

// ---------------------------------------------------------------------------
// Composite spectra
// ---------------------------------------------------------------------------

/// Bin-wise sum of per-channel spectra into one composite spectrum.
///
/// All inputs must share the identical bin layout; the sum is a fresh
/// value, inputs are left untouched.
pub fn aggregate(spectra: &[Spectrum]) -> Result<Spectrum> {
    let first = spectra
        .first()
        .ok_or_else(|| GenError::Config("cannot aggregate zero spectra".into()))?;
    let mut contents = first.contents.clone();
    for (idx, s) in spectra.iter().enumerate().skip(1) {
        if !s.same_binning(first) {
            return Err(GenError::ShapeMismatch {
                context: format!("aggregate input {idx}"),
                detail: first.binning_mismatch(s),
            });
        }
        for (acc, y) in contents.iter_mut().zip(&s.contents) {
            *acc += y;
        }
    }
    Ok(Spectrum {
        centers: first.centers.clone(),
        contents,
    })
}

/// `a - factor * b`, bin-wise. Used to subtract the scaled background run
/// from a measured spectrum before comparing it to the composite.
pub fn subtract_scaled(a: &Spectrum, b: &Spectrum, factor: f64) -> Result<Spectrum> {
    if !a.same_binning(b) {
        return Err(GenError::ShapeMismatch {
            context: "background subtraction".into(),
            detail: a.binning_mismatch(b),
        });
    }
    Ok(Spectrum {
        centers: a.centers.clone(),
        contents: a
            .contents
            .iter()
            .zip(&b.contents)
            .map(|(ya, yb)| ya - factor * yb)
            .collect(),
    })
}

/// Sum of contents over bins whose center is at or above `threshold`.
pub fn integrate_above(spectrum: &Spectrum, threshold: f64) -> f64 {
    spectrum
        .centers
        .iter()
        .zip(&spectrum.contents)
        .filter(|(c, _)| **c >= threshold)
        .map(|(_, y)| y)
        .sum()
}

// ---------------------------------------------------------------------------
// YieldTable – above-threshold bookkeeping for one detector
// ---------------------------------------------------------------------------

/// Above-threshold yields for one detector: one entry per indexed channel
/// plus the secondary (two-proton) yield.
#[derive(Debug, Clone)]
pub struct YieldTable {
    pub detector: usize,
    pub channel_yields: Vec<f64>,
    pub secondary_yield: f64,
}

impl YieldTable {
    /// Integrate already-scaled spectra above `threshold`.
    pub fn from_spectra(
        detector: usize,
        scaled_channels: &[Spectrum],
        secondary: &Spectrum,
        threshold: f64,
    ) -> Self {
        Self {
            detector,
            channel_yields: scaled_channels
                .iter()
                .map(|s| integrate_above(s, threshold))
                .collect(),
            secondary_yield: integrate_above(secondary, threshold),
        }
    }

    /// Total yield: all channels plus the secondary.
    pub fn total(&self) -> f64 {
        self.channel_yields.iter().sum::<f64>() + self.secondary_yield
    }

    /// Secondary share of the total. Reports 0 for an empty detector
    /// instead of dividing by zero.
    pub fn secondary_ratio(&self) -> f64 {
        let total = self.total();
        if total == 0.0 {
            0.0
        } else {
            self.secondary_yield / total
        }
    }
}

/// The single reported ratio: summed secondary yields over summed totals
/// across all detectors (not a mean of per-detector ratios).
pub fn aggregate_secondary_ratio<'a, I>(tables: I) -> f64
where
    I: IntoIterator<Item = &'a YieldTable>,
{
    let (secondary, total) = tables
        .into_iter()
        .fold((0.0, 0.0), |(s, t), y| (s + y.secondary_yield, t + y.total()));
    if total == 0.0 {
        0.0
    } else {
        secondary / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::scale;

    fn spectrum(centers: &[f64], contents: &[f64]) -> Spectrum {
        Spectrum::new(centers.to_vec(), contents.to_vec()).unwrap()
    }

    #[test]
    fn aggregation_is_commutative() {
        let a = spectrum(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        let b = spectrum(&[1.0, 2.0, 3.0], &[0.5, 0.0, -1.0]);
        let c = spectrum(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]);

        let fwd = aggregate(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let rev = aggregate(&[c, b, a]).unwrap();
        for (x, y) in fwd.contents.iter().zip(&rev.contents) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn aggregation_rejects_mismatched_binning() {
        let a = spectrum(&[1.0, 2.0], &[1.0, 1.0]);
        let b = spectrum(&[1.0, 2.5], &[1.0, 1.0]);
        match aggregate(&[a, b]) {
            // equal counts, differing centers: the detail names the center
            Err(GenError::ShapeMismatch { detail, .. }) => {
                assert!(detail.contains("index 1"), "unhelpful detail: {detail}");
                assert!(detail.contains("2.5"), "unhelpful detail: {detail}");
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn integration_threshold_is_inclusive() {
        let s = spectrum(&[4.9, 5.0, 5.1], &[100.0, 1.0, 2.0]);
        assert_eq!(integrate_above(&s, 5.0), 3.0);
    }

    #[test]
    fn integration_is_linear_under_scaling() {
        let s = spectrum(&[4.0, 5.0, 6.0, 7.0], &[1.0, 2.0, 3.0, 4.0]);
        for &f in &[0.0, 0.5, 1.0, 36.982545] {
            let lhs = integrate_above(&scale(&s, f), 5.0);
            let rhs = f * integrate_above(&s, 5.0);
            assert!((lhs - rhs).abs() < 1e-9, "factor {f}: {lhs} vs {rhs}");
        }
    }

    #[test]
    fn secondary_ratio_matches_hand_computation() {
        // channel yields [10, 0, 5], secondary 2 => total 17, ratio 2/17
        let centers = [4.0, 6.0];
        let channels = vec![
            spectrum(&centers, &[99.0, 10.0]),
            spectrum(&centers, &[5.0, 0.0]),
            spectrum(&centers, &[1.0, 5.0]),
        ];
        let secondary = spectrum(&centers, &[0.0, 2.0]);
        let table = YieldTable::from_spectra(0, &channels, &secondary, 5.0);

        assert!((table.total() - 17.0).abs() < 1e-12);
        assert!((table.secondary_ratio() - 2.0 / 17.0).abs() < 1e-12);
        // with only one detector present the aggregate ratio is the same
        let ratio = aggregate_secondary_ratio([&table]);
        assert!((ratio - 0.117647).abs() < 1e-5);
    }

    #[test]
    fn empty_detector_reports_zero_ratio() {
        let table = YieldTable {
            detector: 0,
            channel_yields: vec![0.0, 0.0],
            secondary_yield: 0.0,
        };
        assert_eq!(table.secondary_ratio(), 0.0);
        assert_eq!(aggregate_secondary_ratio([&table]), 0.0);
    }

    #[test]
    fn background_subtraction_applies_factor() {
        let phys = spectrum(&[1.0, 2.0], &[10.0, 8.0]);
        let bg = spectrum(&[1.0, 2.0], &[1.0, 2.0]);
        let residual = subtract_scaled(&phys, &bg, 4.42).unwrap();
        assert!((residual.contents[0] - (10.0 - 4.42)).abs() < 1e-12);
        assert!((residual.contents[1] - (8.0 - 8.84)).abs() < 1e-12);
    }
}
