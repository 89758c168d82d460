use crate::error::{GenError, Result};

// ---------------------------------------------------------------------------
// Spectrum – an ordered energy histogram
// ---------------------------------------------------------------------------

/// One energy spectrum: bin centers (strictly increasing) and the content
/// of each bin.
///
/// A `Spectrum` is immutable by convention: every transformation (scaling,
/// aggregation, rebinning) produces a new value and leaves its inputs
/// untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Bin centers in energy units, strictly increasing.
    pub centers: Vec<f64>,
    /// Bin contents – same length as `centers`.
    pub contents: Vec<f64>,
}

impl Spectrum {
    /// Build a spectrum, enforcing the layout invariants.
    pub fn new(centers: Vec<f64>, contents: Vec<f64>) -> Result<Self> {
        if centers.is_empty() {
            return Err(GenError::InvalidSpectrum("no bins".into()));
        }
        if centers.len() != contents.len() {
            return Err(GenError::InvalidSpectrum(format!(
                "{} centers but {} contents",
                centers.len(),
                contents.len()
            )));
        }
        for (i, pair) in centers.windows(2).enumerate() {
            if !(pair[1] > pair[0]) {
                return Err(GenError::InvalidSpectrum(format!(
                    "bin centers not strictly increasing at index {}: {} then {}",
                    i, pair[0], pair[1]
                )));
            }
        }
        Ok(Self { centers, contents })
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Whether `other` has the identical bin layout (count and centers).
    pub fn same_binning(&self, other: &Spectrum) -> bool {
        self.centers == other.centers
    }

    /// Describe how `other`'s bin layout differs from `self`'s, for error
    /// context: the bin counts when they disagree, otherwise the first
    /// differing center.
    pub fn binning_mismatch(&self, other: &Spectrum) -> String {
        if self.len() != other.len() {
            return format!("expected {} bins, found {}", self.len(), other.len());
        }
        match self
            .centers
            .iter()
            .zip(&other.centers)
            .position(|(a, b)| a != b)
        {
            Some(k) => format!(
                "bin centers differ at index {k}: {} vs {}",
                self.centers[k], other.centers[k]
            ),
            None => "layouts match".into(),
        }
    }

    /// Merge groups of `group` adjacent bins: the merged center is the mean
    /// of the group's centers, the merged content their sum. A trailing
    /// partial group is kept as its own (smaller) bin. `group <= 1` is a
    /// plain copy.
    pub fn rebin(&self, group: usize) -> Spectrum {
        if group <= 1 {
            return self.clone();
        }
        let n = self.len();
        let mut centers = Vec::with_capacity(n.div_ceil(group));
        let mut contents = Vec::with_capacity(n.div_ceil(group));
        let mut i = 0;
        while i < n {
            let j = (i + group).min(n);
            let width = (j - i) as f64;
            centers.push(self.centers[i..j].iter().sum::<f64>() / width);
            contents.push(self.contents[i..j].iter().sum::<f64>());
            i = j;
        }
        // Means of disjoint increasing ranges stay strictly increasing.
        Spectrum { centers, contents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(centers: &[f64], contents: &[f64]) -> Spectrum {
        Spectrum::new(centers.to_vec(), contents.to_vec()).unwrap()
    }

    #[test]
    fn rejects_unsorted_centers() {
        let err = Spectrum::new(vec![1.0, 3.0, 2.0], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, GenError::InvalidSpectrum(_)));
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(Spectrum::new(vec![1.0, 2.0], vec![0.0]).is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(Spectrum::new(vec![], vec![]).is_err());
    }

    #[test]
    fn rebin_merges_adjacent_pairs() {
        let s = spectrum(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 4.0]);
        let r = s.rebin(2);
        assert_eq!(r.centers, vec![1.5, 3.5]);
        assert_eq!(r.contents, vec![3.0, 7.0]);
    }

    #[test]
    fn rebin_keeps_trailing_odd_bin() {
        let s = spectrum(&[1.0, 2.0, 3.0], &[1.0, 2.0, 5.0]);
        let r = s.rebin(2);
        assert_eq!(r.centers, vec![1.5, 3.0]);
        assert_eq!(r.contents, vec![3.0, 5.0]);
    }

    #[test]
    fn mismatch_description_points_at_the_difference() {
        let a = spectrum(&[1.0, 2.0, 3.0], &[0.0; 3]);
        let b = spectrum(&[1.0, 2.25, 3.0], &[0.0; 3]);
        let c = spectrum(&[1.0, 2.0], &[0.0; 2]);
        assert_eq!(
            a.binning_mismatch(&b),
            "bin centers differ at index 1: 2 vs 2.25"
        );
        assert_eq!(a.binning_mismatch(&c), "expected 3 bins, found 2");
    }

    #[test]
    fn rebin_by_one_is_identity() {
        let s = spectrum(&[1.0, 2.0], &[0.5, 0.25]);
        assert_eq!(s.rebin(1), s);
    }
}
