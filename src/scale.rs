use crate::data::model::Spectrum;

/// Multiply every bin content by `factor`; bin centers are unchanged.
///
/// Per-bin uncertainties are deliberately not propagated: the scaled output
/// starts with zero uncertainty, matching the upstream normalization
/// contract.
pub fn scale(spectrum: &Spectrum, factor: f64) -> Spectrum {
    Spectrum {
        centers: spectrum.centers.clone(),
        contents: spectrum.contents.iter().map(|y| y * factor).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_contents_only() {
        let s = Spectrum::new(vec![1.0, 2.0, 3.0], vec![1.0, -2.0, 4.0]).unwrap();
        let scaled = scale(&s, 2.5);
        assert_eq!(scaled.centers, s.centers);
        assert_eq!(scaled.contents, vec![2.5, -5.0, 10.0]);
        // input untouched
        assert_eq!(s.contents, vec![1.0, -2.0, 4.0]);
    }

    #[test]
    fn scaling_by_zero_empties_the_spectrum() {
        let s = Spectrum::new(vec![1.0, 2.0], vec![3.0, 4.0]).unwrap();
        assert_eq!(scale(&s, 0.0).contents, vec![0.0, 0.0]);
    }
}
