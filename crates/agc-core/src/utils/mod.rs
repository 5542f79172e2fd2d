use accurate::{sum::Klein, traits::*};
use auto_ops::impl_op_ex;
use serde::{Deserialize, Serialize};

/// Useful enumerations for object kinds and analysis regions.
pub mod enums;
/// Plain three- and four-vectors for kinematics.
pub mod vectors;

/// A helper method to get histogram edges from evenly-spaced `bins` over a given `range`
/// # See Also
/// [`Histogram`]
/// [`get_bin_index`]
pub fn get_bin_edges(bins: usize, range: (f64, f64)) -> Vec<f64> {
    let bin_width = (range.1 - range.0) / (bins as f64);
    (0..=bins)
        .map(|i| range.0 + (i as f64 * bin_width))
        .collect()
}

/// A helper method to obtain the index of a bin where a value should go in a histogram with evenly
/// spaced `bins` over a given `range`
///
/// # See Also
/// [`Histogram`]
/// [`get_bin_edges`]
pub fn get_bin_index(value: f64, bins: usize, limits: (f64, f64)) -> Option<usize> {
    if value >= limits.0 && value < limits.1 {
        let bin_width = (limits.1 - limits.0) / bins as f64;
        let bin_index = ((value - limits.0) / bin_width).floor() as usize;
        Some(bin_index.min(bins - 1))
    } else {
        None
    }
}

/// A weighted histogram with evenly spaced bins.
///
/// Entries outside the range are accumulated into `underflow`/`overflow` rather than dropped, and
/// the sum of squared weights is tracked per bin so that statistical uncertainties survive
/// merging. Histograms with identical binning combine with `+`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// The weighted number of counts in each bin
    pub counts: Vec<f64>,
    /// The sum of squared weights in each bin
    pub variances: Vec<f64>,
    /// The edges of each bin (length is one greater than `counts`)
    pub bin_edges: Vec<f64>,
    pub underflow: f64,
    pub overflow: f64,
}

impl Histogram {
    /// Create an empty histogram with `bins` evenly spaced bins over `range`.
    ///
    /// # Panics
    ///
    /// Panics if `bins` is zero or the range is empty.
    pub fn new(bins: usize, range: (f64, f64)) -> Self {
        assert!(bins > 0, "Number of bins must be greater than zero!");
        assert!(
            range.1 > range.0,
            "The lower edge of the range must be smaller than the upper edge!"
        );
        Self {
            counts: vec![0.0; bins],
            variances: vec![0.0; bins],
            bin_edges: get_bin_edges(bins, range),
            underflow: 0.0,
            overflow: 0.0,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn range(&self) -> (f64, f64) {
        (self.bin_edges[0], self.bin_edges[self.n_bins()])
    }

    /// Fill every value with the same weight. NaN values are ignored.
    pub fn fill<T: AsRef<[f64]>>(&mut self, values: T, weight: f64) {
        let (bins, range) = (self.n_bins(), self.range());
        for &value in values.as_ref() {
            if value.is_nan() {
                continue;
            }
            match get_bin_index(value, bins, range) {
                Some(bin_index) => {
                    self.counts[bin_index] += weight;
                    self.variances[bin_index] += weight * weight;
                }
                None if value < range.0 => self.underflow += weight,
                None => self.overflow += weight,
            }
        }
    }

    /// Fill with one weight per value.
    ///
    /// # Panics
    ///
    /// Panics if `values` and `weights` have different lengths.
    pub fn fill_weighted<T: AsRef<[f64]>>(&mut self, values: T, weights: T) {
        assert_eq!(
            values.as_ref().len(),
            weights.as_ref().len(),
            "`values` and `weights` must have the same length!"
        );
        for (&value, &weight) in values.as_ref().iter().zip(weights.as_ref()) {
            self.fill([value], weight);
        }
    }

    /// The in-range weighted sum.
    pub fn total(&self) -> f64 {
        self.counts
            .iter()
            .copied()
            .sum_with_accumulator::<Klein<f64>>()
    }

    pub fn same_binning(&self, other: &Self) -> bool {
        self.bin_edges == other.bin_edges
    }

    fn merge(&self, other: &Self) -> Self {
        assert!(
            self.same_binning(other),
            "Histograms must share binning to be added!"
        );
        Self {
            counts: self
                .counts
                .iter()
                .zip(&other.counts)
                .map(|(a, b)| a + b)
                .collect(),
            variances: self
                .variances
                .iter()
                .zip(&other.variances)
                .map(|(a, b)| a + b)
                .collect(),
            bin_edges: self.bin_edges.clone(),
            underflow: self.underflow + other.underflow,
            overflow: self.overflow + other.overflow,
        }
    }
}

impl_op_ex!(+ |a: &Histogram, b: &Histogram| -> Histogram { a.merge(b) });

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_bin_edges() {
        assert_eq!(get_bin_edges(4, (0.0, 2.0)), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_bin_index_limits() {
        assert_eq!(get_bin_index(0.0, 4, (0.0, 2.0)), Some(0));
        assert_eq!(get_bin_index(1.99, 4, (0.0, 2.0)), Some(3));
        assert_eq!(get_bin_index(2.0, 4, (0.0, 2.0)), None);
        assert_eq!(get_bin_index(-0.1, 4, (0.0, 2.0)), None);
    }

    #[test]
    fn test_fill_tracks_flow_and_variance() {
        let mut hist = Histogram::new(25, (50.0, 550.0));
        hist.fill([60.0, 65.0, 40.0, 600.0, f64::NAN], 0.5);
        assert_relative_eq!(hist.counts[0], 1.0);
        assert_relative_eq!(hist.variances[0], 0.5);
        assert_relative_eq!(hist.underflow, 0.5);
        assert_relative_eq!(hist.overflow, 0.5);
        assert_relative_eq!(hist.total(), 1.0);
    }

    #[test]
    fn test_addition_is_bin_wise() {
        let mut a = Histogram::new(2, (0.0, 2.0));
        let mut b = Histogram::new(2, (0.0, 2.0));
        a.fill([0.5], 1.0);
        b.fill_weighted([0.5, 1.5], [2.0, 3.0]);
        let c = &a + &b;
        assert_eq!(c.counts, vec![3.0, 3.0]);
        assert_eq!(c.variances, vec![5.0, 9.0]);
    }

    #[test]
    #[should_panic]
    fn test_addition_requires_same_binning() {
        let _ = Histogram::new(2, (0.0, 2.0)) + Histogram::new(3, (0.0, 2.0));
    }
}
