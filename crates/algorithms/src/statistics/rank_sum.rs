//! Mann–Whitney U (Wilcoxon rank-sum) test
//!
//! Two independent samples are pooled and ranked; tied values share the
//! mean of the ranks they span (mid-ranks). The statistic is reported
//! with its tie-corrected normal approximation:
//!
//! ```text
//! U1  = R1 - n1 (n1 + 1) / 2
//! z   = (U1 - n1 n2 / 2) / sqrt(n1 n2 / 12 * ((n + 1) - sum(t^3 - t) / (n (n - 1))))
//! ```
//!
//! Neighbour counts take few distinct values, so samples are usually
//! given as frequency histograms rather than raw values.

use ndarray::ArrayView1;

/// Result of a Mann–Whitney U test of sample A against sample B
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannWhitney {
    /// Size of sample A
    pub n1: u64,
    /// Size of sample B
    pub n2: u64,
    /// U statistic of sample A
    pub u: f64,
    /// Z-score; positive when A tends to hold larger values than B
    pub z: f64,
    /// P-value (two-tailed, normal approximation)
    pub p_value: f64,
}

impl MannWhitney {
    /// Test from frequency histograms over a shared value axis.
    ///
    /// Entry `k` of each histogram is the number of observations equal
    /// to the `k`-th value; values must be in ascending order. Histograms
    /// of different lengths are padded with zeros.
    ///
    /// Returns `None` when either sample is empty or when every
    /// observation is tied, since the normal approximation is undefined.
    ///
    /// ```
    /// use encal_algorithms::statistics::MannWhitney;
    /// use ndarray::array;
    ///
    /// // A = {1, 1, 2}, B = {0, 1}
    /// let test = MannWhitney::from_frequencies(array![0, 2, 1].view(), array![1, 1, 0].view()).unwrap();
    /// assert_eq!(test.u, 5.0);
    /// assert!(test.z > 0.0);
    /// ```
    pub fn from_frequencies(a: ArrayView1<'_, u64>, b: ArrayView1<'_, u64>) -> Option<Self> {
        let len = a.len().max(b.len());
        let groups = (0..len).map(|k| {
            (
                a.get(k).copied().unwrap_or(0),
                b.get(k).copied().unwrap_or(0),
            )
        });
        Self::from_groups(groups)
    }

    /// Test from raw observations
    pub fn from_samples(a: &[f64], b: &[f64]) -> Option<Self> {
        let mut pooled: Vec<(f64, bool)> = a
            .iter()
            .map(|&v| (v, true))
            .chain(b.iter().map(|&v| (v, false)))
            .collect();
        pooled.sort_by(|x, y| x.0.total_cmp(&y.0));

        let mut groups = Vec::new();
        let mut i = 0;
        while i < pooled.len() {
            let value = pooled[i].0;
            let (mut in_a, mut in_b) = (0u64, 0u64);
            while i < pooled.len() && pooled[i].0 == value {
                if pooled[i].1 {
                    in_a += 1;
                } else {
                    in_b += 1;
                }
                i += 1;
            }
            groups.push((in_a, in_b));
        }

        Self::from_groups(groups.into_iter())
    }

    /// Core computation over `(count in A, count in B)` per distinct value,
    /// ascending
    fn from_groups(groups: impl Iterator<Item = (u64, u64)>) -> Option<Self> {
        let mut n1: u64 = 0;
        let mut n2: u64 = 0;
        let mut rank_sum = 0.0;
        let mut ties = 0.0;
        let mut ranked = 0.0;

        for (in_a, in_b) in groups {
            let t = (in_a + in_b) as f64;
            if t == 0.0 {
                continue;
            }
            let mid_rank = ranked + (t + 1.0) / 2.0;
            rank_sum += in_a as f64 * mid_rank;
            ties += t * t * t - t;
            ranked += t;
            n1 += in_a;
            n2 += in_b;
        }

        if n1 == 0 || n2 == 0 {
            return None;
        }

        let (f1, f2) = (n1 as f64, n2 as f64);
        let n = f1 + f2;
        let u = rank_sum - f1 * (f1 + 1.0) / 2.0;
        let mean = f1 * f2 / 2.0;
        let variance = f1 * f2 / 12.0 * ((n + 1.0) - ties / (n * (n - 1.0)));

        if variance <= f64::EPSILON {
            return None;
        }

        let z = (u - mean) / variance.sqrt();
        Some(Self {
            n1,
            n2,
            u,
            z,
            p_value: 2.0 * normal_cdf(-z.abs()),
        })
    }

    /// Whether |z| exceeds `z_limit`
    pub fn is_significant(&self, z_limit: f64) -> bool {
        self.z.abs() > z_limit
    }
}

/// Approximate CDF of standard normal distribution
/// Uses Abramowitz & Stegun approximation (error < 7.5e-8)
pub fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989422804014327; // 1/sqrt(2*pi)
    let p = d
        * (-x * x / 2.0).exp()
        * (t * (0.3193815 + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274)))));

    if x > 0.0 {
        1.0 - p
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_separated_samples() {
        let test = MannWhitney::from_samples(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(test.u, 0.0);
        // (0 - 4.5) / sqrt(9 / 12 * 7)
        assert_relative_eq!(test.z, -4.5 / 5.25f64.sqrt(), epsilon = 1e-12);
        assert!(test.p_value < 0.06 && test.p_value > 0.04);
    }

    #[test]
    fn test_mid_ranks_match_raw_samples() {
        let hist = MannWhitney::from_frequencies(array![0, 2, 1].view(), array![1, 1, 0].view())
            .unwrap();
        let raw = MannWhitney::from_samples(&[1.0, 1.0, 2.0], &[0.0, 1.0]).unwrap();
        assert_eq!(hist.u, 5.0);
        assert_relative_eq!(hist.z, raw.z, epsilon = 1e-12);
        assert_eq!((hist.n1, hist.n2), (3, 2));
    }

    #[test]
    fn test_swapping_samples_flips_sign() {
        let a = array![3, 5, 2, 0, 1];
        let b = array![10, 4, 4, 2, 0];
        let ab = MannWhitney::from_frequencies(a.view(), b.view()).unwrap();
        let ba = MannWhitney::from_frequencies(b.view(), a.view()).unwrap();
        assert_relative_eq!(ab.z, -ba.z, epsilon = 1e-12);
        assert_relative_eq!(ab.p_value, ba.p_value, epsilon = 1e-12);
    }

    #[test]
    fn test_identical_distributions() {
        let h = array![4, 8, 2];
        let test = MannWhitney::from_frequencies(h.view(), h.view()).unwrap();
        assert_relative_eq!(test.z, 0.0, epsilon = 1e-12);
        assert!(!test.is_significant(1.96));
    }

    #[test]
    fn test_degenerate_samples() {
        // empty side
        assert!(MannWhitney::from_frequencies(array![0, 0].view(), array![3, 1].view()).is_none());
        // everything tied
        assert!(MannWhitney::from_frequencies(array![5, 0].view(), array![7, 0].view()).is_none());
        assert!(MannWhitney::from_samples(&[], &[1.0]).is_none());
    }

    #[test]
    fn test_padding() {
        let short = MannWhitney::from_frequencies(array![1, 1].view(), array![0, 1, 2].view()).unwrap();
        let padded =
            MannWhitney::from_frequencies(array![1, 1, 0].view(), array![0, 1, 2].view()).unwrap();
        assert_eq!(short, padded);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 0.002);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 0.002);
    }
}
