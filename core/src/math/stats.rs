pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        (Self::sum_sq(samples) / samples.len() as f64).sqrt()
    }

    pub fn sum_sq(samples: &[f64]) -> f64 {
        samples.iter().map(|&v| v * v).sum()
    }

    /// Weighted mean of `values`, or `None` when the weights sum below `floor`.
    pub fn weighted_mean(values: &[f64], weights: &[f64], floor: f64) -> Option<f64> {
        let (sum, sum_wgt) = values
            .iter()
            .zip(weights)
            .fold((0.0, 0.0), |(s, sw), (&v, &w)| (s + w * v, sw + w));
        if sum_wgt < floor {
            None
        } else {
            Some(sum / sum_wgt)
        }
    }
}
