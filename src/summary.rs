/// Descriptive statistics over the present samples of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Needs at least two samples; sample variance is undefined below that.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }

        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        let variance = samples
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (count - 1) as f64;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count,
            mean,
            variance,
            min,
            max,
        })
    }
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

/// Renders mean, variance, min and max of the present values under `title`.
pub fn summarize(values: &[Option<f64>], title: &str, unit: &str) -> String {
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    match Summary::from_samples(&present) {
        Some(s) => format!(
            "{title}:\n  Mean: {:.2}{unit}\n  Variance: {:.2}{unit}\n  Min: {:.2}{unit}\n  Max: {:.2}{unit}",
            s.mean, s.variance, s.min, s.max
        ),
        None => format!("{title}: Not enough data."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizes_three_values() {
        let x = summarize(&[Some(1.0), Some(2.0), Some(3.0)], "Test", "");
        assert_eq!(
            x,
            "Test:\n  Mean: 2.00\n  Variance: 1.00\n  Min: 1.00\n  Max: 3.00"
        );
    }

    #[test]
    fn unit_follows_every_figure() {
        let x = summarize(&[Some(10.0), Some(15.0), Some(20.0)], "Packet Loss", "%");
        assert!(x.starts_with("Packet Loss:\n"));
        assert!(x.contains("Mean: 15.00%"));
        assert!(x.contains("Variance: 25.00%"));
        assert!(x.contains("Min: 10.00%"));
        assert!(x.contains("Max: 20.00%"));
    }

    #[test]
    fn too_few_values_is_not_enough_data() {
        assert_eq!(summarize(&[], "Test", ""), "Test: Not enough data.");
        assert_eq!(summarize(&[Some(1.0)], "Test", ""), "Test: Not enough data.");
    }

    #[test]
    fn absent_values_are_dropped_before_counting() {
        assert_eq!(
            summarize(&[None, Some(4.0), None], "Download", "Mbps"),
            "Download: Not enough data."
        );
        let x = summarize(&[Some(2.0), None, Some(4.0)], "Upload", "Mbps");
        assert!(x.contains("Mean: 3.00Mbps"));
        assert!(x.contains("Variance: 2.00Mbps"));
    }

    #[test]
    fn variance_uses_n_minus_one() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let s = Summary::from_samples(&samples).unwrap();
        assert_eq!(s.mean, 5.0);
        assert!((s.variance - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!((s.min, s.max, s.count), (2.0, 9.0, 8));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[3.0]), Some(3.0));
    }
}
