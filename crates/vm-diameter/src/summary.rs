use serde::Serialize;

/// Statistics over the valid samples of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DiameterSummary {
    Measured {
        mean: f32,
        median: f32,
        /// Population standard deviation.
        std: f32,
        valid_samples: usize,
    },
    Unmeasured,
}

impl DiameterSummary {
    pub fn from_widths(widths: &[f32]) -> Self {
        if widths.is_empty() {
            return DiameterSummary::Unmeasured;
        }

        let n = widths.len() as f64;
        let mean = widths.iter().map(|&w| w as f64).sum::<f64>() / n;
        let var = widths
            .iter()
            .map(|&w| {
                let d = w as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        let mut sorted = widths.to_vec();
        sorted.sort_by(f32::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            0.5 * (sorted[mid - 1] + sorted[mid])
        } else {
            sorted[mid]
        };

        DiameterSummary::Measured {
            mean: mean as f32,
            median,
            std: var.sqrt() as f32,
            valid_samples: widths.len(),
        }
    }

    pub fn mean(&self) -> Option<f32> {
        match *self {
            DiameterSummary::Measured { mean, .. } => Some(mean),
            DiameterSummary::Unmeasured => None,
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, DiameterSummary::Measured { .. })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::DiameterSummary;

    #[test]
    fn summary_statistics() {
        let DiameterSummary::Measured {
            mean,
            median,
            std,
            valid_samples,
        } = DiameterSummary::from_widths(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
        else {
            panic!("expected measured summary");
        };
        assert_relative_eq!(mean, 5.0);
        assert_relative_eq!(median, 4.5);
        assert_relative_eq!(std, 2.0);
        assert_eq!(valid_samples, 8);
    }

    #[test]
    fn no_widths_is_unmeasured() {
        let s = DiameterSummary::from_widths(&[]);
        assert_eq!(s, DiameterSummary::Unmeasured);
        assert_eq!(s.mean(), None);
        assert!(!s.is_measured());
    }
}
