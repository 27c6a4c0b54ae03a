//! Standardization to zero mean and unit variance.

use crate::{Error, Result};

/// Per-dimension standardization fitted once and then frozen.
///
/// Uses the population standard deviation. Dimensions with zero variance get
/// a scale of 1 so constant features map to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fits mean and scale over `rows`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Data`] if `rows` is empty, has zero dimensions or
    /// rows of differing length.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::Data("cannot fit scaler on zero rows".to_string()));
        };
        let dims = first.len();
        if dims == 0 {
            return Err(Error::Data("cannot fit scaler on zero features".to_string()));
        }
        if rows.iter().any(|r| r.len() != dims) {
            return Err(Error::Data("feature rows have inconsistent lengths".to_string()));
        }

        let n = count_to_f64(rows.len());
        let mut mean = vec![0.0; dims];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut variance = vec![0.0; dims];
        for row in rows {
            for ((var, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                let diff = v - m;
                *var += diff * diff;
            }
        }

        let scale = variance
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Standardizes one row.
    #[must_use]
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Per-dimension means.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Per-dimension scales.
    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.mean.len()
    }
}

/// Converts a row count to f64 for averaging, capping at `u32::MAX`.
#[inline]
fn count_to_f64(value: usize) -> f64 {
    let capped = u32::try_from(value).unwrap_or(u32::MAX);
    f64::from(capped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_zero_mean_unit_variance() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert!((scaler.mean()[0] - 2.0).abs() < 1e-12);
        assert!((scaler.mean()[1] - 20.0).abs() < 1e-12);

        let transformed: Vec<Vec<f64>> = rows.iter().map(|r| scaler.transform(r)).collect();
        for dim in 0..2 {
            let column: Vec<f64> = transformed.iter().map(|r| r[dim]).collect();
            let mean: f64 = column.iter().sum::<f64>() / 3.0;
            let var: f64 = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_dimension_maps_to_zero() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 3.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert!((scaler.scale()[0] - 1.0).abs() < f64::EPSILON);
        assert_eq!(scaler.transform(&[5.0, 1.0])[0], 0.0);
    }

    #[test]
    fn test_fit_rejects_empty_and_ragged_input() {
        assert!(matches!(StandardScaler::fit(&[]), Err(Error::Data(_))));
        assert!(matches!(StandardScaler::fit(&[vec![]]), Err(Error::Data(_))));
        assert!(matches!(
            StandardScaler::fit(&[vec![1.0], vec![1.0, 2.0]]),
            Err(Error::Data(_))
        ));
    }
}
