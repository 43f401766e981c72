use nalgebra::{RealField, SVector};

use crate::error::FilterError;
use crate::utils::state::GaussianState;

/// A recursive estimator fed one measurement per time step.
pub trait BayesianFilter<T: RealField, const S: usize, const Z: usize> {
    /// Runs one predict/correct cycle. On error the estimate is left untouched.
    fn update_estimate(&mut self, z: &SVector<T, Z>) -> Result<(), FilterError>;

    fn gaussian_estimate(&self) -> GaussianState<T, S>;
}

/// Feeds every measurement to `filter` and collects the estimate after each step.
///
/// A rejected measurement is skipped: the previous estimate is recorded again.
pub fn replay<T, F, const S: usize, const Z: usize>(
    filter: &mut F,
    measurements: &[SVector<T, Z>],
) -> Vec<GaussianState<T, S>>
where
    T: RealField,
    F: BayesianFilter<T, S, Z> + ?Sized,
{
    let mut estimates = Vec::with_capacity(measurements.len());
    for (step, z) in measurements.iter().enumerate() {
        if let Err(err) = filter.update_estimate(z) {
            log::warn!("skipping measurement {}: {err}", step + 1);
        }
        estimates.push(filter.gaussian_estimate());
    }
    estimates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ExtendedKalmanFilter;
    use crate::models::{LinearMeasurement, LinearProcess};
    use nalgebra::{Matrix1, Vector1};

    #[test]
    fn replay_skips_rejected_measurements() {
        let mut ekf = ExtendedKalmanFilter::new(
            GaussianState::new(Vector1::new(0.0), Matrix1::new(1.0)),
            Matrix1::new(0.0),
            Matrix1::new(1.0),
            Box::new(LinearProcess::<f64, 1>::identity()),
            Box::new(LinearMeasurement::<f64, 1, 1>::identity()),
        );
        let estimates = replay(&mut ekf, &[Vector1::new(2.0)]);
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].x[0], 1.0);

        // S = P + R = 0
        ekf.set_measurement_noise(Matrix1::new(-0.5));
        let estimates = replay(&mut ekf, &[Vector1::new(7.0), Vector1::new(9.0)]);
        assert_eq!(estimates.len(), 2);
        assert!(estimates.iter().all(|e| e.x[0] == 1.0 && e.cov[(0, 0)] == 0.5));
    }
}
