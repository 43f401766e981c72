#![allow(non_snake_case)]

use nalgebra::{RealField, SMatrix, SVector};

use crate::error::FilterError;
use crate::filter::BayesianFilter;
use crate::models::{LinearMeasurement, LinearProcess};
use crate::utils::state::GaussianState;

/// Classical Kalman filter for `x(k+1) = F x(k) + w`, `z(k) = H x(k) + v`.
#[derive(Debug, Clone, Copy)]
pub struct LinearKalmanFilter<T: RealField, const S: usize, const Z: usize> {
    x: SVector<T, S>,
    P: SMatrix<T, S, S>,
    F: SMatrix<T, S, S>,
    H: SMatrix<T, Z, S>,
    Q: SMatrix<T, S, S>,
    R: SMatrix<T, Z, Z>,
}

impl<T: RealField + Copy, const S: usize, const Z: usize> LinearKalmanFilter<T, S, Z> {
    pub fn new(
        initial: GaussianState<T, S>,
        process: LinearProcess<T, S>,
        measurement: LinearMeasurement<T, S, Z>,
        Q: SMatrix<T, S, S>,
        R: SMatrix<T, Z, Z>,
    ) -> LinearKalmanFilter<T, S, Z> {
        LinearKalmanFilter {
            x: initial.x,
            P: initial.cov,
            F: process.f,
            H: measurement.h,
            Q,
            R,
        }
    }

    /// Returns new (x, P) without touching `self`.
    fn update_pure(
        &self,
        z: &SVector<T, Z>,
    ) -> Result<(SVector<T, S>, SMatrix<T, S, S>), FilterError> {
        // Prediction
        let x_pred = self.F * self.x;
        let P_pred = self.F * self.P * self.F.transpose() + self.Q;

        // Update
        // nalgebra does not report which column failed
        let S_inv = (self.H * P_pred * self.H.transpose() + self.R)
            .try_inverse()
            .ok_or(FilterError::SingularMatrix { column: 0 })?;
        let K = P_pred * self.H.transpose() * S_inv;
        let x = x_pred + K * (z - self.H * x_pred);
        let P = (SMatrix::<T, S, S>::identity() - K * self.H) * P_pred;

        Ok((x, P))
    }

    pub fn update(&mut self, z: &SVector<T, Z>) -> Result<(), FilterError> {
        let (x, P) = self.update_pure(z)?;
        self.x = x;
        self.P = P;
        Ok(())
    }

    pub fn covariance(&self) -> &SMatrix<T, S, S> {
        &self.P
    }
}

impl<T: RealField + Copy, const S: usize, const Z: usize> BayesianFilter<T, S, Z>
    for LinearKalmanFilter<T, S, Z>
{
    fn update_estimate(&mut self, z: &SVector<T, Z>) -> Result<(), FilterError> {
        self.update(z)
    }

    fn gaussian_estimate(&self) -> GaussianState<T, S> {
        GaussianState {
            x: self.x,
            cov: self.P,
        }
    }
}
