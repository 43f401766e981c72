use nalgebra::{RealField, SMatrix, SVector};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianState<T: RealField, const D: usize> {
    /// State Vector
    pub x: SVector<T, D>,
    /// Covariance Matrix
    pub cov: SMatrix<T, D, D>,
}

impl<T: RealField + Copy, const D: usize> GaussianState<T, D> {
    pub fn new(x: SVector<T, D>, cov: SMatrix<T, D, D>) -> Self {
        GaussianState { x, cov }
    }

    /// Per-component standard deviations, the square roots of the covariance diagonal.
    pub fn std_dev(&self) -> SVector<T, D> {
        self.cov.diagonal().map(|v| v.max(T::zero()).sqrt())
    }
}
