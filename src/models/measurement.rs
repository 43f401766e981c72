use std::marker::PhantomData;

use nalgebra::{Matrix2x4, RealField, SMatrix, SVector, Vector2, Vector4};

use crate::utils::normalize_angle;

/// Observation `z(k) = g(x(k)) + v(k)` together with its Jacobian.
pub trait MeasurementModel<T: RealField, const S: usize, const Z: usize> {
    fn prediction(&self, x: &SVector<T, S>) -> SVector<T, Z>;

    /// Jacobian of `g`, evaluated at `x`
    fn jacobian(&self, x: &SVector<T, S>) -> SMatrix<T, Z, S>;

    fn linearize(&self, x: &SVector<T, S>) -> (SVector<T, Z>, SMatrix<T, Z, S>) {
        (self.prediction(x), self.jacobian(x))
    }

    /// Innovation `z - g(x)`. Override for components living on a circle.
    fn residual(&self, z: &SVector<T, Z>, predicted: &SVector<T, Z>) -> SVector<T, Z> {
        z - predicted
    }
}

/// `z(k) = H x(k)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMeasurement<T: RealField, const S: usize, const Z: usize> {
    pub h: SMatrix<T, Z, S>,
}

impl<T: RealField + Copy, const S: usize, const Z: usize> LinearMeasurement<T, S, Z> {
    pub fn new(h: SMatrix<T, Z, S>) -> Self {
        LinearMeasurement { h }
    }
}

impl<T: RealField + Copy, const S: usize> LinearMeasurement<T, S, S> {
    /// The whole state is observed directly.
    pub fn identity() -> Self {
        LinearMeasurement {
            h: SMatrix::identity(),
        }
    }
}

impl<T: RealField + Copy, const S: usize, const Z: usize> MeasurementModel<T, S, Z>
    for LinearMeasurement<T, S, Z>
{
    fn prediction(&self, x: &SVector<T, S>) -> SVector<T, Z> {
        self.h * x
    }

    fn jacobian(&self, _x: &SVector<T, S>) -> SMatrix<T, Z, S> {
        self.h
    }
}

/// Wraps a closure returning `(g(x), dg/dx)`.
pub struct FnMeasurement<T, F, const S: usize, const Z: usize> {
    g: F,
    _scalar: PhantomData<T>,
}

impl<T, F, const S: usize, const Z: usize> FnMeasurement<T, F, S, Z>
where
    T: RealField,
    F: Fn(&SVector<T, S>) -> (SVector<T, Z>, SMatrix<T, Z, S>),
{
    pub fn new(g: F) -> Self {
        FnMeasurement {
            g,
            _scalar: PhantomData,
        }
    }
}

impl<T, F, const S: usize, const Z: usize> MeasurementModel<T, S, Z> for FnMeasurement<T, F, S, Z>
where
    T: RealField,
    F: Fn(&SVector<T, S>) -> (SVector<T, Z>, SMatrix<T, Z, S>),
{
    fn prediction(&self, x: &SVector<T, S>) -> SVector<T, Z> {
        (self.g)(x).0
    }

    fn jacobian(&self, x: &SVector<T, S>) -> SMatrix<T, Z, S> {
        (self.g)(x).1
    }

    fn linearize(&self, x: &SVector<T, S>) -> (SVector<T, Z>, SMatrix<T, Z, S>) {
        (self.g)(x)
    }
}

/// Measurement = [range, bearing] to a fixed beacon.
/// State = [px, py, vx, vy]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBearing {
    pub beacon: Vector2<f64>,
}

impl RangeBearing {
    pub fn new(beacon: Vector2<f64>) -> Self {
        RangeBearing { beacon }
    }
}

impl MeasurementModel<f64, 4, 2> for RangeBearing {
    fn prediction(&self, x: &Vector4<f64>) -> Vector2<f64> {
        let dx = self.beacon.x - x[0];
        let dy = self.beacon.y - x[1];

        let range = (dx.powi(2) + dy.powi(2)).sqrt();
        let bearing = f64::atan2(dy, dx);
        Vector2::new(range, bearing)
    }

    fn jacobian(&self, x: &Vector4<f64>) -> Matrix2x4<f64> {
        let dx = self.beacon.x - x[0];
        let dy = self.beacon.y - x[1];

        let q = dx.powi(2) + dy.powi(2);
        let q_sqrt = q.sqrt();

        #[rustfmt::skip]
        let jacobian = Matrix2x4::<f64>::new(
            -dx / q_sqrt, -dy / q_sqrt, 0., 0.,
            dy / q,       -dx / q,      0., 0.,
        );
        jacobian
    }

    /// Bearing difference wrapped into `(-pi, pi]`
    fn residual(&self, z: &Vector2<f64>, predicted: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(z[0] - predicted[0], normalize_angle(z[1] - predicted[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn range_bearing_prediction() {
        let model = RangeBearing::new(Vector2::new(3.0, 4.0));
        let z = model.prediction(&Vector4::zeros());
        assert_relative_eq!(z[0], 5.0);
        assert_relative_eq!(z[1], f64::atan2(4.0, 3.0));
    }

    #[test]
    fn range_bearing_jacobian_matches_finite_differences() {
        let model = RangeBearing::new(Vector2::new(10.0, -7.0));
        let x = Vector4::new(1.5, 2.0, 0.3, -0.1);
        let analytic = model.jacobian(&x);

        let h = 1e-6;
        for j in 0..4 {
            let mut plus = x;
            let mut minus = x;
            plus[j] += h;
            minus[j] -= h;
            let numeric = (model.prediction(&plus) - model.prediction(&minus)) / (2.0 * h);
            for i in 0..2 {
                assert_relative_eq!(analytic[(i, j)], numeric[i], epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn bearing_residual_wraps_across_pi() {
        let model = RangeBearing::new(Vector2::zeros());
        let z = Vector2::new(10.0, PI - 0.005);
        let predicted = Vector2::new(10.0, -PI + 0.005);
        let residual = model.residual(&z, &predicted);
        assert_relative_eq!(residual[0], 0.0);
        assert_relative_eq!(residual[1], -0.01, epsilon = 1e-12);
    }

    #[test]
    fn default_residual_subtracts() {
        let model = LinearMeasurement::<f64, 2, 2>::identity();
        let residual = model.residual(&Vector2::new(3.0, PI), &Vector2::new(1.0, -PI));
        assert_eq!(residual, Vector2::new(2.0, 2.0 * PI));
    }

    #[test]
    fn linear_measurement_selects_position() {
        #[rustfmt::skip]
        let model = LinearMeasurement::new(Matrix2x4::new(
            1., 0., 0., 0.,
            0., 1., 0., 0.,
        ));
        let x = Vector4::new(1., 2., 3., 4.);
        assert_eq!(model.prediction(&x), Vector2::new(1., 2.));
        assert_eq!(model.jacobian(&x), model.h);
    }

    #[test]
    fn closure_measurement() {
        let model = FnMeasurement::new(|x: &SVector<f64, 2>| {
            (
                SVector::<f64, 1>::new(x[0] * x[1]),
                SMatrix::<f64, 1, 2>::new(x[1], x[0]),
            )
        });
        let x = SVector::<f64, 2>::new(2.0, 3.0);
        assert_eq!(model.prediction(&x)[0], 6.0);
        assert_eq!(model.jacobian(&x), SMatrix::<f64, 1, 2>::new(3.0, 2.0));
    }
}
